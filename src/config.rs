use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::errors::Result;

/// Top level settings file.
///
/// ```yaml
/// host: 0.0.0.0
/// port: 8080
/// db:
///   host: 127.0.0.1
///   port: 3306
///   username: blog
///   password: secret
///   database: nanoblog
///   charset: utf8mb4
///   max_idle_conns: 10
///   max_open_conns: 100
///   max_lifetime: 1h
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: i64,
    pub db: DbConfig,
}

#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub port: i64,
    pub username: String,
    pub password: String,
    pub database: String,
    pub charset: String,
    pub max_idle_conns: i64,
    pub max_open_conns: i64,
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_lifetime: Duration,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

impl DbConfig {
    /// Connection string with the password masked, for log output.
    pub fn redacted_dsn(&self) -> String {
        format!(
            "mysql://{}:***@{}:{}/{}?charset={}",
            self.username, self.host, self.port, self.database, self.charset
        )
    }
}

// Keeps the password out of `{:?}` output.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("max_idle_conns", &self.max_idle_conns)
            .field("max_open_conns", &self.max_open_conns)
            .field("max_lifetime", &self.max_lifetime)
            .finish()
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a duration such as \"1h30m\" or an integer number of nanoseconds")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Duration, E> {
            Ok(Duration::from_nanos(value))
        }

        // negative lifetimes mean no limit, same as zero
        fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Duration, E> {
            Ok(Duration::from_nanos(u64::try_from(value).unwrap_or(0)))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Duration, E> {
            parse_duration(value).map_err(E::custom)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Duration, E> {
            Ok(Duration::ZERO)
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

/// Parses durations written the way Go's `time.ParseDuration` expects them:
/// a sequence of decimal numbers, each with an optional fraction and a unit
/// suffix (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`), with an optional leading
/// sign. Negative durations clamp to zero.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let trimmed = input.trim();
    let (negative, text) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.is_empty() {
        return Err("empty duration".to_owned());
    }

    let mut total = 0f64;
    let mut rest = text;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {input:?}"))?;
        if number_len == 0 {
            return Err(format!("invalid duration {input:?}"));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("invalid number in duration {input:?}"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            unit => return Err(format!("unknown unit {unit:?} in duration {input:?}")),
        };
        rest = &rest[unit_len..];
        total += value * nanos_per_unit;
    }

    if negative {
        return Ok(Duration::ZERO);
    }
    Ok(Duration::from_nanos(total.round() as u64))
}
