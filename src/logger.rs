//! Colorized console logging on top of `tracing`.
//!
//! Every event is written as a single line:
//!
//! ```text
//! <color>2024-05-01 12:00:00 [INFO]<reset> database connected
//! ```
//!
//! The threshold lives in a [`Logger`] and can be changed at runtime; events
//! below it are dropped. `tracing` has no level above `ERROR`, so fatal
//! events are error events sent to the [`FATAL_TARGET`] target, which is what
//! the [`fatal!`](crate::fatal) macro does before exiting the process.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Local;
use once_cell::sync::{Lazy, OnceCell};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter, Layer};

pub const FATAL_TARGET: &str = "fatal";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

impl Severity {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Debug),
            1 => Some(Self::Info),
            2 => Some(Self::Warn),
            3 => Some(Self::Error),
            4 => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Accepts either an index (`"1"`) or a level name (`"info"`).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(index) = value.parse::<i64>() {
            return Self::from_index(index);
        }
        match value.to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    pub fn of(metadata: &Metadata<'_>) -> Self {
        if metadata.target() == FATAL_TARGET {
            return Self::Fatal;
        }
        match *metadata.level() {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG | Level::TRACE => Self::Debug,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Debug => "\x1b[1;37m",
            Self::Info => "\x1b[1;32m",
            Self::Warn => "\x1b[1;33m",
            Self::Error => "\x1b[1;31m",
            Self::Fatal => "\x1b[1;35m",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Holds the minimum severity that gets printed.
///
/// Clones share the same threshold, so a subscriber built from a logger keeps
/// following later `set_level` calls.
#[derive(Debug, Clone)]
pub struct Logger {
    threshold: Arc<AtomicU8>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Severity::Debug)
    }
}

impl Logger {
    pub fn new(level: Severity) -> Self {
        Self {
            threshold: Arc::new(AtomicU8::new(level as u8)),
        }
    }

    pub fn level(&self) -> Severity {
        Severity::from_index(self.threshold.load(Ordering::Relaxed) as i64)
            .unwrap_or(Severity::Debug)
    }

    pub fn set_level(&self, level: Severity) {
        self.threshold.store(level as u8, Ordering::Relaxed);
    }

    /// Out-of-range indices are ignored.
    pub fn set_level_index(&self, index: i64) {
        if let Some(level) = Severity::from_index(index) {
            self.set_level(level);
        }
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.level()
    }

    /// Builds a subscriber that writes through `make_writer` and filters on
    /// this logger's threshold.
    pub fn subscriber<W>(&self, make_writer: W) -> impl Subscriber + Send + Sync + 'static
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let logger = self.clone();
        let layer = tracing_subscriber::fmt::layer()
            .event_format(ConsoleFormat)
            .with_writer(make_writer)
            .with_filter(filter::filter_fn(move |metadata| {
                logger.enabled(Severity::of(metadata))
            }));
        tracing_subscriber::registry().with(layer)
    }
}

static LOGGER: Lazy<Logger> = Lazy::new(Logger::default);
static INSTALLED: OnceCell<()> = OnceCell::new();

/// The process-wide logger.
pub fn global() -> &'static Logger {
    &LOGGER
}

pub fn set_level(level: Severity) {
    global().set_level(level);
}

/// Installs the global console subscriber. Later calls are no-ops.
pub fn init() -> anyhow::Result<()> {
    INSTALLED
        .get_or_try_init(|| {
            global()
                .subscriber(io::stdout)
                .try_init()
                .map_err(|err| anyhow::anyhow!(err))
        })
        .map(|_| ())
}

/// Formats `<color><timestamp> [LEVEL]<reset> <message>`.
pub struct ConsoleFormat;

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let severity = Severity::of(event.metadata());
        write!(
            writer,
            "{}{} [{}]{} ",
            severity.color(),
            Local::now().format(TIMESTAMP_FORMAT),
            severity.label(),
            RESET
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Logs at fatal severity, then exits the process with status 1.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {{
        ::tracing::error!(target: $crate::logger::FATAL_TARGET, $($arg)+);
        ::std::process::exit(1)
    }};
}
