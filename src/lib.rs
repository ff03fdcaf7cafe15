pub mod authentication;
pub mod config;
pub mod data_formats;
pub mod database;
pub mod db_helpers;
pub mod errors;
pub mod logger;
pub mod models;

use std::path::Path;

use anyhow::Context;
pub use config::{Config, DbConfig};
pub use data_formats::*;
pub use database::{close_db, get_db, init_db, Database};
pub use errors::{Error, Result};

pub const CONFIG_ENV: &str = "NANOBLOG_CONFIG";
pub const LOG_LEVEL_ENV: &str = "NANOBLOG_LOG_LEVEL";
pub const DEFAULT_CONFIG_PATH: &str = "settings.yaml";

/// Config file named by `NANOBLOG_CONFIG`, falling back to `settings.yaml`.
pub fn config_path() -> String {
    std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned())
}

/// Applies `NANOBLOG_LOG_LEVEL` to the global logger when it holds a valid
/// level; anything else is ignored.
pub fn apply_log_level_from_env() {
    if let Some(level) = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .as_deref()
        .and_then(logger::Severity::parse)
    {
        logger::set_level(level);
    }
}

/// Loads the config and opens the shared database handle.
pub async fn bootstrap(path: impl AsRef<Path>) -> anyhow::Result<(Config, &'static Database)> {
    let path = path.as_ref();
    let config = Config::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    let db = init_db(&config.db).await?;
    Ok((config, db))
}
