use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{Connection, MySqlPool};
use tokio::sync::{Mutex, OnceCell};

use crate::config::DbConfig;
use crate::errors::{Error, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Shared handle to the MySQL pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    /// Opens the pool and pings one connection before returning.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        tracing::debug!(dsn = %config.redacted_dsn(), "connecting to database");

        let pool = pool_options(config)
            .connect_with(connect_options(config)?)
            .await
            .map_err(Error::connection("failed to connect to database"))?;

        let mut conn = pool
            .acquire()
            .await
            .map_err(Error::connection("failed to acquire connection"))?;
        conn.ping()
            .await
            .map_err(Error::connection("database ping failed"))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl From<MySqlPool> for Database {
    fn from(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Fails when `port` does not fit a TCP port.
pub fn connect_options(config: &DbConfig) -> Result<MySqlConnectOptions> {
    let port = u16::try_from(config.port).map_err(|_| {
        Error::connection("invalid database port")(sqlx::Error::Configuration(
            format!("port {} is out of range", config.port).into(),
        ))
    })?;
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.database);
    if !config.charset.is_empty() {
        options = options.charset(&config.charset);
    }
    Ok(options)
}

/// Pool limits from config. A non-positive `max_open_conns` means the default
/// limit. sqlx has no idle cap, so `max_idle_conns` becomes `min_connections`:
/// the pool opens that many connections up front and keeps them, never more
/// than the open limit. A non-positive `max_lifetime` means no limit.
pub fn pool_options(config: &DbConfig) -> MySqlPoolOptions {
    let max_open = u32::try_from(config.max_open_conns)
        .ok()
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);
    let min_idle = u32::try_from(config.max_idle_conns).unwrap_or(0);
    let max_lifetime = (!config.max_lifetime.is_zero()).then_some(config.max_lifetime);

    MySqlPoolOptions::new()
        .max_connections(max_open)
        .min_connections(min_idle.min(max_open))
        .max_lifetime(max_lifetime)
}

/// Runs the connect routine at most once at a time and keeps the first
/// successful result.
///
/// Callers that arrive while an attempt is in flight wait for it and share
/// its outcome, failures included. A call that starts after a failed attempt
/// has finished runs a fresh one.
#[derive(Debug, Default)]
pub struct DatabaseCell {
    cell: OnceCell<Database>,
    // bumped under `last_failure` every time an attempt fails
    failures: AtomicU64,
    last_failure: Mutex<Option<Arc<Error>>>,
}

impl DatabaseCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
            failures: AtomicU64::new(0),
            last_failure: Mutex::const_new(None),
        }
    }

    pub async fn get_or_init_with<F, Fut>(&self, connect: F) -> Result<&Database>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Database>>,
    {
        if let Some(db) = self.cell.get() {
            return Ok(db);
        }
        let seen = self.failures.load(Ordering::Acquire);

        let mut last_failure = self.last_failure.lock().await;
        if let Some(db) = self.cell.get() {
            return Ok(db);
        }
        if self.failures.load(Ordering::Acquire) != seen {
            if let Some(failure) = last_failure.as_ref() {
                return Err(Error::Initialization(Arc::clone(failure)));
            }
        }

        match connect().await {
            Ok(db) => {
                *last_failure = None;
                Ok(self.cell.get_or_init(|| async { db }).await)
            }
            Err(error) => {
                tracing::warn!(%error, "database initialization failed");
                let failure = Arc::new(error);
                *last_failure = Some(Arc::clone(&failure));
                self.failures.fetch_add(1, Ordering::Release);
                Err(Error::Initialization(failure))
            }
        }
    }

    pub async fn get_or_init(&self, config: &DbConfig) -> Result<&Database> {
        self.get_or_init_with(|| Database::connect(config)).await
    }

    pub fn get(&self) -> Option<&Database> {
        self.cell.get()
    }

    /// No-op when nothing was initialized.
    pub async fn close(&self) {
        if let Some(db) = self.cell.get() {
            db.close().await;
        }
    }
}

static DATABASE: DatabaseCell = DatabaseCell::new();

pub async fn init_db(config: &DbConfig) -> Result<&'static Database> {
    DATABASE.get_or_init(config).await
}

/// `None` until `init_db` has succeeded.
pub fn get_db() -> Option<&'static Database> {
    DATABASE.get()
}

pub async fn close_db() {
    DATABASE.close().await;
}
