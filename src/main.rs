use nanoblog::{apply_log_level_from_env, bootstrap, close_db, config_path, fatal, logger};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if let Err(error) = logger::init() {
        eprintln!("Error: {error}");
    }
    apply_log_level_from_env();

    let path = config_path();
    let (config, db) = match bootstrap(&path).await {
        Ok(started) => started,
        Err(error) => fatal!("{:#}", error),
    };

    tracing::info!("database connected");
    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.db.redacted_dsn(),
        max_open_conns = config.db.max_open_conns,
        max_idle_conns = config.db.max_idle_conns,
        max_lifetime = ?config.db.max_lifetime,
        "loaded {}",
        path
    );
    tracing::debug!(pool_size = db.pool().size(), "pool ready");

    close_db().await;
}
