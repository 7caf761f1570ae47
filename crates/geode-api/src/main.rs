//! # geode-api: Binary Entry Point
//!
//! Reads configuration from the environment, installs the tracing
//! subscriber, connects the position store, and serves until SIGINT or
//! SIGTERM.

use std::sync::Arc;

use geode_api::config::AppConfig;
use geode_api::db::positions::PgPositionStore;
use geode_api::middleware::cors::CorsOptions;
use geode_api::server::{shutdown_signal, Server, ServerConfig, ShutdownOutcome};
use geode_api::store::{MemoryPositionStore, PositionStore};
use geode_api::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    geode_api::telemetry::init(&config.log_level, config.log_format);
    tracing::info!(?config, "starting geode-api");

    let positions: Arc<dyn PositionStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = geode_api::db::init_pool(url, config.db_max_connections)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "failed to connect to database");
                    e
                })?;
            Arc::new(PgPositionStore::new(pool))
        }
        None => {
            tracing::warn!(
                "DB_URL not set, running with the in-memory store. \
                 Positions will not survive restarts."
            );
            Arc::new(MemoryPositionStore::new())
        }
    };

    let app = geode_api::app(
        AppState::new(positions),
        CorsOptions::with_origins(config.cors_allowed_origins.clone()),
    );

    let server = Server::bind(&config.listen_addr, app, ServerConfig::default())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to start server");
            e
        })?;

    match server.run(shutdown_signal()).await? {
        ShutdownOutcome::Graceful => tracing::info!("all connections drained"),
        ShutdownOutcome::Forced => tracing::warn!("exited with connections still open"),
    }

    Ok(())
}
