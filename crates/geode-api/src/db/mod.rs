//! # Database Persistence Layer
//!
//! Postgres/PostGIS persistence for user positions via SQLx.
//!
//! The database layer is **optional**. When `DB_URL` is set, positions are
//! written to the `geo` table. When absent, the service falls back to
//! [`crate::store::MemoryPositionStore`] and positions do not survive a
//! restart.

pub mod positions;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect to Postgres and apply the embedded migrations.
///
/// Returns `Err` if the connection or a migration fails.
pub async fn init_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2.min(max_connections))
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!(max_connections, "connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(pool)
}
