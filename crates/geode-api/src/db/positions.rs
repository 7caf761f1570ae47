//! Position persistence on the `geo` table.
//!
//! Points are stored as `geography(Point, 4326)`, longitude first.

use async_trait::async_trait;
use geode_core::{Coordinates, UserId};
use sqlx::PgPool;

use crate::store::{PositionStore, StoreError};

const UPSERT_POSITION: &str = "INSERT INTO geo (id, location, geo_updated)
     VALUES ($1, ST_SetSRID(ST_MakePoint($2, $3), 4326), now())
     ON CONFLICT (id) DO UPDATE
     SET location = EXCLUDED.location,
         geo_updated = EXCLUDED.geo_updated";

/// PostGIS-backed [`PositionStore`].
#[derive(Debug, Clone)]
pub struct PgPositionStore {
    pool: PgPool,
}

impl PgPositionStore {
    /// Wrap an already connected pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PositionStore for PgPositionStore {
    async fn upsert(&self, user: UserId, coordinates: Coordinates) -> Result<(), StoreError> {
        sqlx::query(UPSERT_POSITION)
            .bind(*user.as_uuid())
            .bind(coordinates.longitude)
            .bind(coordinates.latitude)
            .execute(&self.pool)
            .await
            .map_err(|source| StoreError::Upsert { user, source })?;

        tracing::debug!(%user, "position upserted");
        Ok(())
    }
}
