//! # Position Store
//!
//! The single write path for user positions: [`PositionStore::upsert`].
//!
//! Two implementations exist:
//!
//! - [`crate::db::positions::PgPositionStore`]: PostGIS-backed, used when
//!   `DB_URL` is configured.
//! - [`MemoryPositionStore`]: process-local, used when no database is
//!   configured (development) and by the test suite.
//!
//! Both overwrite the previous position for a user entirely and stamp the
//! write with the current time. No history is kept.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use geode_core::{Coordinates, GeoPosition, UserId};
use parking_lot::RwLock;
use thiserror::Error;

/// Errors surfaced by a position store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The upsert statement failed (pool exhausted, connection lost, query error).
    #[error("failed to upsert geo position for user {user}: {source}")]
    Upsert {
        /// The user whose position was being written.
        user: UserId,
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },
}

/// Persistence contract for user positions.
#[async_trait]
pub trait PositionStore: Send + Sync + 'static {
    /// Insert or fully overwrite the position of `user`.
    ///
    /// Atomic per call. Concurrent upserts for the same user resolve
    /// last-writer-wins.
    async fn upsert(&self, user: UserId, coordinates: Coordinates) -> Result<(), StoreError>;
}

/// Thread-safe, cloneable in-memory position store.
///
/// The lock is `parking_lot` and is never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct MemoryPositionStore {
    positions: Arc<RwLock<HashMap<UserId, GeoPosition>>>,
}

impl MemoryPositionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position of `user`, if one was ever written.
    pub fn get(&self, user: &UserId) -> Option<GeoPosition> {
        self.positions.read().get(user).cloned()
    }

    /// Number of users with a recorded position.
    pub fn len(&self) -> usize {
        self.positions.read().len()
    }

    /// Whether no position has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.positions.read().is_empty()
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    async fn upsert(&self, user: UserId, coordinates: Coordinates) -> Result<(), StoreError> {
        let position = GeoPosition {
            user,
            coordinates,
            updated_at: Utc::now(),
        };
        self.positions.write().insert(user, position);
        tracing::debug!(%user, "position upserted");
        Ok(())
    }
}
