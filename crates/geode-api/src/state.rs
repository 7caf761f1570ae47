//! # Application State
//!
//! Shared state for the Axum application, passed to route handlers via the
//! `State` extractor. It holds only the position store handle; nothing
//! about a request outlives the request.

use std::sync::Arc;

use crate::store::{MemoryPositionStore, PositionStore};

/// Handles shared by all requests.
#[derive(Clone)]
pub struct AppState {
    /// Sole write path for positions.
    pub positions: Arc<dyn PositionStore>,
}

impl AppState {
    /// Build state around a position store.
    pub fn new(positions: Arc<dyn PositionStore>) -> Self {
        Self { positions }
    }

    /// State backed by an in-memory store.
    pub fn in_memory(store: MemoryPositionStore) -> Self {
        Self::new(Arc::new(store))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
