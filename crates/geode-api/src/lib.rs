//! # geode-api: Position Ingestion Service
//!
//! Accepts a user's current coordinates over HTTP, identifies the user from
//! the bearer token's subject, and upserts the position into a PostGIS
//! table (one row per user, overwritten on every submission).
//!
//! ## API Surface
//!
//! | Method | Path       | Module                | Auth   |
//! |--------|------------|-----------------------|--------|
//! | POST   | `/geo`     | [`routes::geo`]       | Bearer |
//! | GET    | `/healthy` | [`routes::health`]    | none   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! RequestLog → Cors → Router → Handler
//! ```
//!
//! ## Lifecycle
//!
//! [`server::Server`] owns the socket and performs the graceful-then-forced
//! shutdown. See the module docs for the state machine.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;
pub mod telemetry;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::Router;

pub use error::AppError;
pub use state::AppState;

use crate::middleware::cors::{cors_middleware, CorsOptions};

/// Assemble the application router with all routes and middleware.
pub fn app(state: AppState, cors: CorsOptions) -> Router {
    Router::new()
        .merge(routes::geo::router())
        .merge(routes::health::router())
        .with_state(state)
        .layer(from_fn_with_state(Arc::new(cors), cors_middleware))
        .layer(middleware::request_log::layer())
}
