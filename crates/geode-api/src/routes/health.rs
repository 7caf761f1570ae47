//! Liveness check.

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

/// Build the health router.
pub fn router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/healthy", get(healthy))
}

/// GET /healthy: always 200 with an empty body.
async fn healthy() -> StatusCode {
    StatusCode::OK
}
