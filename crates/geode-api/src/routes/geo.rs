//! # Position Submission
//!
//! `POST /geo` records the caller's current position, replacing any
//! previous one.
//!
//! Processing order: identify the caller (401 on failure), decode the body
//! (400), upsert (500), then answer 200 with an empty body. Coordinates are
//! not range-checked.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use geode_core::Coordinates;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;

/// Build the position router.
pub fn router() -> Router<AppState> {
    Router::new().route("/geo", post(submit_position))
}

/// POST /geo: upsert the caller's position.
///
/// The body is decoded regardless of `Content-Type`.
async fn submit_position(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let coordinates = decode_coordinates(&body)?;
    state.positions.upsert(user, coordinates).await?;
    Ok(StatusCode::OK)
}

/// Decode the first JSON value in `body`.
///
/// Anything after that value is ignored, and a top-level `null` means the
/// origin. A body holding no value at all is an error.
fn decode_coordinates(body: &[u8]) -> Result<Coordinates, serde_json::Error> {
    match serde_json::Deserializer::from_slice(body)
        .into_iter::<Option<Coordinates>>()
        .next()
    {
        Some(decoded) => Ok(decoded?.unwrap_or_default()),
        None => Err(serde::de::Error::custom("empty request body")),
    }
}
