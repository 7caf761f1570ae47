//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Each variant carries its underlying cause for the operator log; the
//! client only ever sees the canonical status text (e.g. `Unauthorized`).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::IdentityError;
use crate::store::StoreError;

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or unusable credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] IdentityError),

    /// Request body is not a valid position payload (400).
    #[error("bad request: {0}")]
    BadRequest(#[from] serde_json::Error),

    /// The position store failed (500).
    #[error("internal error: {0}")]
    Internal(#[from] StoreError),
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            Self::Unauthorized(_) => tracing::warn!(error = %self, "no auth user"),
            Self::BadRequest(_) => tracing::debug!(error = %self, "could not decode position payload"),
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
        }

        // Never expose error details to clients.
        let body = status.canonical_reason().unwrap_or_default();
        (status, body).into_response()
    }
}
