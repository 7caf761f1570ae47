//! # Cross-Origin Policy
//!
//! Allow-list CORS middleware.
//!
//! - A request whose `Origin` is not on a non-empty allow-list is passed to
//!   the inner handler untouched; the browser blocks the response itself.
//! - Otherwise the origin is echoed back together with the configured
//!   methods, headers, credentials flag and max-age.
//! - `OPTIONS` requests that pass the origin check are answered with
//!   `204 No Content` and never reach the inner handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// CORS configuration.
#[derive(Debug, Clone, Default)]
pub struct CorsOptions {
    /// Allowed origins. `*` matches any origin; empty allows every origin.
    pub allowed_origins: Vec<String>,
    /// Methods advertised in `Access-Control-Allow-Methods`.
    pub allowed_methods: Vec<Method>,
    /// Headers advertised in `Access-Control-Allow-Headers`.
    pub allowed_headers: Vec<HeaderName>,
    /// Emit `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,
    /// Preflight cache lifetime; omitted when `None` or zero.
    pub max_age: Option<Duration>,
}

impl CorsOptions {
    /// The service's standard policy for the given origin allow-list.
    pub fn with_origins(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins,
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
                Method::OPTIONS,
            ],
            allowed_headers: vec![
                HeaderName::from_static("origin"),
                HeaderName::from_static("content-type"),
                HeaderName::from_static("accept"),
                HeaderName::from_static("authorization"),
            ],
            allow_credentials: true,
            max_age: None,
        }
    }

    /// Whether a request from `origin` gets cross-origin headers.
    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.is_empty()
            || self
                .allowed_origins
                .iter()
                .any(|allowed| allowed == "*" || allowed == origin)
    }

    fn apply(&self, headers: &mut HeaderMap, origin: Option<HeaderValue>) {
        if let Some(origin) = origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }

        if !self.allowed_methods.is_empty() {
            let methods = join(self.allowed_methods.iter().map(Method::as_str));
            if let Ok(value) = HeaderValue::from_str(&methods) {
                headers.insert(ACCESS_CONTROL_ALLOW_METHODS, value);
            }
        }

        if !self.allowed_headers.is_empty() {
            let names = join(self.allowed_headers.iter().map(HeaderName::as_str));
            if let Ok(value) = HeaderValue::from_str(&names) {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
            }
        }

        if self.allow_credentials {
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }

        if let Some(max_age) = self.max_age.filter(|d| d.as_secs() > 0) {
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age.as_secs()));
        }
    }
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

/// Middleware applying [`CorsOptions`] to every request.
///
/// Mount with `axum::middleware::from_fn_with_state(Arc::new(options), cors_middleware)`.
pub async fn cors_middleware(
    State(options): State<Arc<CorsOptions>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request.headers().get(ORIGIN).cloned();
    let origin_str = origin
        .as_ref()
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !options.allows(origin_str) {
        return next.run(request).await;
    }

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let origin = origin.filter(|v| !v.is_empty());
    options.apply(response.headers_mut(), origin);
    response
}
