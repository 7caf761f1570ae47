//! # Request Logging
//!
//! A `tower_http::trace::TraceLayer` configured to emit one DEBUG event per
//! request once the inner service has produced its response:
//!
//! ```text
//! DEBUG request{method=POST path=/geo remote_ip=10.0.0.7:51234 user_agent=curl/8.5.0}: status=200 dur=1.2ms
//! ```
//!
//! The layer only observes; request and response pass through unchanged,
//! and a panic in the inner service propagates.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::http::{header, Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{MakeSpan, OnResponse, TraceLayer};
use tracing::Span;

/// The fully configured logging layer type.
pub type RequestLogLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan, (), LogResponse, (), (), ()>;

/// Build the request logging layer.
pub fn layer() -> RequestLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_request(())
        .on_response(LogResponse)
        .on_body_chunk(())
        .on_eos(())
        .on_failure(())
}

/// Opens a DEBUG span carrying the request's method, path, peer and user-agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let remote_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_else(|| "-".to_string());
        let user_agent = request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        tracing::debug_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            remote_ip = %remote_ip,
            user_agent = %user_agent,
        )
    }
}

/// Records the final status and elapsed time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogResponse;

impl<B> OnResponse<B> for LogResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        tracing::debug!(status = response.status().as_u16(), dur = ?latency, "request");
    }
}
