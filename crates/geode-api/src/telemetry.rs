//! # Tracing Subscriber Setup
//!
//! Installs the process-wide `tracing` subscriber. Called once from `main`;
//! library code only emits events.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

const FALLBACK_LEVEL: &str = "info";

/// Resolve the filter: `RUST_LOG` wins, then `level`, then `info`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(level))
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init(level: &str, format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(level));
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.is_ok()
}
