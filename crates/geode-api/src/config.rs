//! # Service Configuration
//!
//! Loaded once at startup from the environment.
//!
//! Variables:
//! - `LISTEN_ADDR` (default: `0.0.0.0:8080`; a bare `:port` binds all interfaces)
//! - `DB_URL` (optional; absent means in-memory store)
//! - `DB_MAX_CONNECTIONS` (default: 20)
//! - `LOG_LEVEL` (default: `info`)
//! - `LOG_FORMAT` (`json` or `text`, default: `text`)
//! - `CORS_ALLOWED_ORIGINS` (comma-separated, default: `http://localhost:3000`)
//!
//! A malformed `LISTEN_ADDR` or `DB_MAX_CONNECTIONS` is a [`ConfigError`].

use std::net::SocketAddr;

use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line records.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Service configuration.
///
/// Custom `Debug` redacts the database URL, which usually embeds a password.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Address to bind the HTTP listener to.
    pub listen_addr: String,
    /// Postgres connection string.
    pub database_url: Option<String>,
    /// Upper bound of the connection pool.
    pub db_max_connections: u32,
    /// Tracing filter directive.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// CORS origin allow-list.
    pub cors_allowed_origins: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("listen_addr", &self.listen_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            database_url: None,
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            cors_allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let listen_addr = match get("LISTEN_ADDR") {
            Some(raw) => parse_listen_addr(&raw)?,
            None => defaults.listen_addr,
        };

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".into(), raw)),
            },
            None => defaults.db_max_connections,
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or(defaults.cors_allowed_origins);

        Ok(Self {
            listen_addr,
            database_url: get("DB_URL"),
            db_max_connections,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: get("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            cors_allowed_origins,
        })
    }
}

/// Accept `ip:port`, `[ipv6]:port`, `hostname:port` or `:port`.
fn parse_listen_addr(raw: &str) -> Result<String, ConfigError> {
    let addr = normalize_listen_addr(raw.trim());
    if addr.parse::<SocketAddr>().is_ok() {
        return Ok(addr);
    }

    let invalid = || ConfigError::InvalidValue("LISTEN_ADDR".into(), raw.to_string());
    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let valid_host = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if valid_host && port.parse::<u16>().is_ok() {
        Ok(addr)
    } else {
        Err(invalid())
    }
}

fn normalize_listen_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}
