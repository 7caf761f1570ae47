//! # Server Lifecycle
//!
//! Owns the listening socket and drives shutdown:
//!
//! ```text
//! Initializing ──bind──▶ Listening ──signal──▶ Draining ──drained──▶ Closed
//!                                                 │
//!                                                 └─grace elapsed─▶ ForceClosing ──▶ Closed
//! ```
//!
//! Each accepted connection is served on its own task. On the shutdown
//! signal the listener is dropped (new connections are refused), open
//! connections finish their in-flight request and close, and anything still
//! running after the grace period is aborted.
//!
//! There is no per-request deadline; a handler that never completes holds
//! its connection until the forced close.
//!
//! Accept failures are handled in three classes:
//!
//! - errors that concern a single connection are skipped;
//! - resource exhaustion (out of descriptors, buffers or memory) is logged
//!   and retried after a backoff of 5 ms doubling up to 1 s, while open
//!   connections keep being served;
//! - anything else means the listener is broken: it is logged, accepting
//!   stops, open connections drain as on a shutdown signal, and `run`
//!   returns [`ServerError::Accept`].

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tower::ServiceExt;

/// Default bound on how long a client may take to send request headers.
pub const HEADER_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Default time allowed for in-flight requests after the shutdown signal.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Listener tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bound on slow-client header transmission.
    pub header_read_timeout: Duration,
    /// Drain window after the shutdown signal.
    pub grace_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            header_read_timeout: HEADER_READ_TIMEOUT,
            grace_period: SHUTDOWN_GRACE_PERIOD,
        }
    }
}

/// Lifecycle phases, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Configured, not yet bound.
    Initializing,
    /// Accepting connections.
    Listening,
    /// Refusing new connections, waiting for open ones.
    Draining,
    /// Grace period elapsed; aborting what is left.
    ForceClosing,
    /// Terminal.
    Closed,
}

impl LifecycleState {
    /// Return the string representation of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Listening => "listening",
            Self::Draining => "draining",
            Self::ForceClosing => "force_closing",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn transition(from: LifecycleState, to: LifecycleState) -> LifecycleState {
    tracing::info!(from = %from, to = %to, "server state transition");
    to
}

/// How the drain phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every open connection finished within the grace period.
    Graceful,
    /// The grace period elapsed and remaining connections were aborted.
    Forced,
}

/// Fatal lifecycle errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The listener failed in a way retrying cannot fix.
    #[error("accept loop failed: {0}")]
    Accept(#[source] io::Error),
}

/// Source of inbound TCP connections.
trait Accept: Send + Sync + 'static {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Accept for TcpListener {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// A bound HTTP server, ready to run.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    router: Router,
    config: ServerConfig,
}

impl Server {
    /// Bind `addr` and prepare to serve `router`. Does not accept yet.
    pub async fn bind(addr: &str, router: Router, config: ServerConfig) -> Result<Self, ServerError> {
        let state = LifecycleState::Initializing;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::debug!(state = %state, addr, "listener bound");

        Ok(Self {
            listener,
            router,
            config,
        })
    }

    /// The address actually bound (useful with port `0`).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves (or the listener fails), then drain.
    pub async fn run<F>(self, shutdown: F) -> Result<ShutdownOutcome, ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        serve(self.listener, self.router, self.config, shutdown).await
    }
}

async fn serve<L, F>(
    listener: L,
    router: Router,
    config: ServerConfig,
    shutdown: F,
) -> Result<ShutdownOutcome, ServerError>
where
    L: Accept,
    F: Future<Output = ()> + Send,
{
    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(config.header_read_timeout);

    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();
    let mut backoff: Option<Duration> = None;
    let mut fatal: Option<io::Error> = None;
    let mut state = transition(LifecycleState::Initializing, LifecycleState::Listening);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "server listening");
    }

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, remote_addr) = match accepted {
                    Ok(conn) => {
                        backoff = None;
                        conn
                    }
                    Err(err) if is_connection_error(&err) => {
                        tracing::debug!(error = %err, "connection dropped during accept");
                        continue;
                    }
                    Err(err) if is_resource_exhaustion(&err) => {
                        let delay = accept_backoff(backoff);
                        backoff = Some(delay);
                        tracing::error!(
                            error = %err,
                            retry_in = ?delay,
                            open_connections = connections.len(),
                            "accept error"
                        );
                        tokio::select! {
                            () = tokio::time::sleep(delay) => continue,
                            () = &mut shutdown => break,
                        }
                    }
                    Err(err) => {
                        tracing::error!(
                            error = %err,
                            open_connections = connections.len(),
                            "server crashed"
                        );
                        fatal = Some(err);
                        break;
                    }
                };

                let service = router.clone().map_request(move |mut request: Request<Incoming>| {
                    request.extensions_mut().insert(ConnectInfo(remote_addr));
                    request
                });
                let conn = builder.serve_connection_with_upgrades(
                    TokioIo::new(stream),
                    TowerToHyperService::new(service),
                );
                let conn = graceful.watch(conn.into_owned());
                connections.spawn(async move {
                    if let Err(err) = conn.await {
                        tracing::debug!(%remote_addr, error = %err, "connection closed with error");
                    }
                });
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            () = &mut shutdown => break,
        }
    }

    state = transition(state, LifecycleState::Draining);
    drop(listener);
    tracing::info!(open_connections = connections.len(), "shutting down...");

    let outcome = match tokio::time::timeout(config.grace_period, graceful.shutdown()).await {
        Ok(()) => ShutdownOutcome::Graceful,
        Err(_) => {
            state = transition(state, LifecycleState::ForceClosing);
            tracing::error!(
                grace_period = ?config.grace_period,
                open_connections = connections.len(),
                "graceful shutdown failed, shutting down forcefully"
            );
            connections.abort_all();
            ShutdownOutcome::Forced
        }
    };
    while connections.join_next().await.is_some() {}

    transition(state, LifecycleState::Closed);
    tracing::info!(?outcome, "server stopped");
    match fatal {
        Some(err) => Err(ServerError::Accept(err)),
        None => Ok(outcome),
    }
}

/// Errors that clear up once other connections close.
#[cfg(unix)]
fn is_resource_exhaustion(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::OutOfMemory
        || matches!(
            err.raw_os_error(),
            Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
        )
}

#[cfg(not(unix))]
fn is_resource_exhaustion(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::OutOfMemory
}

/// Next accept retry delay: 5 ms, doubling per consecutive failure, capped at 1 s.
fn accept_backoff(previous: Option<Duration>) -> Duration {
    match previous {
        None => ACCEPT_BACKOFF_MIN,
        Some(delay) => (delay * 2).min(ACCEPT_BACKOFF_MAX),
    }
}

/// Errors that concern a single connection, not the listener.
fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
