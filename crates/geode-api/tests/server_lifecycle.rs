//! Server lifecycle over real sockets: serving, draining in-flight requests
//! after the shutdown signal, refusing new connections, and forced close.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use geode_api::middleware::cors::CorsOptions;
use geode_api::server::{Server, ServerConfig, ShutdownOutcome};
use geode_api::store::MemoryPositionStore;
use geode_api::AppState;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Helper: bind on an ephemeral port and run until the returned sender fires.
async fn spawn_server(
    router: Router,
    config: ServerConfig,
) -> (
    SocketAddr,
    oneshot::Sender<()>,
    JoinHandle<ShutdownOutcome>,
) {
    let server = Server::bind("127.0.0.1:0", router, config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .run(async move {
                let _ = rx.await;
            })
            .await
            .unwrap()
    });
    (addr, tx, handle)
}

/// Helper: send one request and read the whole response.
async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Router whose `/slow` handler reports when it starts, then sleeps.
fn slow_router(started: oneshot::Sender<()>, delay: Duration) -> Router {
    let started = Arc::new(Mutex::new(Some(started)));
    Router::new().route(
        "/slow",
        get(move || {
            let started = started.clone();
            async move {
                if let Some(tx) = started.lock().unwrap().take() {
                    let _ = tx.send(());
                }
                tokio::time::sleep(delay).await;
                "done"
            }
        }),
    )
}

#[tokio::test]
async fn serves_the_application_over_tcp() {
    let app = geode_api::app(
        AppState::in_memory(MemoryPositionStore::new()),
        CorsOptions::with_origins(vec!["http://localhost:3000".to_string()]),
    );
    let (addr, shutdown, handle) = spawn_server(app, ServerConfig::default()).await;

    let response = http_get(addr, "/healthy").await;
    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");

    shutdown.send(()).unwrap();
    assert_eq!(handle.await.unwrap(), ShutdownOutcome::Graceful);
}

#[tokio::test]
async fn in_flight_request_completes_after_signal() {
    let (started_tx, started_rx) = oneshot::channel();
    let router = slow_router(started_tx, Duration::from_millis(400));
    let (addr, shutdown, handle) = spawn_server(router, ServerConfig::default()).await;

    let client = tokio::spawn(http_get(addr, "/slow"));
    started_rx.await.unwrap();
    shutdown.send(()).unwrap();

    let response = client.await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
    assert!(response.ends_with("done"));
    assert_eq!(handle.await.unwrap(), ShutdownOutcome::Graceful);
}

#[tokio::test]
async fn new_connections_are_refused_while_draining() {
    let (started_tx, started_rx) = oneshot::channel();
    let router = slow_router(started_tx, Duration::from_millis(600));
    let (addr, shutdown, handle) = spawn_server(router, ServerConfig::default()).await;

    let client = tokio::spawn(http_get(addr, "/slow"));
    started_rx.await.unwrap();
    shutdown.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(TcpStream::connect(addr).await.is_err());

    let response = client.await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
    assert_eq!(handle.await.unwrap(), ShutdownOutcome::Graceful);
}

#[tokio::test]
async fn stuck_request_is_aborted_after_grace_period() {
    let (started_tx, started_rx) = oneshot::channel();
    let router = slow_router(started_tx, Duration::from_secs(3600));
    let config = ServerConfig {
        grace_period: Duration::from_millis(200),
        ..ServerConfig::default()
    };
    let (addr, shutdown, handle) = spawn_server(router, config).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    started_rx.await.unwrap();
    shutdown.send(()).unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop after the grace period")
        .unwrap();
    assert_eq!(outcome, ShutdownOutcome::Forced);

    // The aborted connection is closed without a response.
    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response).await;
    assert!(response.is_empty());
}

#[tokio::test]
async fn idle_keep_alive_connection_does_not_block_shutdown() {
    let (started_tx, _started_rx) = oneshot::channel();
    let router = slow_router(started_tx, Duration::ZERO);
    let (addr, shutdown, handle) = spawn_server(router, ServerConfig::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).await.unwrap();
    assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));

    shutdown.send(()).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("idle connection held the server open")
        .unwrap();
    assert_eq!(outcome, ShutdownOutcome::Graceful);
}
