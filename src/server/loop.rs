// Server loop module
// Accepts connections until shutdown, then drains open connections

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};

use super::connection::accept_connection;
use crate::config::AppState;

/// How often the drain phase re-checks the connection counter
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run the accept loop until `shutdown` is notified.
///
/// After shutdown the listener is closed, open connections are asked to
/// close once their in-flight request is answered, and they get
/// `performance.shutdown_grace` seconds to finish before this returns.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) {
    let (closing_tx, closing_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &closing_rx);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to accept connection");
                    }
                }
            }

            () = shutdown.notified() => {
                tracing::info!("shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    drop(listener);
    closing_tx.send_replace(true);

    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    drain_connections(&active_connections, grace).await;
}

/// Wait for the active connection count to reach zero, up to `grace`
async fn drain_connections(active_connections: &AtomicUsize, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;

    loop {
        let remaining = active_connections.load(Ordering::SeqCst);
        if remaining == 0 {
            tracing::info!("all connections closed");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(remaining, "grace period elapsed with connections still open");
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::create_app;
    use crate::config::Config;
    use crate::server::create_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn send_raw(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn get(path: &str) -> String {
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
    }

    struct TestServer {
        addr: std::net::SocketAddr,
        counter: Arc<AtomicUsize>,
        shutdown: Arc<Notify>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn spawn_server(toml: &str) -> TestServer {
        let cfg = Config::from_toml(toml).unwrap();
        let app = create_app(Some(&cfg.app)).unwrap();
        let state = Arc::new(AppState::new(cfg, app));

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(start_server_loop(
            listener,
            state,
            Arc::clone(&counter),
            Arc::clone(&shutdown),
        ));

        TestServer {
            addr,
            counter,
            shutdown,
            handle,
        }
    }

    /// Send a keep-alive request and read until `body` has arrived
    async fn keep_alive_get(stream: &mut TcpStream, path: &str, body: &str) -> String {
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0_u8; 1024];
        while !buf.ends_with(body.as_bytes()) {
            let n = stream.read(&mut chunk).await.unwrap();
            assert_ne!(n, 0, "connection closed early");
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_serves_routes_and_stops_on_shutdown() {
        let server = spawn_server("[logging]\naccess_log = false");
        let addr = server.addr;

        let response = send_raw(addr, &get("/")).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
        assert!(response.ends_with("\r\n\r\nHello Flask!"), "{response}");

        let response = send_raw(addr, &get("/add/2/3")).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
        assert!(response.ends_with("\r\n\r\n2 + 3 = 6"), "{response}");

        let response = send_raw(addr, &get("/add/2/foo")).await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");

        server.shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(10), server.handle)
            .await
            .expect("server loop did not stop")
            .unwrap();
        assert_eq!(server.counter.load(Ordering::SeqCst), 0);
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_idle_keep_alive_does_not_delay_shutdown() {
        let server = spawn_server("[logging]\naccess_log = false\n[performance]\nshutdown_grace = 5");

        let mut client = TcpStream::connect(server.addr).await.unwrap();
        let response = keep_alive_get(&mut client, "/", "Hello Flask!").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
        assert_eq!(server.counter.load(Ordering::SeqCst), 1);

        let started = tokio::time::Instant::now();
        server.shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(10), server.handle)
            .await
            .expect("server loop did not stop")
            .unwrap();

        assert!(
            started.elapsed() < Duration::from_secs(1),
            "shutdown took {:?}",
            started.elapsed()
        );
        assert_eq!(server.counter.load(Ordering::SeqCst), 0);

        // The server closed the idle connection
        let mut rest = Vec::new();
        assert_eq!(client.read_to_end(&mut rest).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connections_beyond_limit_are_rejected() {
        let server = spawn_server("[logging]\naccess_log = false\n[performance]\nmax_connections = 1");

        let mut first = TcpStream::connect(server.addr).await.unwrap();
        let response = keep_alive_get(&mut first, "/add/1/1", "1 + 1 = 3").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");

        let mut second = TcpStream::connect(server.addr).await.unwrap();
        let mut buf = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(5), second.read_to_end(&mut buf))
            .await
            .expect("rejected connection was not closed")
            .unwrap();
        assert_eq!(read, 0);
        assert_eq!(server.counter.load(Ordering::SeqCst), 1);

        // The first connection is still served
        let response = keep_alive_get(&mut first, "/", "Hello Flask!").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");

        server.shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(10), server.handle)
            .await
            .expect("server loop did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_drain_returns_after_grace() {
        let counter = AtomicUsize::new(1);
        let started = tokio::time::Instant::now();
        drain_connections(&counter, Duration::from_millis(120)).await;
        assert!(started.elapsed() >= Duration::from_millis(120));
    }
}
