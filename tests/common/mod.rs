//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a programmable mock service. The handler receives the request path
/// and returns (status, body).
pub async fn start_mock_service<F, Fut>(addr: SocketAddr, handler: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let path = parse_request_path(&buf[..n]);

                        let (status, body) = handler(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a backend that accepts connections, counts them, and drops the
/// socket without answering. Every proxied call observes a transport failure.
pub async fn start_resetting_backend(addr: SocketAddr) -> Arc<AtomicU32> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let accepts = Arc::new(AtomicU32::new(0));
    let counter = accepts.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    drop(socket);
                }
                Err(_) => break,
            }
        }
    });

    accepts
}

/// Start a backend that records the value of one request header and answers
/// 200. Returns the cell the captured value lands in.
pub async fn start_header_capture_backend(
    addr: SocketAddr,
    header: &'static str,
) -> Arc<std::sync::Mutex<Option<String>>> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let captured = Arc::new(std::sync::Mutex::new(None));
    let cell = captured.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let cell = cell.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let text = String::from_utf8_lossy(&buf[..n]).to_string();
                        let prefix = format!("{header}:");
                        if let Some(value) = text
                            .lines()
                            .find(|line| line.to_ascii_lowercase().starts_with(&prefix))
                            .map(|line| line[prefix.len()..].trim().to_string())
                        {
                            *cell.lock().unwrap() = Some(value);
                        }

                        let response =
                            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok";
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    captured
}

/// First line of an HTTP/1.1 request: `GET /path HTTP/1.1`.
fn parse_request_path(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string()
}
