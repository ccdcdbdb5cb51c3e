//! One-shot HTTP stub used by the channel tests.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A stub that answers exactly one request and hands back what it received.
pub struct StubServer {
    /// Base URL of the stub, ending in `/submit`.
    pub url: String,
    handle: JoinHandle<String>,
}

impl StubServer {
    /// Wait for the captured request and return its JSON body.
    pub async fn request_json(self) -> serde_json::Value {
        let raw = match self.handle.await {
            Ok(raw) => raw,
            Err(err) => panic!("stub task should finish: {err}"),
        };
        let body = raw.split("\r\n\r\n").nth(1).unwrap_or_default();
        match serde_json::from_str(body) {
            Ok(value) => value,
            Err(err) => panic!("request body should be JSON ({err}): {raw}"),
        }
    }

    /// Wait for the captured request and return its raw text.
    pub async fn request_text(self) -> String {
        match self.handle.await {
            Ok(raw) => raw,
            Err(err) => panic!("stub task should finish: {err}"),
        }
    }
}

/// Serve one response with the given status line, content type and body.
pub async fn serve_once(status_line: &str, content_type: &str, body: &str) -> StubServer {
    let listener = bind().await;
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => panic!("listener should expose local addr: {err}"),
    };

    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let handle = tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return String::new();
        };
        let request = read_request(&mut socket).await;
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
        request
    });

    StubServer {
        url: format!("http://{addr}/submit"),
        handle,
    }
}

/// A listener that must never see a connection.
pub struct Tripwire {
    /// URL pointing at the listener.
    pub url: String,
    listener: TcpListener,
}

impl Tripwire {
    /// Assert nobody connected within a short grace period.
    pub async fn assert_untouched(self) {
        let accepted =
            tokio::time::timeout(Duration::from_millis(200), self.listener.accept()).await;
        assert!(accepted.is_err(), "no request should have been sent");
    }
}

/// Bind a listener for negative network assertions.
pub async fn tripwire() -> Tripwire {
    let listener = bind().await;
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => panic!("listener should expose local addr: {err}"),
    };
    Tripwire {
        url: format!("http://{addr}/submit"),
        listener,
    }
}

async fn bind() -> TcpListener {
    match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => panic!("listener should bind: {err}"),
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        if let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end.saturating_add(4).saturating_add(content_length) {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
