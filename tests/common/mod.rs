//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use credsnare::protocols::{ListenerHandle, ProtocolConfig, ProtocolEngine, SpawnError};

/// One request seen by a mock webhook.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    /// Header names lowercased, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[allow(dead_code)]
impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Requests received by a mock webhook, in arrival order.
pub type Received = Arc<Mutex<Vec<ReceivedRequest>>>;

/// Start a programmable mock webhook endpoint on an ephemeral port.
///
/// `f` receives each request body and returns the status code to answer with.
#[allow(dead_code)]
pub async fn start_programmable_webhook<F, Fut>(f: F) -> (SocketAddr, Received)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = u16> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let log = received.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let body = request.body.clone();
                        log.lock().unwrap().push(request);
                        let status = f(body).await;
                        let status_text = match status {
                            200 => "200 OK",
                            204 => "204 No Content",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            status_text
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, received)
}

/// Start a mock webhook that answers every request with `status`.
#[allow(dead_code)]
pub async fn start_mock_webhook(status: u16) -> (SocketAddr, Received) {
    start_programmable_webhook(move |_| async move { status }).await
}

async fn read_request(socket: &mut TcpStream) -> Option<ReceivedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let headers: Vec<(String, String)> = head
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(ReceivedRequest {
        headers,
        body: String::from_utf8_lossy(&buf[header_end..]).into_owned(),
    })
}

/// Ordered log of lifecycle events observed by mock engines and sinks.
#[allow(dead_code)]
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Engine that records spawns and shutdowns and fails on chosen ports.
#[allow(dead_code)]
pub struct MockEngine {
    pub fail_ports: Vec<u16>,
    pub events: EventLog,
}

#[allow(dead_code)]
impl MockEngine {
    pub fn new(events: EventLog) -> Self {
        Self {
            fail_ports: Vec::new(),
            events,
        }
    }

    pub fn failing_on(mut self, ports: &[u16]) -> Self {
        self.fail_ports = ports.to_vec();
        self
    }
}

struct MockHandle {
    name: String,
    events: EventLog,
}

impl ListenerHandle for MockHandle {
    fn shutdown(self: Box<Self>) {
        self.events.lock().unwrap().push(format!("stop {}", self.name));
    }
}

impl ProtocolEngine for MockEngine {
    fn spawn(&self, config: ProtocolConfig) -> Result<Box<dyn ListenerHandle>, SpawnError> {
        let name = format!("{}:{}", config.protocol, config.bind_port);
        if self.fail_ports.contains(&config.bind_port) {
            self.events.lock().unwrap().push(format!("fail {}", name));
            return Err(SpawnError::Engine("address already in use".into()));
        }
        self.events.lock().unwrap().push(format!("start {}", name));
        Ok(Box::new(MockHandle {
            name,
            events: self.events.clone(),
        }))
    }
}
