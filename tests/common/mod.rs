//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use sakthi_gateway::config::GatewayConfig;
use sakthi_gateway::http::HttpServer;
use sakthi_gateway::lifecycle::Shutdown;

/// One request as seen by a mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string, exactly as received.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Minimal HTTP upstream that records every request it receives.
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub async fn start(body: &'static str) -> Self {
        Self::start_with_status("200 OK", body).await
    }

    pub async fn start_with_status(status_line: &'static str, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let recorded = recorded.clone();
                        tokio::spawn(async move {
                            handle_http(socket, recorded, status_line, body).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn handle_http(
    mut socket: TcpStream,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    status_line: &'static str,
    body: &'static str,
) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];

    let head_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        match socket.read(&mut tmp).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_string();
            let value = value.trim().to_string();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }

    let mut body_bytes = buf[head_end + 4..].to_vec();
    while body_bytes.len() < content_length {
        match socket.read(&mut tmp).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body_bytes.extend_from_slice(&tmp[..n]),
        }
    }

    requests.lock().unwrap().push(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body_bytes).to_string(),
    });

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nX-Upstream: mock\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// WebSocket upstream that records the upgrade and echoes every message.
pub struct MockWebSocketUpstream {
    pub addr: SocketAddr,
    upgrade_path: Arc<Mutex<Option<String>>>,
    upgrade_headers: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockWebSocketUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let upgrade_path: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let upgrade_headers: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));

        let path_slot = upgrade_path.clone();
        let header_slot = upgrade_headers.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let path_slot = path_slot.clone();
                        let header_slot = header_slot.clone();
                        tokio::spawn(async move {
                            echo_websocket(socket, path_slot, header_slot).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            addr,
            upgrade_path,
            upgrade_headers,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn upgrade_path(&self) -> Option<String> {
        self.upgrade_path.lock().unwrap().clone()
    }

    pub fn upgrade_header(&self, name: &str) -> Option<String> {
        self.upgrade_headers
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

async fn echo_websocket(
    socket: TcpStream,
    path_slot: Arc<Mutex<Option<String>>>,
    header_slot: Arc<Mutex<Vec<(String, String)>>>,
) {
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    let callback = move |req: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
        *path_slot.lock().unwrap() = Some(req.uri().to_string());
        let mut headers = header_slot.lock().unwrap();
        for (name, value) in req.headers() {
            headers.push((
                name.to_string(),
                value.to_str().unwrap_or_default().to_string(),
            ));
        }
        // Accept the first offered subprotocol, like a real server would.
        if let Some(offered) = req.headers().get("sec-websocket-protocol") {
            if let Ok(offered) = offered.to_str() {
                if let Some(first) = offered.split(',').next() {
                    if let Ok(value) = first.trim().parse() {
                        response
                            .headers_mut()
                            .insert("sec-websocket-protocol", value);
                    }
                }
            }
        }
        Ok(response)
    };

    let mut ws = match tokio_tungstenite::accept_hdr_async(socket, callback).await {
        Ok(ws) => ws,
        Err(_) => return,
    };

    while let Some(Ok(message)) = ws.next().await {
        use tokio_tungstenite::tungstenite::protocol::Message;
        match message {
            Message::Text(_) | Message::Binary(_) => {
                if ws.send(message).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    let _ = ws.close(None).await;
}

/// A gateway instance listening on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

/// Standard config with both upstreams re-pointed at test addresses.
pub fn gateway_config(api_base: &str, admin_base: &str) -> GatewayConfig {
    let mut config = GatewayConfig::standard();
    config.upstreams.api.base_url = api_base.to_string();
    config.upstreams.admin.base_url = admin_base.to_string();
    for route in &mut config.routes {
        if route.name == "ideas" {
            route.target_url = Some(format!("{}/app/api/ideas", api_base));
        }
    }
    config
}

/// Bind an ephemeral port, spawn the server, and wait until it accepts.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(config).unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    wait_until_ready(addr).await;
    TestGateway { addr, shutdown }
}

pub async fn wait_until_ready(addr: SocketAddr) {
    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("gateway did not become ready on {}", addr);
}

/// Client without connection pooling, so each request observes the gateway's
/// current state.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
