//! Test helpers for integration tests.
//!
//! Provides a line client, a WebSocket client and helpers that start
//! a hub with its transports on ephemeral ports.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use roomcast::config::{HubConfig, ServerConfig, WebConfig};
use roomcast::server::{NAME_PROMPT, ROOM_CODE_PROMPT};
use roomcast::{Hub, HubHandle, LineServer, WebServer};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait before concluding that nothing more will arrive.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Hub configuration with two rooms, `MAIN` being the default.
pub fn hub_config() -> HubConfig {
    HubConfig {
        room_codes: vec!["MAIN".to_string(), "SIDE".to_string()],
        default_room_code: "MAIN".to_string(),
        ..HubConfig::default()
    }
}

/// Spawn a hub and a line server on an ephemeral port.
pub async fn start_line_server(config: HubConfig) -> (SocketAddr, HubHandle) {
    let hub = Hub::spawn(&config);
    let server_config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        join_timeout_secs: 2,
        ..ServerConfig::default()
    };
    let server = LineServer::bind(&server_config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve(hub.clone()));
    (addr, hub)
}

/// Start a web server on an ephemeral port for an existing hub.
pub async fn start_web_server(hub: HubHandle) -> SocketAddr {
    let config = WebConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        serve_static: false,
        ..WebConfig::default()
    };
    WebServer::new(&config, hub).run_with_addr().await.unwrap()
}

/// Line-transport test client.
pub struct LineClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl LineClient {
    /// Connect to the server at the given address.
    pub async fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
        })
    }

    /// Connect, answer both prompts, and wait for the client's own join notice.
    ///
    /// Returns the client and every payload received before that notice.
    pub async fn join(addr: SocketAddr, name: &str, code: &str) -> (Self, Vec<Value>) {
        let mut client = Self::connect(addr).await.unwrap();
        client.expect_prompt(NAME_PROMPT).await;
        client.send_line(name).await.unwrap();
        client.expect_prompt(ROOM_CODE_PROMPT).await;
        client.send_line(code).await.unwrap();

        let notice = format!("{name} has joined the chat");
        let mut greeting = Vec::new();
        loop {
            let value = client.recv_json().await;
            if value["type"] == "system" && value["content"] == notice.as_str() {
                break;
            }
            greeting.push(value);
        }
        (client, greeting)
    }

    /// Read exactly `prompt` from the server.
    pub async fn expect_prompt(&mut self, prompt: &str) {
        let mut buf = vec![0u8; prompt.len()];
        timeout(DEFAULT_TIMEOUT, self.reader.read_exact(&mut buf))
            .await
            .expect("timed out waiting for prompt")
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&buf), prompt);
    }

    /// Send raw bytes to the server.
    pub async fn send_raw(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data).await?;
        self.writer.flush().await
    }

    /// Send a line (with LF) to the server.
    pub async fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        self.send_raw(format!("{line}\n").as_bytes()).await
    }

    /// Send a JSON payload as one line.
    pub async fn send_json(&mut self, value: &Value) -> std::io::Result<()> {
        self.send_line(&value.to_string()).await
    }

    /// Receive one line, or `None` on EOF.
    pub async fn recv_line(&mut self) -> Option<String> {
        self.recv_line_timeout(DEFAULT_TIMEOUT)
            .await
            .expect("timed out waiting for a line")
    }

    /// Receive one line with a custom timeout. `Err` means the timeout elapsed.
    pub async fn recv_line_timeout(
        &mut self,
        duration: Duration,
    ) -> Result<Option<String>, tokio::time::error::Elapsed> {
        timeout(duration, async {
            let mut line = String::new();
            match self.reader.read_line(&mut line).await {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line.trim_end_matches('\n').to_string()),
            }
        })
        .await
    }

    /// Receive one JSON payload.
    pub async fn recv_json(&mut self) -> Value {
        let line = self.recv_line().await.expect("connection closed");
        serde_json::from_str(&line).unwrap_or_else(|e| panic!("not JSON ({e}): {line}"))
    }

    /// Receive payloads until one matches `pred`, returning it.
    pub async fn recv_until<F>(&mut self, pred: F) -> Value
    where
        F: Fn(&Value) -> bool,
    {
        loop {
            let value = self.recv_json().await;
            if pred(&value) {
                return value;
            }
        }
    }

    /// Receive payloads until one of the given `type` arrives.
    pub async fn recv_type(&mut self, kind: &str) -> Value {
        self.recv_until(|value| value["type"] == kind).await
    }

    /// Check that no payload arrives within the quiet period.
    pub async fn is_quiet(&mut self) -> bool {
        self.recv_line_timeout(QUIET_PERIOD).await.is_err()
    }

    /// Check that the server closes the connection.
    pub async fn expect_closed(&mut self) -> bool {
        loop {
            match self.recv_line_timeout(DEFAULT_TIMEOUT).await {
                Ok(None) => return true,
                Ok(Some(_)) => continue,
                Err(_) => return false,
            }
        }
    }

    /// Send a chat message and return its identifier from the echo.
    pub async fn say(&mut self, content: &str) -> String {
        self.send_json(&serde_json::json!({"type": "message", "content": content}))
            .await
            .unwrap();
        let echo = self
            .recv_until(|value| value["type"] == "message" && value["content"] == content)
            .await;
        echo["id"].as_str().unwrap().to_string()
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket test client.
pub struct WsClient {
    stream: WsStream,
}

impl WsClient {
    /// Open a WebSocket to `/ws`.
    pub async fn connect(addr: SocketAddr) -> Result<Self, tungstenite::Error> {
        let (stream, _response) = connect_async(format!("ws://{addr}/ws")).await?;
        Ok(Self { stream })
    }

    /// Send one text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<(), tungstenite::Error> {
        self.stream.send(Message::text(text)).await
    }

    /// Send a JSON payload as one text frame.
    pub async fn send_json(&mut self, value: &Value) -> Result<(), tungstenite::Error> {
        self.send_text(&value.to_string()).await
    }

    /// Receive the next text frame, or `None` once the server closes.
    pub async fn recv_text(&mut self) -> Option<String> {
        timeout(DEFAULT_TIMEOUT, async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await
        .expect("timed out waiting for a frame")
    }

    /// Receive one JSON payload.
    pub async fn recv_json(&mut self) -> Value {
        let text = self.recv_text().await.expect("socket closed");
        serde_json::from_str(&text).unwrap_or_else(|e| panic!("not JSON ({e}): {text}"))
    }

    /// Receive payloads until one of the given `type` arrives.
    pub async fn recv_type(&mut self, kind: &str) -> Value {
        loop {
            let value = self.recv_json().await;
            if value["type"] == kind {
                return value;
            }
        }
    }

    /// Send the join frame and wait for the client's own join notice.
    pub async fn join(addr: SocketAddr, name: &str, code: &str) -> (Self, Vec<Value>) {
        let mut client = Self::connect(addr).await.unwrap();
        client
            .send_json(&serde_json::json!({"type": "join", "name": name, "code": code}))
            .await
            .unwrap();

        let notice = format!("{name} has joined the chat");
        let mut greeting = Vec::new();
        loop {
            let value = client.recv_json().await;
            if value["type"] == "system" && value["content"] == notice.as_str() {
                break;
            }
            greeting.push(value);
        }
        (client, greeting)
    }
}
