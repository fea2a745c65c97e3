//! Line sessions: one per accepted TCP connection.
//!
//! A session runs the name / room-code handshake, joins the hub, and then
//! splits into a reader (this task) and a writer task draining the client's
//! mailbox.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::input::LineReader;
use crate::chat::{parse_client_input, ChatEvent, ClientHandle, ClientInput, HubHandle, Mailbox};
use crate::config::ServerConfig;
use crate::{Result, RoomcastError};

/// Prompt for the display name.
pub const NAME_PROMPT: &str = "Enter your name: ";

/// Prompt for the room code.
pub const ROOM_CODE_PROMPT: &str = "Enter room code: ";

/// First-line prefixes that identify HTTP health probes hitting the line port.
const HEALTH_PROBE_PREFIXES: [&str; 3] = ["GET /", "HEAD /", "User-Agent:"];

/// Check whether a first line looks like a health probe rather than a name.
pub fn is_health_probe(line: &str) -> bool {
    let line = line.trim();
    HEALTH_PROBE_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// A line-transport client session.
pub struct LineSession {
    hub: HubHandle,
    peer_addr: SocketAddr,
    join_timeout: Duration,
    max_line_length: usize,
}

impl LineSession {
    /// Create a session for a connection from `peer_addr`.
    pub fn new(hub: HubHandle, peer_addr: SocketAddr, config: &ServerConfig) -> Self {
        Self {
            hub,
            peer_addr,
            join_timeout: Duration::from_secs(config.join_timeout_secs),
            max_line_length: config.max_line_length,
        }
    }

    /// Get the peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Drive the connection until the client quits or disconnects.
    pub async fn run(self, stream: TcpStream) -> Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = LineReader::new(read_half, self.max_line_length);

        let (name, room_code) =
            match timeout(self.join_timeout, self.handshake(&mut lines, &mut write_half)).await {
                Ok(result) => match result? {
                    Some(answers) => answers,
                    None => return Ok(()),
                },
                Err(_) => {
                    debug!("Handshake from {} timed out", self.peer_addr);
                    return Ok(());
                }
            };

        let (client, mailbox) = match self.hub.join(&name, &room_code) {
            Ok(joined) => joined,
            Err(RoomcastError::JoinRejected(rejection)) => {
                info!("Rejected {} from {}: {}", name, self.peer_addr, rejection);
                write_half
                    .write_all(format!("{rejection}\n").as_bytes())
                    .await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        info!(
            "{} connected from {} as {}",
            client.name(),
            self.peer_addr,
            client.id()
        );

        let writer = tokio::spawn(write_loop(write_half, mailbox));
        self.hub
            .send(ChatEvent::joined(client.room(), client.name()))?;

        match self.read_loop(&mut lines, &client).await {
            Ok(()) => {}
            Err(RoomcastError::LineTooLong(max)) => {
                warn!("{} sent a line over {} bytes, closing", self.peer_addr, max);
            }
            Err(e) => debug!("Read from {} ended: {}", self.peer_addr, e),
        }

        info!("{} disconnected from {}", client.name(), self.peer_addr);
        self.hub.send(ChatEvent::left(client.room(), client.name()))?;
        self.hub.leave(client)?;
        if let Err(e) = writer.await {
            warn!("Writer task for {} failed: {}", self.peer_addr, e);
        }
        Ok(())
    }

    /// Ask for the name and room code.
    ///
    /// Returns `None` when the peer went away or turned out to be a health probe.
    async fn handshake<R, W>(
        &self,
        lines: &mut LineReader<R>,
        writer: &mut W,
    ) -> Result<Option<(String, String)>>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        send(writer, NAME_PROMPT).await?;
        let Some(line) = lines.read_line().await? else {
            return Ok(None);
        };
        if is_health_probe(&line) {
            debug!("Health probe from {}", self.peer_addr);
            return Ok(None);
        }
        let name = match line.trim() {
            "" => self.peer_addr.to_string(),
            name => name.to_string(),
        };

        send(writer, ROOM_CODE_PROMPT).await?;
        let Some(room_code) = lines.read_line().await? else {
            return Ok(None);
        };

        Ok(Some((name, room_code)))
    }

    async fn read_loop<R>(&self, lines: &mut LineReader<R>, client: &ClientHandle) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        while let Some(line) = lines.read_line().await? {
            match parse_client_input(&line) {
                ClientInput::Empty | ClientInput::Ignored => {}
                ClientInput::Quit => break,
                ClientInput::Payload(payload) => self.hub.submit(client, payload)?,
            }
        }
        Ok(())
    }
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, data: &str) -> Result<()> {
    writer.write_all(data.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Drain the mailbox onto the socket, one payload per line.
async fn write_loop(mut writer: OwnedWriteHalf, mut mailbox: Mailbox) {
    while let Some(payload) = mailbox.recv().await {
        let mut line = String::with_capacity(payload.len() + 1);
        line.push_str(&payload);
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!("Write failed: {}", e);
            break;
        }
    }
}
