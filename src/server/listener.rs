//! TCP listener for the line transport.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use super::session::LineSession;
use crate::chat::HubHandle;
use crate::config::ServerConfig;
use crate::{Result, RoomcastError};

/// Accepts line clients, at most `max_connections` at a time.
pub struct LineServer {
    listener: TcpListener,
    slots: Arc<Semaphore>,
    config: ServerConfig,
}

impl LineServer {
    /// Bind to the configured address.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        info!("Line server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            slots: Arc::new(Semaphore::new(config.max_connections)),
            config: config.clone(),
        })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of connections currently holding a slot.
    pub fn active_connections(&self) -> usize {
        self.config.max_connections - self.slots.available_permits()
    }

    /// Wait for a free slot, then accept the next connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit)> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RoomcastError::Io(std::io::Error::other("connection slots closed")))?;

        let (stream, addr) = self.listener.accept().await?;
        debug!("Accepted connection from {}", addr);

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Accept connections forever, running a [`LineSession`] for each.
    pub async fn serve(self, hub: HubHandle) -> Result<()> {
        loop {
            let (stream, addr, permit) = match self.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let session = LineSession::new(hub.clone(), addr, &self.config);
            tokio::spawn(async move {
                if let Err(e) = session.run(stream).await {
                    warn!("Session for {} ended with error: {}", addr, e);
                }
                drop(permit);
            });
        }
    }
}

/// A connection slot, released on drop.
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}
