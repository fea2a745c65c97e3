//! Web server for roomcast.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

use crate::chat::HubHandle;
use crate::config::WebConfig;
use crate::Result;

use super::router::create_router;

/// Web server for the WebSocket transport.
pub struct WebServer {
    /// Address to bind, as `host:port`.
    bind_addr: String,
    /// Application router.
    router: Router,
}

impl WebServer {
    /// Create a new web server joined to `hub`.
    pub fn new(config: &WebConfig, hub: HubHandle) -> Self {
        Self {
            bind_addr: format!("{}:{}", config.host, config.port),
            router: create_router(hub, config),
        }
    }

    /// Get the configured bind address.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Run the web server.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        let service = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, service).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
