//! Web transport for roomcast.
//!
//! This module serves the WebSocket endpoint, a health check and optional
//! static files for the browser client.

pub mod router;
pub mod server;
pub mod ws;

pub use router::{create_health_router, create_router, create_static_router};
pub use server::WebServer;
