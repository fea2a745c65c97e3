//! Router configuration for the web transport.

use std::path::Path;

use axum::{routing::get, Router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::chat::HubHandle;
use crate::config::WebConfig;

use super::ws::chat_ws_handler;

/// Create the main router.
pub fn create_router(hub: HubHandle, config: &WebConfig) -> Router {
    let mut router = Router::new()
        .route("/ws", get(chat_ws_handler))
        .with_state(hub)
        .merge(create_health_router());

    if config.serve_static {
        if let Some(static_router) = create_static_router(&config.static_path) {
            router = router.merge(static_router);
        }
    }

    router.layer(TraceLayer::new_for_http())
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Create a router serving files from `path`, if it is a directory.
pub fn create_static_router(path: &str) -> Option<Router> {
    if !Path::new(path).is_dir() {
        tracing::warn!("Static directory {} not found, not serving static files", path);
        return None;
    }
    Some(Router::new().fallback_service(ServeDir::new(path)))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
