//! WebSocket module for real-time communication.
//!
//! This module provides the WebSocket transport for hub clients. Browser
//! clients and line clients share rooms.

pub mod chat;
pub mod messages;

pub use chat::chat_ws_handler;
pub use messages::{JoinRequest, INVALID_JOIN_MESSAGE};
