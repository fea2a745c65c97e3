//! roomcast - real-time room broadcast hub
//!
//! Clients join a room over a line-oriented TCP socket or a WebSocket and
//! exchange messages, edits and read receipts with everyone in that room.
//! All shared state lives in a single hub task.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod web;

pub use chat::{
    normalize_room_code, ChatEvent, ClientHandle, ClientPayload, EventKind, Hub, HubHandle,
    Mailbox, RoomStats,
};
pub use config::Config;
pub use error::{JoinRejection, Result, RoomcastError};
pub use server::{LineServer, LineSession};
pub use web::WebServer;
