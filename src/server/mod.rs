//! Line transport.
//!
//! This module provides the TCP listener and per-connection sessions for
//! newline-delimited clients.

pub mod input;
mod listener;
mod session;

pub use input::{InputResult, LineBuffer, LineReader};
pub use listener::{ConnectionPermit, LineServer};
pub use session::{is_health_probe, LineSession, NAME_PROMPT, ROOM_CODE_PROMPT};
