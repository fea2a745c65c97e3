//! WebSocket handshake messages.
//!
//! After the join frame, a WebSocket client speaks exactly the same payloads
//! as a line client; only the join step is specific to this transport.

use serde::Deserialize;

/// Text sent back when the first frame is not a valid join request.
pub const INVALID_JOIN_MESSAGE: &str = "Invalid join message";

/// First frame a WebSocket client must send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JoinRequest {
    /// Join a room.
    Join {
        /// Display name. Blank falls back to the remote address.
        #[serde(default)]
        name: String,
        /// Room code. Blank falls back to the default room.
        #[serde(default)]
        code: String,
    },
}

impl JoinRequest {
    /// Decode a join frame. Returns `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::debug!("Invalid join frame: {}", e);
                None
            }
        }
    }

    /// Display name to join under, using `fallback` when the name is blank.
    pub fn name_or(&self, fallback: &str) -> String {
        let JoinRequest::Join { name, .. } = self;
        match name.trim() {
            "" => fallback.to_string(),
            name => name.to_string(),
        }
    }

    /// Room code as sent by the client.
    pub fn code(&self) -> &str {
        let JoinRequest::Join { code, .. } = self;
        code
    }
}
