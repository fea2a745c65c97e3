//! Inbound client payloads and outbound control payloads.
//!
//! Client input is decoded once at the transport boundary into
//! [`ClientPayload`]; the hub never sees untyped JSON.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::event::ChatEvent;

/// A decoded payload sent by a joined client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientPayload {
    /// New message, optionally replying to another one.
    #[serde(rename = "message", rename_all = "camelCase")]
    NewMessage {
        /// Message content.
        #[serde(default, deserialize_with = "string_or_empty")]
        content: String,
        /// Optional encoded image.
        #[serde(default, deserialize_with = "string_or_none")]
        image: Option<String>,
        /// Identifier of the replied-to message.
        #[serde(default, deserialize_with = "string_or_none")]
        reply_to: Option<String>,
    },
    /// Edit of one of the client's own messages.
    Edit {
        /// Identifier of the message to edit.
        #[serde(default, deserialize_with = "string_or_empty")]
        id: String,
        /// Replacement content.
        #[serde(default, deserialize_with = "string_or_empty")]
        content: String,
    },
    /// The client has read a message.
    ReadReceipt {
        /// Identifier of the message that was read.
        #[serde(default, deserialize_with = "string_or_empty")]
        id: String,
    },
    /// Raw text line that was not JSON.
    #[serde(skip)]
    PlainText(String),
}

/// Fields of the wrong JSON type decode as empty rather than failing the payload.
fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(string_or_none(deserializer)?.unwrap_or_default())
}

fn string_or_none<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Result of decoding one line or frame of client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientInput {
    /// Blank input, nothing to do.
    Empty,
    /// The client asked to disconnect.
    Quit,
    /// A payload for the hub.
    Payload(ClientPayload),
    /// A JSON object that is not a known payload.
    Ignored,
}

/// Decode one line or text frame of client input.
///
/// JSON objects are decoded by their `type` field; objects with an unknown
/// type, and a bare `null`, are ignored. Any other input that is not a JSON
/// object is treated as a plain text message.
pub fn parse_client_input(raw: &str) -> ClientInput {
    let text = raw.trim();
    if text.is_empty() {
        return ClientInput::Empty;
    }
    if text == "/quit" {
        return ClientInput::Quit;
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => match serde_json::from_value::<ClientPayload>(value) {
            Ok(payload) => ClientInput::Payload(payload),
            Err(e) => {
                tracing::debug!("Ignoring unrecognized client payload: {}", e);
                ClientInput::Ignored
            }
        },
        Ok(Value::Null) => ClientInput::Ignored,
        _ => ClientInput::Payload(ClientPayload::PlainText(text.to_string())),
    }
}

/// Per-room statistics broadcast on every join and leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    /// Configured member count, or the online count when no member list is configured.
    pub total_members: usize,
    /// Number of clients currently in the room.
    pub online_members: usize,
    /// Display names of the clients currently in the room.
    pub member_names: Vec<String>,
}

/// Control payloads pushed by the hub that are not chat events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPayload {
    /// Room statistics.
    Stats(RoomStats),
    /// Recent room history replayed to a new member.
    History {
        /// Messages in arrival order.
        messages: Vec<ChatEvent>,
    },
}
