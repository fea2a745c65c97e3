//! Chat event model shared by the hub and both transports.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Authored chat message. The only kind that is stored and replayed.
    Message,
    /// System notice (joins, leaves).
    System,
    /// In-place edit of a stored message.
    Edit,
    /// Read-state update of a stored message.
    ReadReceipt,
}

impl EventKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::System => "system",
            EventKind::Edit => "edit",
            EventKind::ReadReceipt => "read_receipt",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current time in seconds since the Unix epoch.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A chat event as it travels between clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    /// Globally unique identifier.
    pub id: String,
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Author's display name (absent for system notices and receipts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Optional embedded, already-encoded image payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    /// Room the event belongs to. Never changes after creation.
    #[serde(rename = "roomCode", default, skip_serializing_if = "String::is_empty")]
    pub room: String,
    /// Identifier of the message this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Whether the content was edited after creation.
    #[serde(default, skip_serializing_if = "is_false")]
    pub edited: bool,
    /// Reader name to read time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub read_by: BTreeMap<String, i64>,
    /// Content of the replied-to message, captured when the reply was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_content: Option<String>,
    /// Author of the replied-to message, captured when the reply was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_author: Option<String>,
}

impl ChatEvent {
    fn blank(id: String, kind: EventKind, room: String) -> Self {
        Self {
            id,
            kind,
            author: None,
            content: String::new(),
            image: None,
            timestamp: now_timestamp(),
            room,
            reply_to: None,
            edited: false,
            read_by: BTreeMap::new(),
            reply_to_content: None,
            reply_to_author: None,
        }
    }

    /// Create a new chat message with a fresh identifier.
    pub fn message(
        author: impl Into<String>,
        room: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut event = Self::blank(format!("msg_{}", Uuid::new_v4()), EventKind::Message, room.into());
        event.author = Some(author.into());
        event.content = content.into();
        event
    }

    /// Create a system notice.
    pub fn system(room: impl Into<String>, content: impl Into<String>) -> Self {
        let mut event = Self::blank(format!("sys_{}", Uuid::new_v4()), EventKind::System, room.into());
        event.content = content.into();
        event
    }

    /// Create the notice announcing that `name` joined `room`.
    pub fn joined(room: impl Into<String>, name: &str) -> Self {
        Self::system(room, format!("{name} has joined the chat"))
    }

    /// Create the notice announcing that `name` left `room`.
    pub fn left(room: impl Into<String>, name: &str) -> Self {
        Self::system(room, format!("{name} has left the chat"))
    }

    /// Attach an image payload.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Mark this message as a reply to `target`, snapshotting its content and author.
    pub fn replying_to(mut self, target: &ChatEvent) -> Self {
        self.reply_to = Some(target.id.clone());
        self.reply_to_content = Some(target.content.clone());
        self.reply_to_author = target.author.clone();
        self
    }

    /// Build the `edit` event announcing the current state of an edited message.
    pub fn edit_of(original: &ChatEvent) -> Self {
        let mut event = Self::blank(original.id.clone(), EventKind::Edit, original.room.clone());
        event.author = original.author.clone();
        event.content = original.content.clone();
        event.timestamp = original.timestamp;
        event.edited = true;
        event
    }

    /// Build the `read_receipt` event carrying the full read state of a message.
    pub fn receipt_of(original: &ChatEvent, at: i64) -> Self {
        let mut event = Self::blank(original.id.clone(), EventKind::ReadReceipt, original.room.clone());
        event.timestamp = at;
        event.read_by = original.read_by.clone();
        event
    }

    /// Whether this event is stored and replayed.
    pub fn is_message(&self) -> bool {
        self.kind == EventKind::Message
    }
}
