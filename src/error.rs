//! Error types for roomcast.

use thiserror::Error;

/// Reason a join request was refused before it reached the hub.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinRejection {
    /// The normalized room code is not in the configured allow-list.
    #[error("Invalid join code")]
    InvalidRoomCode(String),
    /// The display name is not in the configured member allow-list.
    #[error("You are not a member of this chat")]
    NotAMember(String),
}

/// Common error type for roomcast.
#[derive(Error, Debug)]
pub enum RoomcastError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for configuration or client input.
    #[error("validation error: {0}")]
    Validation(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A join request was refused.
    #[error("join rejected: {0}")]
    JoinRejected(JoinRejection),

    /// A client sent a line longer than the configured maximum.
    #[error("line longer than {0} bytes")]
    LineTooLong(usize),

    /// The hub task has stopped and no longer accepts events.
    #[error("hub is not running")]
    HubClosed,
}

impl From<JoinRejection> for RoomcastError {
    fn from(rejection: JoinRejection) -> Self {
        RoomcastError::JoinRejected(rejection)
    }
}

/// Result type alias for roomcast operations.
pub type Result<T> = std::result::Result<T, RoomcastError>;
