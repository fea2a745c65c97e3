//! Configuration module for roomcast.

use serde::Deserialize;
use std::path::Path;

use crate::chat::normalize_room_code;
use crate::{Result, RoomcastError};

/// Line transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum number of concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Seconds a connection may spend on the name / room-code handshake.
    #[serde(default = "default_join_timeout")]
    pub join_timeout_secs: u64,
    /// Longest accepted input line in bytes; longer lines are truncated.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> usize {
    100
}

fn default_join_timeout() -> u64 {
    30
}

fn default_max_line_length() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            join_timeout_secs: default_join_timeout(),
            max_line_length: default_max_line_length(),
        }
    }
}

/// WebSocket transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Whether the WebSocket transport is enabled.
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for HTTP and WebSocket.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Whether to serve static files.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

fn default_web_enabled() -> bool {
    true
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8000
}

fn default_serve_static() -> bool {
    true
}

fn default_static_path() -> String {
    "static".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_web_enabled(),
            host: default_web_host(),
            port: default_web_port(),
            serve_static: default_serve_static(),
            static_path: default_static_path(),
        }
    }
}

/// Hub configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Room codes clients may join.
    #[serde(default = "default_room_codes")]
    pub room_codes: Vec<String>,
    /// Room code used when a client supplies a blank one.
    #[serde(default = "default_room_code")]
    pub default_room_code: String,
    /// Display names allowed to join. Empty allows everyone.
    #[serde(default)]
    pub allowed_members: Vec<String>,
    /// Maximum number of messages replayed per room.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Capacity of each client's outgoing mailbox.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

fn default_room_codes() -> Vec<String> {
    vec![default_room_code()]
}

fn default_room_code() -> String {
    "MYGROUP123".to_string()
}

fn default_history_limit() -> usize {
    200
}

fn default_mailbox_capacity() -> usize {
    10
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            room_codes: default_room_codes(),
            default_room_code: default_room_code(),
            allowed_members: Vec::new(),
            history_limit: default_history_limit(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/roomcast.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Line transport configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// WebSocket transport configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Hub configuration.
    #[serde(default)]
    pub hub: HubConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(RoomcastError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| RoomcastError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `ROOMCAST_ROOM_CODES`: comma-separated room code allow-list
    /// - `ROOMCAST_ALLOWED_MEMBERS`: comma-separated member allow-list
    pub fn apply_env_overrides(&mut self) {
        if let Ok(codes) = std::env::var("ROOMCAST_ROOM_CODES") {
            let codes = split_list(&codes);
            if !codes.is_empty() {
                self.hub.room_codes = codes;
            }
        }
        if let Ok(members) = std::env::var("ROOMCAST_ALLOWED_MEMBERS") {
            self.hub.allowed_members = split_list(&members);
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.hub.room_codes.is_empty() {
            return Err(RoomcastError::Validation(
                "hub.room_codes must contain at least one room code".to_string(),
            ));
        }

        let default_code = normalize_room_code(&self.hub.default_room_code, "");
        let allowed = self
            .hub
            .room_codes
            .iter()
            .any(|code| normalize_room_code(code, "") == default_code);
        if !allowed {
            return Err(RoomcastError::Validation(format!(
                "hub.default_room_code {default_code} is not listed in hub.room_codes"
            )));
        }

        if self.hub.history_limit == 0 {
            return Err(RoomcastError::Validation(
                "hub.history_limit must be greater than zero".to_string(),
            ));
        }
        if self.hub.mailbox_capacity == 0 {
            return Err(RoomcastError::Validation(
                "hub.mailbox_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
