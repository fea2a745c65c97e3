//! Chat core for roomcast.
//!
//! This module holds everything that is independent of a transport:
//! - The event model and the decoded client payloads
//! - The message store, room history and membership registry
//! - Non-blocking fan-out to per-client mailboxes
//! - The hub task that serializes every state change

pub mod event;
pub mod fanout;
pub mod history;
pub mod hub;
pub mod payload;
pub mod registry;
pub mod store;

pub use event::{now_timestamp, ChatEvent, EventKind};
pub use fanout::{broadcast_room, deliver, marshal, DeliveryReport};
pub use history::{RoomHistory, DEFAULT_HISTORY_LIMIT};
pub use hub::{normalize_room_code, ClientHandle, Hub, HubEvent, HubHandle, HubQuery, Mailbox};
pub use payload::{parse_client_input, ClientInput, ClientPayload, ControlPayload, RoomStats};
pub use registry::{ClientId, Member, MembershipRegistry, Outbound};
pub use store::MessageStore;
