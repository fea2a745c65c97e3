//! Membership registry: the set of clients currently joined to a room.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;

/// Pre-marshaled outbound payload shared by every recipient.
pub type Outbound = Arc<str>;

/// Identifier of a connected client, unique for the hub's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// A registered member as seen by the hub.
#[derive(Debug)]
pub struct Member {
    /// Client identifier.
    pub id: ClientId,
    /// Display name.
    pub name: String,
    /// Room the member joined. Fixed for the member's lifetime.
    pub room: String,
    /// Writing half of the client's mailbox. Dropped on removal, which closes the mailbox.
    mailbox: mpsc::Sender<Outbound>,
}

impl Member {
    /// Create a member writing into `mailbox`.
    pub fn new(
        id: ClientId,
        name: impl Into<String>,
        room: impl Into<String>,
        mailbox: mpsc::Sender<Outbound>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            room: room.into(),
            mailbox,
        }
    }

    /// Offer a payload without waiting.
    pub fn try_deliver(&self, payload: Outbound) -> Result<(), mpsc::error::TrySendError<Outbound>> {
        self.mailbox.try_send(payload)
    }
}

/// Registry of joined members, iterated in join order.
#[derive(Debug, Default)]
pub struct MembershipRegistry {
    members: BTreeMap<ClientId, Member>,
}

impl MembershipRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member.
    ///
    /// Returns false, leaving the registry untouched, if the id is already registered.
    pub fn add(&mut self, member: Member) -> bool {
        if self.members.contains_key(&member.id) {
            return false;
        }
        self.members.insert(member.id, member);
        true
    }

    /// Remove a member, closing its mailbox.
    pub fn remove(&mut self, id: ClientId) -> Option<(String, String)> {
        self.members
            .remove(&id)
            .map(|member| (member.name, member.room))
    }

    /// Get a member by id.
    pub fn get(&self, id: ClientId) -> Option<&Member> {
        self.members.get(&id)
    }

    /// Snapshot of the members currently in `room`.
    pub fn list_room(&self, room: &str) -> Vec<&Member> {
        self.members
            .values()
            .filter(|member| member.room == room)
            .collect()
    }

    /// Display names of the members currently in `room`.
    pub fn member_names(&self, room: &str) -> Vec<String> {
        self.list_room(room)
            .into_iter()
            .map(|member| member.name.clone())
            .collect()
    }

    /// Number of members in `room`.
    pub fn room_count(&self, room: &str) -> usize {
        self.members.values().filter(|m| m.room == room).count()
    }

    /// Total number of registered members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
