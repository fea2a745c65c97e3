//! Message store: the lookup index of every chat message seen.
//!
//! Entries are never removed. Replies, edits and read receipts all resolve
//! their target through this index, scoped to the caller's room.

use std::collections::HashMap;

use super::event::{now_timestamp, ChatEvent};

/// Canonical record of stored messages, keyed by identifier.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: HashMap<String, ChatEvent>,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a message under its identifier.
    pub fn put(&mut self, event: ChatEvent) {
        self.messages.insert(event.id.clone(), event);
    }

    /// Look up a message by identifier.
    pub fn get(&self, id: &str) -> Option<&ChatEvent> {
        self.messages.get(id)
    }

    /// Look up a message that belongs to `room`.
    pub fn get_in_room(&self, id: &str, room: &str) -> Option<&ChatEvent> {
        self.get(id).filter(|event| event.room == room)
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Replace the content of a message if `author` wrote it and it lives in `room`.
    ///
    /// Sets the edited flag and refreshes the timestamp. Returns the updated
    /// message, or `None` when the edit must be dropped.
    pub fn mutate_if_author(
        &mut self,
        id: &str,
        room: &str,
        author: &str,
        content: impl Into<String>,
    ) -> Option<&ChatEvent> {
        let event = self.messages.get_mut(id)?;
        if event.room != room || event.author.as_deref() != Some(author) {
            return None;
        }

        event.content = content.into();
        event.edited = true;
        event.timestamp = now_timestamp();
        Some(event)
    }

    /// Record that `reader` read a message in `room` at `at`.
    ///
    /// A repeated receipt from the same reader overwrites the earlier time.
    pub fn record_read(
        &mut self,
        id: &str,
        room: &str,
        reader: &str,
        at: i64,
    ) -> Option<&ChatEvent> {
        let event = self.messages.get_mut(id)?;
        if event.room != room {
            return None;
        }

        event.read_by.insert(reader.to_string(), at);
        Some(event)
    }
}
