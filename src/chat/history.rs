//! Bounded per-room message history used for replay to new members.

use std::collections::{HashMap, VecDeque};

use super::event::ChatEvent;

/// Default number of messages kept per room.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Per-room FIFO buffers of recent `message` events.
#[derive(Debug)]
pub struct RoomHistory {
    rooms: HashMap<String, VecDeque<ChatEvent>>,
    limit: usize,
}

impl RoomHistory {
    /// Create a history keeping at most `limit` messages per room.
    pub fn new(limit: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            limit: limit.max(1),
        }
    }

    /// Append a message to its room, evicting the oldest entries past the limit.
    ///
    /// Events that are not of kind `message` are ignored.
    pub fn append(&mut self, room: &str, event: ChatEvent) {
        if !event.is_message() {
            return;
        }

        let entries = self.rooms.entry(room.to_string()).or_default();
        entries.push_back(event);
        while entries.len() > self.limit {
            entries.pop_front();
        }
    }

    /// Copy of the room's history in arrival order.
    pub fn snapshot(&self, room: &str) -> Vec<ChatEvent> {
        self.rooms
            .get(room)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of messages held for a room.
    pub fn len(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, VecDeque::len)
    }

    /// Replace a stored entry with its updated version, if still held.
    ///
    /// Keeps replayed messages in step with edits and read receipts.
    pub fn refresh(&mut self, event: &ChatEvent) {
        if let Some(entry) = self
            .rooms
            .get_mut(&event.room)
            .and_then(|entries| entries.iter_mut().find(|entry| entry.id == event.id))
        {
            *entry = event.clone();
        }
    }
}

impl Default for RoomHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
