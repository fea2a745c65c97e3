//! Fan-out of outbound payloads to room members.
//!
//! A payload is serialized once and the same bytes are offered to every
//! recipient. Offers never wait: a full mailbox drops the payload for that
//! recipient only.

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, trace};

use super::registry::{Member, MembershipRegistry, Outbound};

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients whose mailbox accepted the payload.
    pub delivered: usize,
    /// Recipients whose mailbox was full or closed.
    pub dropped: usize,
}

/// Serialize a payload to its wire form.
///
/// Failures are logged and yield `None`; the caller skips the broadcast.
pub fn marshal<T: Serialize>(payload: &T) -> Option<Outbound> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Outbound::from(json)),
        Err(e) => {
            error!("Error marshaling outbound payload: {}", e);
            None
        }
    }
}

/// Offer `payload` to a single member without waiting.
pub fn deliver(member: &Member, payload: &Outbound) -> bool {
    match member.try_deliver(payload.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            trace!(client = %member.id, "Mailbox full, dropping payload");
            false
        }
        Err(TrySendError::Closed(_)) => {
            trace!(client = %member.id, "Mailbox closed, dropping payload");
            false
        }
    }
}

/// Offer `payload` to every current member of `room`.
pub fn broadcast_room(
    registry: &MembershipRegistry,
    room: &str,
    payload: &Outbound,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for member in registry.list_room(room) {
        if deliver(member, payload) {
            report.delivered += 1;
        } else {
            report.dropped += 1;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::registry::ClientId;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[test]
    fn test_marshal() {
        let payload = marshal(&serde_json::json!({"type": "stats"})).unwrap();
        assert_eq!(&*payload, r#"{"type":"stats"}"#);
    }

    #[test]
    fn test_marshal_failure_returns_none() {
        use std::collections::HashMap;
        // Non-string map keys cannot be represented in JSON
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        assert!(marshal(&bad).is_none());
    }

    #[test]
    fn test_broadcast_room_only_targets_room() {
        let mut registry = MembershipRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        registry.add(Member::new(ClientId(1), "Alice", "MAIN", tx1));
        registry.add(Member::new(ClientId(2), "Bob", "SIDE", tx2));

        let payload: Outbound = Arc::from("hello");
        let report = broadcast_room(&registry, "MAIN", &payload);

        assert_eq!(report, DeliveryReport { delivered: 1, dropped: 0 });
        assert_eq!(&*rx1.try_recv().unwrap(), "hello");
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_full_mailbox_drops_for_that_recipient_only() {
        let mut registry = MembershipRegistry::new();
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        registry.add(Member::new(ClientId(1), "Slow", "MAIN", slow_tx));
        registry.add(Member::new(ClientId(2), "Fast", "MAIN", fast_tx));

        for i in 0..3 {
            let payload: Outbound = Arc::from(format!("m{i}"));
            broadcast_room(&registry, "MAIN", &payload);
        }

        assert_eq!(&*slow_rx.try_recv().unwrap(), "m0");
        assert!(slow_rx.try_recv().is_err());

        for i in 0..3 {
            assert_eq!(&*fast_rx.try_recv().unwrap(), format!("m{i}").as_str());
        }
    }

    #[test]
    fn test_shared_bytes() {
        let mut registry = MembershipRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(1);
        let (tx2, mut rx2) = mpsc::channel(1);
        registry.add(Member::new(ClientId(1), "A", "MAIN", tx1));
        registry.add(Member::new(ClientId(2), "B", "MAIN", tx2));

        let payload: Outbound = Arc::from("once");
        broadcast_room(&registry, "MAIN", &payload);

        let a = rx1.try_recv().unwrap();
        let b = rx2.try_recv().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_closed_mailbox_counts_as_dropped() {
        let mut registry = MembershipRegistry::new();
        let (tx, rx) = mpsc::channel(1);
        registry.add(Member::new(ClientId(1), "Gone", "MAIN", tx));
        drop(rx);

        let report = broadcast_room(&registry, "MAIN", &Arc::from("x"));
        assert_eq!(report.dropped, 1);
    }
}
