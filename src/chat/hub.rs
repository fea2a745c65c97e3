//! The hub: a single task that owns all shared chat state.
//!
//! Transports talk to the hub only through a [`HubHandle`], which enqueues
//! events on one unbounded channel. The hub consumes them strictly one at a
//! time, so the registry, message store and room history need no locking.
//! A tick never waits on I/O; delivery to clients goes through their bounded
//! mailboxes (see [`super::fanout`]).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::event::{now_timestamp, ChatEvent, EventKind};
use super::fanout::{broadcast_room, deliver, marshal};
use super::history::RoomHistory;
use super::payload::{ClientPayload, ControlPayload, RoomStats};
use super::registry::{ClientId, Member, MembershipRegistry, Outbound};
use super::store::MessageStore;
use crate::config::HubConfig;
use crate::{JoinRejection, Result, RoomcastError};

/// Normalize a client-supplied room code: trim, upper-case, blank → `default`.
pub fn normalize_room_code(raw: &str, default: &str) -> String {
    let code = raw.trim();
    if code.is_empty() {
        default.trim().to_uppercase()
    } else {
        code.to_uppercase()
    }
}

/// Events consumed by the hub.
#[derive(Debug)]
pub enum HubEvent {
    /// A client completed its join handshake.
    Join(Member),
    /// A client disconnected or quit.
    Leave(ClientId),
    /// A fully built event to store (if a message) and fan out.
    Message(ChatEvent),
    /// A decoded payload from a joined client.
    Client {
        /// Sending client.
        client: ClientId,
        /// Decoded payload.
        payload: ClientPayload,
    },
    /// A read-only query answered from inside the tick.
    Query(HubQuery),
}

/// Read-only queries against hub state.
#[derive(Debug)]
pub enum HubQuery {
    /// Current statistics of a room.
    RoomStats {
        /// Room code.
        room: String,
        /// Reply channel.
        reply: oneshot::Sender<RoomStats>,
    },
    /// Current history of a room.
    History {
        /// Room code.
        room: String,
        /// Reply channel.
        reply: oneshot::Sender<Vec<ChatEvent>>,
    },
    /// A stored message by identifier.
    Message {
        /// Message identifier.
        id: String,
        /// Reply channel.
        reply: oneshot::Sender<Option<ChatEvent>>,
    },
}

/// Hub state. Only ever touched by the task running [`Hub::run`].
pub struct Hub {
    registry: MembershipRegistry,
    store: MessageStore,
    history: RoomHistory,
    /// Size of the configured member allow-list, if any.
    configured_members: Option<usize>,
}

impl Hub {
    /// Create a hub from configuration.
    pub fn new(config: &HubConfig) -> Self {
        let configured_members = {
            let members: HashSet<&str> =
                config.allowed_members.iter().map(String::as_str).collect();
            (!members.is_empty()).then_some(members.len())
        };

        Self {
            registry: MembershipRegistry::new(),
            store: MessageStore::new(),
            history: RoomHistory::new(config.history_limit),
            configured_members,
        }
    }

    /// Start the hub on the tokio runtime and return a handle to it.
    ///
    /// The hub stops once every handle has been dropped.
    pub fn spawn(config: &HubConfig) -> HubHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Self::new(config);
        tokio::spawn(hub.run(rx));
        HubHandle::new(tx, config)
    }

    /// Consume events until every sender is gone.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<HubEvent>) {
        info!("Hub started");
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
        info!("Hub stopped");
    }

    /// Process a single event.
    pub fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::Join(member) => self.on_join(member),
            HubEvent::Leave(id) => self.on_leave(id),
            HubEvent::Message(event) => self.on_message(event),
            HubEvent::Client { client, payload } => self.on_client(client, payload),
            HubEvent::Query(query) => self.answer(query),
        }
    }

    /// Statistics for a room as currently registered.
    pub fn room_stats(&self, room: &str) -> RoomStats {
        let member_names = self.registry.member_names(room);
        let online_members = member_names.len();
        RoomStats {
            total_members: self.configured_members.unwrap_or(online_members),
            online_members,
            member_names,
        }
    }

    fn on_join(&mut self, member: Member) {
        let id = member.id;
        let room = member.room.clone();
        let name = member.name.clone();

        if !self.registry.add(member) {
            warn!(client = %id, "Ignoring duplicate join");
            return;
        }
        info!(
            "{} joined room {}. Online: {}",
            name,
            room,
            self.registry.room_count(&room)
        );

        self.replay_history(id, &room);
        self.broadcast_stats(&room);
    }

    fn on_leave(&mut self, id: ClientId) {
        match self.registry.remove(id) {
            Some((name, room)) => {
                info!(
                    "{} left room {}. Online: {}",
                    name,
                    room,
                    self.registry.room_count(&room)
                );
                self.broadcast_stats(&room);
            }
            None => debug!(client = %id, "Leave for unknown client"),
        }
    }

    fn on_message(&mut self, event: ChatEvent) {
        if event.is_message() {
            if self.store.get(&event.id).is_some() {
                warn!(room = %event.room, "Dropping message that reuses id {}", event.id);
                return;
            }
            self.store.put(event.clone());
            self.history.append(&event.room, event.clone());
        }
        self.publish(&event);
    }

    fn on_client(&mut self, client: ClientId, payload: ClientPayload) {
        let Some(member) = self.registry.get(client) else {
            debug!(client = %client, "Dropping payload from client that is not joined");
            return;
        };
        let name = member.name.clone();
        let room = member.room.clone();

        match payload {
            ClientPayload::NewMessage {
                content,
                image,
                reply_to,
            } => {
                let mut event = ChatEvent::message(&name, &room, content);
                if let Some(image) = image.filter(|image| !image.is_empty()) {
                    event = event.with_image(image);
                }
                if let Some(reply_to) = reply_to.filter(|id| !id.is_empty()) {
                    match self.store.get_in_room(&reply_to, &room) {
                        Some(target) => event = event.replying_to(target),
                        None => debug!(room = %room, "Reply target {} not found", reply_to),
                    }
                }
                self.on_message(event);
            }
            ClientPayload::PlainText(text) => {
                self.on_message(ChatEvent::message(&name, &room, text));
            }
            ClientPayload::Edit { id, content } => {
                let Some(updated) = self
                    .store
                    .mutate_if_author(&id, &room, &name, content)
                    .cloned()
                else {
                    debug!(room = %room, "Dropping edit of {} by {}", id, name);
                    return;
                };
                self.history.refresh(&updated);
                self.publish(&ChatEvent::edit_of(&updated));
            }
            ClientPayload::ReadReceipt { id } => {
                let at = now_timestamp();
                let Some(updated) = self.store.record_read(&id, &room, &name, at).cloned() else {
                    debug!(room = %room, "Dropping read receipt for {} by {}", id, name);
                    return;
                };
                self.history.refresh(&updated);
                self.publish(&ChatEvent::receipt_of(&updated, at));
            }
        }
    }

    fn answer(&self, query: HubQuery) {
        // A dropped reply receiver only means the asker went away.
        match query {
            HubQuery::RoomStats { room, reply } => {
                let _ = reply.send(self.room_stats(&room));
            }
            HubQuery::History { room, reply } => {
                let _ = reply.send(self.history.snapshot(&room));
            }
            HubQuery::Message { id, reply } => {
                let _ = reply.send(self.store.get(&id).cloned());
            }
        }
    }

    fn publish(&self, event: &ChatEvent) {
        let Some(payload) = marshal(event) else {
            return;
        };
        let report = broadcast_room(&self.registry, &event.room, &payload);
        debug!(
            room = %event.room,
            kind = %event.kind,
            delivered = report.delivered,
            dropped = report.dropped,
            "Fanned out event {}",
            event.id
        );
    }

    fn broadcast_stats(&self, room: &str) {
        let stats = ControlPayload::Stats(self.room_stats(room));
        if let Some(payload) = marshal(&stats) {
            broadcast_room(&self.registry, room, &payload);
        }
    }

    fn replay_history(&self, id: ClientId, room: &str) {
        let messages = self.history.snapshot(room);
        if messages.is_empty() {
            return;
        }
        let Some(member) = self.registry.get(id) else {
            return;
        };
        if let Some(payload) = marshal(&ControlPayload::History { messages }) {
            deliver(member, &payload);
        }
    }
}

/// Join checks applied before anything reaches the hub.
#[derive(Debug)]
struct JoinGate {
    room_codes: HashSet<String>,
    default_room_code: String,
    allowed_members: HashSet<String>,
    mailbox_capacity: usize,
}

impl JoinGate {
    fn new(config: &HubConfig) -> Self {
        Self {
            room_codes: config
                .room_codes
                .iter()
                .map(|code| normalize_room_code(code, ""))
                .filter(|code| !code.is_empty())
                .collect(),
            default_room_code: normalize_room_code(&config.default_room_code, ""),
            allowed_members: config.allowed_members.iter().cloned().collect(),
            mailbox_capacity: config.mailbox_capacity.max(1),
        }
    }

    fn check(&self, name: &str, raw_room_code: &str) -> std::result::Result<String, JoinRejection> {
        let room = normalize_room_code(raw_room_code, &self.default_room_code);
        if !self.room_codes.contains(&room) {
            return Err(JoinRejection::InvalidRoomCode(room));
        }
        if !self.allowed_members.is_empty() && !self.allowed_members.contains(name) {
            return Err(JoinRejection::NotAMember(name.to_string()));
        }
        Ok(room)
    }
}

/// A joined client as held by its transport.
///
/// Not `Clone`: a handle is registered once and consumed by [`HubHandle::leave`].
#[derive(Debug)]
pub struct ClientHandle {
    id: ClientId,
    name: String,
    room: String,
}

impl ClientHandle {
    /// Client identifier.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Room the client joined.
    pub fn room(&self) -> &str {
        &self.room
    }
}

/// Reading half of a client's bounded outgoing queue.
///
/// Yields pre-marshaled payloads in hub order and ends once the client has
/// been removed from the hub.
#[derive(Debug)]
pub struct Mailbox {
    rx: mpsc::Receiver<Outbound>,
}

impl Mailbox {
    /// Wait for the next payload. `None` once the mailbox is closed.
    pub async fn recv(&mut self) -> Option<Outbound> {
        self.rx.recv().await
    }

    /// Take the next payload if one is queued.
    pub fn try_recv(&mut self) -> Option<Outbound> {
        self.rx.try_recv().ok()
    }
}

/// Cloneable entry point transports use to talk to the hub.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubEvent>,
    gate: Arc<JoinGate>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    /// Create a handle feeding `tx`.
    pub fn new(tx: mpsc::UnboundedSender<HubEvent>, config: &HubConfig) -> Self {
        Self {
            tx,
            gate: Arc::new(JoinGate::new(config)),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Room code used for blank codes.
    pub fn default_room_code(&self) -> &str {
        &self.gate.default_room_code
    }

    /// Join `name` to the room identified by `raw_room_code`.
    ///
    /// The room code is normalized and checked against the allow-list, and the
    /// name against the member allow-list when one is configured. Rejected
    /// joins never reach the hub.
    pub fn join(&self, name: &str, raw_room_code: &str) -> Result<(ClientHandle, Mailbox)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomcastError::Validation(
                "display name must not be empty".to_string(),
            ));
        }
        let room = self.gate.check(name, raw_room_code)?;

        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (mailbox_tx, mailbox_rx) = mpsc::channel(self.gate.mailbox_capacity);
        self.dispatch(HubEvent::Join(Member::new(id, name, &room, mailbox_tx)))?;

        let handle = ClientHandle {
            id,
            name: name.to_string(),
            room,
        };
        Ok((handle, Mailbox { rx: mailbox_rx }))
    }

    /// Remove a client. Its mailbox closes once the hub processes the leave.
    pub fn leave(&self, client: ClientHandle) -> Result<()> {
        self.dispatch(HubEvent::Leave(client.id))
    }

    /// Submit a decoded payload on behalf of a client.
    pub fn submit(&self, client: &ClientHandle, payload: ClientPayload) -> Result<()> {
        self.dispatch(HubEvent::Client {
            client: client.id,
            payload,
        })
    }

    /// Enqueue a system notice for a room.
    ///
    /// Chat messages only enter through [`HubHandle::submit`], so any other
    /// kind is refused.
    pub fn send(&self, event: ChatEvent) -> Result<()> {
        if event.kind != EventKind::System {
            return Err(RoomcastError::Validation(format!(
                "only system events can be sent directly, got {}",
                event.kind.as_str()
            )));
        }
        self.dispatch(HubEvent::Message(event))
    }

    /// Current statistics of a room.
    pub async fn room_stats(&self, room: &str) -> Result<RoomStats> {
        let (reply, rx) = oneshot::channel();
        self.dispatch(HubEvent::Query(HubQuery::RoomStats {
            room: room.to_string(),
            reply,
        }))?;
        rx.await.map_err(|_| RoomcastError::HubClosed)
    }

    /// Current history of a room.
    pub async fn history(&self, room: &str) -> Result<Vec<ChatEvent>> {
        let (reply, rx) = oneshot::channel();
        self.dispatch(HubEvent::Query(HubQuery::History {
            room: room.to_string(),
            reply,
        }))?;
        rx.await.map_err(|_| RoomcastError::HubClosed)
    }

    /// A stored message by identifier.
    pub async fn message(&self, id: &str) -> Result<Option<ChatEvent>> {
        let (reply, rx) = oneshot::channel();
        self.dispatch(HubEvent::Query(HubQuery::Message {
            id: id.to_string(),
            reply,
        }))?;
        rx.await.map_err(|_| RoomcastError::HubClosed)
    }

    fn dispatch(&self, event: HubEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| RoomcastError::HubClosed)
    }
}
