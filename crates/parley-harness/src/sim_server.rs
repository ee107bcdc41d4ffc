//! In-memory chat server for simulation.
//!
//! `SimServer` reproduces the observable behavior of a Parley server without
//! any networking: frames go in with the connection they arrived on and come
//! out as [`Delivery`] values addressed to connections. Tests (or
//! [`crate::SharedSimServer`]) route the deliveries.
//!
//! # Behavior
//!
//! - `join`: the joiner gets the room history, then the whole room gets a
//!   join notice and a sorted user list.
//! - `chat_message`: trimmed, dropped if empty, appended to the room history
//!   (capped at [`HISTORY_CAP`]) and broadcast to the room.
//! - `typing`: fanned out to the room, excluding the sending connection.
//! - `private_message`: assigned a server id, stored, delivered to the
//!   recipient and echoed to the sender.
//! - `get_private_history`: answered with every stored message between the
//!   two users.
//! - `message_seen`: marks the message seen and sends `update_seen_status` to
//!   both parties.
//! - disconnect: the user leaves the room; an emptied room drops its history.

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::{Arc, Mutex},
};

use parley_proto::{
    Identity, InboundEvent, MessageId, OutboundEvent, Room,
    payloads::{
        private::{PrivateHistory, PrivateMessage, SeenStatus},
        room::{ChatMessage, History, SystemNotice, UserList, UserTyping},
    },
};
use tracing::{debug, warn};

/// Maximum number of messages retained per room.
pub const HISTORY_CAP: usize = 100;

/// Server-side connection handle.
pub type ConnectionId = u64;

/// A frame the server wants delivered to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Destination connection.
    pub to: ConnectionId,
    /// Encoded text frame.
    pub frame: String,
}

#[derive(Debug, Clone)]
struct Connection {
    username: Identity,
    room: Option<Room>,
}

#[derive(Debug, Clone, Default)]
struct RoomState {
    users: BTreeSet<Identity>,
    history: VecDeque<ChatMessage>,
}

/// Simulated server state.
#[derive(Debug, Clone, Default)]
pub struct SimServer {
    connections: BTreeMap<ConnectionId, Connection>,
    rooms: BTreeMap<Room, RoomState>,
    private_log: Vec<PrivateMessage>,
    next_connection_id: ConnectionId,
    next_message_id: u64,
}

impl SimServer {
    /// Create an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a connection for a logged-in user.
    pub fn connect(&mut self, username: Identity) -> ConnectionId {
        self.next_connection_id += 1;
        let id = self.next_connection_id;
        debug!(connection = id, user = %username, "connection accepted");
        self.connections.insert(id, Connection { username, room: None });
        id
    }

    /// Process a text frame received on `connection`.
    ///
    /// Malformed frames and frames from unknown connections are dropped.
    pub fn handle(&mut self, connection: ConnectionId, frame: &str) -> Vec<Delivery> {
        let Some(username) = self.connections.get(&connection).map(|c| c.username.clone()) else {
            warn!(connection, "frame from unknown connection");
            return Vec::new();
        };

        let event = match OutboundEvent::decode(frame) {
            Ok(event) => event,
            Err(e) => {
                warn!(connection, error = %e, "dropping malformed client frame");
                return Vec::new();
            },
        };

        let mut out = Outbox::default();
        match event {
            OutboundEvent::Join(join) => {
                self.on_join(&mut out, connection, username, join.room);
            },
            OutboundEvent::ChatMessage(chat) => {
                self.on_chat(&mut out, connection, username, &chat.msg);
            },
            OutboundEvent::Typing(typing) => {
                if let Some(room) = self.room_of(connection) {
                    let event = InboundEvent::UserTyping(UserTyping {
                        username,
                        is_typing: typing.is_typing,
                    });
                    self.to_room(&mut out, &room, Some(connection), &event);
                }
            },
            OutboundEvent::SetUsername(set) => {
                if let Some(conn) = self.connections.get_mut(&connection) {
                    conn.username = set.username;
                }
            },
            OutboundEvent::PrivateMessage(send) => {
                self.on_private(&mut out, username, send.recipient_username, &send.msg);
            },
            OutboundEvent::GetPrivateHistory(request) => {
                let history = self
                    .private_log
                    .iter()
                    .filter(|m| {
                        (m.sender == username && m.recipient == request.with_user)
                            || (m.sender == request.with_user && m.recipient == username)
                    })
                    .cloned()
                    .collect();
                let event = InboundEvent::PrivateHistory(PrivateHistory {
                    with_user: request.with_user,
                    history,
                });
                out.push(connection, &event);
            },
            OutboundEvent::MessageSeen(ack) => {
                self.on_seen(&mut out, &username, &ack.id, ack.sender);
            },
        }
        out.deliveries
    }

    /// Drop a connection, removing its user from the room.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Vec<Delivery> {
        let mut out = Outbox::default();
        let Some(conn) = self.connections.remove(&connection) else {
            return out.deliveries;
        };
        let Some(room) = conn.room else {
            return out.deliveries;
        };

        let Some(state) = self.rooms.get_mut(&room) else {
            return out.deliveries;
        };
        if !state.users.remove(&conn.username) {
            return out.deliveries;
        }
        if state.users.is_empty() {
            debug!(room = %room, "room emptied, dropping history");
            self.rooms.remove(&room);
        }

        let notice = format!("{} left the chat.", conn.username);
        self.to_room(&mut out, &room, None, &InboundEvent::System(SystemNotice { msg: notice }));
        self.send_user_list(&mut out, &room);
        out.deliveries
    }

    fn on_join(
        &mut self,
        out: &mut Outbox,
        connection: ConnectionId,
        username: Identity,
        room: Room,
    ) {
        if let Some(conn) = self.connections.get_mut(&connection) {
            conn.room = Some(room.clone());
        }
        let notice = format!("{username} joined the chat.");
        let state = self.rooms.entry(room.clone()).or_default();
        state.users.insert(username);

        let history = History { messages: state.history.iter().cloned().collect() };
        out.push(connection, &InboundEvent::History(history));

        self.to_room(out, &room, None, &InboundEvent::System(SystemNotice { msg: notice }));
        self.send_user_list(out, &room);
    }

    fn on_chat(
        &mut self,
        out: &mut Outbox,
        connection: ConnectionId,
        username: Identity,
        msg: &str,
    ) {
        let msg = msg.trim();
        let Some(room) = self.room_of(connection) else { return };
        if msg.is_empty() {
            return;
        }

        let message = ChatMessage { username, msg: msg.to_string() };
        if let Some(state) = self.rooms.get_mut(&room) {
            state.history.push_back(message.clone());
            if state.history.len() > HISTORY_CAP {
                state.history.pop_front();
            }
        }
        self.to_room(out, &room, None, &InboundEvent::ChatMessage(message));
    }

    fn on_private(&mut self, out: &mut Outbox, sender: Identity, recipient: Identity, msg: &str) {
        let msg = msg.trim();
        if msg.is_empty() || sender == recipient {
            return;
        }

        self.next_message_id += 1;
        let message = PrivateMessage {
            id: MessageId::Number(self.next_message_id),
            sender,
            recipient,
            msg: msg.to_string(),
            seen: false,
        };
        self.private_log.push(message.clone());

        let event = InboundEvent::PrivateMessage(message.clone());
        self.to_user(out, &message.recipient, &event);
        self.to_user(out, &message.sender, &event);
    }

    fn on_seen(&mut self, out: &mut Outbox, reader: &Identity, id: &MessageId, sender: Identity) {
        let Some(message) = self
            .private_log
            .iter_mut()
            .find(|m| &m.id == id && &m.recipient == reader && m.sender == sender)
        else {
            debug!(id = %id, reader = %reader, "seen ack matches no message");
            return;
        };
        if message.seen {
            return;
        }
        message.seen = true;

        let event = InboundEvent::SeenStatus(SeenStatus { id: id.clone() });
        self.to_user(out, reader, &event);
        self.to_user(out, &sender, &event);
    }

    fn room_of(&self, connection: ConnectionId) -> Option<Room> {
        self.connections.get(&connection).and_then(|c| c.room.clone())
    }

    fn send_user_list(&self, out: &mut Outbox, room: &Room) {
        let Some(state) = self.rooms.get(room) else { return };
        let users = state.users.iter().cloned().collect();
        self.to_room(out, room, None, &InboundEvent::UserList(UserList { users }));
    }

    fn to_room(
        &self,
        out: &mut Outbox,
        room: &Room,
        except: Option<ConnectionId>,
        event: &InboundEvent,
    ) {
        for (id, conn) in &self.connections {
            if conn.room.as_ref() == Some(room) && Some(*id) != except {
                out.push(*id, event);
            }
        }
    }

    fn to_user(&self, out: &mut Outbox, user: &Identity, event: &InboundEvent) {
        for (id, conn) in &self.connections {
            if &conn.username == user {
                out.push(*id, event);
            }
        }
    }

    /// Users currently in `room`, sorted.
    pub fn users(&self, room: &Room) -> Vec<Identity> {
        self.rooms.get(room).map(|s| s.users.iter().cloned().collect()).unwrap_or_default()
    }

    /// Retained history of `room`, oldest first.
    pub fn history(&self, room: &Room) -> Vec<ChatMessage> {
        self.rooms.get(room).map(|s| s.history.iter().cloned().collect()).unwrap_or_default()
    }

    /// Every private message the server has stored.
    pub fn private_messages(&self) -> &[PrivateMessage] {
        &self.private_log
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[derive(Default)]
struct Outbox {
    deliveries: Vec<Delivery>,
}

impl Outbox {
    fn push(&mut self, to: ConnectionId, event: &InboundEvent) {
        match event.encode() {
            Ok(frame) => self.deliveries.push(Delivery { to, frame }),
            Err(e) => warn!(event = event.name(), error = %e, "failed to encode server event"),
        }
    }
}

/// Server plus per-connection inboxes.
///
/// Deliveries are routed into the destination connection's inbox as soon as
/// the server produces them, so several simulated drivers can share one
/// server through a [`SharedSimServer`].
#[derive(Debug, Default)]
pub struct SimNetwork {
    server: SimServer,
    inboxes: BTreeMap<ConnectionId, VecDeque<String>>,
}

/// Thread-safe handle to a [`SimNetwork`].
pub type SharedSimServer = Arc<Mutex<SimNetwork>>;

/// Create a shared simulated server with no connections.
pub fn create_shared_server() -> SharedSimServer {
    Arc::new(Mutex::new(SimNetwork::default()))
}

impl SimNetwork {
    /// Open a connection for `username`.
    pub fn connect(&mut self, username: Identity) -> ConnectionId {
        let id = self.server.connect(username);
        self.inboxes.insert(id, VecDeque::new());
        id
    }

    /// Deliver a client frame to the server and route the replies.
    pub fn send(&mut self, from: ConnectionId, frame: &str) {
        let deliveries = self.server.handle(from, frame);
        self.route(deliveries);
    }

    /// Close a connection. Frames still queued for it are discarded.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        self.inboxes.remove(&connection);
        let deliveries = self.server.disconnect(connection);
        self.route(deliveries);
    }

    /// Pop the next frame queued for `connection`.
    pub fn recv(&mut self, connection: ConnectionId) -> Option<String> {
        self.inboxes.get_mut(&connection).and_then(VecDeque::pop_front)
    }

    /// Whether any connection has frames waiting.
    pub fn has_pending(&self) -> bool {
        self.inboxes.values().any(|inbox| !inbox.is_empty())
    }

    /// The simulated server.
    pub fn server(&self) -> &SimServer {
        &self.server
    }

    fn route(&mut self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            if let Some(inbox) = self.inboxes.get_mut(&delivery.to) {
                inbox.push_back(delivery.frame);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parley_proto::payloads::{
        private::{HistoryRequest, MessageSeen, SendPrivate},
        room::{ChatSend, Join, Typing},
    };

    use super::*;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn general() -> Room {
        Room::new("General").unwrap()
    }

    fn send(server: &mut SimServer, conn: ConnectionId, event: OutboundEvent) -> Vec<Delivery> {
        server.handle(conn, &event.encode().unwrap())
    }

    fn decoded(deliveries: &[Delivery], to: ConnectionId) -> Vec<InboundEvent> {
        deliveries
            .iter()
            .filter(|d| d.to == to)
            .map(|d| InboundEvent::decode(&d.frame).unwrap())
            .collect()
    }

    fn joined(server: &mut SimServer, name: &str) -> ConnectionId {
        let conn = server.connect(id(name));
        send(server, conn, OutboundEvent::Join(Join { room: general() }));
        conn
    }

    #[test]
    fn join_sends_history_notice_and_sorted_users() {
        let mut server = SimServer::new();
        let bob = joined(&mut server, "bob");

        let alice = server.connect(id("alice"));
        let out = send(&mut server, alice, OutboundEvent::Join(Join { room: general() }));

        assert_eq!(decoded(&out, alice), vec![
            InboundEvent::History(History { messages: vec![] }),
            InboundEvent::System(SystemNotice { msg: "alice joined the chat.".into() }),
            InboundEvent::UserList(UserList { users: vec![id("alice"), id("bob")] }),
        ]);
        assert_eq!(decoded(&out, bob).len(), 2);
    }

    #[test]
    fn history_is_capped() {
        let mut server = SimServer::new();
        let bob = joined(&mut server, "bob");

        for i in 0..=HISTORY_CAP {
            send(&mut server, bob, OutboundEvent::ChatMessage(ChatSend { msg: format!("m{i}") }));
        }

        let history = server.history(&general());
        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history[0].msg, "m1");
    }

    #[test]
    fn typing_excludes_sender() {
        let mut server = SimServer::new();
        let bob = joined(&mut server, "bob");
        let alice = joined(&mut server, "alice");

        let out = send(&mut server, alice, OutboundEvent::Typing(Typing { is_typing: true }));

        assert!(decoded(&out, alice).is_empty());
        assert_eq!(decoded(&out, bob), vec![InboundEvent::UserTyping(UserTyping {
            username: id("alice"),
            is_typing: true
        })]);
    }

    #[test]
    fn private_message_delivered_and_echoed_then_seen() {
        let mut server = SimServer::new();
        let bob = joined(&mut server, "bob");
        let alice = joined(&mut server, "alice");

        let out = send(
            &mut server,
            alice,
            OutboundEvent::PrivateMessage(SendPrivate {
                recipient_username: id("bob"),
                msg: " hi ".into(),
            }),
        );
        assert_eq!(decoded(&out, bob), decoded(&out, alice));

        let ack = MessageSeen { id: MessageId::Number(1), sender: id("alice") };
        let out = send(&mut server, bob, OutboundEvent::MessageSeen(ack.clone()));
        let status = InboundEvent::SeenStatus(SeenStatus { id: MessageId::Number(1) });
        assert_eq!(decoded(&out, alice), vec![status.clone()]);
        assert_eq!(decoded(&out, bob), vec![status]);

        assert!(send(&mut server, bob, OutboundEvent::MessageSeen(ack)).is_empty());
        assert!(server.private_messages()[0].seen);
    }

    #[test]
    fn private_history_is_per_pair() {
        let mut server = SimServer::new();
        let alice = joined(&mut server, "alice");
        for peer in ["bob", "carol"] {
            send(
                &mut server,
                alice,
                OutboundEvent::PrivateMessage(SendPrivate {
                    recipient_username: id(peer),
                    msg: "hi".into(),
                }),
            );
        }

        let out = send(
            &mut server,
            alice,
            OutboundEvent::GetPrivateHistory(HistoryRequest { with_user: id("carol") }),
        );

        let events = decoded(&out, alice);
        assert!(matches!(
            events.as_slice(),
            [InboundEvent::PrivateHistory(h)] if h.history.len() == 1 && h.history[0].recipient == id("carol")
        ));
    }

    #[test]
    fn last_leave_drops_room_history() {
        let mut server = SimServer::new();
        let bob = joined(&mut server, "bob");
        let alice = joined(&mut server, "alice");
        send(&mut server, bob, OutboundEvent::ChatMessage(ChatSend { msg: "hi".into() }));

        let out = server.disconnect(bob);
        assert_eq!(decoded(&out, alice).len(), 2);
        assert_eq!(server.users(&general()), vec![id("alice")]);
        assert_eq!(server.history(&general()).len(), 1);

        server.disconnect(alice);
        assert!(server.history(&general()).is_empty());
        assert_eq!(server.connection_count(), 0);
    }

    #[test]
    fn malformed_frames_are_dropped() {
        let mut server = SimServer::new();
        let bob = joined(&mut server, "bob");

        assert!(server.handle(bob, "{").is_empty());
        assert!(server.handle(99, "{}").is_empty());
    }

    #[test]
    fn network_routes_to_inboxes() {
        let mut network = SimNetwork::default();
        let bob = network.connect(id("bob"));
        let alice = network.connect(id("alice"));

        network.send(bob, &OutboundEvent::Join(Join { room: general() }).encode().unwrap());
        network.send(alice, &OutboundEvent::Join(Join { room: general() }).encode().unwrap());

        assert!(network.has_pending());
        let bob_frames: Vec<_> = std::iter::from_fn(|| network.recv(bob)).collect();
        assert_eq!(bob_frames.len(), 5);

        network.disconnect(alice);
        assert_eq!(network.recv(alice), None);
        assert_eq!(network.server().users(&general()), vec![id("bob")]);
    }
}
