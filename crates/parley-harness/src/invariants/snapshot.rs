//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Sub,
    time::Duration,
};

use parley_client::Session;
use parley_core::{ConversationPhase, Identity, PrivateMessage};

/// Snapshot of the entire system state.
///
/// Contains observable state from one or more clients for invariant checking.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-client state snapshots.
    pub clients: Vec<ClientSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client] }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { clients }
    }

    /// Add a client snapshot.
    pub fn add_client(&mut self, client: ClientSnapshot) {
        self.clients.push(client);
    }
}

/// Snapshot of a single client's observable state.
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    /// Client identity.
    pub identity: Identity,
    /// Whether the transport is connected.
    pub connected: bool,
    /// Online users. `None` until the first presence snapshot.
    pub presence: Option<Vec<Identity>>,
    /// Active private conversation peer.
    pub active_peer: Option<Identity>,
    /// All known private conversations.
    pub conversations: BTreeMap<Identity, ConversationSnapshot>,
    /// Peers with the unseen-messages marker set.
    pub unseen: BTreeSet<Identity>,
}

impl ClientSnapshot {
    /// Create an empty snapshot for `identity`.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            connected: false,
            presence: None,
            active_peer: None,
            conversations: BTreeMap::new(),
            unseen: BTreeSet::new(),
        }
    }

    /// Capture the observable state of a session.
    pub fn from_session<I>(session: &Session<I>) -> Self
    where
        I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
    {
        let private = session.private();
        Self {
            identity: session.me().clone(),
            connected: session.is_connected(),
            presence: session
                .presence()
                .has_snapshot()
                .then(|| session.presence().users().to_vec()),
            active_peer: private.active_peer().cloned(),
            conversations: private
                .conversations()
                .map(|(peer, c)| {
                    (peer.clone(), ConversationSnapshot {
                        phase: c.phase,
                        messages: c.messages.clone(),
                    })
                })
                .collect(),
            unseen: private.unseen_peers().cloned().collect(),
        }
    }

    /// Set connection state.
    #[must_use]
    pub fn with_connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }

    /// Set the presence list.
    #[must_use]
    pub fn with_presence(mut self, users: impl IntoIterator<Item = Identity>) -> Self {
        self.presence = Some(users.into_iter().collect());
        self
    }

    /// Set the active conversation peer.
    #[must_use]
    pub fn with_active_peer(mut self, peer: Option<Identity>) -> Self {
        self.active_peer = peer;
        self
    }

    /// Add a conversation.
    #[must_use]
    pub fn with_conversation(mut self, peer: Identity, conversation: ConversationSnapshot) -> Self {
        self.conversations.insert(peer, conversation);
        self
    }

    /// Mark a peer as having unseen messages.
    #[must_use]
    pub fn with_unseen(mut self, peer: Identity) -> Self {
        self.unseen.insert(peer);
        self
    }
}

/// Snapshot of one private conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationSnapshot {
    /// Lifecycle phase.
    pub phase: ConversationPhase,
    /// Buffered messages, oldest first.
    pub messages: Vec<PrivateMessage>,
}

impl ConversationSnapshot {
    /// Create a conversation snapshot in `phase`.
    pub fn with_phase(phase: ConversationPhase) -> Self {
        Self { phase, messages: Vec::new() }
    }

    /// Set the buffered messages.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<PrivateMessage>) -> Self {
        self.messages = messages;
        self
    }
}
