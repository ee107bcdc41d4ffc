//! Domain types shared by the trackers.
//!
//! These are the client's own view of chat data, decoupled from the wire
//! payloads in `parley-proto`. Conversions from the payloads are provided so
//! the session can hand validated events straight to the trackers.

use parley_proto::{Identity, MessageId, payloads};
use serde::{Deserialize, Serialize};

/// A room message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicMessage {
    /// Author.
    pub sender: Identity,
    /// Message text.
    pub text: String,
}

impl From<payloads::room::ChatMessage> for PublicMessage {
    fn from(message: payloads::room::ChatMessage) -> Self {
        Self { sender: message.username, text: message.msg }
    }
}

/// A private message between the local user and one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
    /// Server-assigned id.
    pub id: MessageId,
    /// Author.
    pub sender: Identity,
    /// Addressee.
    pub recipient: Identity,
    /// Message text.
    pub text: String,
    /// Whether the recipient has seen it. Only ever goes false → true.
    pub seen: bool,
}

impl PrivateMessage {
    /// The participant that is not `me`, or `None` if `me` is not exactly one
    /// side of the message.
    pub fn counterpart(&self, me: &Identity) -> Option<&Identity> {
        match (&self.sender == me, &self.recipient == me) {
            (true, false) => Some(&self.recipient),
            (false, true) => Some(&self.sender),
            _ => None,
        }
    }

    /// Whether this message is between exactly `me` and `peer`.
    pub fn is_between(&self, me: &Identity, peer: &Identity) -> bool {
        self.counterpart(me) == Some(peer)
    }
}

impl From<payloads::private::PrivateMessage> for PrivateMessage {
    fn from(message: payloads::private::PrivateMessage) -> Self {
        Self {
            id: message.id,
            sender: message.sender,
            recipient: message.recipient,
            text: message.msg,
            seen: message.seen,
        }
    }
}

/// Lifecycle phase of a private conversation.
///
/// ```text
/// Closed ──open──> HistoryPending ──history──> HistoryLoaded
///   ^                    │                           │
///   └───────close────────┴───────────close───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConversationPhase {
    /// Not displayed. The buffer is retained.
    #[default]
    Closed,
    /// Opened, waiting for the server's history.
    HistoryPending,
    /// Opened and reconciled with the server's history.
    HistoryLoaded,
}

/// Per-peer private conversation state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Messages oldest first.
    pub messages: Vec<PrivateMessage>,
    /// Current phase.
    pub phase: ConversationPhase,
    /// An incoming message arrived while the conversation was not displayed.
    pub has_unseen_incoming: bool,
}

impl Conversation {
    /// Whether the conversation is currently displayed.
    pub fn is_open(&self) -> bool {
        self.phase != ConversationPhase::Closed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn message(sender: &str, recipient: &str) -> PrivateMessage {
        PrivateMessage {
            id: MessageId::Number(1),
            sender: id(sender),
            recipient: id(recipient),
            text: "hi".into(),
            seen: false,
        }
    }

    #[test]
    fn counterpart_is_the_other_side() {
        let me = id("alice");
        assert_eq!(message("alice", "bob").counterpart(&me), Some(&id("bob")));
        assert_eq!(message("bob", "alice").counterpart(&me), Some(&id("bob")));
        assert_eq!(message("bob", "carol").counterpart(&me), None);
    }

    #[test]
    fn is_between_checks_both_parties() {
        let me = id("alice");
        assert!(message("bob", "alice").is_between(&me, &id("bob")));
        assert!(!message("carol", "alice").is_between(&me, &id("bob")));
    }
}
