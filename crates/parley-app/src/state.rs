//! Observable application state types.
//!
//! These structures are the view model: the subset of session state the UI
//! needs, kept current by applying [`parley_core::RenderIntent`]s.

use parley_core::{Identity, MessageId, PrivateMessage, PublicMessage};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to server.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected and joined.
    Connected,
}

/// A line in the room log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    /// Room message.
    Chat(PublicMessage),
    /// System notice.
    System(String),
}

/// The displayed private conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateView {
    /// Peer of the conversation.
    pub peer: Identity,
    /// Messages oldest first.
    pub messages: Vec<PrivateMessage>,
}

impl PrivateView {
    /// Empty view for `peer`.
    pub fn new(peer: Identity, messages: Vec<PrivateMessage>) -> Self {
        Self { peer, messages }
    }

    /// Mark a message as seen. Returns `false` if no message has that id.
    pub fn mark_seen(&mut self, id: &MessageId) -> bool {
        match self.messages.iter_mut().find(|m| &m.id == id) {
            Some(message) => {
                message.seen = true;
                true
            },
            None => false,
        }
    }
}
