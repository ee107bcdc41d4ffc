//! Actions returned by the trackers.
//!
//! Trackers never perform I/O. Each operation returns a list of actions: wire
//! events to emit and presentation updates to apply. The session forwards them
//! to the transport and the presentation layer in order.

use parley_proto::{Identity, MessageId, OutboundEvent};

use crate::types::{PrivateMessage, PublicMessage};

/// Output of a tracker operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerAction {
    /// Send this event to the server.
    Emit(OutboundEvent),

    /// Update the presentation.
    Render(RenderIntent),
}

/// Presentation update requested by a tracker.
///
/// Intents fall into a few shapes: full-list replacements, incremental
/// appends, single-field updates, and marker toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderIntent {
    /// The room log was replaced by server history.
    PublicLogReplaced {
        /// Complete log, oldest first.
        messages: Vec<PublicMessage>,
    },

    /// A room message was appended.
    PublicMessageAppended(PublicMessage),

    /// Display a system notice.
    SystemNotice {
        /// Notice text.
        text: String,
    },

    /// The presence set was replaced.
    PresenceReplaced {
        /// Online users in server order.
        users: Vec<Identity>,
        /// Number of online users.
        count: usize,
    },

    /// The typing indicator changed. `None` hides it.
    TypingChanged {
        /// Label to display.
        label: Option<String>,
    },

    /// A private conversation was opened with its retained buffer.
    ConversationOpened {
        /// Peer of the conversation.
        peer: Identity,
        /// Buffered messages, oldest first.
        messages: Vec<PrivateMessage>,
    },

    /// The active private conversation was closed.
    ConversationClosed {
        /// Peer of the closed conversation.
        peer: Identity,
    },

    /// The active conversation was replaced by server history.
    ConversationReplaced {
        /// Peer of the conversation.
        peer: Identity,
        /// Complete history, oldest first.
        messages: Vec<PrivateMessage>,
    },

    /// A private message was appended to the active conversation.
    PrivateMessageAppended {
        /// Peer of the conversation.
        peer: Identity,
        /// The new message.
        message: PrivateMessage,
    },

    /// A message in the active conversation is now seen.
    SeenUpdated {
        /// Peer of the conversation.
        peer: Identity,
        /// Id of the message.
        id: MessageId,
    },

    /// The unseen-messages marker for a peer was toggled.
    UnseenMarker {
        /// Peer whose marker changed.
        peer: Identity,
        /// Whether unseen messages are pending.
        unseen: bool,
    },

    /// Session-scoped state was cleared (connect or disconnect).
    SessionReset,
}

impl From<RenderIntent> for TrackerAction {
    fn from(intent: RenderIntent) -> Self {
        Self::Render(intent)
    }
}

impl From<OutboundEvent> for TrackerAction {
    fn from(event: OutboundEvent) -> Self {
        Self::Emit(event)
    }
}
