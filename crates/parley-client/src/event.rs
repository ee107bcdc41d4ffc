//! Session events and actions.

use parley_core::{Identity, RenderIntent};
use parley_proto::OutboundEvent;

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Receiving text frames from the transport
/// - Reporting transport lifecycle (connect, disconnect)
/// - Driving time forward via ticks
/// - Forwarding user intents (send message, open conversation, etc.)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation (virtual) clocks.
#[derive(Debug, Clone)]
pub enum SessionEvent<I = std::time::Instant> {
    /// Text frame received from the server.
    Received(String),

    /// The transport connected (or reconnected).
    Connected,

    /// The transport was lost.
    Disconnected,

    /// Time tick for timer processing.
    ///
    /// The caller should send ticks periodically so the typing debounce
    /// can expire.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// The user edited the room composer.
    LocalInput {
        /// Current time from the environment.
        now: I,
    },

    /// The user submitted a room message.
    SubmitPublic {
        /// Message text as typed.
        text: String,
    },

    /// The user opened a private conversation.
    OpenConversation {
        /// Peer to talk to.
        peer: Identity,
    },

    /// The user closed the active private conversation.
    CloseConversation,

    /// The user sent a private message.
    SendPrivate {
        /// Addressee.
        peer: Identity,
        /// Message text as typed.
        text: String,
    },
}

/// Actions the session produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send an event to the server.
    Send(OutboundEvent),

    /// Apply a presentation update.
    Render(RenderIntent),

    /// Log a message (for debugging).
    Log {
        /// Log message.
        message: String,
    },
}
