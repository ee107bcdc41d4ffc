//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use parley_core::Identity;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// The room composer changed (drives the typing indicator).
    LocalInput,

    /// Send a room message.
    SubmitPublic {
        /// Message text.
        text: String,
    },

    /// Open a private conversation.
    OpenConversation {
        /// Peer to talk to.
        peer: Identity,
    },

    /// Close the active private conversation.
    CloseConversation,

    /// Send a private message.
    SendPrivate {
        /// Recipient.
        peer: Identity,
        /// Message text.
        text: String,
    },
}

impl AppAction {
    /// Whether the action must go through the session.
    pub fn is_session_action(&self) -> bool {
        !matches!(self, Self::Render | Self::Quit)
    }
}
