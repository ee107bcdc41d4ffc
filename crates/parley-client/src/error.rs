//! Session error types.

use parley_core::ConversationError;
use thiserror::Error;

/// Errors returned to the caller of [`crate::Session::handle`].
///
/// These are caller mistakes only. Bad server input never produces an error;
/// it is dropped and reported through [`crate::SessionAction::Log`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The operation needs a connected transport.
    #[error("not connected: cannot {operation}")]
    NotConnected {
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Private conversation operation was rejected.
    #[error(transparent)]
    Conversation(#[from] ConversationError),
}
