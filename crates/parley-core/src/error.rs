//! Error types for the chat trackers.
//!
//! Only caller mistakes are errors. Untrusted server input that does not fit
//! the local state (stale history, unknown seen-acks) is dropped silently by
//! the trackers and never surfaces here.

use parley_proto::Identity;
use thiserror::Error;

/// Errors from private conversation operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// A conversation with the local identity was requested.
    #[error("cannot open a private conversation with yourself ({0})")]
    SelfConversation(Identity),

    /// A private message addressed to the local identity was requested.
    #[error("cannot send a private message to yourself ({0})")]
    SelfMessage(Identity),
}
