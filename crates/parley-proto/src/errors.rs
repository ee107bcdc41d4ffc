//! Protocol errors.
//!
//! Decoding never panics. Anything the server sends that does not match the
//! expected shape for its event name surfaces as a [`ProtocolError`], and the
//! caller decides whether to drop it.

use thiserror::Error;

/// Errors produced while encoding or decoding wire events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Text frame is not a JSON envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Envelope names an event this protocol does not define.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Payload is missing fields, has wrong types, or fails validation.
    #[error("invalid payload for {event}: {reason}")]
    InvalidPayload {
        /// Event name the payload was decoded for.
        event: &'static str,
        /// Why the payload was rejected.
        reason: String,
    },

    /// Identity was empty or whitespace-only.
    #[error("identity must not be empty")]
    EmptyIdentity,

    /// Room name was empty or whitespace-only.
    #[error("room must not be empty")]
    EmptyRoom,

    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
