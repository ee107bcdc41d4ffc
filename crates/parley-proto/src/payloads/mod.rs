//! Typed event payloads.
//!
//! The envelope's event name selects the payload type, so a payload is only
//! ever decoded as the struct its name promises. Decoding is strict: missing
//! fields, wrong JSON types, and semantically invalid values (empty
//! identities, self-addressed private messages) are rejected as a whole.
//!
//! # Invariants
//!
//! Each variant maps to exactly one event name, enforced by exhaustive
//! matches in `name()`, `from_envelope()`, and `to_envelope()`.

pub mod private;
pub mod room;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    Envelope,
    errors::{ProtocolError, Result},
};

/// Event names used on the wire.
pub mod names {
    /// Room history after join (server → client).
    pub const HISTORY: &str = "history";
    /// Presence snapshot (server → client).
    pub const UPDATE_USER_LIST: &str = "update_user_list";
    /// System notice (server → client).
    pub const SYSTEM: &str = "system";
    /// Room message (both directions).
    pub const CHAT_MESSAGE: &str = "chat_message";
    /// Remote typing state (server → client).
    pub const USER_TYPING: &str = "user_typing";
    /// Private message (both directions).
    pub const PRIVATE_MESSAGE: &str = "private_message";
    /// Private conversation history (server → client).
    pub const PRIVATE_HISTORY: &str = "private_history";
    /// Seen-status change (server → client).
    pub const UPDATE_SEEN_STATUS: &str = "update_seen_status";
    /// Join a room (client → server).
    pub const JOIN: &str = "join";
    /// Local typing state (client → server).
    pub const TYPING: &str = "typing";
    /// Identity announcement (client → server).
    pub const SET_USERNAME: &str = "set_username";
    /// Private history request (client → server).
    pub const GET_PRIVATE_HISTORY: &str = "get_private_history";
    /// Seen acknowledgment (client → server).
    pub const MESSAGE_SEEN: &str = "message_seen";
}

/// Semantic checks that run after a payload deserializes.
pub(crate) trait Validate {
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Events the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Room history, sent once after join.
    History(room::History),
    /// Presence snapshot.
    UserList(room::UserList),
    /// System notice.
    System(room::SystemNotice),
    /// Live room message.
    ChatMessage(room::ChatMessage),
    /// Remote typing state change.
    UserTyping(room::UserTyping),
    /// Live private message (incoming, or the echo of one we sent).
    PrivateMessage(private::PrivateMessage),
    /// Private conversation history.
    PrivateHistory(private::PrivateHistory),
    /// A private message was seen.
    SeenStatus(private::SeenStatus),
}

impl InboundEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::History(_) => names::HISTORY,
            Self::UserList(_) => names::UPDATE_USER_LIST,
            Self::System(_) => names::SYSTEM,
            Self::ChatMessage(_) => names::CHAT_MESSAGE,
            Self::UserTyping(_) => names::USER_TYPING,
            Self::PrivateMessage(_) => names::PRIVATE_MESSAGE,
            Self::PrivateHistory(_) => names::PRIVATE_HISTORY,
            Self::SeenStatus(_) => names::UPDATE_SEEN_STATUS,
        }
    }

    /// Decode and validate an envelope received from the server.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let data = &envelope.data;
        match envelope.event.as_str() {
            names::HISTORY => decode(names::HISTORY, data).map(Self::History),
            names::UPDATE_USER_LIST => decode(names::UPDATE_USER_LIST, data).map(Self::UserList),
            names::SYSTEM => decode(names::SYSTEM, data).map(Self::System),
            names::CHAT_MESSAGE => decode(names::CHAT_MESSAGE, data).map(Self::ChatMessage),
            names::USER_TYPING => decode(names::USER_TYPING, data).map(Self::UserTyping),
            names::PRIVATE_MESSAGE => {
                decode(names::PRIVATE_MESSAGE, data).map(Self::PrivateMessage)
            },
            names::PRIVATE_HISTORY => {
                decode(names::PRIVATE_HISTORY, data).map(Self::PrivateHistory)
            },
            names::UPDATE_SEEN_STATUS => {
                decode(names::UPDATE_SEEN_STATUS, data).map(Self::SeenStatus)
            },
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Decode a text frame straight into an event.
    pub fn decode(text: &str) -> Result<Self> {
        Self::from_envelope(&Envelope::decode(text)?)
    }

    /// Encode into an envelope.
    pub fn to_envelope(&self) -> Result<Envelope> {
        let name = self.name();
        match self {
            Self::History(p) => encode(name, p),
            Self::UserList(p) => encode(name, p),
            Self::System(p) => encode(name, p),
            Self::ChatMessage(p) => encode(name, p),
            Self::UserTyping(p) => encode(name, p),
            Self::PrivateMessage(p) => encode(name, p),
            Self::PrivateHistory(p) => encode(name, p),
            Self::SeenStatus(p) => encode(name, p),
        }
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String> {
        self.to_envelope()?.encode()
    }
}

/// Events a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Join the configured room.
    Join(room::Join),
    /// Post a room message.
    ChatMessage(room::ChatSend),
    /// Announce local typing state.
    Typing(room::Typing),
    /// Announce the local identity.
    SetUsername(room::SetUsername),
    /// Send a private message.
    PrivateMessage(private::SendPrivate),
    /// Request a private conversation history.
    GetPrivateHistory(private::HistoryRequest),
    /// Acknowledge a received private message.
    MessageSeen(private::MessageSeen),
}

impl OutboundEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join(_) => names::JOIN,
            Self::ChatMessage(_) => names::CHAT_MESSAGE,
            Self::Typing(_) => names::TYPING,
            Self::SetUsername(_) => names::SET_USERNAME,
            Self::PrivateMessage(_) => names::PRIVATE_MESSAGE,
            Self::GetPrivateHistory(_) => names::GET_PRIVATE_HISTORY,
            Self::MessageSeen(_) => names::MESSAGE_SEEN,
        }
    }

    /// Decode and validate an envelope received from a client.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let data = &envelope.data;
        match envelope.event.as_str() {
            names::JOIN => decode(names::JOIN, data).map(Self::Join),
            names::CHAT_MESSAGE => decode(names::CHAT_MESSAGE, data).map(Self::ChatMessage),
            names::TYPING => decode(names::TYPING, data).map(Self::Typing),
            names::SET_USERNAME => decode(names::SET_USERNAME, data).map(Self::SetUsername),
            names::PRIVATE_MESSAGE => {
                decode(names::PRIVATE_MESSAGE, data).map(Self::PrivateMessage)
            },
            names::GET_PRIVATE_HISTORY => {
                decode(names::GET_PRIVATE_HISTORY, data).map(Self::GetPrivateHistory)
            },
            names::MESSAGE_SEEN => decode(names::MESSAGE_SEEN, data).map(Self::MessageSeen),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Decode a text frame straight into an event.
    pub fn decode(text: &str) -> Result<Self> {
        Self::from_envelope(&Envelope::decode(text)?)
    }

    /// Encode into an envelope.
    pub fn to_envelope(&self) -> Result<Envelope> {
        let name = self.name();
        match self {
            Self::Join(p) => encode(name, p),
            Self::ChatMessage(p) => encode(name, p),
            Self::Typing(p) => encode(name, p),
            Self::SetUsername(p) => encode(name, p),
            Self::PrivateMessage(p) => encode(name, p),
            Self::GetPrivateHistory(p) => encode(name, p),
            Self::MessageSeen(p) => encode(name, p),
        }
    }

    /// Encode straight into a text frame.
    pub fn encode(&self) -> Result<String> {
        self.to_envelope()?.encode()
    }
}

fn decode<T>(event: &'static str, data: &Value) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let payload = T::deserialize(data)
        .map_err(|e| ProtocolError::InvalidPayload { event, reason: e.to_string() })?;
    payload.validate().map_err(|reason| ProtocolError::InvalidPayload { event, reason })?;
    Ok(payload)
}

fn encode<T: Serialize>(event: &'static str, payload: &T) -> Result<Envelope> {
    let data = serde_json::to_value(payload).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(Envelope::new(event, data))
}
