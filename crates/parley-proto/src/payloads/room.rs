//! Room-scoped payload types.
//!
//! These payloads cover the shared room: message history, live messages,
//! presence snapshots, system notices, and typing activity.

use serde::{Deserialize, Serialize};

use super::Validate;
use crate::{Identity, Room};

/// A room message as delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the message.
    pub username: Identity,
    /// Message text.
    pub msg: String,
}

impl Validate for ChatMessage {}

/// Room history sent once after joining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    /// Messages in arrival order, oldest first.
    pub messages: Vec<ChatMessage>,
}

impl Validate for History {}

/// Full snapshot of the users currently in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    /// Online users.
    pub users: Vec<Identity>,
}

impl Validate for UserList {}

/// Server-generated notice (joins, leaves).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemNotice {
    /// Notice text.
    pub msg: String,
}

impl Validate for SystemNotice {}

/// Another user's typing state changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTyping {
    /// User whose state changed.
    pub username: Identity,
    /// Whether they are typing now.
    pub is_typing: bool,
}

impl Validate for UserTyping {}

/// Request to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    /// Room to join.
    pub room: Room,
}

impl Validate for Join {}

/// Request to post a message to the joined room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSend {
    /// Message text.
    pub msg: String,
}

impl Validate for ChatSend {
    fn validate(&self) -> Result<(), String> {
        if self.msg.trim().is_empty() {
            return Err("message text is empty".to_string());
        }
        Ok(())
    }
}

/// Local typing state announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Typing {
    /// Whether the local user is typing.
    #[serde(default)]
    pub is_typing: bool,
}

impl Validate for Typing {}

/// Identity announcement for servers that do not take it from the login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUsername {
    /// Username to use for this connection.
    pub username: Identity,
}

impl Validate for SetUsername {}
