//! Private (one-to-one) conversation payload types.
//!
//! Private messages carry a server-assigned [`MessageId`], which is the join
//! key for later seen-status updates.

use serde::{Deserialize, Serialize};

use super::Validate;
use crate::{Identity, MessageId};

/// A private message between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
    /// Server-assigned id.
    pub id: MessageId,
    /// Author.
    pub sender: Identity,
    /// Addressee.
    pub recipient: Identity,
    /// Message text.
    pub msg: String,
    /// Whether the recipient has seen it.
    pub seen: bool,
}

impl Validate for PrivateMessage {
    fn validate(&self) -> Result<(), String> {
        if self.sender == self.recipient {
            return Err(format!("message {} is addressed to its own sender", self.id));
        }
        Ok(())
    }
}

/// Full history of a private conversation, answering a history request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateHistory {
    /// Peer the history belongs to.
    pub with_user: Identity,
    /// Messages oldest first.
    pub history: Vec<PrivateMessage>,
}

/// Entries are not validated one by one; the receiver drops any that do not
/// belong to the conversation.
impl Validate for PrivateHistory {}

/// A private message was marked as seen by its recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenStatus {
    /// Id of the message now seen.
    pub id: MessageId,
}

impl Validate for SeenStatus {}

/// Request to send a private message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPrivate {
    /// Addressee.
    pub recipient_username: Identity,
    /// Message text.
    pub msg: String,
}

impl Validate for SendPrivate {
    fn validate(&self) -> Result<(), String> {
        if self.msg.trim().is_empty() {
            return Err("message text is empty".to_string());
        }
        Ok(())
    }
}

/// Request for the full history with one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Peer whose conversation is requested.
    pub with_user: Identity,
}

impl Validate for HistoryRequest {}

/// Acknowledgment that a received private message was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSeen {
    /// Id of the seen message.
    pub id: MessageId,
    /// Original author, so the server can notify them.
    pub sender: Identity,
}

impl Validate for MessageSeen {}
