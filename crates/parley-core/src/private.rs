//! Private one-to-one conversations.
//!
//! Each peer has a message buffer that lives as long as the manager. At most
//! one conversation is active (displayed) at a time. Opening a conversation
//! shows the retained buffer immediately and asks the server for the
//! authoritative history, which replaces the buffer when it arrives.
//!
//! # Invariants
//!
//! - Every buffered message has the local identity on exactly one side and
//!   the buffer's peer on the other.
//! - History is applied only to the active conversation. A response for a
//!   conversation that was closed or switched away from in the meantime is
//!   discarded.
//! - `seen` only moves from false to true.
//! - The unseen marker is never set for the active conversation.

use std::collections::BTreeMap;

use parley_proto::{
    Identity, MessageId, OutboundEvent,
    payloads::private::{HistoryRequest, MessageSeen, SendPrivate},
};
use tracing::{debug, warn};

use crate::{
    action::{RenderIntent, TrackerAction},
    error::ConversationError,
    types::{Conversation, ConversationPhase, PrivateMessage},
};

/// Owns all private conversations of the local user.
#[derive(Debug, Clone)]
pub struct PrivateConversationManager {
    me: Identity,
    conversations: BTreeMap<Identity, Conversation>,
    active: Option<Identity>,
}

impl PrivateConversationManager {
    /// Create a manager for the local identity `me`.
    pub fn new(me: Identity) -> Self {
        Self { me, conversations: BTreeMap::new(), active: None }
    }

    /// Local identity.
    pub fn me(&self) -> &Identity {
        &self.me
    }

    /// Open the conversation with `peer` and request its history.
    ///
    /// Any previously active conversation is closed first. The retained
    /// buffer is rendered right away so the user sees something before the
    /// server answers.
    pub fn open_conversation(
        &mut self,
        peer: Identity,
    ) -> Result<Vec<TrackerAction>, ConversationError> {
        if peer == self.me {
            return Err(ConversationError::SelfConversation(peer));
        }

        if let Some(previous) = self.active.take() {
            if let Some(conversation) = self.conversations.get_mut(&previous) {
                conversation.phase = ConversationPhase::Closed;
            }
        }

        let mut actions = Vec::new();
        let conversation = self.conversations.entry(peer.clone()).or_default();

        if conversation.has_unseen_incoming {
            conversation.has_unseen_incoming = false;
            actions.push(TrackerAction::Render(RenderIntent::UnseenMarker {
                peer: peer.clone(),
                unseen: false,
            }));
        }

        conversation.phase = ConversationPhase::HistoryPending;
        actions.push(TrackerAction::Render(RenderIntent::ConversationOpened {
            peer: peer.clone(),
            messages: conversation.messages.clone(),
        }));
        actions.push(history_request(&peer));

        self.active = Some(peer);
        Ok(actions)
    }

    /// Close the active conversation. The buffer is kept.
    pub fn close_conversation(&mut self) -> Vec<TrackerAction> {
        let Some(peer) = self.active.take() else {
            return Vec::new();
        };

        if let Some(conversation) = self.conversations.get_mut(&peer) {
            conversation.phase = ConversationPhase::Closed;
        }

        vec![TrackerAction::Render(RenderIntent::ConversationClosed { peer })]
    }

    /// Apply the server's history for `peer`.
    ///
    /// Discarded unless `peer` is the active conversation. Entries that are
    /// not between the local user and `peer` are dropped. Every unseen
    /// message addressed to us is acknowledged.
    pub fn on_history_received(
        &mut self,
        peer: &Identity,
        messages: Vec<PrivateMessage>,
    ) -> Vec<TrackerAction> {
        if self.active.as_ref() != Some(peer) {
            debug!(peer = %peer, "discarding history for inactive conversation");
            return Vec::new();
        }

        let total = messages.len();
        let messages: Vec<PrivateMessage> =
            messages.into_iter().filter(|m| m.is_between(&self.me, peer)).collect();
        if messages.len() != total {
            warn!(
                peer = %peer,
                dropped = total - messages.len(),
                "history contained messages from other conversations"
            );
        }

        let mut actions = vec![TrackerAction::Render(RenderIntent::ConversationReplaced {
            peer: peer.clone(),
            messages: messages.clone(),
        })];
        actions.extend(
            messages.iter().filter(|m| m.recipient == self.me && !m.seen).map(seen_ack),
        );

        let conversation = self.conversations.entry(peer.clone()).or_default();
        conversation.messages = messages;
        conversation.phase = ConversationPhase::HistoryLoaded;

        actions
    }

    /// Handle a live private message, incoming or the echo of our own.
    pub fn on_incoming(&mut self, message: PrivateMessage) -> Vec<TrackerAction> {
        let Some(peer) = message.counterpart(&self.me).cloned() else {
            warn!(
                id = %message.id,
                sender = %message.sender,
                recipient = %message.recipient,
                "dropping private message not addressed to or from self"
            );
            return Vec::new();
        };

        let addressed_to_me = message.recipient == self.me;
        let is_active = self.active.as_ref() == Some(&peer);
        let conversation = self.conversations.entry(peer.clone()).or_default();
        conversation.messages.push(message.clone());

        let mut actions = Vec::new();
        if is_active {
            let ack = (addressed_to_me && !message.seen).then(|| seen_ack(&message));
            actions.push(TrackerAction::Render(RenderIntent::PrivateMessageAppended {
                peer,
                message,
            }));
            actions.extend(ack);
        } else if addressed_to_me && !conversation.has_unseen_incoming {
            conversation.has_unseen_incoming = true;
            actions.push(TrackerAction::Render(RenderIntent::UnseenMarker { peer, unseen: true }));
        }

        actions
    }

    /// The server reports message `id` as seen.
    ///
    /// Applies to the active conversation only. Unknown ids and repeated
    /// acknowledgments are ignored.
    pub fn on_seen_ack(&mut self, id: &MessageId) -> Vec<TrackerAction> {
        let Some(peer) = self.active.clone() else {
            debug!(id = %id, "seen update without an active conversation");
            return Vec::new();
        };

        let target = self
            .conversations
            .get_mut(&peer)
            .and_then(|c| c.messages.iter_mut().find(|m| &m.id == id && !m.seen));

        match target {
            Some(message) => {
                message.seen = true;
                vec![TrackerAction::Render(RenderIntent::SeenUpdated { peer, id: id.clone() })]
            },
            None => {
                debug!(id = %id, peer = %peer, "seen update matches no unseen message");
                Vec::new()
            },
        }
    }

    /// Send `text` to `peer`.
    ///
    /// Blank text, or no open conversation, is a silent no-op. The message is
    /// not buffered locally; the server's echo is.
    pub fn send_message(
        &self,
        peer: &Identity,
        text: &str,
    ) -> Result<Vec<TrackerAction>, ConversationError> {
        if peer == &self.me {
            return Err(ConversationError::SelfMessage(peer.clone()));
        }

        let text = text.trim();
        if text.is_empty() || self.active.is_none() {
            return Ok(Vec::new());
        }

        Ok(vec![TrackerAction::Emit(OutboundEvent::PrivateMessage(SendPrivate {
            recipient_username: peer.clone(),
            msg: text.to_string(),
        }))])
    }

    /// The transport reconnected: ask again for the active history.
    pub fn on_reconnected(&mut self) -> Vec<TrackerAction> {
        let Some(peer) = self.active.clone() else {
            return Vec::new();
        };

        if let Some(conversation) = self.conversations.get_mut(&peer) {
            conversation.phase = ConversationPhase::HistoryPending;
        }

        vec![history_request(&peer)]
    }

    /// Peer of the active conversation.
    pub fn active_peer(&self) -> Option<&Identity> {
        self.active.as_ref()
    }

    /// Conversation with `peer`, if it was ever referenced.
    pub fn conversation(&self, peer: &Identity) -> Option<&Conversation> {
        self.conversations.get(peer)
    }

    /// All conversations, ordered by peer.
    pub fn conversations(&self) -> impl Iterator<Item = (&Identity, &Conversation)> {
        self.conversations.iter()
    }

    /// Peers with unseen incoming messages.
    pub fn unseen_peers(&self) -> impl Iterator<Item = &Identity> {
        self.conversations.iter().filter(|(_, c)| c.has_unseen_incoming).map(|(peer, _)| peer)
    }

    /// Whether `peer` has unseen incoming messages.
    pub fn has_unseen(&self, peer: &Identity) -> bool {
        self.conversations.get(peer).is_some_and(|c| c.has_unseen_incoming)
    }
}

fn history_request(peer: &Identity) -> TrackerAction {
    TrackerAction::Emit(OutboundEvent::GetPrivateHistory(HistoryRequest {
        with_user: peer.clone(),
    }))
}

fn seen_ack(message: &PrivateMessage) -> TrackerAction {
    TrackerAction::Emit(OutboundEvent::MessageSeen(MessageSeen {
        id: message.id.clone(),
        sender: message.sender.clone(),
    }))
}
