//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::BTreeMap;

use parley_core::{ConversationPhase, MessageId};

use super::{Invariant, InvariantKind, InvariantResult, SystemSnapshot, Violation};

/// The active peer must have an open conversation, and no other conversation
/// may be open.
///
/// Exactly one buffer is ever displayed; a second open conversation would
/// receive acks and appends meant for another peer.
pub struct ActiveConversationKnown;

impl Invariant for ActiveConversationKnown {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ActiveConversationKnown
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if let Some(active) = &client.active_peer {
                let open = client.conversations.get(active).map(|c| c.phase);
                if !matches!(
                    open,
                    Some(ConversationPhase::HistoryPending | ConversationPhase::HistoryLoaded)
                ) {
                    return Err(Violation {
                        invariant: self.kind(),
                        message: format!(
                            "client {}: active peer {active} has conversation phase {open:?}",
                            client.identity
                        ),
                    });
                }
            }

            for (peer, conversation) in &client.conversations {
                if conversation.phase != ConversationPhase::Closed
                    && client.active_peer.as_ref() != Some(peer)
                {
                    return Err(Violation {
                        invariant: self.kind(),
                        message: format!(
                            "client {}: conversation with {peer} is {:?} but active peer is {:?}",
                            client.identity, conversation.phase, client.active_peer
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A connected client with a presence list sees itself online.
///
/// The server always lists a joined user, so a presence list without self
/// means the list came from another room or session.
pub struct SelfInPresence;

impl Invariant for SelfInPresence {
    fn kind(&self) -> InvariantKind {
        InvariantKind::SelfInPresence
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if !client.connected {
                continue;
            }
            if let Some(users) = &client.presence
                && !users.contains(&client.identity)
            {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("client {}: missing from presence {users:?}", client.identity),
                });
            }
        }
        Ok(())
    }
}

/// Every buffered private message is between the client and that buffer's
/// peer.
pub struct ConversationParticipants;

impl Invariant for ConversationParticipants {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ConversationParticipants
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            for (peer, conversation) in &client.conversations {
                if let Some(stray) =
                    conversation.messages.iter().find(|m| !m.is_between(&client.identity, peer))
                {
                    return Err(Violation {
                        invariant: self.kind(),
                        message: format!(
                            "client {}: message {} ({} -> {}) in conversation with {peer}",
                            client.identity, stray.id, stray.sender, stray.recipient
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The displayed conversation never carries the unseen marker.
pub struct UnseenNeverActive;

impl Invariant for UnseenNeverActive {
    fn kind(&self) -> InvariantKind {
        InvariantKind::UnseenNeverActive
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if let Some(active) = &client.active_peer
                && client.unseen.contains(active)
            {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "client {}: active conversation with {active} marked unseen",
                        client.identity
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Two clients viewing each other's loaded conversation agree on `seen` for
/// every message id both hold.
///
/// Only meaningful once all in-flight frames are delivered; use
/// [`super::InvariantRegistry::quiescent`].
pub struct SeenConvergence;

impl Invariant for SeenConvergence {
    fn kind(&self) -> InvariantKind {
        InvariantKind::SeenConvergence
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (i, a) in state.clients.iter().enumerate() {
            for b in &state.clients[i + 1..] {
                if a.active_peer.as_ref() != Some(&b.identity)
                    || b.active_peer.as_ref() != Some(&a.identity)
                {
                    continue;
                }
                let (Some(a_conv), Some(b_conv)) =
                    (a.conversations.get(&b.identity), b.conversations.get(&a.identity))
                else {
                    continue;
                };
                if a_conv.phase != ConversationPhase::HistoryLoaded
                    || b_conv.phase != ConversationPhase::HistoryLoaded
                {
                    continue;
                }

                let a_seen: BTreeMap<&MessageId, bool> =
                    a_conv.messages.iter().map(|m| (&m.id, m.seen)).collect();
                for message in &b_conv.messages {
                    if let Some(&seen) = a_seen.get(&message.id)
                        && seen != message.seen
                    {
                        return Err(Violation {
                            invariant: self.kind(),
                            message: format!(
                                "message {}: {} sees seen={seen}, {} sees seen={}",
                                message.id, a.identity, b.identity, message.seen
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
