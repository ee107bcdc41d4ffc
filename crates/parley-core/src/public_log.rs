//! Room message log.
//!
//! The server sends the room history once after joining, then live messages.
//! Messages carry no id, so nothing is deduplicated: a message appended
//! twice by the server is shown twice.

use crate::{
    action::{RenderIntent, TrackerAction},
    types::PublicMessage,
};

/// Ordered room messages since joining.
#[derive(Debug, Clone, Default)]
pub struct PublicLog {
    messages: Vec<PublicMessage>,
}

impl PublicLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the log with the server's history.
    pub fn replace_with_history(&mut self, messages: Vec<PublicMessage>) -> Vec<TrackerAction> {
        self.messages = messages;
        vec![TrackerAction::Render(RenderIntent::PublicLogReplaced {
            messages: self.messages.clone(),
        })]
    }

    /// Append a live message.
    pub fn append(&mut self, message: PublicMessage) -> Vec<TrackerAction> {
        self.messages.push(message.clone());
        vec![TrackerAction::Render(RenderIntent::PublicMessageAppended(message))]
    }

    /// Messages oldest first.
    pub fn messages(&self) -> &[PublicMessage] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop all messages.
    pub fn reset(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parley_proto::Identity;

    use super::*;

    fn msg(sender: &str, text: &str) -> PublicMessage {
        PublicMessage { sender: Identity::new(sender).unwrap(), text: text.into() }
    }

    #[test]
    fn history_replaces_then_appends() {
        let mut log = PublicLog::new();
        log.append(msg("stale", "old"));

        log.replace_with_history(vec![msg("alice", "one"), msg("bob", "two")]);
        let actions = log.append(msg("alice", "three"));

        assert_eq!(log.messages(), &[msg("alice", "one"), msg("bob", "two"), msg("alice", "three")]);
        assert_eq!(
            actions,
            vec![TrackerAction::Render(RenderIntent::PublicMessageAppended(msg("alice", "three")))]
        );
    }

    #[test]
    fn duplicates_are_kept() {
        let mut log = PublicLog::new();
        log.append(msg("alice", "hi"));
        log.append(msg("alice", "hi"));

        assert_eq!(log.len(), 2);
    }
}
