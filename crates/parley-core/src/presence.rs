//! Online presence for the joined room.
//!
//! Presence is snapshot-only: every change arrives as the full user list and
//! replaces the previous one. There is no incremental add or remove.

use std::collections::BTreeSet;

use parley_proto::Identity;
use tracing::warn;

use crate::action::{RenderIntent, TrackerAction};

/// Current online-user set of the joined room.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    me: Identity,
    /// Online users in server order.
    users: Vec<Identity>,
    /// Same users, for membership checks.
    members: BTreeSet<Identity>,
    has_snapshot: bool,
}

impl PresenceTracker {
    /// Create an empty tracker for the local identity `me`.
    pub fn new(me: Identity) -> Self {
        Self { me, users: Vec::new(), members: BTreeSet::new(), has_snapshot: false }
    }

    /// Replace the presence set with a server snapshot.
    ///
    /// Server order is kept; repeated names collapse onto their first
    /// occurrence. A snapshot without the local user is accepted but logged,
    /// since the server should always list a joined client.
    pub fn apply_snapshot(&mut self, users: Vec<Identity>) -> Vec<TrackerAction> {
        let mut members = BTreeSet::new();
        let mut deduped: Vec<Identity> = Vec::with_capacity(users.len());
        for user in users {
            if members.insert(user.clone()) {
                deduped.push(user);
            }
        }

        if !members.contains(&self.me) {
            warn!(me = %self.me, count = deduped.len(), "presence snapshot does not include self");
        }

        self.users = deduped;
        self.members = members;
        self.has_snapshot = true;

        vec![TrackerAction::Render(RenderIntent::PresenceReplaced {
            users: self.users.clone(),
            count: self.users.len(),
        })]
    }

    /// Users online, in server order.
    pub fn users(&self) -> &[Identity] {
        &self.users
    }

    /// Whether `user` is online.
    pub fn contains(&self, user: &Identity) -> bool {
        self.members.contains(user)
    }

    /// Number of online users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether nobody is online.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Whether a snapshot arrived since the last reset.
    pub fn has_snapshot(&self) -> bool {
        self.has_snapshot
    }

    /// Drop all presence state.
    pub fn reset(&mut self) {
        self.users.clear();
        self.members.clear();
        self.has_snapshot = false;
    }
}
