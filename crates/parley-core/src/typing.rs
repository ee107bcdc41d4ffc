//! Typing activity: remote indicators and the local debounce timer.
//!
//! Remote typing state is a set of users, rendered as a single label. Local
//! typing is announced with a leading-edge debounce: the first keystroke
//! emits `typing{true}`, later keystrokes only push the deadline back, and
//! `typing{false}` is emitted once the user has been idle for the debounce
//! window or submits.
//!
//! The timer is sans-IO. It stores the instant of the last keystroke and is
//! checked on every tick, so no timer task ever needs cancelling.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use parley_proto::{Identity, OutboundEvent, payloads::room::Typing};
use tracing::trace;

use crate::{
    action::{RenderIntent, TrackerAction},
    presence::PresenceTracker,
};

/// Idle time after the last keystroke before `typing{false}` is sent.
pub const DEFAULT_TYPING_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Number of simultaneous typists at which the label stops naming users.
pub const SEVERAL_TYPING_THRESHOLD: usize = 2;

/// Tracks who is typing and debounces the local user's own typing signal.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct TypingAggregator<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    me: Identity,
    /// Remote typists in the order they started.
    typists: Vec<Identity>,
    debounce: Duration,
    /// Instant of the last local keystroke. `Some` while the timer is armed.
    last_input: Option<I>,
}

impl<I> TypingAggregator<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create an aggregator for the local identity `me`.
    pub fn new(me: Identity, debounce: Duration) -> Self {
        Self { me, typists: Vec::new(), debounce, last_input: None }
    }

    /// Apply a remote user's typing state.
    ///
    /// Events naming the local user are ignored; the local indicator is never
    /// shown to ourselves.
    pub fn on_remote_typing(&mut self, user: Identity, is_typing: bool) -> Vec<TrackerAction> {
        if user == self.me {
            trace!(user = %user, "ignoring typing event for self");
            return Vec::new();
        }

        if is_typing {
            if !self.typists.contains(&user) {
                self.typists.push(user);
            }
        } else {
            self.typists.retain(|u| u != &user);
        }

        vec![self.label_action()]
    }

    /// Register a local keystroke at `now`.
    ///
    /// Emits `typing{true}` only on the leading edge, when no timer is armed.
    /// A timer whose deadline passed without a tick is expired first, so the
    /// keystroke starts a new window.
    pub fn on_local_input(&mut self, now: I) -> Vec<TrackerAction> {
        let mut actions = self.on_tick(now);
        let leading = self.last_input.is_none();
        self.last_input = Some(now);

        if leading {
            actions.push(typing_event(true));
        }
        actions
    }

    /// Expire the local timer if the debounce window has elapsed.
    pub fn on_tick(&mut self, now: I) -> Vec<TrackerAction> {
        match self.last_input {
            Some(last) if now - last >= self.debounce => {
                self.last_input = None;
                vec![typing_event(false)]
            },
            _ => Vec::new(),
        }
    }

    /// The local user submitted their input: stop typing immediately.
    pub fn on_local_submit(&mut self) -> Vec<TrackerAction> {
        self.last_input = None;
        vec![typing_event(false)]
    }

    /// Drop typists that are no longer online.
    ///
    /// Renders a new label only when the set changed.
    pub fn retain_present(&mut self, presence: &PresenceTracker) -> Vec<TrackerAction> {
        let before = self.typists.len();
        self.typists.retain(|u| presence.contains(u));

        if self.typists.len() == before { Vec::new() } else { vec![self.label_action()] }
    }

    /// Forget remote typists and disarm the local timer without emitting.
    pub fn reset(&mut self) {
        self.typists.clear();
        self.last_input = None;
    }

    /// Remaining time before the armed timer expires. `None` when disarmed.
    pub fn time_until_expiry(&self, now: I) -> Option<Duration> {
        self.last_input.map(|last| self.debounce.saturating_sub(now - last))
    }

    /// Whether the local typing timer is armed.
    pub fn is_armed(&self) -> bool {
        self.last_input.is_some()
    }

    /// Remote users currently typing.
    pub fn typists(&self) -> &[Identity] {
        &self.typists
    }

    /// Label for the current set of typists. `None` means hidden.
    pub fn label(&self) -> Option<String> {
        typing_label(&self.typists)
    }

    fn label_action(&self) -> TrackerAction {
        TrackerAction::Render(RenderIntent::TypingChanged { label: self.label() })
    }
}

/// Human-readable typing label for a set of typists.
pub fn typing_label(typists: &[Identity]) -> Option<String> {
    match typists {
        [] => None,
        [one] => Some(format!("{one} is typing...")),
        many => {
            debug_assert!(many.len() >= SEVERAL_TYPING_THRESHOLD);
            Some("Several people are typing...".to_string())
        },
    }
}

fn typing_event(is_typing: bool) -> TrackerAction {
    TrackerAction::Emit(OutboundEvent::Typing(Typing { is_typing }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn aggregator() -> TypingAggregator<Instant> {
        TypingAggregator::new(id("me"), DEFAULT_TYPING_DEBOUNCE)
    }

    fn emitted(actions: &[TrackerAction]) -> Vec<bool> {
        actions
            .iter()
            .filter_map(|a| match a {
                TrackerAction::Emit(OutboundEvent::Typing(t)) => Some(t.is_typing),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn label_policy() {
        let mut typing = aggregator();

        let actions = typing.on_remote_typing(id("alice"), true);
        assert_eq!(
            actions,
            vec![TrackerAction::Render(RenderIntent::TypingChanged {
                label: Some("alice is typing...".into())
            })]
        );

        typing.on_remote_typing(id("bob"), true);
        assert_eq!(typing.label().as_deref(), Some("Several people are typing..."));

        typing.on_remote_typing(id("alice"), false);
        typing.on_remote_typing(id("bob"), false);
        assert_eq!(typing.label(), None);
    }

    #[test]
    fn self_typing_is_ignored() {
        let mut typing = aggregator();

        assert!(typing.on_remote_typing(id("me"), true).is_empty());
        assert!(typing.typists().is_empty());
    }

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn one_start_per_debounce_window() {
        let mut typing = aggregator();
        let t0 = Instant::now();

        let mut starts = Vec::new();
        for ms in [0u64, 300, 900, 1500] {
            starts.extend(emitted(&typing.on_local_input(t0 + Duration::from_millis(ms))));
        }
        assert_eq!(starts, vec![true]);

        // Deadline is measured from the last keystroke.
        assert!(typing.on_tick(t0 + Duration::from_millis(3000)).is_empty());
        assert_eq!(emitted(&typing.on_tick(t0 + Duration::from_millis(3500))), vec![false]);

        // Expired exactly once.
        assert!(typing.on_tick(t0 + Duration::from_millis(9000)).is_empty());
        assert!(!typing.is_armed());
    }

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn keystroke_after_missed_deadline_restarts_window() {
        let mut typing = aggregator();
        let t0 = Instant::now();

        let mut signals = emitted(&typing.on_local_input(t0));
        signals.extend(emitted(&typing.on_local_input(t0 + Duration::from_secs(3))));

        assert_eq!(signals, vec![true, false, true]);
        assert_eq!(
            typing.time_until_expiry(t0 + Duration::from_secs(3)),
            Some(DEFAULT_TYPING_DEBOUNCE)
        );
    }

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn submit_clears_typing() {
        let mut typing = aggregator();
        let t0 = Instant::now();

        typing.on_local_input(t0);
        assert_eq!(emitted(&typing.on_local_submit()), vec![false]);

        // No second stop once the window would have elapsed.
        assert!(typing.on_tick(t0 + Duration::from_secs(5)).is_empty());

        // Next keystroke starts a fresh window.
        assert_eq!(emitted(&typing.on_local_input(t0 + Duration::from_secs(6))), vec![true]);
    }

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn time_until_expiry_tracks_last_input() {
        let mut typing = aggregator();
        let t0 = Instant::now();
        assert_eq!(typing.time_until_expiry(t0), None);

        typing.on_local_input(t0);
        typing.on_local_input(t0 + Duration::from_millis(500));

        assert_eq!(
            typing.time_until_expiry(t0 + Duration::from_millis(1000)),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(typing.time_until_expiry(t0 + Duration::from_secs(10)), Some(Duration::ZERO));
    }

    #[test]
    fn retain_present_prunes_departed_typists() {
        let mut typing = aggregator();
        let mut presence = PresenceTracker::new(id("me"));
        typing.on_remote_typing(id("alice"), true);
        typing.on_remote_typing(id("bob"), true);

        presence.apply_snapshot(vec![id("me"), id("alice")]);
        let actions = typing.retain_present(&presence);

        assert_eq!(typing.typists(), &[id("alice")]);
        assert_eq!(
            actions,
            vec![TrackerAction::Render(RenderIntent::TypingChanged {
                label: Some("alice is typing...".into())
            })]
        );
        assert!(typing.retain_present(&presence).is_empty());
    }

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn reset_is_silent() {
        let mut typing = aggregator();
        typing.on_remote_typing(id("alice"), true);
        typing.on_local_input(Instant::now());

        typing.reset();

        assert!(typing.typists().is_empty());
        assert!(!typing.is_armed());
    }
}
