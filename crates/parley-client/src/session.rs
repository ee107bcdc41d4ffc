//! Session state machine.
//!
//! The `Session` owns the four trackers for one identity in one room and
//! routes every event to exactly one of them. It is the only place that
//! decodes server frames: a frame that fails to decode or validate is dropped
//! with a log action and never reaches a tracker.
//!
//! # Lifecycle
//!
//! ```text
//! ┌──────────────┐ Connected ┌───────────┐
//! │ Disconnected │──────────>│ Connected │
//! └──────────────┘<──────────└───────────┘
//!                 Disconnected
//! ```
//!
//! Presence, typing, and the room log are session-scoped: they are cleared on
//! every `Connected` and `Disconnected`, and the server's snapshots after the
//! next join repopulate them. Private conversations survive reconnects.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use parley_core::{
    DEFAULT_TYPING_DEBOUNCE, Identity, PresenceTracker, PrivateConversationManager, PublicLog,
    RenderIntent, Room, TrackerAction, TypingAggregator,
};
use parley_proto::{
    InboundEvent, OutboundEvent,
    payloads::room::{ChatSend, Join, SetUsername},
};
use tracing::{debug, info, warn};

use crate::{
    error::SessionError,
    event::{SessionAction, SessionEvent},
};

/// Notice rendered when the transport is lost.
const DISCONNECTED_NOTICE: &str = "Disconnected from server.";

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Idle time before local typing is reported as stopped.
    pub typing_debounce: Duration,
    /// Send `set_username` before joining, for servers that do not take the
    /// identity from the login.
    pub announce_identity: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { typing_debounce: DEFAULT_TYPING_DEBOUNCE, announce_identity: false }
    }
}

/// Chat session for one identity in one room.
///
/// This is a pure state machine: no I/O and no clock. Time is passed in with
/// the events that need it.
#[derive(Debug, Clone)]
pub struct Session<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    me: Identity,
    room: Room,
    config: SessionConfig,
    connected: bool,
    presence: PresenceTracker,
    typing: TypingAggregator<I>,
    public_log: PublicLog,
    private: PrivateConversationManager,
}

impl<I> Session<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a disconnected session.
    pub fn new(me: Identity, room: Room, config: SessionConfig) -> Self {
        Self {
            presence: PresenceTracker::new(me.clone()),
            typing: TypingAggregator::new(me.clone(), config.typing_debounce),
            public_log: PublicLog::new(),
            private: PrivateConversationManager::new(me.clone()),
            me,
            room,
            config,
            connected: false,
        }
    }

    /// Local identity.
    pub fn me(&self) -> &Identity {
        &self.me
    }

    /// Joined room.
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the transport is connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Presence tracker.
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Typing aggregator.
    pub fn typing(&self) -> &TypingAggregator<I> {
        &self.typing
    }

    /// Room message log.
    pub fn public_log(&self) -> &PublicLog {
        &self.public_log
    }

    /// Private conversations.
    pub fn private(&self) -> &PrivateConversationManager {
        &self.private
    }

    /// Time until the local typing timer expires, for drivers that sleep
    /// until the next deadline instead of ticking at a fixed rate.
    pub fn next_deadline(&self, now: I) -> Option<Duration> {
        self.typing.time_until_expiry(now)
    }

    /// Process an event and return resulting actions.
    pub fn handle(&mut self, event: SessionEvent<I>) -> Result<Vec<SessionAction>, SessionError> {
        match event {
            SessionEvent::Received(text) => Ok(self.handle_text(&text)),
            SessionEvent::Connected => Ok(self.handle_connected()),
            SessionEvent::Disconnected => Ok(self.handle_disconnected()),
            SessionEvent::Tick { now } => Ok(convert_tracker_actions(self.typing.on_tick(now))),
            SessionEvent::LocalInput { now } => Ok(self.handle_local_input(now)),
            SessionEvent::SubmitPublic { text } => self.handle_submit_public(&text),
            SessionEvent::OpenConversation { peer } => {
                self.require_connected("open a conversation")?;
                Ok(convert_tracker_actions(self.private.open_conversation(peer)?))
            },
            SessionEvent::CloseConversation => {
                Ok(convert_tracker_actions(self.private.close_conversation()))
            },
            SessionEvent::SendPrivate { peer, text } => self.handle_send_private(&peer, &text),
        }
    }

    fn handle_text(&mut self, text: &str) -> Vec<SessionAction> {
        match InboundEvent::decode(text) {
            Ok(event) => {
                debug!(event = event.name(), "inbound event");
                convert_tracker_actions(self.dispatch(event))
            },
            Err(e) => {
                warn!(error = %e, "dropping inbound frame");
                vec![SessionAction::Log { message: format!("Dropped inbound frame: {e}") }]
            },
        }
    }

    /// Route a validated server event to the tracker that owns it.
    fn dispatch(&mut self, event: InboundEvent) -> Vec<TrackerAction> {
        match event {
            InboundEvent::History(history) => self
                .public_log
                .replace_with_history(history.messages.into_iter().map(Into::into).collect()),
            InboundEvent::UserList(list) => {
                let mut actions = self.presence.apply_snapshot(list.users);
                actions.extend(self.typing.retain_present(&self.presence));
                actions
            },
            InboundEvent::System(notice) => {
                vec![TrackerAction::Render(RenderIntent::SystemNotice { text: notice.msg })]
            },
            InboundEvent::ChatMessage(message) => self.public_log.append(message.into()),
            InboundEvent::UserTyping(typing) => {
                self.typing.on_remote_typing(typing.username, typing.is_typing)
            },
            InboundEvent::PrivateMessage(message) => self.private.on_incoming(message.into()),
            InboundEvent::PrivateHistory(history) => self.private.on_history_received(
                &history.with_user,
                history.history.into_iter().map(Into::into).collect(),
            ),
            InboundEvent::SeenStatus(status) => self.private.on_seen_ack(&status.id),
        }
    }

    fn handle_connected(&mut self) -> Vec<SessionAction> {
        info!(me = %self.me, room = %self.room, "connected, joining room");
        self.connected = true;
        self.reset_session_state();

        let mut actions = vec![SessionAction::Render(RenderIntent::SessionReset)];
        if self.config.announce_identity {
            actions.push(SessionAction::Send(OutboundEvent::SetUsername(SetUsername {
                username: self.me.clone(),
            })));
        }
        actions.push(SessionAction::Send(OutboundEvent::Join(Join { room: self.room.clone() })));
        actions.extend(convert_tracker_actions(self.private.on_reconnected()));
        actions
    }

    fn handle_disconnected(&mut self) -> Vec<SessionAction> {
        if !self.connected {
            return Vec::new();
        }

        info!(me = %self.me, "disconnected");
        self.connected = false;
        self.reset_session_state();

        vec![
            SessionAction::Render(RenderIntent::SessionReset),
            SessionAction::Render(RenderIntent::SystemNotice {
                text: DISCONNECTED_NOTICE.to_string(),
            }),
        ]
    }

    fn handle_local_input(&mut self, now: I) -> Vec<SessionAction> {
        if !self.connected {
            return Vec::new();
        }
        convert_tracker_actions(self.typing.on_local_input(now))
    }

    fn handle_submit_public(&mut self, text: &str) -> Result<Vec<SessionAction>, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        self.require_connected("send a room message")?;

        let chat = ChatSend { msg: text.to_string() };
        let mut actions = vec![SessionAction::Send(OutboundEvent::ChatMessage(chat))];
        actions.extend(convert_tracker_actions(self.typing.on_local_submit()));
        Ok(actions)
    }

    fn handle_send_private(
        &mut self,
        peer: &Identity,
        text: &str,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if text.trim().is_empty() || self.private.active_peer().is_none() {
            return Ok(Vec::new());
        }
        self.require_connected("send a private message")?;

        Ok(convert_tracker_actions(self.private.send_message(peer, text)?))
    }

    fn require_connected(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.connected { Ok(()) } else { Err(SessionError::NotConnected { operation }) }
    }

    fn reset_session_state(&mut self) {
        self.presence.reset();
        self.typing.reset();
        self.public_log.reset();
    }
}

/// Convert tracker actions to session actions.
fn convert_tracker_actions(actions: Vec<TrackerAction>) -> Vec<SessionAction> {
    actions
        .into_iter()
        .map(|action| match action {
            TrackerAction::Emit(event) => SessionAction::Send(event),
            TrackerAction::Render(intent) => SessionAction::Render(intent),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parley_proto::payloads::private::HistoryRequest;

    use super::*;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn session() -> Session<Instant> {
        Session::new(id("me"), Room::new("General").unwrap(), SessionConfig::default())
    }

    fn connected() -> Session<Instant> {
        let mut session = session();
        session.handle(SessionEvent::Connected).unwrap();
        session
    }

    fn receive(session: &mut Session<Instant>, text: &str) -> Vec<SessionAction> {
        session.handle(SessionEvent::Received(text.to_string())).unwrap()
    }

    #[test]
    fn connect_joins_room() {
        let mut session = session();

        let actions = session.handle(SessionEvent::Connected).unwrap();

        assert!(session.is_connected());
        assert_eq!(actions, vec![
            SessionAction::Render(RenderIntent::SessionReset),
            SessionAction::Send(OutboundEvent::Join(Join { room: Room::new("General").unwrap() })),
        ]);
    }

    #[test]
    fn connect_announces_identity_when_configured() {
        let config = SessionConfig { announce_identity: true, ..SessionConfig::default() };
        let mut session: Session<Instant> =
            Session::new(id("me"), Room::new("General").unwrap(), config);

        let actions = session.handle(SessionEvent::Connected).unwrap();

        assert_eq!(
            actions[1],
            SessionAction::Send(OutboundEvent::SetUsername(SetUsername { username: id("me") }))
        );
        assert!(matches!(actions[2], SessionAction::Send(OutboundEvent::Join(_))));
    }

    #[test]
    fn malformed_frames_are_logged_and_ignored() {
        let mut session = connected();
        receive(&mut session, r#"{"event":"update_user_list","data":{"users":["me","bob"]}}"#);

        for frame in [
            "garbage",
            r#"{"event":"nope","data":{}}"#,
            r#"{"event":"update_user_list","data":{"users":"bob"}}"#,
            r#"{"event":"chat_message","data":{"username":"","msg":"hi"}}"#,
        ] {
            let actions = receive(&mut session, frame);
            assert!(matches!(actions.as_slice(), [SessionAction::Log { .. }]), "{frame}");
        }

        assert_eq!(session.presence().users(), &[id("me"), id("bob")]);
        assert!(session.public_log().is_empty());
    }

    #[test]
    fn reconnect_resets_session_state() {
        let mut session = connected();
        receive(&mut session, r#"{"event":"update_user_list","data":{"users":["me","bob"]}}"#);
        receive(&mut session, r#"{"event":"chat_message","data":{"username":"bob","msg":"hi"}}"#);
        receive(&mut session, r#"{"event":"user_typing","data":{"username":"bob","is_typing":true}}"#);

        session.handle(SessionEvent::Connected).unwrap();

        assert!(session.presence().is_empty());
        assert!(session.public_log().is_empty());
        assert!(session.typing().typists().is_empty());
    }

    #[test]
    fn reconnect_rerequests_open_conversation() {
        let mut session = connected();
        session.handle(SessionEvent::OpenConversation { peer: id("alice") }).unwrap();

        let actions = session.handle(SessionEvent::Connected).unwrap();

        assert_eq!(
            actions.last(),
            Some(&SessionAction::Send(OutboundEvent::GetPrivateHistory(HistoryRequest {
                with_user: id("alice"),
            })))
        );
    }

    #[test]
    fn disconnect_clears_and_notifies_once() {
        let mut session = connected();
        receive(&mut session, r#"{"event":"history","data":{"messages":[{"username":"bob","msg":"a"}]}}"#);

        let actions = session.handle(SessionEvent::Disconnected).unwrap();

        assert!(!session.is_connected());
        assert!(session.public_log().is_empty());
        assert_eq!(actions.len(), 2);
        assert!(session.handle(SessionEvent::Disconnected).unwrap().is_empty());
    }

    #[test]
    fn user_list_prunes_departed_typists() {
        let mut session = connected();
        receive(&mut session, r#"{"event":"user_typing","data":{"username":"bob","is_typing":true}}"#);

        let actions =
            receive(&mut session, r#"{"event":"update_user_list","data":{"users":["me"]}}"#);

        assert!(actions.contains(&SessionAction::Render(RenderIntent::TypingChanged { label: None })));
        assert!(session.typing().typists().is_empty());
    }

    #[test]
    fn system_notice_renders_only() {
        let mut session = connected();

        let actions = receive(&mut session, r#"{"event":"system","data":{"msg":"bob joined"}}"#);

        assert_eq!(actions, vec![SessionAction::Render(RenderIntent::SystemNotice {
            text: "bob joined".into()
        })]);
    }

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn submit_sends_and_stops_typing() {
        let mut session = connected();
        session.handle(SessionEvent::LocalInput { now: Instant::now() }).unwrap();

        let actions = session.handle(SessionEvent::SubmitPublic { text: "  hello ".into() }).unwrap();

        assert_eq!(actions, vec![
            SessionAction::Send(OutboundEvent::ChatMessage(ChatSend { msg: "hello".into() })),
            SessionAction::Send(OutboundEvent::Typing(parley_proto::payloads::room::Typing {
                is_typing: false
            })),
        ]);
    }

    #[test]
    fn blank_submit_is_a_noop() {
        let mut session = connected();

        assert!(session.handle(SessionEvent::SubmitPublic { text: "   ".into() }).unwrap().is_empty());
        assert!(
            session
                .handle(SessionEvent::SendPrivate { peer: id("alice"), text: "".into() })
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn caller_errors() {
        let mut offline = session();
        assert_eq!(
            offline.handle(SessionEvent::SubmitPublic { text: "hi".into() }),
            Err(SessionError::NotConnected { operation: "send a room message" })
        );

        let mut session = connected();
        assert!(matches!(
            session.handle(SessionEvent::OpenConversation { peer: id("me") }),
            Err(SessionError::Conversation(_))
        ));
    }

    #[test]
    fn history_with_stray_entry_keeps_the_rest() {
        let mut session = connected();
        session.handle(SessionEvent::OpenConversation { peer: id("alice") }).unwrap();

        receive(
            &mut session,
            r#"{"event":"private_history","data":{"with_user":"alice","history":[
                {"id":1,"sender":"alice","recipient":"me","msg":"hi","seen":true},
                {"id":2,"sender":"alice","recipient":"alice","msg":"odd","seen":true}
            ]}}"#,
        );

        let conversation = session.private().conversation(&id("alice")).unwrap();
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].text, "hi");
    }

    #[test]
    fn private_send_without_conversation_is_silent_even_offline() {
        let mut offline = session();
        assert_eq!(
            offline.handle(SessionEvent::SendPrivate { peer: id("alice"), text: "hi".into() }),
            Ok(Vec::new())
        );

        let mut session = connected();
        session.handle(SessionEvent::OpenConversation { peer: id("alice") }).unwrap();
        session.handle(SessionEvent::Disconnected).unwrap();
        assert_eq!(
            session.handle(SessionEvent::SendPrivate { peer: id("alice"), text: "hi".into() }),
            Err(SessionError::NotConnected { operation: "send a private message" })
        );
    }

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn typing_ignored_while_disconnected() {
        let mut offline = session();

        assert!(offline.handle(SessionEvent::LocalInput { now: Instant::now() }).unwrap().is_empty());
        assert!(!offline.typing().is_armed());
    }
}
