//! Session-to-Application translation layer.
//!
//! The [`Bridge`] wraps the Sans-IO [`parley_client::Session`] and adapts it
//! to the high-level application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts high-level [`crate::AppAction`] into session events, stamping
//!   local input with the environment's clock.
//! - Encodes outbound events into text frames to be sent by the driver in the
//!   next I/O cycle.
//! - Converts render intents and errors from the session back into
//!   [`crate::AppEvent`]s to update the UI.
//! - Manages time ticks generically to support both real-time execution and
//!   deterministic simulation.

use parley_client::{
    Identity, Room, Session, SessionAction, SessionConfig, SessionError, SessionEvent,
};
use parley_core::env::Environment;
use tracing::{debug, warn};

use crate::{AppAction, AppEvent};

/// Bridge between App and Session protocol logic.
///
/// Generic over Environment to support both production and simulation.
/// The Instant type is determined by the Environment's associated type.
pub struct Bridge<E: Environment> {
    session: Session<E::Instant>,
    env: E,
    outgoing: Vec<String>,
}

impl<E: Environment> Bridge<E> {
    /// Create a new Bridge for `me` in `room`.
    pub fn new(env: E, me: Identity, room: Room, config: SessionConfig) -> Self {
        Self { session: Session::new(me, room, config), env, outgoing: Vec::new() }
    }

    /// The wrapped session.
    pub fn session(&self) -> &Session<E::Instant> {
        &self.session
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        let event = match action {
            AppAction::LocalInput => SessionEvent::LocalInput { now: self.env.now() },
            AppAction::SubmitPublic { text } => SessionEvent::SubmitPublic { text },
            AppAction::OpenConversation { peer } => SessionEvent::OpenConversation { peer },
            AppAction::CloseConversation => SessionEvent::CloseConversation,
            AppAction::SendPrivate { peer, text } => SessionEvent::SendPrivate { peer, text },
            AppAction::Render | AppAction::Quit => return vec![],
        };
        self.handle_event(event)
    }

    /// Handle a text frame from the server.
    pub fn handle_frame(&mut self, text: String) -> Vec<AppEvent> {
        self.handle_event(SessionEvent::Received(text))
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: E::Instant) -> Vec<AppEvent> {
        self.handle_event(SessionEvent::Tick { now })
    }

    /// The transport connected.
    pub fn handle_connected(&mut self) -> Vec<AppEvent> {
        self.handle_event(SessionEvent::Connected)
    }

    /// The transport was lost.
    pub fn handle_disconnected(&mut self) -> Vec<AppEvent> {
        self.handle_event(SessionEvent::Disconnected)
    }

    /// Take pending outgoing frames.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    fn handle_event(&mut self, event: SessionEvent<E::Instant>) -> Vec<AppEvent> {
        let result = self.session.handle(event);
        self.handle_session_result(result)
    }

    fn handle_session_result(
        &mut self,
        result: Result<Vec<SessionAction>, SessionError>,
    ) -> Vec<AppEvent> {
        match result {
            Ok(actions) => self.process_session_actions(actions),
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        }
    }

    fn process_session_actions(&mut self, actions: Vec<SessionAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                SessionAction::Send(event) => match event.encode() {
                    Ok(text) => self.outgoing.push(text),
                    Err(e) => {
                        warn!(event = event.name(), error = %e, "failed to encode outbound event");
                        events.push(AppEvent::Error { message: e.to_string() });
                    },
                },
                SessionAction::Render(intent) => events.push(AppEvent::Render(intent)),
                SessionAction::Log { message } => debug!(%message, "session"),
            }
        }

        events
    }
}
