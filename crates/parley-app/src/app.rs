//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the application completely decoupled from I/O and protocol
//! mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Owns the composer and turns submitted lines into commands or messages.
//! - Keeps the view model current by applying session render intents.
//! - Stores terminal dimensions to handle resize events.
//! - Tracks high-level connection state for UI feedback.

use std::collections::BTreeSet;

use parley_core::{Identity, RenderIntent, Room};

use crate::{
    AppAction, AppEvent, Composer, ConnectionState, KeyInput, LogLine, PrivateView,
    commands::{self, Command},
};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Local identity.
    me: Identity,
    /// Joined room.
    room: Room,
    /// Connection state.
    state: ConnectionState,
    /// Message being written.
    composer: Composer,
    /// Room log, oldest first.
    log: Vec<LogLine>,
    /// Online users in server order.
    users: Vec<Identity>,
    /// Peers with unseen private messages.
    unseen: BTreeSet<Identity>,
    /// Typing indicator. `None` if nobody is typing.
    typing_label: Option<String>,
    /// Displayed private conversation. `None` shows the room.
    conversation: Option<PrivateView>,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Create a new App for `me` in `room`.
    pub fn new(me: Identity, room: Room) -> Self {
        Self {
            me,
            room,
            state: ConnectionState::Disconnected,
            composer: Composer::new(),
            log: Vec::new(),
            users: Vec::new(),
            unseen: BTreeSet::new(),
            typing_label: None,
            conversation: None,
            terminal_size: (80, 24),
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => vec![],
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::Connecting => {
                self.state = ConnectionState::Connecting;
                self.status_message = Some("Connecting...".into());
                vec![AppAction::Render]
            },
            AppEvent::Connected => {
                self.state = ConnectionState::Connected;
                self.status_message = Some(format!("Joined {}", self.room));
                vec![AppAction::Render]
            },
            AppEvent::Disconnected => {
                self.state = ConnectionState::Disconnected;
                self.status_message = None;
                vec![AppAction::Render]
            },
            AppEvent::Render(intent) => {
                self.apply(intent);
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                self.status_message = Some(format!("Error: {message}"));
                vec![AppAction::Render]
            },
        }
    }

    fn handle_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        match key {
            KeyInput::Enter => self.submit(),
            KeyInput::Esc => match self.conversation {
                Some(_) => vec![AppAction::CloseConversation, AppAction::Render],
                None => vec![AppAction::Quit],
            },
            KeyInput::Tab => match self.unseen.first() {
                Some(peer) => vec![AppAction::OpenConversation { peer: peer.clone() }],
                None => vec![],
            },
            KeyInput::Up | KeyInput::Down => vec![],
            KeyInput::Char(_)
            | KeyInput::Backspace
            | KeyInput::Delete
            | KeyInput::Left
            | KeyInput::Right
            | KeyInput::Home
            | KeyInput::End => {
                let changed = self.composer.edit(key);
                let mut actions = Vec::new();
                let composing_command = self.composer.buffer().starts_with('/');
                if changed && self.conversation.is_none() && !composing_command {
                    actions.push(AppAction::LocalInput);
                }
                actions.push(AppAction::Render);
                actions
            },
        }
    }

    fn submit(&mut self) -> Vec<AppAction> {
        let line = self.composer.take();
        match commands::parse(&line) {
            Command::OpenConversation { peer } => {
                vec![AppAction::OpenConversation { peer }, AppAction::Render]
            },
            Command::CloseConversation => {
                if self.conversation.is_none() {
                    self.status_message = Some("No private conversation open".into());
                    return vec![AppAction::Render];
                }
                vec![AppAction::CloseConversation, AppAction::Render]
            },
            Command::Quit => vec![AppAction::Quit],
            Command::Users => {
                self.status_message = Some(format!("{} online", self.users.len()));
                vec![AppAction::Render]
            },
            Command::Message { text } => {
                let action = match &self.conversation {
                    Some(view) => AppAction::SendPrivate { peer: view.peer.clone(), text },
                    None => AppAction::SubmitPublic { text },
                };
                vec![action, AppAction::Render]
            },
            Command::Unknown { input } => {
                self.status_message = Some(format!("Unknown command: {input}"));
                vec![AppAction::Render]
            },
            Command::InvalidArgs { command, error } => {
                self.status_message = Some(format!("{command}: {error}"));
                vec![AppAction::Render]
            },
        }
    }

    /// Apply a session render intent to the view model.
    fn apply(&mut self, intent: RenderIntent) {
        match intent {
            RenderIntent::PublicLogReplaced { messages } => {
                self.log = messages.into_iter().map(LogLine::Chat).collect();
            },
            RenderIntent::PublicMessageAppended(message) => self.log.push(LogLine::Chat(message)),
            RenderIntent::SystemNotice { text } => self.log.push(LogLine::System(text)),
            RenderIntent::PresenceReplaced { users, .. } => self.users = users,
            RenderIntent::TypingChanged { label } => self.typing_label = label,
            RenderIntent::ConversationOpened { peer, messages } => {
                self.unseen.remove(&peer);
                self.status_message = Some(format!("Private conversation with {peer}"));
                self.conversation = Some(PrivateView::new(peer, messages));
            },
            RenderIntent::ConversationClosed { peer } => {
                if self.is_viewing(&peer) {
                    self.conversation = None;
                    self.status_message = None;
                }
            },
            RenderIntent::ConversationReplaced { peer, messages } => {
                if let Some(view) = self.conversation.as_mut().filter(|v| v.peer == peer) {
                    view.messages = messages;
                }
            },
            RenderIntent::PrivateMessageAppended { peer, message } => {
                if let Some(view) = self.conversation.as_mut().filter(|v| v.peer == peer) {
                    view.messages.push(message);
                }
            },
            RenderIntent::SeenUpdated { peer, id } => {
                if let Some(view) = self.conversation.as_mut().filter(|v| v.peer == peer) {
                    view.mark_seen(&id);
                }
            },
            RenderIntent::UnseenMarker { peer, unseen } => {
                if unseen {
                    self.unseen.insert(peer);
                } else {
                    self.unseen.remove(&peer);
                }
            },
            RenderIntent::SessionReset => {
                self.log.clear();
                self.users.clear();
                self.typing_label = None;
            },
        }
    }

    fn is_viewing(&self, peer: &Identity) -> bool {
        self.conversation.as_ref().is_some_and(|v| &v.peer == peer)
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Local identity.
    pub fn me(&self) -> &Identity {
        &self.me
    }

    /// Joined room.
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    /// Message being written.
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Room log, oldest first.
    pub fn log(&self) -> &[LogLine] {
        &self.log
    }

    /// Online users in server order.
    pub fn users(&self) -> &[Identity] {
        &self.users
    }

    /// Peers with unseen private messages.
    pub fn unseen(&self) -> &BTreeSet<Identity> {
        &self.unseen
    }

    /// Typing indicator. `None` if nobody is typing.
    pub fn typing_label(&self) -> Option<&str> {
        self.typing_label.as_deref()
    }

    /// Displayed private conversation. `None` if the room is shown.
    pub fn conversation(&self) -> Option<&PrivateView> {
        self.conversation.as_ref()
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}
