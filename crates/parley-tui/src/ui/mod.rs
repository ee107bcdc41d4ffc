//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! returning widget trees.

mod chat;
mod input;
mod status;
mod users;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
};

use crate::App;

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    const MAIN_AREA_MIN_HEIGHT: u16 = 3;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MAIN_AREA_MIN_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [main_area, input_area, status_area] = chunks.as_ref() else {
        return;
    };

    render_main_area(frame, app, *main_area);
    input::render(frame, app, *input_area);
    status::render(frame, app, *status_area);
}

/// Render the main area (chat + users sidebar).
fn render_main_area(frame: &mut Frame, app: &App, area: Rect) {
    const USER_SIDEBAR_WIDTH: u16 = 18;
    const CHAT_AREA_MIN_WIDTH: u16 = 20;

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(CHAT_AREA_MIN_WIDTH), Constraint::Length(USER_SIDEBAR_WIDTH)])
        .split(area);

    let [chat_area, users_area] = chunks.as_ref() else {
        return;
    };

    chat::render(frame, app, *chat_area);
    users::render(frame, app, *users_area);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parley_core::{Identity, MessageId, PrivateMessage, PublicMessage, RenderIntent, Room};
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::{AppEvent, KeyInput};

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn app() -> App {
        let mut app = App::new(id("alice"), Room::new("General").unwrap());
        app.handle(AppEvent::Connected);
        app
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        let symbols: Vec<&str> = buffer.content.iter().map(|cell| cell.symbol()).collect();
        symbols.chunks(width).map(|row| row.concat()).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn renders_room_log_and_users() {
        let mut app = app();
        app.handle(AppEvent::Render(RenderIntent::PresenceReplaced {
            users: vec![id("alice"), id("bob")],
            count: 2,
        }));
        app.handle(AppEvent::Render(RenderIntent::PublicMessageAppended(PublicMessage {
            sender: id("bob"),
            text: "hello there".into(),
        })));

        let screen = draw(&app);

        assert!(screen.contains("#General"));
        assert!(screen.contains("bob: hello there"));
        assert!(screen.contains("Users (2)"));
        assert!(screen.contains("Connected"));
    }

    #[test]
    fn renders_typing_label_and_unseen_marker() {
        let mut app = app();
        app.handle(AppEvent::Render(RenderIntent::PresenceReplaced {
            users: vec![id("alice"), id("bob")],
            count: 2,
        }));
        app.handle(AppEvent::Render(RenderIntent::TypingChanged {
            label: Some("bob is typing...".into()),
        }));
        app.handle(AppEvent::Render(RenderIntent::UnseenMarker { peer: id("bob"), unseen: true }));

        let screen = draw(&app);

        assert!(screen.contains("bob is typing..."));
        assert!(screen.contains("bob *"));
    }

    #[test]
    fn renders_private_conversation_with_seen_ticks() {
        let mut app = app();
        let message = PrivateMessage {
            id: MessageId::Number(1),
            sender: id("alice"),
            recipient: id("bob"),
            text: "secret".into(),
            seen: true,
        };
        app.handle(AppEvent::Render(RenderIntent::ConversationOpened {
            peer: id("bob"),
            messages: vec![message],
        }));

        let screen = draw(&app);

        assert!(screen.contains("@bob"));
        assert!(screen.contains("alice: secret (seen)"));
    }

    #[test]
    fn renders_composer_text() {
        let mut app = app();
        for c in "hey".chars() {
            app.handle(AppEvent::Key(KeyInput::Char(c)));
        }

        assert!(draw(&app).contains("> hey"));
    }
}
