//! Users sidebar
//!
//! Displays the room's users with unseen-message indicators.

use parley_app::App;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

const ACTIVE_PREFIX: &str = ">";
const INACTIVE_PREFIX: &str = " ";
const UNSEEN_MARKER: &str = " *";
const EMPTY_MARKER: &str = "";

enum UserDisplayState {
    Active,
    Unseen,
    Me,
    Normal,
}

/// Render the users sidebar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let active_peer = app.conversation().map(|view| &view.peer);

    let items: Vec<ListItem> = app
        .users()
        .iter()
        .map(|user| {
            let state = if active_peer == Some(user) {
                UserDisplayState::Active
            } else if app.unseen().contains(user) {
                UserDisplayState::Unseen
            } else if user == app.me() {
                UserDisplayState::Me
            } else {
                UserDisplayState::Normal
            };

            let (prefix, suffix, style) = match state {
                UserDisplayState::Active => (
                    ACTIVE_PREFIX,
                    EMPTY_MARKER,
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                UserDisplayState::Unseen => {
                    (INACTIVE_PREFIX, UNSEEN_MARKER, Style::default().fg(Color::Cyan))
                },
                UserDisplayState::Me => {
                    (INACTIVE_PREFIX, EMPTY_MARKER, Style::default().add_modifier(Modifier::BOLD))
                },
                UserDisplayState::Normal => (INACTIVE_PREFIX, EMPTY_MARKER, Style::default()),
            };

            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(user.to_string(), style),
                Span::styled(suffix, Style::default().fg(Color::Red)),
            ]))
        })
        .collect();

    let block =
        Block::default().borders(Borders::ALL).title(format!(" Users ({}) ", app.users().len()));
    let list = List::new(items).block(block);

    frame.render_widget(list, area);
}
