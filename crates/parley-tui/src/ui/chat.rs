//! Chat area
//!
//! Displays the room log, or the open private conversation.

use parley_app::{App, LogLine};
use parley_core::{Identity, PrivateMessage, PublicMessage};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

const BORDER_SIZE: u16 = 2;
const SEEN_MARKER: &str = " (seen)";

/// Render the chat area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let (title, items) = match app.conversation() {
        Some(view) => (
            format!(" @{} ", view.peer),
            view.messages.iter().map(|m| private_line(app.me(), m)).collect::<Vec<_>>(),
        ),
        None => (
            format!(" #{} ", app.room()),
            app.log().iter().map(|line| log_line(app.me(), line)).collect(),
        ),
    };

    let mut block = Block::default().borders(Borders::ALL).title(title);
    if let Some(label) = app.typing_label() {
        block = block.title_bottom(Line::from(Span::styled(
            format!(" {label} "),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let skip = items.len().saturating_sub(visible_height);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    let list = List::new(visible_items).block(block);

    frame.render_widget(list, area);
}

fn sender_span(me: &Identity, sender: &Identity) -> Span<'static> {
    let color = if sender == me { Color::Yellow } else { Color::Green };
    Span::styled(sender.to_string(), Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn log_line(me: &Identity, line: &LogLine) -> ListItem<'static> {
    match line {
        LogLine::Chat(PublicMessage { sender, text }) => ListItem::new(Line::from(vec![
            sender_span(me, sender),
            Span::raw(": "),
            Span::raw(text.clone()),
        ])),
        LogLine::System(text) => ListItem::new(Line::from(Span::styled(
            text.clone(),
            Style::default().fg(Color::DarkGray),
        ))),
    }
}

fn private_line(me: &Identity, message: &PrivateMessage) -> ListItem<'static> {
    let mut spans =
        vec![sender_span(me, &message.sender), Span::raw(": "), Span::raw(message.text.clone())];

    // Only the author cares whether the peer has read it.
    if message.seen && &message.sender == me {
        spans.push(Span::styled(SEEN_MARKER, Style::default().fg(Color::Cyan)));
    }

    ListItem::new(Line::from(spans))
}
