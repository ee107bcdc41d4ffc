//! Terminal-agnostic keyboard input and the message composer.

/// Keyboard input abstraction.
///
/// Decouples application logic from terminal libraries (crossterm, termion,
/// etc.) enabling deterministic simulation testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key (delete character before cursor).
    Backspace,
    /// Delete key (delete character at cursor).
    Delete,
    /// Tab key (jump to the next conversation with unseen messages).
    Tab,
    /// Escape key (close conversation, or quit).
    Esc,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Up arrow key.
    Up,
    /// Down arrow key.
    Down,
    /// Home key (cursor to start).
    Home,
    /// End key (cursor to end).
    End,
}

/// Text buffer with a cursor.
///
/// The cursor is a byte offset that always sits on a character boundary, so
/// multi-byte input edits cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    buffer: String,
    cursor: usize,
}

impl Composer {
    /// Create an empty composer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Cursor position as a byte offset into [`Self::buffer`].
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cursor position in characters, for display.
    pub fn cursor_column(&self) -> usize {
        self.buffer[..self.cursor].chars().count()
    }

    /// Apply an editing key.
    ///
    /// Returns `true` if the text changed. Cursor movement alone returns
    /// `false`; non-editing keys are ignored.
    pub fn edit(&mut self, key: KeyInput) -> bool {
        match key {
            KeyInput::Char(c) => {
                self.buffer.insert(self.cursor, c);
                self.cursor += c.len_utf8();
                true
            },
            KeyInput::Backspace => match self.prev_boundary() {
                Some(prev) => {
                    self.buffer.remove(prev);
                    self.cursor = prev;
                    true
                },
                None => false,
            },
            KeyInput::Delete => {
                if self.cursor < self.buffer.len() {
                    self.buffer.remove(self.cursor);
                    true
                } else {
                    false
                }
            },
            KeyInput::Left => {
                if let Some(prev) = self.prev_boundary() {
                    self.cursor = prev;
                }
                false
            },
            KeyInput::Right => {
                if let Some(c) = self.buffer[self.cursor..].chars().next() {
                    self.cursor += c.len_utf8();
                }
                false
            },
            KeyInput::Home => {
                self.cursor = 0;
                false
            },
            KeyInput::End => {
                self.cursor = self.buffer.len();
                false
            },
            KeyInput::Enter | KeyInput::Tab | KeyInput::Esc | KeyInput::Up | KeyInput::Down => {
                false
            },
        }
    }

    /// Take the text, leaving the composer empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.buffer)
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.buffer[..self.cursor].char_indices().next_back().map(|(i, _)| i)
    }
}
