//! Application input events.
//!
//! This module defines [`AppEvent`], the set of inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from two distinct sources:
//! - User interactions (Keyboard, Resize) and system ticks.
//! - Session output translated by the [`crate::Bridge`].

use parley_core::RenderIntent;

use crate::KeyInput;

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Connection in progress.
    Connecting,

    /// Connected to server.
    Connected,

    /// Connection lost.
    Disconnected,

    /// Presentation update from the session.
    Render(RenderIntent),

    /// Error occurred.
    Error {
        /// Error description.
        message: String,
    },
}
