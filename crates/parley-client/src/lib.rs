//! Client
//!
//! Action-based chat session for the Parley protocol. Owns the trackers of
//! one identity in one room and reconciles them with the server's events.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and Action-Based patterns as
//! [`parley_core`]. It receives events ([`SessionEvent`]), processes them
//! through pure state machine logic, and returns actions ([`SessionAction`])
//! for the caller to execute.
//!
//! # Components
//!
//! - [`Session`]: Dispatcher owning presence, typing, room log, and private
//!   conversations
//! - [`SessionConfig`]: Typing debounce and identity announcement
//! - [`SessionEvent`]: Events fed into the session
//! - [`SessionAction`]: Actions produced by the session
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedClient`]: WebSocket connection handle
//! - [`transport::connect`]: Connect to a server

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod event;
mod session;

#[cfg(feature = "transport")]
pub mod transport;

pub use error::SessionError;
pub use event::{SessionAction, SessionEvent};
pub use parley_core::{Identity, MessageId, RenderIntent, Room, env::Environment};
pub use session::{Session, SessionConfig};
