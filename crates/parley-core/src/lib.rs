//! Parley core
//!
//! Client-side state reconciliation for Parley chat. Turns the stream of
//! server events into a consistent view of the room and private
//! conversations, and produces the outbound signaling that view requires
//! (typing announcements, seen acknowledgments).
//!
//! # Architecture
//!
//! Every tracker is a Sans-IO state machine: operations take their inputs
//! (including the current time) as arguments and return [`TrackerAction`]s
//! for the caller to execute. Trackers own their state exclusively and never
//! reach into each other.
//!
//! # Components
//!
//! - [`PresenceTracker`]: Online users of the joined room
//! - [`TypingAggregator`]: Remote typing indicators and local typing debounce
//! - [`PublicLog`]: Room message history
//! - [`PrivateConversationManager`]: Per-peer private conversations
//! - [`env::Environment`]: Time abstraction for deterministic simulation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod action;
pub mod env;
pub mod error;
pub mod presence;
pub mod private;
pub mod public_log;
pub mod types;
pub mod typing;

pub use action::{RenderIntent, TrackerAction};
pub use error::ConversationError;
pub use parley_proto::{Identity, MessageId, Room};
pub use presence::PresenceTracker;
pub use private::PrivateConversationManager;
pub use public_log::PublicLog;
pub use types::{Conversation, ConversationPhase, PrivateMessage, PublicMessage};
pub use typing::{DEFAULT_TYPING_DEBOUNCE, SEVERAL_TYPING_THRESHOLD, TypingAggregator};
