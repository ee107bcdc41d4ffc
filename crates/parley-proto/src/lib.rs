//! Parley protocol
//!
//! Wire format for the Parley chat protocol. Every message on the channel is
//! a JSON [`Envelope`] naming an event and carrying its payload. Payloads are
//! typed per event and validated on decode: a malformed or incomplete payload
//! is an error, never a partially-populated value.
//!
//! # Components
//!
//! - [`Envelope`]: Named event with an untyped JSON body
//! - [`InboundEvent`]: Events the server sends to clients
//! - [`OutboundEvent`]: Events clients send to the server
//! - [`Identity`], [`Room`], [`MessageId`]: Identifiers carried in payloads

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
pub mod errors;
mod ids;
pub mod payloads;

pub use envelope::Envelope;
pub use errors::{ProtocolError, Result};
pub use ids::{Identity, MessageId, Room};
pub use payloads::{InboundEvent, OutboundEvent};
