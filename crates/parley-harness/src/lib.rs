//! Deterministic simulation harness for Parley testing.
//!
//! In-memory implementations of the environment, the server, and the I/O
//! driver for deterministic, reproducible tests of sessions and the app
//! runtime.
//!
//! # Cluster Testing
//!
//! [`TestCluster`] drives several sessions against one [`SimServer`]
//! synchronously, running every operation to quiescence.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for invariants
//! that hold after every event and [`InvariantRegistry::quiescent()`] once the
//! network is drained.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod invariants;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_server;

pub use cluster::{ClusterClient, TestCluster};
pub use invariants::{
    ActiveConversationKnown, ClientSnapshot, ConversationParticipants, ConversationSnapshot,
    Invariant, InvariantKind, InvariantRegistry, InvariantResult, SeenConvergence, SelfInPresence,
    SystemSnapshot, UnseenNeverActive, Violation,
};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_server::{
    ConnectionId, Delivery, HISTORY_CAP, SharedSimServer, SimNetwork, SimServer,
    create_shared_server,
};
