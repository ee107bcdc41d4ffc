//! Test cluster simulation for convergence testing.
//!
//! Drives several [`Session`]s against one in-memory [`SimNetwork`]
//! synchronously. Every operation runs to quiescence: frames are delivered
//! and answered until no connection has anything queued, which makes
//! property tests over multi-client interleavings deterministic.

use parley_client::{
    Identity, Room, Session, SessionAction, SessionConfig, SessionError, SessionEvent,
};
use parley_core::env::Environment;
use tracing::warn;

use crate::{
    SimEnv,
    invariants::{ClientSnapshot, SystemSnapshot},
    sim_env::SimInstant,
    sim_server::{ConnectionId, SimNetwork},
};

/// Upper bound on delivery rounds in [`TestCluster::settle`].
const MAX_SETTLE_ROUNDS: usize = 10_000;

/// One simulated client.
pub struct ClusterClient {
    /// Server connection, `None` while disconnected.
    pub connection: Option<ConnectionId>,
    /// The client's session.
    pub session: Session<SimInstant>,
}

/// Simulated cluster of clients sharing one server and one virtual clock.
pub struct TestCluster {
    env: SimEnv,
    network: SimNetwork,
    clients: Vec<ClusterClient>,
}

impl TestCluster {
    /// Create a cluster with one disconnected client per identity, all
    /// configured for `room`.
    pub fn new(identities: Vec<Identity>, room: &Room) -> Self {
        let clients = identities
            .into_iter()
            .map(|me| ClusterClient {
                connection: None,
                session: Session::new(me, room.clone(), SessionConfig::default()),
            })
            .collect();

        Self { env: SimEnv::new(), network: SimNetwork::default(), clients }
    }

    /// Shared virtual clock.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// The simulated network and server.
    pub fn network(&self) -> &SimNetwork {
        &self.network
    }

    /// Number of clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether the cluster has no clients.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Session of client `idx`.
    pub fn session(&self, idx: usize) -> &Session<SimInstant> {
        &self.clients[idx].session
    }

    /// Connect client `idx` and run to quiescence.
    pub fn connect(&mut self, idx: usize) {
        if self.clients[idx].connection.is_some() {
            return;
        }
        let me = self.clients[idx].session.me().clone();
        self.clients[idx].connection = Some(self.network.connect(me));
        // Connected never fails.
        let _ = self.apply(idx, SessionEvent::Connected);
    }

    /// Connect every client in order.
    pub fn connect_all(&mut self) {
        for idx in 0..self.clients.len() {
            self.connect(idx);
        }
    }

    /// Drop client `idx`'s connection and run to quiescence.
    pub fn disconnect(&mut self, idx: usize) {
        let Some(connection) = self.clients[idx].connection.take() else { return };
        self.network.disconnect(connection);
        let _ = self.apply(idx, SessionEvent::Disconnected);
    }

    /// Feed an event to client `idx`, send what it emits, and run to
    /// quiescence.
    ///
    /// # Errors
    ///
    /// Returns the session's error; nothing is sent in that case.
    pub fn apply(
        &mut self,
        idx: usize,
        event: SessionEvent<SimInstant>,
    ) -> Result<(), SessionError> {
        let actions = self.clients[idx].session.handle(event)?;
        self.send_actions(idx, actions);
        self.settle();
        Ok(())
    }

    /// Advance the clock and tick every client.
    pub fn advance(&mut self, duration: std::time::Duration) {
        self.env.advance(duration);
        let now = self.env.now();
        for idx in 0..self.clients.len() {
            let _ = self.apply(idx, SessionEvent::Tick { now });
        }
    }

    /// Deliver queued frames until no connection has any left.
    pub fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            if !self.network.has_pending() {
                return;
            }
            for idx in 0..self.clients.len() {
                let Some(connection) = self.clients[idx].connection else { continue };
                while let Some(frame) = self.network.recv(connection) {
                    match self.clients[idx].session.handle(SessionEvent::Received(frame)) {
                        Ok(actions) => self.send_actions(idx, actions),
                        Err(e) => warn!(client = idx, error = %e, "frame rejected"),
                    }
                }
            }
        }
        warn!("cluster did not settle");
    }

    /// Snapshot of every client for invariant checking.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot::from_clients(
            self.clients.iter().map(|c| ClientSnapshot::from_session(&c.session)).collect(),
        )
    }

    fn send_actions(&mut self, idx: usize, actions: Vec<SessionAction>) {
        let Some(connection) = self.clients[idx].connection else { return };
        for action in actions {
            if let SessionAction::Send(event) = action {
                match event.encode() {
                    Ok(frame) => self.network.send(connection, &frame),
                    Err(e) => warn!(client = idx, error = %e, "failed to encode event"),
                }
            }
        }
    }
}
