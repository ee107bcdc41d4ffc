//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as `TerminalDriver` but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`parley_app::Runtime`] orchestration code runs in both production and
//! simulation.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use parley_app::{App, AppEvent, Driver, KeyInput};
use parley_client::{Identity, Session};
use parley_core::env::Environment;

use crate::{
    SimEnv,
    invariants::{ClientSnapshot, InvariantRegistry, SystemSnapshot},
    sim_env::SimInstant,
    sim_server::{ConnectionId, SharedSimServer},
};

/// Error type for simulation driver.
#[derive(Debug, Clone, thiserror::Error)]
#[error("SimDriverError: {0}")]
pub struct SimDriverError(pub String);

/// Shared state for event injection.
///
/// This allows injection from outside async contexts.
#[derive(Default)]
struct SharedState {
    pending_events: VecDeque<AppEvent>,
    sent_frames: Vec<String>,
    connection: Option<ConnectionId>,
    render_count: usize,
}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] trait so the same [`parley_app::Runtime`]
/// orchestration code runs in both production TUI and simulation tests.
/// Frames go through a [`SharedSimServer`], so several drivers sharing one
/// server talk to each other.
#[derive(Clone)]
pub struct SimDriver {
    username: Identity,
    env: SimEnv,
    server: SharedSimServer,
    state: Arc<Mutex<SharedState>>,
    invariants: Arc<Option<InvariantRegistry>>,
}

impl SimDriver {
    /// Create a driver that logs in as `username` on `server`.
    pub fn new(username: Identity, env: SimEnv, server: SharedSimServer) -> Self {
        Self {
            username,
            env,
            server,
            state: Arc::new(Mutex::new(SharedState::default())),
            invariants: Arc::new(None),
        }
    }

    /// Enable invariant checking.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Arc::new(Some(registry));
        self
    }

    fn state(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inject an `AppEvent` for processing.
    pub fn inject_event(&self, event: AppEvent) {
        self.state().pending_events.push_back(event);
    }

    /// Inject key presses that type `text`.
    pub fn inject_text(&self, text: &str) {
        let mut state = self.state();
        state.pending_events.extend(text.chars().map(|c| AppEvent::Key(KeyInput::Char(c))));
    }

    /// Inject a tick event.
    pub fn inject_tick(&self) {
        self.inject_event(AppEvent::Tick);
    }

    /// Drop the connection as if the network failed.
    pub fn drop_connection(&self) {
        let connection = self.state().connection.take();
        if let Some(connection) = connection {
            self.server.lock().unwrap_or_else(PoisonError::into_inner).disconnect(connection);
        }
    }

    /// Take every frame sent so far.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.state().sent_frames)
    }

    /// Number of times the app was rendered.
    pub fn render_count(&self) -> usize {
        self.state().render_count
    }

    /// Check if there are pending events or frames to process.
    pub fn has_pending(&self) -> bool {
        let state = self.state();
        if !state.pending_events.is_empty() {
            return true;
        }
        let network = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        state.connection.is_some() && network.has_pending()
    }

    /// Check invariants against a session's state.
    pub fn check_invariants<I>(&self, session: &Session<I>, context: &str)
    where
        I: Copy + Ord + Send + Sync + std::ops::Sub<Output = std::time::Duration>,
    {
        if let Some(registry) = self.invariants.as_ref() {
            let snapshot = SystemSnapshot::single(ClientSnapshot::from_session(session));
            registry.assert_all(&snapshot, context);
        }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        Ok(self.state().pending_events.pop_front())
    }

    async fn send_frame(&mut self, frame: String) -> Result<(), Self::Error> {
        let connection = {
            let mut state = self.state();
            state.sent_frames.push(frame.clone());
            state.connection
        };
        let Some(connection) = connection else {
            return Err(SimDriverError("not connected".into()));
        };
        self.server.lock().unwrap_or_else(PoisonError::into_inner).send(connection, &frame);
        Ok(())
    }

    async fn recv_frame(&mut self) -> Option<String> {
        let connection = self.state().connection?;
        self.server.lock().unwrap_or_else(PoisonError::into_inner).recv(connection)
    }

    async fn connect(&mut self, _url: &str) -> Result<(), Self::Error> {
        let connection = self
            .server
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .connect(self.username.clone());
        self.state().connection = Some(connection);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state().connection.is_some()
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn render(&mut self, _app: &App) -> Result<(), Self::Error> {
        self.state().render_count += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.drop_connection();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sim_server::create_shared_server;

    fn driver() -> SimDriver {
        SimDriver::new(Identity::new("alice").unwrap(), SimEnv::new(), create_shared_server())
    }

    #[test]
    fn inject_event_queues_event() {
        let driver = driver();
        driver.inject_event(AppEvent::Tick);

        assert!(driver.has_pending());
    }

    #[tokio::test]
    async fn poll_event_pops_in_order() {
        let mut driver = driver();
        driver.inject_text("ab");

        assert_eq!(driver.poll_event().await.unwrap(), Some(AppEvent::Key(KeyInput::Char('a'))));
        assert_eq!(driver.poll_event().await.unwrap(), Some(AppEvent::Key(KeyInput::Char('b'))));
        assert_eq!(driver.poll_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn send_requires_connection() {
        let mut driver = driver();
        assert!(driver.send_frame("{}".into()).await.is_err());

        driver.connect("ws://sim").await.unwrap();
        assert!(driver.is_connected());
        driver.send_frame(r#"{"event":"join","data":{"room":"General"}}"#.into()).await.unwrap();

        assert_eq!(driver.take_sent().len(), 2);
        assert!(driver.recv_frame().await.is_some());
    }

    #[tokio::test]
    async fn drop_connection_disconnects() {
        let mut driver = driver();
        driver.connect("ws://sim").await.unwrap();

        driver.drop_connection();

        assert!(!driver.is_connected());
        assert_eq!(driver.recv_frame().await, None);
    }
}
