//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: Protocol bridge to the Session
//! - [`Driver`]: Platform-specific I/O

use parley_client::{Identity, Room, SessionConfig};
use parley_core::env::Environment;
use tracing::{debug, info};

use crate::{App, AppAction, AppEvent, Bridge, Driver};

/// Upper bound on server frames handled per cycle, so input stays responsive
/// under a flood.
const MAX_FRAMES_PER_CYCLE: usize = 64;

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment supplying the session's clock
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
    server_url: String,
    connected: bool,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Create a new runtime with the given driver and environment.
    pub fn new(
        driver: D,
        env: E,
        me: Identity,
        room: Room,
        config: SessionConfig,
        server_url: String,
    ) -> Self {
        let app = App::new(me.clone(), room.clone());
        let bridge = Bridge::new(env, me, room, config);
        Self { driver, app, bridge, server_url, connected: false }
    }

    /// Run the main event loop.
    ///
    /// This is the core orchestration loop that:
    /// 1. Polls for input events from the driver
    /// 2. Receives frames from the server
    /// 3. Processes actions and events between App and Bridge
    /// 4. Sends outgoing frames through the driver
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;
        self.connect().await?;

        loop {
            let should_quit = self.step().await?;
            if should_quit {
                break;
            }
        }

        self.driver.stop();
        Ok(())
    }

    /// Connect to the server and join the room.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot connect.
    pub async fn connect(&mut self) -> Result<(), D::Error> {
        let actions = self.app.handle(AppEvent::Connecting);
        self.process_actions(actions).await?;

        self.driver.connect(&self.server_url).await?;
        self.connected = true;
        info!(url = %self.server_url, "connected");

        let mut events = vec![AppEvent::Connected];
        events.extend(self.bridge.handle_connected());
        self.send_outgoing_frames().await?;
        self.process_bridge_events(events).await?;
        Ok(())
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        if let Some(event) = self.driver.poll_event().await? {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }

        for _ in 0..MAX_FRAMES_PER_CYCLE {
            let Some(frame) = self.driver.recv_frame().await else { break };
            let events = self.bridge.handle_frame(frame);
            self.send_outgoing_frames().await?;
            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        }

        if self.connected && !self.driver.is_connected() {
            self.connected = false;
            info!("connection lost");
            let mut events = vec![AppEvent::Disconnected];
            events.extend(self.bridge.handle_disconnected());
            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        }

        let now = self.driver.now();
        let events = self.bridge.handle_tick(now);
        self.send_outgoing_frames().await?;
        self.process_bridge_events(events).await
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),

                    // Session operations go through the bridge
                    AppAction::LocalInput
                    | AppAction::SubmitPublic { .. }
                    | AppAction::OpenConversation { .. }
                    | AppAction::CloseConversation
                    | AppAction::SendPrivate { .. } => {
                        let events = self.bridge.process_app_action(action);
                        for event in events {
                            let new_actions = self.app.handle(event);
                            pending_actions.extend(new_actions);
                        }
                        self.send_outgoing_frames().await?;
                    },
                }
            }
        }
        Ok(false)
    }

    /// Process events from Bridge back to App.
    async fn process_bridge_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        for event in events {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Send all pending outgoing frames to the server.
    async fn send_outgoing_frames(&mut self) -> Result<(), D::Error> {
        let frames = self.bridge.take_outgoing();
        if !self.driver.is_connected() {
            if !frames.is_empty() {
                debug!(count = frames.len(), "dropping frames while disconnected");
            }
            return Ok(());
        }
        for frame in frames {
            self.driver.send_frame(frame).await?;
        }
        Ok(())
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the App
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    /// Get a reference to the Bridge
    pub fn bridge(&self) -> &Bridge<E> {
        &self.bridge
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }
}
