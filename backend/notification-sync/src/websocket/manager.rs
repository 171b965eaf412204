/// Push Connection Manager
///
/// Owns the lifecycle of one logical push connection:
/// - Idempotent connect gated on a session credential
/// - Heartbeat (ping) while connected
/// - Bounded automatic reconnection after transport loss
/// - Explicit teardown that cancels any pending reconnection
///
/// State machine:
///
/// ```text
/// Disconnected --connect()--> Connecting --open--> Connected
///      ^                          |                   |
///      +------ close/error -------+-------------------+
///      (reconnect after backoff while attempts remain)
/// ```
use super::listeners::ListenerRegistry;
use super::messages::{ClientFrame, PushFrame};
use super::transport::{Connector, TransportCommand, TransportEvent, TransportHandle};
use crate::config::PushConfig;
use crate::credentials::CredentialSource;
use crate::error::{Result, SyncError};
use crate::metrics;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Observable lifecycle events
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    StateChanged(ConnectionState),
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// No further automatic recovery until `connect()` is called again
    ReconnectExhausted { attempts: u32 },
    FrameDropped { reason: String },
}

/// Result of a `connect()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Started,
    /// Already connecting or connected; nothing was done
    AlreadyActive,
    /// No session credential; no socket was opened
    Unauthenticated,
}

struct Shared {
    state: ConnectionState,
    attempt_count: u32,
    /// Bumped on every connect/disconnect so a superseded driver cannot write state
    generation: u64,
    driver: Option<CancellationToken>,
    outbound: Option<mpsc::UnboundedSender<TransportCommand>>,
}

struct ManagerInner {
    config: PushConfig,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialSource>,
    listeners: ListenerRegistry,
    shared: Mutex<Shared>,
    events: broadcast::Sender<ConnectionEvent>,
}

enum PumpExit {
    Cancelled,
    Closed(Option<String>),
}

/// Manages the push connection of one session
///
/// Cheap to clone; all clones drive the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl ConnectionManager {
    pub fn new(
        config: PushConfig,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(ManagerInner {
                config,
                connector,
                credentials,
                listeners: ListenerRegistry::new(),
                shared: Mutex::new(Shared {
                    state: ConnectionState::Disconnected,
                    attempt_count: 0,
                    generation: 0,
                    driver: None,
                    outbound: None,
                }),
                events,
            }),
        }
    }

    /// Start connecting unless a connection is already in progress or open
    ///
    /// A pending reconnection timer is superseded and the connection is opened
    /// immediately. Must be called from within a tokio runtime.
    pub fn connect(&self) -> ConnectOutcome {
        let mut shared = self.inner.shared.lock();

        if matches!(
            shared.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!("connect() ignored, connection is {:?}", shared.state);
            return ConnectOutcome::AlreadyActive;
        }

        if self.inner.credentials.session_token().is_none() {
            warn!("No session credential, skipping push connection");
            return ConnectOutcome::Unauthenticated;
        }

        if let Some(pending) = shared.driver.take() {
            info!("Superseding pending reconnection with explicit connect");
            pending.cancel();
        }

        shared.generation += 1;
        let generation = shared.generation;
        let cancel = CancellationToken::new();
        shared.driver = Some(cancel.clone());
        shared.state = ConnectionState::Connecting;
        drop(shared);

        self.inner.emit(ConnectionEvent::StateChanged(ConnectionState::Connecting));
        tokio::spawn(run_driver(self.inner.clone(), generation, cancel));

        ConnectOutcome::Started
    }

    /// Tear the connection down from any state
    ///
    /// Closes the transport, clears every listener, resets the attempt counter
    /// and cancels a pending reconnection timer.
    pub fn disconnect(&self) {
        let mut shared = self.inner.shared.lock();
        shared.generation += 1;
        if let Some(driver) = shared.driver.take() {
            driver.cancel();
        }
        shared.outbound = None;
        shared.attempt_count = 0;
        let previous = std::mem::replace(&mut shared.state, ConnectionState::Disconnected);
        drop(shared);

        self.inner.listeners.clear();

        if previous != ConnectionState::Disconnected {
            self.inner
                .emit(ConnectionEvent::StateChanged(ConnectionState::Disconnected));
        }
        info!("Push connection torn down (was {:?})", previous);
    }

    /// Write a client frame on the open connection
    pub fn send(&self, frame: &ClientFrame) -> Result<()> {
        let shared = self.inner.shared.lock();
        match (&shared.state, &shared.outbound) {
            (ConnectionState::Connected, Some(outbound)) => outbound
                .send(TransportCommand::Send(frame.to_json()?))
                .map_err(|_| SyncError::NotConnected),
            _ => Err(SyncError::NotConnected),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Consecutive automatic reconnection attempts since the last open
    pub fn attempt_count(&self) -> u32 {
        self.inner.shared.lock().attempt_count
    }

    /// Whether a reconnection timer is pending
    pub fn reconnect_pending(&self) -> bool {
        let shared = self.inner.shared.lock();
        shared.state == ConnectionState::Disconnected && shared.driver.is_some()
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.inner.listeners
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }
}

impl ManagerInner {
    fn emit(&self, event: ConnectionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Set state if `generation` is still current
    fn transition(&self, generation: u64, state: ConnectionState) -> bool {
        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return false;
        }
        let changed = shared.state != state;
        shared.state = state;
        drop(shared);

        if changed {
            self.emit(ConnectionEvent::StateChanged(state));
        }
        true
    }

    fn on_open(&self, generation: u64, outbound: mpsc::UnboundedSender<TransportCommand>) -> bool {
        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return false;
        }
        shared.state = ConnectionState::Connected;
        shared.attempt_count = 0;
        shared.outbound = Some(outbound);
        drop(shared);

        info!("Push connection established to {}", self.config.url);
        self.emit(ConnectionEvent::StateChanged(ConnectionState::Connected));
        true
    }

    /// Move to Disconnected and compute the next backoff, if any remain
    fn schedule_reconnect(&self, generation: u64) -> Option<Duration> {
        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return None;
        }

        let was = std::mem::replace(&mut shared.state, ConnectionState::Disconnected);
        shared.outbound = None;

        let retry = &self.config.retry;
        let next = if retry.allows(shared.attempt_count) {
            shared.attempt_count += 1;
            retry
                .delay_for(shared.attempt_count)
                .map(|delay| (shared.attempt_count, delay))
        } else {
            None
        };

        if next.is_none() {
            shared.driver = None;
        }
        let attempts = shared.attempt_count;
        drop(shared);

        if was != ConnectionState::Disconnected {
            self.emit(ConnectionEvent::StateChanged(ConnectionState::Disconnected));
        }

        match next {
            Some((attempt, delay)) => {
                info!(
                    "Reconnecting push channel in {:?} (attempt {}/{})",
                    delay, attempt, retry.max_attempts
                );
                metrics::observe_reconnect_scheduled();
                self.emit(ConnectionEvent::ReconnectScheduled { attempt, delay });
                Some(delay)
            }
            None => {
                error!(
                    "Push channel gave up after {} reconnection attempts",
                    attempts
                );
                self.emit(ConnectionEvent::ReconnectExhausted { attempts });
                None
            }
        }
    }

    /// Stop without scheduling anything
    fn abandon(&self, generation: u64) {
        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return;
        }
        shared.driver = None;
        shared.outbound = None;
        let was = std::mem::replace(&mut shared.state, ConnectionState::Disconnected);
        drop(shared);

        if was != ConnectionState::Disconnected {
            self.emit(ConnectionEvent::StateChanged(ConnectionState::Disconnected));
        }
    }

    fn handle_text(&self, text: &str) {
        match PushFrame::from_json(text) {
            Ok(frame) => {
                metrics::observe_frame(&frame.event_type);
                let report = self.listeners.dispatch(&frame);
                debug!(
                    "Dispatched '{}' to {} listener(s), {} failed",
                    frame.event_type, report.delivered, report.failed
                );
            }
            Err(e) => {
                warn!("Dropping malformed push frame: {}", e);
                metrics::observe_dropped_frame();
                self.emit(ConnectionEvent::FrameDropped {
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Run an open transport until it closes or the driver is cancelled
    async fn pump(&self, mut handle: TransportHandle, cancel: &CancellationToken) -> PumpExit {
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    let _ = handle.outbound.send(TransportCommand::Close);
                    return PumpExit::Cancelled;
                }
                event = handle.inbound.recv() => match event {
                    Some(TransportEvent::Text(text)) => self.handle_text(&text),
                    Some(TransportEvent::Closed { reason }) => return PumpExit::Closed(reason),
                    None => return PumpExit::Closed(None),
                },
                // First tick fires immediately
                _ = heartbeat.tick() => {
                    let ping = match ClientFrame::ping().to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to encode ping frame: {}", e);
                            continue;
                        }
                    };
                    if handle.outbound.send(TransportCommand::Send(ping)).is_err() {
                        return PumpExit::Closed(Some("transport writer gone".to_string()));
                    }
                }
            }
        }
    }
}

async fn run_driver(inner: Arc<ManagerInner>, generation: u64, cancel: CancellationToken) {
    loop {
        let Some(token) = inner.credentials.session_token() else {
            warn!("Session credential no longer available, stopping push connection");
            inner.abandon(generation);
            return;
        };

        if !inner.transition(generation, ConnectionState::Connecting) {
            return;
        }

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = inner.connector.open(&inner.config.url, &token) => result,
        };

        match opened {
            Ok(handle) => {
                if !inner.on_open(generation, handle.outbound.clone()) {
                    let _ = handle.outbound.send(TransportCommand::Close);
                    return;
                }
                match inner.pump(handle, &cancel).await {
                    PumpExit::Cancelled => return,
                    PumpExit::Closed(reason) => warn!(
                        "Push connection closed: {}",
                        reason.as_deref().unwrap_or("no reason given")
                    ),
                }
            }
            Err(e) => warn!("Failed to open push connection: {}", e),
        }

        let Some(delay) = inner.schedule_reconnect(generation) else {
            return;
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Pending reconnection cancelled");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
