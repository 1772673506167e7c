//! Relay connection lifecycle.
//!
//! [`ConnectionManager`] owns the transport, tracks connection status and
//! drives reconnection with a fixed delay and a bounded number of attempts.
//! It never sleeps itself: a pending reconnect is exposed as a deadline that
//! the event loop waits on before calling
//! [`ConnectionManager::on_reconnect_timer`].

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::config::WsConfig;
use super::error::WsError;
use super::messages::ClientMessage;
use super::transport::{
    ConnectionId, Transport, TransportEvent, TransportEventKind, POLICY_VIOLATION_CLOSE_CODE,
};
use crate::metrics::SessionMetrics;

/// Connection status shown to the teacher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Attempt in progress or scheduled.
    Connecting,
    /// Connected to the relay.
    Connected,
    /// Not connected.
    Disconnected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Label shown once the reconnect budget is exhausted.
pub const GAVE_UP_LABEL: &str = "Reconnect Failed";

/// Result of asking for a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// A timer was armed for this attempt number.
    Scheduled {
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// A timer is already pending.
    AlreadyPending,
    /// Connection is open; nothing to do.
    NotNeeded,
    /// Automatic reconnection was disabled by [`ConnectionManager::halt`].
    Halted,
    /// Attempt budget exhausted.
    GaveUp,
}

/// What a transport event meant to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Event belonged to a superseded connection.
    Ignored,
    /// Connection opened and the teacher identified itself.
    Opened,
    /// Text frame for the session to parse.
    Frame(String),
    /// Transport error; status changed only.
    Errored,
    /// Connection closed; students should be marked disconnected.
    Closed(ReconnectOutcome),
}

/// Relay connection manager.
pub struct ConnectionManager<T> {
    config: WsConfig,
    transport: T,
    status: ConnectionStatus,
    label: String,
    current: Option<ConnectionId>,
    attempts: u32,
    reconnect_at: Option<Instant>,
    halted: bool,
    gave_up: bool,
    metrics: Arc<SessionMetrics>,
}

impl<T> std::fmt::Debug for ConnectionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.config.url)
            .field("status", &self.status)
            .field("label", &self.label)
            .field("attempts", &self.attempts)
            .field("halted", &self.halted)
            .field("gave_up", &self.gave_up)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ConnectionManager<T> {
    /// Creates a manager over the given transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: WsConfig,
        transport: T,
        metrics: Arc<SessionMetrics>,
    ) -> Result<Self, WsError> {
        config.validate()?;

        Ok(Self {
            config,
            transport,
            status: ConnectionStatus::Disconnected,
            label: "Disconnected".to_string(),
            current: None,
            attempts: 0,
            reconnect_at: None,
            halted: false,
            gave_up: false,
            metrics,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Returns the status label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the number of reconnect attempts since the last open.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns true if the reconnect budget is spent.
    #[must_use]
    pub const fn gave_up(&self) -> bool {
        self.gave_up
    }

    /// Returns true once automatic reconnection has been disabled.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Returns when the pending reconnect should fire.
    #[must_use]
    pub const fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    fn set_status(&mut self, status: ConnectionStatus, label: impl Into<String>) {
        self.status = status;
        self.label = label.into();
    }

    /// Opens a connection unless one is open or in progress.
    ///
    /// Cancels any pending reconnect timer. Returns true if an attempt was
    /// started.
    pub fn connect(&mut self) -> bool {
        self.reconnect_at = None;

        if self.current.is_some()
            && matches!(
                self.status,
                ConnectionStatus::Connected | ConnectionStatus::Connecting
            )
        {
            info!("Connection already open or connecting");
            return false;
        }

        self.set_status(ConnectionStatus::Connecting, "Connecting...");
        info!("Attempting connection to {}", self.config.url);

        match self.transport.start(&self.config.url) {
            Ok(id) => {
                self.current = Some(id);
                true
            }
            Err(e) => {
                error!("Failed to start connection: {}", e);
                self.current = None;
                self.set_status(ConnectionStatus::Disconnected, "Connection Failed");
                self.schedule_reconnect();
                false
            }
        }
    }

    /// Resets the attempt budget and connects.
    ///
    /// This is the manual way out of the "gave up" state.
    pub fn reconnect_now(&mut self) -> bool {
        self.attempts = 0;
        self.halted = false;
        self.gave_up = false;
        self.connect()
    }

    /// Arms the reconnect timer if allowed.
    pub fn schedule_reconnect(&mut self) -> ReconnectOutcome {
        if self.reconnect_at.is_some() {
            return ReconnectOutcome::AlreadyPending;
        }
        if self.status == ConnectionStatus::Connected {
            return ReconnectOutcome::NotNeeded;
        }
        if self.halted {
            return ReconnectOutcome::Halted;
        }

        if self.attempts >= self.config.max_reconnect_attempts {
            return self.give_up("Maximum reconnect attempts reached, giving up");
        }
        let delay = self.config.reconnect_delay;
        let Some(deadline) = Instant::now().checked_add(delay) else {
            return self.give_up("Reconnect delay out of range, giving up");
        };

        self.attempts += 1;
        info!(
            "Scheduling reconnect ({}/{}) in {}s",
            self.attempts,
            self.config.max_reconnect_attempts,
            delay.as_secs()
        );
        self.reconnect_at = Some(deadline);
        self.metrics.record_reconnect_scheduled();
        let label = format!("Reconnecting ({})...", self.attempts);
        self.set_status(ConnectionStatus::Connecting, label);
        ReconnectOutcome::Scheduled {
            attempt: self.attempts,
        }
    }

    fn give_up(&mut self, reason: &str) -> ReconnectOutcome {
        error!("{}", reason);
        self.gave_up = true;
        self.set_status(ConnectionStatus::Disconnected, GAVE_UP_LABEL);
        ReconnectOutcome::GaveUp
    }

    /// Fires the pending reconnect, if any.
    pub fn on_reconnect_timer(&mut self) -> bool {
        if self.reconnect_at.take().is_none() {
            return false;
        }
        self.connect()
    }

    /// Applies a transport event.
    pub fn handle_event(&mut self, event: TransportEvent) -> ConnectionEvent {
        if self.current != Some(event.connection) {
            debug!("Ignoring event from stale connection {}", event.connection);
            return ConnectionEvent::Ignored;
        }

        match event.kind {
            TransportEventKind::Opened => {
                self.attempts = 0;
                self.gave_up = false;
                self.reconnect_at = None;
                self.set_status(ConnectionStatus::Connected, "Connected");
                info!("Connection established");
                self.send(&ClientMessage::TeacherConnect {});
                ConnectionEvent::Opened
            }
            TransportEventKind::Frame(text) => ConnectionEvent::Frame(text),
            TransportEventKind::Error(msg) => {
                error!("WebSocket error: {}", msg);
                self.set_status(ConnectionStatus::Disconnected, "Error");
                ConnectionEvent::Errored
            }
            TransportEventKind::Closed { code, reason } => {
                let detail = if reason.is_empty() {
                    match code {
                        Some(code) => format!(" (Code: {})", code),
                        None => String::new(),
                    }
                } else {
                    format!(" ({})", reason)
                };
                warn!("Connection closed{}", detail);
                self.current = None;
                self.set_status(ConnectionStatus::Disconnected, format!("Closed{}", detail));
                ConnectionEvent::Closed(self.schedule_reconnect())
            }
        }
    }

    /// Sends a message if the connection is open.
    ///
    /// Returns false (and logs) otherwise; never queues.
    pub fn send(&mut self, msg: &ClientMessage) -> bool {
        if self.status != ConnectionStatus::Connected {
            warn!("Connection not open, message unsent: {:?}", msg);
            self.metrics.record_unsent();
            return false;
        }

        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                error!("{}", WsError::Serialization(e.to_string()));
                self.metrics.record_unsent();
                return false;
            }
        };

        match self.transport.send_text(json) {
            Ok(()) => {
                self.metrics.record_sent();
                true
            }
            Err(e) => {
                warn!("Failed to send message: {}", e);
                self.metrics.record_unsent();
                false
            }
        }
    }

    /// Closes the connection for good after a fatal session error.
    ///
    /// Cancels any pending reconnect and disables automatic reconnection.
    pub fn halt(&mut self, reason: &str) {
        warn!("Halting connection: {}", reason);
        self.halted = true;
        self.reconnect_at = None;
        self.transport.close(POLICY_VIOLATION_CLOSE_CODE, reason);
        self.current = None;
        self.set_status(ConnectionStatus::Disconnected, reason);
    }
}
