//! Session metrics.
//!
//! Lock-free counters shared between the connection manager and the session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters for one dashboard session.
#[derive(Debug)]
pub struct SessionMetrics {
    /// Frames received from the relay.
    frames_received: AtomicU64,

    /// Frames dropped as malformed or unhandled.
    frames_dropped: AtomicU64,

    /// Messages written to the transport.
    messages_sent: AtomicU64,

    /// Messages discarded because the connection was not open.
    messages_unsent: AtomicU64,

    /// `command_failed` reports from the relay.
    commands_rejected: AtomicU64,

    /// Reconnect timers armed.
    reconnects_scheduled: AtomicU64,

    /// Start time.
    start_time: Instant,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMetrics {
    /// Creates zeroed metrics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames_received: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_unsent: AtomicU64::new(0),
            commands_rejected: AtomicU64::new(0),
            reconnects_scheduled: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a received frame.
    pub fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dropped frame.
    pub fn record_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a sent message.
    pub fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a message that could not be sent.
    pub fn record_unsent(&self) {
        self.messages_unsent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a command rejected by the relay.
    pub fn record_command_rejected(&self) {
        self.commands_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a scheduled reconnect.
    pub fn record_reconnect_scheduled(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns frames received.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Returns frames dropped.
    #[must_use]
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    /// Returns messages sent.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Returns messages left unsent.
    #[must_use]
    pub fn messages_unsent(&self) -> u64 {
        self.messages_unsent.load(Ordering::Relaxed)
    }

    /// Returns commands rejected.
    #[must_use]
    pub fn commands_rejected(&self) -> u64 {
        self.commands_rejected.load(Ordering::Relaxed)
    }

    /// Returns reconnects scheduled.
    #[must_use]
    pub fn reconnects_scheduled(&self) -> u64 {
        self.reconnects_scheduled.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the share of received frames that were dropped (0.0 to 1.0).
    #[must_use]
    pub fn drop_rate(&self) -> f64 {
        let received = self.frames_received();
        if received > 0 {
            self.frames_dropped() as f64 / received as f64
        } else {
            0.0
        }
    }

    /// Returns a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        SessionMetricsSnapshot {
            frames_received: self.frames_received(),
            frames_dropped: self.frames_dropped(),
            messages_sent: self.messages_sent(),
            messages_unsent: self.messages_unsent(),
            commands_rejected: self.commands_rejected(),
            reconnects_scheduled: self.reconnects_scheduled(),
            drop_rate: self.drop_rate(),
            uptime: self.uptime(),
        }
    }
}

/// A point-in-time snapshot of session metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetricsSnapshot {
    /// Frames received.
    pub frames_received: u64,
    /// Frames dropped.
    pub frames_dropped: u64,
    /// Messages sent.
    pub messages_sent: u64,
    /// Messages left unsent.
    pub messages_unsent: u64,
    /// Commands rejected by the relay.
    pub commands_rejected: u64,
    /// Reconnect timers armed.
    pub reconnects_scheduled: u64,
    /// Share of received frames that were dropped.
    pub drop_rate: f64,
    /// Uptime.
    pub uptime: Duration,
}
