//! Relay connection settings.
//!
//! Defaults match the production relay: one attempt every five seconds, at
//! most ten attempts, and a ping every thirty seconds.

use std::time::Duration;

use super::error::WsError;

/// Default relay URL.
pub const DEFAULT_WS_URL: &str = "wss://extension.mkseven1.com";

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Default delay between reconnect attempts in seconds.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

/// Default maximum number of reconnect attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Upper bound for the heartbeat interval and the reconnect delay, in seconds.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Relay connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsConfig {
    /// Relay URL.
    pub url: String,

    /// Interval between ping frames.
    pub heartbeat_interval: Duration,

    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,

    /// Attempts after a close before giving up. Zero disables reconnection.
    pub max_reconnect_attempts: u32,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl WsConfig {
    /// Default settings for another relay.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the ping interval.
    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the delay between reconnect attempts.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the reconnect budget.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Checks the URL and intervals.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-WebSocket URL, or an interval that is zero
    /// or longer than [`MAX_INTERVAL_SECS`].
    pub fn validate(&self) -> Result<(), WsError> {
        validate_url(&self.url)?;
        check_interval("heartbeat interval", self.heartbeat_interval)?;
        check_interval("reconnect delay", self.reconnect_delay)?;
        Ok(())
    }
}

fn check_interval(name: &str, interval: Duration) -> Result<(), WsError> {
    if interval.is_zero() {
        return Err(WsError::InvalidConfig(format!("{name} must be > 0")));
    }
    if interval > Duration::from_secs(MAX_INTERVAL_SECS) {
        return Err(WsError::InvalidConfig(format!("{name} must be at most {MAX_INTERVAL_SECS}s")));
    }
    Ok(())
}

/// Checks that `url` is a ws:// or wss:// URL.
///
/// # Errors
///
/// Returns [`WsError::InvalidUrl`] otherwise.
pub fn validate_url(url: &str) -> Result<(), WsError> {
    let rest = url
        .strip_prefix("wss://")
        .or_else(|| url.strip_prefix("ws://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(WsError::InvalidUrl(url.to_string())),
    }
}
