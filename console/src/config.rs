//! Console configuration.
//!
//! Loaded from `SABER_*` environment variables on top of the defaults.

use std::time::Duration;

use saber_sdk::ws::config::{
    validate_url, DEFAULT_HEARTBEAT_SECS, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_DELAY_SECS, DEFAULT_WS_URL, MAX_INTERVAL_SECS,
};
use saber_sdk::{SortKey, WsConfig};
use serde::{Deserialize, Serialize};

/// Relay URL variable.
pub const ENV_WS_URL: &str = "SABER_WS_URL";
/// Reconnect delay variable, in seconds.
pub const ENV_RECONNECT_DELAY_SECS: &str = "SABER_RECONNECT_DELAY_SECS";
/// Reconnect attempt cap variable.
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "SABER_MAX_RECONNECT_ATTEMPTS";
/// Heartbeat interval variable, in seconds.
pub const ENV_HEARTBEAT_SECS: &str = "SABER_HEARTBEAT_SECS";
/// Initial sort key variable.
pub const ENV_SORT: &str = "SABER_SORT";
/// Initial filter variable.
pub const ENV_FILTER: &str = "SABER_FILTER";

/// Configuration for the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Relay WebSocket URL.
    pub ws_url: String,

    /// Delay between reconnect attempts in seconds.
    pub reconnect_delay_secs: u64,

    /// Maximum reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Ping interval in seconds.
    pub heartbeat_secs: u64,

    /// Initial sort key.
    pub sort: SortKey,

    /// Initial filter text.
    pub filter: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            reconnect_delay_secs: DEFAULT_RECONNECT_DELAY_SECS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
            sort: SortKey::default(),
            filter: String::new(),
        }
    }
}

fn parse_number<N: std::str::FromStr>(name: &'static str, value: &str) -> Result<N, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}

impl ConsoleConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the configuration through `lookup`, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_WS_URL) {
            config.ws_url = url.trim().to_string();
        }
        if let Some(value) = lookup(ENV_RECONNECT_DELAY_SECS) {
            config.reconnect_delay_secs = parse_number(ENV_RECONNECT_DELAY_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_RECONNECT_ATTEMPTS) {
            config.max_reconnect_attempts = parse_number(ENV_MAX_RECONNECT_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_HEARTBEAT_SECS) {
            config.heartbeat_secs = parse_number(ENV_HEARTBEAT_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_SORT) {
            config.sort = value.parse().map_err(ConfigError::InvalidSort)?;
        }
        if let Some(filter) = lookup(ENV_FILTER) {
            config.filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the relay URL.
    #[must_use]
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Sets the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, delay_secs: u64, max_attempts: u32) -> Self {
        self.reconnect_delay_secs = delay_secs;
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url(&self.ws_url).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;

        if self.reconnect_delay_secs == 0 {
            return Err(ConfigError::InvalidReconnectDelay);
        }
        if self.reconnect_delay_secs > MAX_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooLong {
                name: ENV_RECONNECT_DELAY_SECS,
                secs: self.reconnect_delay_secs,
            });
        }

        if self.heartbeat_secs == 0 {
            return Err(ConfigError::InvalidHeartbeat);
        }
        if self.heartbeat_secs > MAX_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooLong {
                name: ENV_HEARTBEAT_SECS,
                secs: self.heartbeat_secs,
            });
        }

        Ok(())
    }

    /// Returns the connection settings.
    #[must_use]
    pub fn ws_config(&self) -> WsConfig {
        WsConfig::new(self.ws_url.clone())
            .with_heartbeat_interval(Duration::from_secs(self.heartbeat_secs))
            .with_reconnect_delay(Duration::from_secs(self.reconnect_delay_secs))
            .with_max_reconnect_attempts(self.max_reconnect_attempts)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Relay URL rejected.
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),

    /// Variable was not a number.
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// Unknown sort key.
    #[error("{0}")]
    InvalidSort(String),

    /// Zero reconnect delay.
    #[error("reconnect delay must be > 0")]
    InvalidReconnectDelay,

    /// Zero heartbeat interval.
    #[error("heartbeat interval must be > 0")]
    InvalidHeartbeat,

    /// Interval longer than a day.
    #[error("{name} must be at most {max}s, got {secs}", max = MAX_INTERVAL_SECS)]
    IntervalTooLong {
        /// Variable name.
        name: &'static str,
        /// Configured seconds.
        secs: u64,
    },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = ConsoleConfig::default();
        assert_eq!(config.ws_url, "wss://extension.mkseven1.com");
        assert_eq!(config.reconnect_delay_secs, 5);
        assert_eq!(config.max_reconnect_attempts, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_vars() {
        let config = ConsoleConfig::from_lookup(lookup(&[
            (ENV_WS_URL, "ws://localhost:9000"),
            (ENV_RECONNECT_DELAY_SECS, "2"),
            (ENV_MAX_RECONNECT_ATTEMPTS, " 3 "),
            (ENV_SORT, "activity"),
            (ENV_FILTER, "ana"),
        ]))
        .expect("config");

        assert_eq!(config.ws_url, "ws://localhost:9000");
        assert_eq!(config.reconnect_delay_secs, 2);
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.sort, SortKey::Activity);
        assert_eq!(config.filter, "ana");
        assert_eq!(config.heartbeat_secs, 30);
    }

    #[test]
    fn test_config_rejects_bad_number() {
        let err = ConsoleConfig::from_lookup(lookup(&[(ENV_HEARTBEAT_SECS, "soon")]))
            .expect_err("should fail");
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                name: ENV_HEARTBEAT_SECS,
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn test_config_rejects_bad_sort_and_url() {
        assert!(matches!(
            ConsoleConfig::from_lookup(lookup(&[(ENV_SORT, "grade")])),
            Err(ConfigError::InvalidSort(_))
        ));
        assert!(matches!(
            ConsoleConfig::from_lookup(lookup(&[(ENV_WS_URL, "http://relay")])),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_config_validate_zero_delay() {
        let config = ConsoleConfig::default().with_reconnect(0, 10);
        assert_eq!(config.validate(), Err(ConfigError::InvalidReconnectDelay));
    }

    #[test]
    fn test_config_rejects_oversized_delay() {
        let err = ConsoleConfig::from_lookup(lookup(&[(
            ENV_RECONNECT_DELAY_SECS,
            "18446744073709551615",
        )]))
        .expect_err("should fail");
        assert_eq!(
            err,
            ConfigError::IntervalTooLong {
                name: ENV_RECONNECT_DELAY_SECS,
                secs: u64::MAX,
            }
        );
        assert_eq!(
            err.to_string(),
            "SABER_RECONNECT_DELAY_SECS must be at most 86400s, got 18446744073709551615"
        );

        let day = ConsoleConfig::default().with_reconnect(MAX_INTERVAL_SECS, 10);
        assert!(day.validate().is_ok());
        assert!(day.ws_config().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_oversized_heartbeat() {
        let config = ConsoleConfig {
            heartbeat_secs: MAX_INTERVAL_SECS + 1,
            ..ConsoleConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IntervalTooLong {
                name: ENV_HEARTBEAT_SECS,
                ..
            })
        ));
    }

    #[test]
    fn test_ws_config() {
        let ws = ConsoleConfig::default()
            .with_ws_url("ws://127.0.0.1:8080")
            .with_reconnect(1, 4)
            .ws_config();
        assert_eq!(ws.url, "ws://127.0.0.1:8080");
        assert_eq!(ws.reconnect_delay, Duration::from_secs(1));
        assert_eq!(ws.max_reconnect_attempts, 4);
    }

    #[test]
    fn test_config_json_roundtrip_with_defaults() {
        let raw = r#"{"ws_url":"ws://localhost:1","sort":"status"}"#;
        let config: ConsoleConfig = serde_json::from_str(raw).expect("parse");
        assert_eq!(config.sort, SortKey::Status);
        assert_eq!(config.heartbeat_secs, 30);
    }
}
