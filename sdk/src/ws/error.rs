//! Relay connection errors.

use std::fmt;

/// Errors from the relay connection and its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsError {
    /// Relay could not be reached.
    Connection(String),

    /// WebSocket protocol error.
    Protocol(String),

    /// Outbound message could not be encoded.
    Serialization(String),

    /// No connection to write to.
    NotConnected,

    /// Relay URL is not a ws:// or wss:// URL.
    InvalidUrl(String),

    /// Connection settings rejected.
    InvalidConfig(String),

    /// Frame could not be handed to the driver task.
    SendFailed(String),
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "could not reach relay: {}", msg),
            Self::Protocol(msg) => write!(f, "websocket protocol error: {}", msg),
            Self::Serialization(msg) => write!(f, "could not encode message: {}", msg),
            Self::NotConnected => write!(f, "no relay connection"),
            Self::InvalidUrl(url) => {
                write!(f, "invalid relay url {:?}: must start with ws:// or wss://", url)
            }
            Self::InvalidConfig(msg) => write!(f, "invalid connection settings: {}", msg),
            Self::SendFailed(msg) => write!(f, "relay send failed: {}", msg),
        }
    }
}

impl std::error::Error for WsError {}

impl From<tokio_tungstenite::tungstenite::Error> for WsError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
