//! Relay connection.
//!
//! This module holds everything between the session and the relay socket:
//! configuration, the wire messages, the [`Transport`] seam with its
//! `tokio-tungstenite` implementation, and the reconnecting
//! [`ConnectionManager`].
//!
//! # Example
//!
//! ```rust,ignore
//! use saber_sdk::ws::{ConnectionManager, TungsteniteTransport, WsConfig};
//!
//! let config = WsConfig::new("wss://relay.example.org");
//! let (transport, mut events) = TungsteniteTransport::new(config.heartbeat_interval);
//! let mut manager = ConnectionManager::new(config, transport, metrics)?;
//! manager.connect();
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", manager.handle_event(event));
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod messages;
pub mod transport;

pub use client::TungsteniteTransport;
pub use config::WsConfig;
pub use connection::{
    ConnectionEvent, ConnectionManager, ConnectionStatus, ReconnectOutcome, GAVE_UP_LABEL,
};
pub use error::WsError;
pub use messages::{ClientMessage, CommandEnvelope, MessageError, ServerEvent};
pub use transport::{ConnectionId, Transport, TransportEvent, TransportEventKind};
