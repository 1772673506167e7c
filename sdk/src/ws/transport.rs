//! Transport abstraction under the connection manager.
//!
//! A transport starts connection attempts and carries text frames. Outcomes are
//! reported asynchronously as [`TransportEvent`]s tagged with the connection ID
//! returned by [`Transport::start`], so events from a superseded attempt can be
//! told apart from the current one.

use super::error::WsError;

/// Identifier of one connection attempt.
pub type ConnectionId = u64;

/// Close code sent when the relay rejected this session.
pub const POLICY_VIOLATION_CLOSE_CODE: u16 = 1008;

/// What happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// Handshake completed.
    Opened,
    /// Text frame received.
    Frame(String),
    /// Transport-level error; a `Closed` event follows.
    Error(String),
    /// Connection closed or could not be established.
    Closed {
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
}

/// Event reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Connection attempt this event belongs to.
    pub connection: ConnectionId,
    /// Event kind.
    pub kind: TransportEventKind,
}

impl TransportEvent {
    /// Creates a new event.
    #[must_use]
    pub const fn new(connection: ConnectionId, kind: TransportEventKind) -> Self {
        Self { connection, kind }
    }
}

/// A WebSocket-like transport.
pub trait Transport {
    /// Begins a connection attempt and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot even be started (for example a
    /// malformed URL).
    fn start(&mut self, url: &str) -> Result<ConnectionId, WsError>;

    /// Queues a text frame on the current connection.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no connection to write to.
    fn send_text(&mut self, text: String) -> Result<(), WsError>;

    /// Closes the current connection.
    fn close(&mut self, code: u16, reason: &str);
}
