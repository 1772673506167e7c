//! WebSocket transport implementation.
//!
//! Provides the `tokio-tungstenite` transport used against the real relay.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use super::config::validate_url;
use super::error::WsError;
use super::transport::{ConnectionId, Transport, TransportEvent, TransportEventKind};

/// WebSocket transport backed by `tokio-tungstenite`.
///
/// Each connection attempt runs in its own driver task, which reports
/// everything it sees through the event channel returned by [`Self::new`]
/// and always finishes with a `Closed` event.
#[derive(Debug)]
pub struct TungsteniteTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    driver: Option<JoinHandle<()>>,
    next_id: ConnectionId,
    heartbeat_interval: Duration,
}

impl TungsteniteTransport {
    /// Creates a transport and the receiver for its events.
    #[must_use]
    pub fn new(heartbeat_interval: Duration) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                outbound: None,
                driver: None,
                next_id: 0,
                heartbeat_interval,
            },
            rx,
        )
    }
}

impl Drop for TungsteniteTransport {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl Transport for TungsteniteTransport {
    fn start(&mut self, url: &str) -> Result<ConnectionId, WsError> {
        validate_url(url)?;

        if let Some(driver) = self.driver.take() {
            driver.abort();
        }

        self.next_id += 1;
        let id = self.next_id;
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        self.outbound = Some(out_tx);
        self.driver = Some(tokio::spawn(drive(
            id,
            url.to_string(),
            out_rx,
            self.events.clone(),
            self.heartbeat_interval,
        )));

        Ok(id)
    }

    fn send_text(&mut self, text: String) -> Result<(), WsError> {
        let outbound = self.outbound.as_ref().ok_or(WsError::NotConnected)?;
        outbound
            .send(Message::Text(text.into()))
            .map_err(|e| WsError::SendFailed(e.to_string()))
    }

    fn close(&mut self, code: u16, reason: &str) {
        if let Some(outbound) = self.outbound.take() {
            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: reason.to_string().into(),
            };
            let _ = outbound.send(Message::Close(Some(frame)));
        }
    }
}

/// Runs one connection until it closes.
async fn drive(
    id: ConnectionId,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    events: mpsc::UnboundedSender<TransportEvent>,
    heartbeat_interval: Duration,
) {
    let emit = |kind: TransportEventKind| {
        let _ = events.send(TransportEvent::new(id, kind));
    };

    let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            let err = WsError::Connection(e.to_string());
            emit(TransportEventKind::Error(err.to_string()));
            emit(TransportEventKind::Closed {
                code: None,
                reason: e.to_string(),
            });
            return;
        }
    };

    info!("Connection {} established to {}", id, url);
    emit(TransportEventKind::Opened);

    let (mut sink, mut source) = ws_stream.split();
    let mut ticker = tokio::time::interval(heartbeat_interval);
    ticker.tick().await;

    let (code, reason) = loop {
        tokio::select! {
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    emit(TransportEventKind::Frame(text.as_str().to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.as_str().to_string()),
                        None => (None, String::new()),
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    emit(TransportEventKind::Error(WsError::from(e).to_string()));
                    break (None, String::new());
                }
                None => break (None, String::new()),
            },
            outgoing = outbound.recv() => match outgoing {
                Some(msg) => {
                    let closing = match &msg {
                        Message::Close(frame) => Some((
                            frame.as_ref().map(|f| u16::from(f.code)),
                            frame
                                .as_ref()
                                .map(|f| f.reason.as_str().to_string())
                                .unwrap_or_default(),
                        )),
                        _ => None,
                    };
                    if let Err(e) = sink.send(msg).await {
                        let err = WsError::SendFailed(e.to_string());
                        emit(TransportEventKind::Error(err.to_string()));
                        break (None, String::new());
                    }
                    if let Some(local) = closing {
                        debug!("Connection {} closed locally", id);
                        break local;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break (None, String::new());
                }
            },
            _ = ticker.tick() => {
                if let Err(e) = sink.send(Message::Ping(Vec::new().into())).await {
                    emit(TransportEventKind::Error(WsError::SendFailed(e.to_string()).to_string()));
                    break (None, String::new());
                }
            }
        }
    };

    emit(TransportEventKind::Closed { code, reason });
}
