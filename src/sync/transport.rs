//! Duplex text channel to the relay.
//!
//! The connection manager only sees the [`Transport`] trait: frames in, frames
//! out, and lifecycle signals. Reconnecting after a dropped socket is the
//! transport's job; the core just reacts to [`TransportSignal::Disconnected`]
//! and [`TransportSignal::Reconnected`].

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::protocol::{Event, EventCodec, ProtocolError};

/// Transport errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Transport closed")]
    Closed,
}

/// What a transport yields to the connection manager
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    /// One text frame
    Message(String),
    /// The link dropped; the transport is trying to get it back
    Disconnected { reason: Option<String> },
    /// The link is back after a [`TransportSignal::Disconnected`]
    Reconnected,
}

/// A connected, self-reconnecting duplex channel
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next frame or lifecycle signal; `None` once the transport is finished
    async fn recv(&mut self) -> Option<TransportSignal>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports to an endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError>;
}

// ============================================================================
// WEBSOCKET
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens [`WsTransport`]s
#[derive(Debug, Clone)]
pub struct WsConnector {
    reconnect_delay: Duration,
}

impl WsConnector {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self { reconnect_delay }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError> {
        let transport = WsTransport::connect(endpoint, self.reconnect_delay).await?;
        Ok(Box::new(transport))
    }
}

/// WebSocket transport carrying JSON text frames.
///
/// After the socket drops it retries the same URL every `reconnect_delay`
/// for as long as [`Transport::recv`] keeps being polled.
pub struct WsTransport {
    url: String,
    reconnect_delay: Duration,
    socket: Option<WsStream>,
    closed: bool,
}

impl WsTransport {
    pub async fn connect(url: &str, reconnect_delay: Duration) -> Result<Self, TransportError> {
        let (socket, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        info!("Connected to relay at {}", url);

        Ok(Self {
            url: url.to_string(),
            reconnect_delay,
            socket: Some(socket),
            closed: false,
        })
    }

    fn drop_socket(&mut self, reason: Option<String>) -> TransportSignal {
        self.socket = None;
        TransportSignal::Disconnected { reason }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let socket = self.socket.as_mut().ok_or(TransportError::NotConnected)?;
        socket
            .send(WsMessage::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<TransportSignal> {
        loop {
            if self.closed {
                return None;
            }

            let Some(socket) = self.socket.as_mut() else {
                tokio::time::sleep(self.reconnect_delay).await;
                match connect_async(self.url.as_str()).await {
                    Ok((socket, _)) => {
                        info!("Reconnected to relay at {}", self.url);
                        self.socket = Some(socket);
                        return Some(TransportSignal::Reconnected);
                    }
                    Err(e) => {
                        debug!("Reconnect to {} failed: {}", self.url, e);
                        continue;
                    }
                }
            };

            match socket.next().await {
                Some(Ok(WsMessage::Text(text))) => return Some(TransportSignal::Message(text)),
                Some(Ok(WsMessage::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string());
                    return Some(self.drop_socket(reason));
                }
                Some(Ok(WsMessage::Binary(_))) => {
                    warn!("Ignoring binary frame from relay");
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite
                }
                Some(Err(e)) => return Some(self.drop_socket(Some(e.to_string()))),
                None => return Some(self.drop_socket(None)),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        if let Some(mut socket) = self.socket.take() {
            socket
                .close(None)
                .await
                .map_err(|e| TransportError::Send(e.to_string()))?;
        }
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// Create a connected in-memory transport and the relay side driving it
pub fn memory_pair() -> (MemoryTransport, RelayHandle) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    let transport = MemoryTransport {
        inbound: inbound_rx,
        outbound: outbound_tx,
        connected: true,
    };
    let relay = RelayHandle {
        inbound: inbound_tx,
        outbound: outbound_rx,
    };
    (transport, relay)
}

/// In-process transport. Sends fail between a disconnect and the next reconnect.
pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<TransportSignal>,
    outbound: mpsc::UnboundedSender<String>,
    connected: bool,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.outbound.send(text).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<TransportSignal> {
        let signal = self.inbound.recv().await?;
        match signal {
            TransportSignal::Disconnected { .. } => self.connected = false,
            TransportSignal::Reconnected => self.connected = true,
            TransportSignal::Message(_) => {}
        }
        Some(signal)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        self.inbound.close();
        Ok(())
    }
}

/// The relay's end of a [`MemoryTransport`]
pub struct RelayHandle {
    inbound: mpsc::UnboundedSender<TransportSignal>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl RelayHandle {
    /// Deliver an event to the client
    pub fn send_event(&self, event: &Event) -> Result<(), ProtocolError> {
        let text = EventCodec::encode(event)?;
        self.send_raw(text);
        Ok(())
    }

    /// Deliver a raw frame to the client
    pub fn send_raw(&self, text: impl Into<String>) {
        let _ = self.inbound.send(TransportSignal::Message(text.into()));
    }

    pub fn disconnect(&self, reason: Option<&str>) {
        let _ = self.inbound.send(TransportSignal::Disconnected {
            reason: reason.map(str::to_string),
        });
    }

    pub fn reconnect(&self) {
        let _ = self.inbound.send(TransportSignal::Reconnected);
    }

    /// Next frame the client sent, decoded
    pub async fn next_event(&mut self) -> Option<Event> {
        let text = self.outbound.recv().await?;
        EventCodec::decode(&text).ok()
    }

    /// A frame the client already sent, if any
    pub fn try_next_event(&mut self) -> Option<Event> {
        let text = self.outbound.try_recv().ok()?;
        EventCodec::decode(&text).ok()
    }
}

/// Hands out one pre-built [`MemoryTransport`]
pub struct MemoryConnector {
    transport: Mutex<Option<MemoryTransport>>,
}

impl MemoryConnector {
    pub fn new(transport: MemoryTransport) -> Self {
        Self {
            transport: Mutex::new(Some(transport)),
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError> {
        let transport = self.transport.lock().take().ok_or_else(|| {
            TransportError::Connect(format!("Memory transport for {} already used", endpoint))
        })?;
        Ok(Box::new(transport))
    }
}
