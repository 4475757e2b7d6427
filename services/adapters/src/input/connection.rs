//! Streaming transport abstraction and the WebSocket implementation
//!
//! A [`Transport`] owns one socket and reports its lifecycle as
//! [`TransportEvent`]s on a channel handed to it by its [`TransportFactory`].
//! Retry and backoff live here, never in the protocol clients.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use types::VenueId;

use crate::config::BaseAdapterConfig;
use crate::{AdapterError, Result};

/// Connection states for the streaming lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live socket
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Socket open
    Connected,
    /// Close requested, socket still draining
    Closing,
    /// Closed on request, no reconnect will follow
    Closed,
}

/// Lifecycle and data events reported by a transport
#[derive(Debug)]
pub enum TransportEvent {
    Connecting,
    Connected,
    Disconnected,
    Closing,
    Closed,
    Error(AdapterError),
    /// One inbound text frame
    Message(String),
}

impl TransportEvent {
    /// Connection state implied by a lifecycle event
    pub fn state(&self) -> Option<ConnectionState> {
        match self {
            TransportEvent::Connecting => Some(ConnectionState::Connecting),
            TransportEvent::Connected => Some(ConnectionState::Connected),
            TransportEvent::Disconnected => Some(ConnectionState::Disconnected),
            TransportEvent::Closing => Some(ConnectionState::Closing),
            TransportEvent::Closed => Some(ConnectionState::Closed),
            TransportEvent::Error(_) | TransportEvent::Message(_) => None,
        }
    }
}

/// Raw streaming transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start connecting; outcome is reported through lifecycle events
    async fn connect(&self) -> Result<()>;

    /// Send one text frame
    async fn send(&self, frame: String) -> Result<()>;

    /// Close the socket without reconnecting
    async fn close(&self) -> Result<()>;
}

/// Builds transports bound to an event channel
pub trait TransportFactory: Send + Sync {
    fn create(&self, url: &str, events: mpsc::UnboundedSender<TransportEvent>)
        -> Arc<dyn Transport>;
}

/// Configuration for connection management
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Base backoff time for reconnection
    pub base_backoff_ms: u64,
    /// Maximum backoff time
    pub max_backoff_ms: u64,
    /// Maximum consecutive reconnection attempts
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            base_backoff_ms: 1000,
            max_backoff_ms: 30000,
            max_reconnect_attempts: 10,
        }
    }
}

impl From<&BaseAdapterConfig> for ConnectionConfig {
    fn from(base: &BaseAdapterConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(base.connection_timeout_ms),
            base_backoff_ms: base.reconnect_delay_ms,
            max_backoff_ms: base.max_reconnect_delay_ms,
            max_reconnect_attempts: base.max_retries,
        }
    }
}

impl ConnectionConfig {
    /// Exponential backoff for the given consecutive failure count
    pub fn backoff(&self, attempt: u32) -> Duration {
        // Cap the exponent at 6 for 2^6 = 64x
        let multiplier = attempt.min(6);
        let backoff_ms = self.base_backoff_ms.saturating_mul(2_u64.pow(multiplier));
        Duration::from_millis(backoff_ms.min(self.max_backoff_ms))
    }
}

/// WebSocket transport with automatic reconnection
pub struct WsTransport {
    venue: VenueId,
    url: String,
    config: ConnectionConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<Message>>>>,
    shutdown: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WsTransport {
    pub fn new(
        venue: VenueId,
        url: impl Into<String>,
        config: ConnectionConfig,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            venue,
            url: url.into(),
            config,
            events,
            outbound: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(Notify::new()),
            task: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self) -> Result<()> {
        let mut task = self.task.lock();
        if task.as_ref().map(|t| !t.is_finished()).unwrap_or(false) {
            return Ok(());
        }

        let supervisor = Supervisor {
            venue: self.venue,
            url: self.url.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            outbound: self.outbound.clone(),
            shutdown: self.shutdown.clone(),
        };
        *task = Some(tokio::spawn(supervisor.run()));
        Ok(())
    }

    async fn send(&self, frame: String) -> Result<()> {
        let sender = self.outbound.lock().clone();
        match sender {
            Some(tx) => tx
                .send(Message::Text(frame))
                .map_err(|_| AdapterError::ConnectionClosed {
                    venue: self.venue,
                    reason: Some("socket writer stopped".to_string()),
                }),
            None => Err(AdapterError::NotConnected { venue: self.venue }),
        }
    }

    async fn close(&self) -> Result<()> {
        let Some(task) = self.task.lock().take() else {
            return Ok(());
        };
        if task.is_finished() {
            return Ok(());
        }

        let _ = self.events.send(TransportEvent::Closing);
        self.shutdown.notify_one();

        // Let the supervisor send the close frame and report Closed
        let abort = task.abort_handle();
        if timeout(self.config.connect_timeout, task).await.is_err() {
            tracing::warn!("{} transport did not close in time, aborting", self.venue);
            abort.abort();
            let _ = self.events.send(TransportEvent::Closed);
        }
        Ok(())
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

/// Reconnect loop owning the socket
struct Supervisor {
    venue: VenueId,
    url: String,
    config: ConnectionConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<Message>>>>,
    shutdown: Arc<Notify>,
}

enum SessionEnd {
    Shutdown,
    Dropped,
}

impl Supervisor {
    async fn run(self) {
        let mut failures: u32 = 0;

        loop {
            let _ = self.events.send(TransportEvent::Connecting);
            tracing::info!("Connecting to {} at {}", self.venue, self.url);

            match timeout(self.config.connect_timeout, connect_async(self.url.as_str())).await {
                Ok(Ok((ws_stream, response))) => {
                    tracing::info!(
                        "Connected to {} with response: {:?}",
                        self.venue,
                        response.status()
                    );
                    failures = 0;

                    match self.session(ws_stream).await {
                        SessionEnd::Shutdown => {
                            let _ = self.events.send(TransportEvent::Closed);
                            return;
                        }
                        SessionEnd::Dropped => {
                            let _ = self.events.send(TransportEvent::Disconnected);
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::error!("WebSocket connection error for {}: {}", self.venue, e);
                    let _ = self.events.send(TransportEvent::Error(AdapterError::ConnectionFailed {
                        venue: self.venue,
                        reason: e.to_string(),
                    }));
                    let _ = self.events.send(TransportEvent::Disconnected);
                }
                Err(_) => {
                    tracing::error!(
                        "Connection timeout for {} after {:?}",
                        self.venue,
                        self.config.connect_timeout
                    );
                    let _ = self.events.send(TransportEvent::Error(AdapterError::ConnectionTimeout {
                        venue: self.venue,
                        timeout_ms: self.config.connect_timeout.as_millis() as u64,
                    }));
                    let _ = self.events.send(TransportEvent::Disconnected);
                }
            }

            failures += 1;
            if failures > self.config.max_reconnect_attempts {
                tracing::error!(
                    "Max reconnection attempts ({}) exceeded for {}",
                    self.config.max_reconnect_attempts,
                    self.venue
                );
                let _ = self.events.send(TransportEvent::Error(AdapterError::ConnectionFailed {
                    venue: self.venue,
                    reason: format!(
                        "gave up after {} reconnect attempts",
                        self.config.max_reconnect_attempts
                    ),
                }));
                let _ = self.events.send(TransportEvent::Closed);
                return;
            }

            let backoff = self.config.backoff(failures - 1);
            tracing::info!(
                "Will reconnect to {} in {}ms (attempt {})",
                self.venue,
                backoff.as_millis(),
                failures
            );

            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = self.shutdown.notified() => {
                    let _ = self.events.send(TransportEvent::Closed);
                    return;
                }
            }
        }
    }

    async fn session<S>(&self, ws_stream: tokio_tungstenite::WebSocketStream<S>) -> SessionEnd
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        *self.outbound.lock() = Some(tx);
        let _ = self.events.send(TransportEvent::Connected);

        let end = loop {
            tokio::select! {
                inbound = read.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let _ = self.events.send(TransportEvent::Message(text));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::warn!("{} closed the stream: {:?}", self.venue, frame);
                        break SessionEnd::Dropped;
                    }
                    Some(Ok(_)) => {
                        // ping/pong/binary control frames carry no payload we use
                    }
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error for {}: {}", self.venue, e);
                        let _ = self.events.send(TransportEvent::Error(AdapterError::WebSocket(e)));
                        break SessionEnd::Dropped;
                    }
                    None => break SessionEnd::Dropped,
                },
                outbound = rx.recv() => {
                    if let Some(message) = outbound {
                        if let Err(e) = write.send(message).await {
                            tracing::error!("Send failed for {}: {}", self.venue, e);
                            let _ = self.events.send(TransportEvent::Error(AdapterError::WebSocket(e)));
                            break SessionEnd::Dropped;
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    let _ = write.send(Message::Close(None)).await;
                    break SessionEnd::Shutdown;
                }
            }
        };

        *self.outbound.lock() = None;
        end
    }
}

/// Factory producing [`WsTransport`]s
pub struct WsTransportFactory {
    venue: VenueId,
    config: ConnectionConfig,
}

impl WsTransportFactory {
    pub fn new(venue: VenueId, config: ConnectionConfig) -> Self {
        Self { venue, config }
    }
}

impl TransportFactory for WsTransportFactory {
    fn create(
        &self,
        url: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Arc<dyn Transport> {
        Arc::new(WsTransport::new(self.venue, url, self.config.clone(), events))
    }
}
