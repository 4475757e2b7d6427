//! Connection lifecycle controller for the Woo stream
//!
//! Owns the transport handle and reacts to its lifecycle events: arms the
//! heartbeat on connect, resets auth on every disconnect, replays the
//! registry on every connect and hands inbound frames to the router.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use types::{Market, VenueId};

use super::auth::{AuthHandshake, AuthState};
use super::encoder::{SessionContext, SubscriptionEncoder};
use super::heartbeat::Heartbeat;
use super::registry::SubscriptionRegistry;
use super::router::InboundRouter;
use crate::config::WooConfig;
use crate::input::{
    Capabilities, Channel, ConnectionConfig, ConnectionState, StreamingClient, Transport,
    TransportEvent, TransportFactory, WsTransportFactory,
};
use crate::output::{ClientEvent, EventSink};
use crate::rate_limit::OutboundThrottle;
use crate::rest::Signer;
use crate::{AdapterError, Result};

pub const WOO_CAPABILITIES: Capabilities = Capabilities {
    has_tickers: true,
    has_trades: true,
    has_candles: true,
    has_level2_updates: true,
    has_level2_snapshots: false,
    has_level3_updates: false,
    has_bbo: true,
    has_orders: true,
};

/// Woo streaming client
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct WooClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    venue: VenueId,
    url: String,
    factory: Arc<dyn TransportFactory>,
    sink: Arc<dyn EventSink>,
    signer: Option<Signer>,
    encoder: SubscriptionEncoder,
    registry: Arc<SubscriptionRegistry>,
    auth: Arc<AuthHandshake>,
    router: InboundRouter,
    throttle: OutboundThrottle,
    heartbeat: Heartbeat,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    state: Mutex<ConnectionState>,
    generation: AtomicU64,
}

impl WooClient {
    /// Client over a reconnecting WebSocket transport
    pub fn new(config: &WooConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        let factory = Arc::new(WsTransportFactory::new(
            VenueId::Woo,
            ConnectionConfig::from(&config.base),
        ));
        Self::with_transport_factory(config, factory, sink)
    }

    /// Client over a caller-supplied transport
    ///
    /// Fails with `Configuration` when `config` does not validate.
    pub fn with_transport_factory(
        config: &WooConfig,
        factory: Arc<dyn TransportFactory>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate().map_err(AdapterError::Configuration)?;

        let venue = VenueId::Woo;
        let signer = config.credentials.as_ref().map(Signer::from_credentials);
        let session = SessionContext::new(signer.is_some());
        let registry = Arc::new(SubscriptionRegistry::new());
        let auth = Arc::new(AuthHandshake::new(venue));

        tracing::info!(
            "Woo client {} created for {}",
            session.client_id(),
            config.stream_url()
        );

        let inner = ClientInner {
            venue,
            url: config.stream_url(),
            factory,
            sink,
            signer,
            encoder: SubscriptionEncoder::new(session, config.candle_period),
            router: InboundRouter::new(venue, registry.clone(), auth.clone()),
            registry,
            auth,
            throttle: OutboundThrottle::new(config.send_throttle()),
            heartbeat: Heartbeat::new(config.ping_interval()),
            transport: Mutex::new(None),
            pump: Mutex::new(None),
            state: Mutex::new(ConnectionState::Disconnected),
            generation: AtomicU64::new(0),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Id stamped on every request of this client
    pub fn client_id(&self) -> &str {
        self.inner.encoder.session().client_id()
    }

    pub fn auth_state(&self) -> AuthState {
        self.inner.auth.state()
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.inner.registry
    }

    pub fn heartbeat_armed(&self) -> bool {
        self.inner.heartbeat.is_armed()
    }

    /// Gate for private operations; see [`AuthHandshake::await_authenticated`]
    pub async fn await_authenticated(&self) -> Result<()> {
        let transport = self.inner.live_transport()?;
        self.inner.authenticate(transport.as_ref()).await
    }

    /// Re-send every registered subscription over the live connection
    ///
    /// Returns how many subscriptions were replayed successfully. Failures
    /// are reported on the error channel.
    pub async fn resubscribe_all(&self) -> usize {
        self.inner.resubscribe_all().await
    }
}

impl ClientInner {
    fn emit(&self, event: ClientEvent) {
        self.sink.emit(event);
    }

    fn current_transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.lock().clone()
    }

    fn live_transport(&self) -> Result<Arc<dyn Transport>> {
        if *self.state.lock() != ConnectionState::Connected {
            return Err(AdapterError::NotConnected { venue: self.venue });
        }
        self.current_transport()
            .ok_or(AdapterError::NotConnected { venue: self.venue })
    }

    fn ensure_supported(&self, channel: Channel) -> Result<()> {
        if WOO_CAPABILITIES.supports(channel) {
            Ok(())
        } else {
            Err(AdapterError::NotSupported(format!("{} channel on Woo", channel)))
        }
    }

    async fn authenticate(&self, transport: &dyn Transport) -> Result<()> {
        self.auth
            .await_authenticated(transport, self.signer.as_ref(), &self.encoder)
            .await
    }

    async fn send_subscribe(&self, channel: Channel, market: &Market) -> Result<()> {
        let transport = self.live_transport()?;
        if channel.is_private() {
            self.authenticate(transport.as_ref()).await?;
        }

        let frames = self.encoder.subscribe_frames(channel, market)?;
        self.throttle.send_all(transport.as_ref(), frames).await
    }

    async fn send_unsubscribe(&self, channel: Channel, market: &Market) -> Result<()> {
        let transport = self.live_transport()?;
        if channel.is_private() {
            self.authenticate(transport.as_ref()).await?;
        }

        let frame = self.encoder.unsubscribe_frame(channel, market)?;
        self.throttle.send(transport.as_ref(), frame).await
    }

    async fn resubscribe_all(&self) -> usize {
        self.replay(self.registry.snapshot()).await
    }

    async fn replay(&self, entries: Vec<(Channel, Market)>) -> usize {
        tracing::info!("Replaying {} subscriptions on {}", entries.len(), self.venue);

        let mut replayed = 0;
        let mut orders_sent = false;
        for (channel, market) in entries {
            // one shared topic covers every market on the orders channel
            if channel == Channel::Orders {
                if orders_sent {
                    continue;
                }
                orders_sent = true;
            }

            match self.send_subscribe(channel, &market).await {
                Ok(()) => replayed += 1,
                Err(e) => {
                    tracing::warn!("Resubscribe {} {} failed: {}", channel, market, e);
                    self.emit(ClientEvent::Error(e));
                }
            }
        }
        replayed
    }

    fn handle_transport_event(self: &Arc<Self>, generation: u64, event: TransportEvent) {
        if generation != self.generation.load(Ordering::SeqCst) {
            tracing::debug!("Ignoring event from replaced transport: {:?}", event);
            return;
        }

        if matches!(event, TransportEvent::Connected) {
            // before publishing, so no caller can start a challenge this would cancel
            self.auth.reset();
        }
        if let Some(state) = event.state() {
            *self.state.lock() = state;
        }

        match event {
            TransportEvent::Connecting => {
                tracing::info!("Connecting to {}", self.venue);
                self.emit(ClientEvent::Connecting);
            }
            TransportEvent::Connected => {
                // Taken after the state change: a subscribe that saw the old
                // state has already recorded its entry
                let pending = self.registry.snapshot();
                if let Some(transport) = self.current_transport() {
                    self.heartbeat.arm(transport, self.sink.clone());
                }
                tracing::info!("Connected to {}", self.venue);
                self.emit(ClientEvent::Connected);

                if !pending.is_empty() {
                    // Auth replies arrive through this task, so replay must not block it
                    let inner = self.clone();
                    tokio::spawn(async move {
                        inner.replay(pending).await;
                    });
                }
            }
            TransportEvent::Disconnected => {
                self.heartbeat.disarm();
                self.auth.reset();
                tracing::warn!("Disconnected from {}", self.venue);
                self.emit(ClientEvent::Disconnected);
            }
            TransportEvent::Closing => {
                tracing::info!("Closing connection to {}", self.venue);
                self.emit(ClientEvent::Closing);
            }
            TransportEvent::Closed => {
                self.heartbeat.disarm();
                self.auth.reset();
                tracing::info!("Connection to {} closed", self.venue);
                self.emit(ClientEvent::Closed);
            }
            TransportEvent::Error(e) => {
                tracing::error!("Transport error on {}: {}", self.venue, e);
                self.emit(ClientEvent::Error(e));
            }
            TransportEvent::Message(text) => {
                for event in self.router.route(&text) {
                    self.emit(event);
                }
            }
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
    }
}

async fn pump_events(
    inner: Weak<ClientInner>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.handle_transport_event(generation, event);
    }
}

#[async_trait]
impl StreamingClient for WooClient {
    fn venue(&self) -> VenueId {
        self.inner.venue
    }

    fn capabilities(&self) -> Capabilities {
        WOO_CAPABILITIES
    }

    async fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        let transport = {
            let mut slot = inner.transport.lock();
            if slot.is_some() {
                tracing::debug!("Transport for {} already exists", inner.venue);
                return Ok(());
            }

            let (tx, rx) = mpsc::unbounded_channel();
            let transport = inner.factory.create(&inner.url, tx);
            *slot = Some(transport.clone());

            let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let pump = tokio::spawn(pump_events(Arc::downgrade(inner), generation, rx));
            *inner.pump.lock() = Some(pump);
            transport
        };

        transport.connect().await
    }

    async fn close(&self) -> Result<()> {
        let inner = &self.inner;
        let transport = inner.transport.lock().take();
        inner.heartbeat.disarm();
        inner.auth.reset();

        match transport {
            Some(transport) => {
                tracing::info!("Closing {} client {}", inner.venue, self.client_id());
                transport.close().await
            }
            None => Ok(()),
        }
    }

    fn connection_state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    async fn subscribe(&self, channel: Channel, market: &Market) -> Result<()> {
        let inner = &self.inner;
        inner.ensure_supported(channel)?;
        if channel.is_private() && inner.signer.is_none() {
            return Err(AdapterError::MissingCredentials { venue: inner.venue });
        }

        inner.registry.insert(channel, market.clone());
        tracing::info!("Subscribing {} {}", channel, market);
        inner.send_subscribe(channel, market).await
    }

    async fn unsubscribe(&self, channel: Channel, market: &Market) -> Result<()> {
        let inner = &self.inner;
        inner.ensure_supported(channel)?;
        if !inner.registry.contains(channel, market) {
            tracing::debug!("{} {} not subscribed, nothing to do", channel, market);
            return Ok(());
        }

        tracing::info!("Unsubscribing {} {}", channel, market);
        let result = inner.send_unsubscribe(channel, market).await;
        inner.registry.remove(channel, market);

        match result {
            Err(AdapterError::NotConnected { .. }) => Ok(()),
            other => other,
        }
    }
}

impl std::fmt::Debug for WooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooClient")
            .field("client_id", &self.client_id())
            .field("state", &self.connection_state())
            .field("auth", &self.auth_state())
            .finish()
    }
}
