//! Shared fixtures for the adapter integration tests
//!
//! `MockTransport` records every frame the client sends and lets a test
//! inject lifecycle events and inbound messages as if they came off the wire.

#![allow(dead_code)]

use adapter_service::{
    AdapterError, ChannelSink, ClientEvent, Result, Transport, TransportEvent, TransportFactory,
    WooClient, WooConfig, WooCredentials,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use types::{Market, VenueId};

pub struct MockTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    sent: Mutex<Vec<String>>,
    fail_sends: AtomicBool,
}

impl MockTransport {
    fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Deliver an event to the client as the transport would
    pub fn inject(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    pub fn inject_message(&self, frame: Value) {
        self.inject(TransportEvent::Message(frame.to_string()));
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    /// Sent frames whose `event` field equals `event`
    pub fn sent_events(&self, event: &str) -> Vec<Value> {
        self.sent_json()
            .into_iter()
            .filter(|frame| frame["event"] == event)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<()> {
        self.inject(TransportEvent::Connecting);
        self.inject(TransportEvent::Connected);
        Ok(())
    }

    async fn send(&self, frame: String) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AdapterError::ConnectionClosed {
                venue: VenueId::Woo,
                reason: Some("mock send failure".to_string()),
            });
        }
        self.sent.lock().push(frame);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inject(TransportEvent::Closing);
        self.inject(TransportEvent::Closed);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockFactory {
    created: AtomicUsize,
    last: Mutex<Option<Arc<MockTransport>>>,
}

impl MockFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Transport handed out most recently
    pub fn transport(&self) -> Arc<MockTransport> {
        self.last
            .lock()
            .clone()
            .expect("no transport created yet")
    }
}

impl TransportFactory for MockFactory {
    fn create(
        &self,
        _url: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Arc<dyn Transport> {
        let transport = Arc::new(MockTransport::new(events));
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(transport.clone());
        transport
    }
}

pub struct Harness {
    pub client: WooClient,
    pub factory: Arc<MockFactory>,
    pub events: mpsc::UnboundedReceiver<ClientEvent>,
}

impl Harness {
    pub fn transport(&self) -> Arc<MockTransport> {
        self.factory.transport()
    }

    /// Next event, failing the test after two seconds
    pub async fn next_event(&mut self) -> ClientEvent {
        tokio::time::timeout(Duration::from_secs(2), self.events.recv())
            .await
            .expect("timed out waiting for client event")
            .expect("event channel closed")
    }

    /// Skip events until one named `name` arrives
    pub async fn expect_event(&mut self, name: &str) -> ClientEvent {
        loop {
            let event = self.next_event().await;
            if event.name() == name {
                return event;
            }
        }
    }

    /// Connect and wait until the client has seen `Connected`
    pub async fn connect(&mut self) {
        use adapter_service::StreamingClient;
        self.client.connect().await.expect("connect");
        self.expect_event("connected").await;
    }
}

pub fn test_config(with_credentials: bool) -> WooConfig {
    WooConfig {
        application_id: "test-app".to_string(),
        send_throttle_ms: 0,
        rest_throttle_ms: 0,
        credentials: with_credentials.then(|| WooCredentials {
            api_key: "test-key".to_string(),
            secret: "test-secret".to_string(),
        }),
        ..WooConfig::default()
    }
}

pub fn harness(with_credentials: bool) -> Harness {
    harness_with_config(test_config(with_credentials))
}

pub fn harness_with_config(config: WooConfig) -> Harness {
    let factory = Arc::new(MockFactory::default());
    let (sink, events) = ChannelSink::new();
    let client = WooClient::with_transport_factory(&config, factory.clone(), Arc::new(sink))
        .expect("valid test config");
    Harness {
        client,
        factory,
        events,
    }
}

pub fn btc_usdt() -> Market {
    Market::spot(VenueId::Woo, "BTC", "USDT")
}

pub fn eth_usdt() -> Market {
    Market::spot(VenueId::Woo, "ETH", "USDT")
}

/// Poll `condition` until it holds, failing the test after two seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
