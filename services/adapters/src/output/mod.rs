//! Output side: delivery of canonical events to downstream consumers
//!
//! Every normalized event, lifecycle notification and surfaced error leaves
//! the adapter as a [`ClientEvent`] through an [`EventSink`]. Errors travel
//! on the same path as data so nothing is thrown across the event boundary.

use tokio::sync::mpsc;
use types::{
    BboUpdate, Candle, Level2Snapshot, Level2Update, Market, OrderReport, Ticker, Trade,
};

use crate::AdapterError;

/// Event emitted by a streaming client
#[derive(Debug)]
pub enum ClientEvent {
    Ticker(Ticker, Market),
    Trade(Trade, Market),
    Candle(Candle, Market),
    Level2Update(Level2Update, Market),
    Level2Snapshot(Level2Snapshot, Market),
    Bbo(BboUpdate, Market),
    /// Account-scoped, carries no market
    Orders(OrderReport),
    /// Heartbeat acknowledgement
    Pong,
    Connecting,
    Connected,
    Disconnected,
    Closing,
    Closed,
    /// Generic error channel
    Error(AdapterError),
}

impl ClientEvent {
    /// Canonical event name
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Ticker(..) => "ticker",
            ClientEvent::Trade(..) => "trade",
            ClientEvent::Candle(..) => "candle",
            ClientEvent::Level2Update(..) => "l2update",
            ClientEvent::Level2Snapshot(..) => "l2snapshot",
            ClientEvent::Bbo(..) => "bbo",
            ClientEvent::Orders(_) => "orders",
            ClientEvent::Pong => "pong",
            ClientEvent::Connecting => "connecting",
            ClientEvent::Connected => "connected",
            ClientEvent::Disconnected => "disconnected",
            ClientEvent::Closing => "closing",
            ClientEvent::Closed => "closed",
            ClientEvent::Error(_) => "error",
        }
    }

    /// Market the event was resolved against, if any
    pub fn market(&self) -> Option<&Market> {
        match self {
            ClientEvent::Ticker(_, m)
            | ClientEvent::Trade(_, m)
            | ClientEvent::Candle(_, m)
            | ClientEvent::Level2Update(_, m)
            | ClientEvent::Level2Snapshot(_, m)
            | ClientEvent::Bbo(_, m) => Some(m),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ClientEvent::Error(_))
    }
}

/// Destination for client events
pub trait EventSink: Send + Sync {
    /// Deliver one event; must not block
    fn emit(&self, event: ClientEvent);
}

/// Sink forwarding events over an unbounded tokio channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver consumers read from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ClientEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("Dropping {} event, receiver gone", e.0.name());
        }
    }
}
