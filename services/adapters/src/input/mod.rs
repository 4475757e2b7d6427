//! Input adapters for collecting market data from exchange streams

pub mod collectors;
pub mod connection;

use crate::{AdapterError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use types::{Market, VenueId};

pub use connection::{
    ConnectionConfig, ConnectionState, Transport, TransportEvent, TransportFactory, WsTransport,
    WsTransportFactory,
};

/// Category of streamed data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Ticker,
    Trade,
    Candle,
    Level2,
    Bbo,
    /// Account execution reports
    Orders,
    Level2Snapshots,
    Level3,
}

impl Channel {
    /// Channels tracked by a subscription registry
    pub const TRACKED: [Channel; 6] = [
        Channel::Ticker,
        Channel::Trade,
        Channel::Candle,
        Channel::Level2,
        Channel::Bbo,
        Channel::Orders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Ticker => "ticker",
            Channel::Trade => "trade",
            Channel::Candle => "candle",
            Channel::Level2 => "level2",
            Channel::Bbo => "bbo",
            Channel::Orders => "orders",
            Channel::Level2Snapshots => "level2_snapshots",
            Channel::Level3 => "level3",
        }
    }

    /// Channel requires an authenticated session
    pub fn is_private(&self) -> bool {
        matches!(self, Channel::Orders)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        let channel = match s.to_ascii_lowercase().as_str() {
            "ticker" => Channel::Ticker,
            "trade" | "trades" => Channel::Trade,
            "candle" | "candles" | "kline" => Channel::Candle,
            "level2" | "l2update" => Channel::Level2,
            "bbo" => Channel::Bbo,
            "orders" | "executionreport" => Channel::Orders,
            "level2_snapshots" | "l2snapshot" => Channel::Level2Snapshots,
            "level3" => Channel::Level3,
            other => {
                return Err(AdapterError::Configuration(format!(
                    "unknown channel: {}",
                    other
                )))
            }
        };
        Ok(channel)
    }
}

/// Channels a client can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub has_tickers: bool,
    pub has_trades: bool,
    pub has_candles: bool,
    pub has_level2_updates: bool,
    pub has_level2_snapshots: bool,
    pub has_level3_updates: bool,
    pub has_bbo: bool,
    pub has_orders: bool,
}

impl Capabilities {
    pub fn supports(&self, channel: Channel) -> bool {
        match channel {
            Channel::Ticker => self.has_tickers,
            Channel::Trade => self.has_trades,
            Channel::Candle => self.has_candles,
            Channel::Level2 => self.has_level2_updates,
            Channel::Level2Snapshots => self.has_level2_snapshots,
            Channel::Level3 => self.has_level3_updates,
            Channel::Bbo => self.has_bbo,
            Channel::Orders => self.has_orders,
        }
    }
}

/// Core trait for per-exchange streaming clients
#[async_trait]
pub trait StreamingClient: Send + Sync {
    /// Get the venue this client connects to
    fn venue(&self) -> VenueId;

    /// Channels this client can serve
    fn capabilities(&self) -> Capabilities;

    /// Open the transport; a no-op when one already exists
    async fn connect(&self) -> Result<()>;

    /// Close the transport and drop it
    async fn close(&self) -> Result<()>;

    /// Current connection state
    fn connection_state(&self) -> ConnectionState;

    /// Subscribe to a channel for a market
    async fn subscribe(&self, channel: Channel, market: &Market) -> Result<()>;

    /// Unsubscribe from a channel for a market
    async fn unsubscribe(&self, channel: Channel, market: &Market) -> Result<()>;
}
