//! Canonical market-data and account events
//!
//! These are the exchange-agnostic value objects handed to downstream
//! consumers. They own no resources and are never mutated after
//! construction by the adapter that produced them.
//!
//! Fields a venue does not provide on a given channel are left as `None`
//! rather than synthesized.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{TypeError, VenueId};

/// Aggressor or order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(TypeError::InvalidSide(s.to_string())),
        }
    }
}

/// Rolling 24h ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub exchange: VenueId,
    pub base: String,
    pub quote: String,
    /// Exchange timestamp in milliseconds, when the channel reports one
    pub timestamp: Option<u64>,
    pub last: Decimal,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    pub quote_volume: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
    pub bid: Option<Decimal>,
    pub bid_volume: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub ask_volume: Option<Decimal>,
}

/// Public trade print
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub exchange: VenueId,
    pub base: String,
    pub quote: String,
    pub trade_id: Option<String>,
    pub side: Side,
    /// Exchange execution time in milliseconds
    pub unix: Option<u64>,
    pub price: Decimal,
    pub amount: Decimal,
    pub buy_order_id: Option<String>,
    pub sell_order_id: Option<String>,
}

/// OHLCV candle keyed by its open time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle start time in milliseconds
    pub timestamp_ms: u64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// One price level of an order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level2Point {
    pub price: Decimal,
    pub size: Decimal,
}

impl Level2Point {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// A zero size removes the level from a book
    pub fn is_removal(&self) -> bool {
        self.size.is_zero()
    }
}

/// Incremental order book update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level2Update {
    pub exchange: VenueId,
    pub base: String,
    pub quote: String,
    /// Timestamp of this update, used as its sequence id
    pub sequence_id: u64,
    /// Timestamp of the update this one builds on
    pub prev_sequence_id: Option<u64>,
    pub asks: Vec<Level2Point>,
    pub bids: Vec<Level2Point>,
}

impl Level2Update {
    /// True when this update directly follows `sequence_id` with no gap
    pub fn follows(&self, sequence_id: u64) -> bool {
        self.prev_sequence_id == Some(sequence_id)
    }
}

/// Full order book image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level2Snapshot {
    pub exchange: VenueId,
    pub base: String,
    pub quote: String,
    pub sequence_id: u64,
    pub asks: Vec<Level2Point>,
    pub bids: Vec<Level2Point>,
}

/// Best bid and offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BboUpdate {
    pub exchange: VenueId,
    pub base: String,
    pub quote: String,
    pub sequence_id: u64,
    pub ask: Level2Point,
    pub bid: Level2Point,
}

impl BboUpdate {
    pub fn spread(&self) -> Decimal {
        self.ask.price - self.bid.price
    }
}

/// Execution report for an account order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    pub exchange: VenueId,
    /// Prefix-free venue symbol, e.g. `BTC_USDT`
    pub symbol: String,
    pub order_type: String,
    pub side: Side,
    pub order_id: u64,
    /// Event time in milliseconds
    pub time: u64,
    pub size: Decimal,
    pub filled_size: Decimal,
    pub price: Decimal,
    /// `size - filled_size`
    pub remain_size: Decimal,
    pub status: String,
    pub timestamp: u64,
}

/// Candle interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandlePeriod {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1mon")]
    OneMonth,
}

impl CandlePeriod {
    /// Interval code as used in topics and REST queries
    pub fn as_str(&self) -> &'static str {
        match self {
            CandlePeriod::OneMinute => "1m",
            CandlePeriod::FiveMinutes => "5m",
            CandlePeriod::FifteenMinutes => "15m",
            CandlePeriod::ThirtyMinutes => "30m",
            CandlePeriod::OneHour => "1h",
            CandlePeriod::FourHours => "4h",
            CandlePeriod::TwelveHours => "12h",
            CandlePeriod::OneDay => "1d",
            CandlePeriod::OneWeek => "1w",
            CandlePeriod::OneMonth => "1mon",
        }
    }
}

impl Default for CandlePeriod {
    fn default() -> Self {
        CandlePeriod::OneMinute
    }
}

impl fmt::Display for CandlePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandlePeriod {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let period = match s {
            "1m" => CandlePeriod::OneMinute,
            "5m" => CandlePeriod::FiveMinutes,
            "15m" => CandlePeriod::FifteenMinutes,
            "30m" => CandlePeriod::ThirtyMinutes,
            "1h" => CandlePeriod::OneHour,
            "4h" => CandlePeriod::FourHours,
            "12h" => CandlePeriod::TwelveHours,
            "1d" => CandlePeriod::OneDay,
            "1w" => CandlePeriod::OneWeek,
            "1mon" => CandlePeriod::OneMonth,
            other => return Err(TypeError::UnknownCandlePeriod(other.to_string())),
        };
        Ok(period)
    }
}
