//! Woo stream wire formats
//!
//! Inbound frames are JSON objects (or arrays of them) keyed either by
//! `event` (control replies) or by `topic` (channel data):
//!
//! ```text
//! {"id":"PRIV_1639246424000","event":"auth","success":true,"ts":1639246424459}
//! {"event":"pong","ts":1639246424459}
//! {"topic":"SPOT_BTC_USDT@trade","ts":1639246424459,
//!  "data":{"symbol":"SPOT_BTC_USDT","price":48681.12,"size":0.00104,"side":"SELL"}}
//! {"topic":"SPOT_BTC_USDT@orderbookupdate","ts":1639247399388,
//!  "data":{"symbol":"SPOT_BTC_USDT","prevTs":1639247399189,"asks":[[48700.1,0.5]],"bids":[]}}
//! {"id":"PUB_1639247994019","event":"request","success":true,"ts":1639247993451,
//!  "data":{"symbol":"SPOT_BTC_USDT","ts":1639247993389,"asks":[...],"bids":[...]}}
//! ```
//!
//! Prices and sizes arrive as JSON numbers and are decoded straight into
//! `Decimal`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use types::{Level2Point, Side};

/// Control frame, discriminated by its `event` field
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum EventMessage {
    Subscribe {
        #[serde(default)]
        success: Option<bool>,
        #[serde(default)]
        topic: Option<String>,
    },
    Unsubscribe {
        #[serde(default)]
        success: Option<bool>,
        #[serde(default)]
        topic: Option<String>,
    },
    Auth {
        #[serde(default)]
        success: bool,
    },
    Error {
        #[serde(default, rename = "errorMsg")]
        error_msg: Option<String>,
    },
    Ping,
    Pong,
    Request {
        #[serde(default)]
        data: Option<SnapshotData>,
    },
    #[serde(other)]
    Unknown,
}

/// Channel data frame
#[derive(Debug, Clone, Deserialize)]
pub struct TopicFrame<T> {
    pub topic: String,
    #[serde(default)]
    pub ts: Option<u64>,
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeData {
    pub symbol: String,
    pub price: Decimal,
    pub size: Decimal,
    pub side: Side,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineData {
    pub symbol: String,
    #[serde(rename = "type", default)]
    pub period: Option<String>,
    pub open: Decimal,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    #[serde(default)]
    pub amount: Option<Decimal>,
    pub start_time: u64,
    #[serde(default)]
    pub end_time: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerData {
    pub symbol: String,
    pub open: Decimal,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Book level as sent on the wire: `[price, size]`
pub type WireLevel = [Decimal; 2];

pub fn to_points(levels: &[WireLevel]) -> Vec<Level2Point> {
    levels
        .iter()
        .map(|[price, size]| Level2Point::new(*price, *size))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookUpdateData {
    pub symbol: String,
    #[serde(default)]
    pub prev_ts: Option<u64>,
    #[serde(default)]
    pub asks: Vec<WireLevel>,
    #[serde(default)]
    pub bids: Vec<WireLevel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BboData {
    pub symbol: String,
    pub ask: Decimal,
    pub ask_size: Decimal,
    pub bid: Decimal,
    pub bid_size: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReportData {
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: Side,
    pub order_id: u64,
    pub timestamp: u64,
    pub quantity: Decimal,
    pub total_executed_quantity: Decimal,
    pub price: Decimal,
    pub status: String,
}

/// Payload of an on-demand order book `request` reply
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotData {
    pub symbol: String,
    pub ts: u64,
    #[serde(default)]
    pub asks: Vec<WireLevel>,
    #[serde(default)]
    pub bids: Vec<WireLevel>,
}

/// Subscribe or unsubscribe request
#[derive(Debug, Serialize)]
pub struct SubscriptionRequest<'a> {
    pub id: &'a str,
    pub topic: &'a str,
    pub event: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AuthParams<'a> {
    pub apikey: &'a str,
    pub sign: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub id: &'a str,
    pub event: &'static str,
    pub params: AuthParams<'a>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotParams<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub symbol: &'a str,
}

/// One-shot order book snapshot request
#[derive(Debug, Serialize)]
pub struct SnapshotRequest<'a> {
    pub id: &'a str,
    pub event: &'static str,
    pub params: SnapshotParams<'a>,
}

/// Read the `topic` discriminator of a frame
pub fn topic_of(frame: &Value) -> Option<&str> {
    frame.get("topic").and_then(Value::as_str)
}
