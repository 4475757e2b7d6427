//! Woo REST payloads and their normalized records
//!
//! The REST API returns most numbers as strings and mixes second and
//! millisecond timestamps; the decoders here accept either form.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;
use types::{strip_venue_prefix, Level2Point, Side};

/// Parse a JSON number or numeric string into a decimal
fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// Millisecond timestamp sent as-is
fn de_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_decimal(&value).and_then(|d| d.trunc().to_u64()))
}

/// Second timestamp (possibly fractional) converted to milliseconds
fn de_seconds_as_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_decimal(&value).and_then(|d| (d * Decimal::from(1000)).trunc().to_u64()))
}

/// "1" / 1 / true
fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_u64() == Some(1),
        Value::String(s) => s == "1",
        _ => false,
    })
}

/// Id that may arrive as a number or a string
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Decimal places implied by a step such as `0.0001`
pub fn precision_from_step(step: Decimal) -> u32 {
    step.normalize().scale()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rows<T> {
    #[serde(default = "Vec::new")]
    pub rows: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentInfo {
    pub symbol: String,
    pub quote_tick: Decimal,
    pub base_min: Decimal,
    #[serde(default)]
    pub base_max: Option<Decimal>,
    pub min_notional: Decimal,
}

/// Spot market listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketInfo {
    /// Prefix-free id, e.g. `BTC_USDT`
    pub id: String,
    /// Unified symbol, e.g. `BTC/USDT`
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub amount_precision: u32,
    pub price_precision: u32,
    pub min_amount: Decimal,
    pub max_amount: Option<Decimal>,
    pub min_notional: Decimal,
}

impl InstrumentInfo {
    pub fn normalize(&self) -> Option<MarketInfo> {
        let id = strip_venue_prefix(&self.symbol);
        let (base, quote) = id.split_once('_')?;

        Some(MarketInfo {
            id: id.to_string(),
            symbol: format!("{}/{}", base, quote),
            base: base.to_string(),
            quote: quote.to_string(),
            amount_precision: precision_from_step(self.base_min),
            price_precision: precision_from_step(self.quote_tick),
            min_amount: self.base_min,
            max_amount: self.base_max,
            min_notional: self.min_notional,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenNetwork {
    pub token: String,
    #[serde(default, deserialize_with = "de_flag")]
    pub allow_deposit: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub allow_withdraw: bool,
    #[serde(default)]
    pub withdrawal_fee: Option<Decimal>,
    #[serde(default)]
    pub minimum_withdrawal: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Currency {
    pub code: String,
    /// Both deposits and withdrawals enabled
    pub active: bool,
    pub withdrawal_fee: Option<Decimal>,
    pub min_withdrawal: Option<Decimal>,
}

impl From<&TokenNetwork> for Currency {
    fn from(row: &TokenNetwork) -> Self {
        Self {
            code: row.token.clone(),
            active: row.allow_deposit && row.allow_withdraw,
            withdrawal_fee: row.withdrawal_fee,
            min_withdrawal: row.minimum_withdrawal,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookResponse {
    #[serde(default, deserialize_with = "de_millis")]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
    #[serde(default)]
    pub bids: Vec<BookLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBook {
    pub symbol: String,
    pub timestamp: Option<u64>,
    pub bids: Vec<Level2Point>,
    pub asks: Vec<Level2Point>,
}

impl OrderBookResponse {
    pub fn normalize(self, symbol: &str) -> OrderBook {
        let points = |levels: Vec<BookLevel>| {
            levels
                .into_iter()
                .map(|l| Level2Point::new(l.price, l.quantity))
                .collect()
        };
        OrderBook {
            symbol: strip_venue_prefix(symbol).to_string(),
            timestamp: self.timestamp,
            bids: points(self.bids),
            asks: points(self.asks),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KlineRow {
    #[serde(default, deserialize_with = "de_millis")]
    pub start_timestamp: Option<u64>,
    pub open: Decimal,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Historical candle with quote turnover
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ohlcv {
    pub timestamp_ms: u64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub amount: Option<Decimal>,
}

impl From<&KlineRow> for Ohlcv {
    fn from(row: &KlineRow) -> Self {
        Self {
            timestamp_ms: row.start_timestamp.unwrap_or_default(),
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            amount: row.amount,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoldingResponse {
    #[serde(default)]
    pub holding: Vec<HoldingRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoldingRow {
    pub token: String,
    pub holding: Decimal,
    #[serde(default)]
    pub outstanding_holding: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    pub code: String,
    pub total: Decimal,
    pub free: Decimal,
    pub used: Decimal,
}

impl From<&HoldingRow> for Balance {
    fn from(row: &HoldingRow) -> Self {
        // A negative outstanding holding is reserved by open orders
        let free = if row.outstanding_holding >= Decimal::ZERO {
            row.holding
        } else {
            row.holding + row.outstanding_holding
        };
        Self {
            code: row.token.clone(),
            total: row.holding,
            free,
            used: row.holding - free,
        }
    }
}

/// `GET v1/client/info` body; only the fee rates are read
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfoResponse {
    pub application: ApplicationInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationInfo {
    #[serde(default)]
    pub application_id: Option<String>,
    pub maker_fee_rate: Decimal,
    pub taker_fee_rate: Decimal,
}

/// Maker/taker rates as fractions of notional
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradingFees {
    pub maker: Decimal,
    pub taker: Decimal,
}

impl From<&ApplicationInfo> for TradingFees {
    fn from(info: &ApplicationInfo) -> Self {
        // venue reports basis points
        let bps = Decimal::from(10_000);
        Self {
            maker: info.maker_fee_rate / bps,
            taker: info.taker_fee_rate / bps,
        }
    }
}

/// Order type accepted by `POST v1/order`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
    Ioc,
    Fok,
    PostOnly,
    Ask,
    Bid,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
            OrderType::Ioc => "IOC",
            OrderType::Fok => "FOK",
            OrderType::PostOnly => "POST_ONLY",
            OrderType::Ask => "ASK",
            OrderType::Bid => "BID",
        }
    }
}

/// New order parameters
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    /// Prefix-free market id, e.g. `BTC_USDT`
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    pub quantity: Decimal,
    /// Ignored for market orders
    pub price: Option<Decimal>,
    pub client_order_id: Option<u64>,
    pub order_tag: Option<String>,
    pub visible_quantity: Option<Decimal>,
}

impl OrderRequest {
    pub fn limit(symbol: impl Into<String>, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            order_type: OrderType::Limit,
            side,
            quantity,
            price: Some(price),
            client_order_id: None,
            order_tag: None,
            visible_quantity: None,
        }
    }

    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            order_type: OrderType::Market,
            side,
            quantity,
            price: None,
            client_order_id: None,
            order_tag: None,
            visible_quantity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Closed,
    Canceled,
}

impl OrderStatus {
    pub fn from_wire(status: Option<&str>) -> Self {
        match status {
            Some("FILLED") => OrderStatus::Closed,
            Some("CANCELLED") | Some("REJECTED") => OrderStatus::Canceled,
            _ => OrderStatus::Open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fee {
    pub currency: Option<String>,
    pub cost: Option<Decimal>,
}

/// Raw order as returned by create and fetch
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    #[serde(default, deserialize_with = "de_id")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "de_id")]
    pub client_order_id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default, alias = "order_type", rename = "type")]
    pub order_type: Option<String>,
    #[serde(default, alias = "order_price")]
    pub price: Option<Decimal>,
    #[serde(default, alias = "order_quantity")]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub executed: Option<Decimal>,
    #[serde(default)]
    pub average_executed_price: Option<Decimal>,
    #[serde(default)]
    pub total_fee: Option<Decimal>,
    #[serde(default)]
    pub fee_asset: Option<String>,
    #[serde(default, alias = "timestamp", deserialize_with = "de_seconds_as_millis")]
    pub created_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: Option<String>,
    pub client_order_id: Option<String>,
    /// Unified `BASE/QUOTE` symbol when known
    pub symbol: Option<String>,
    pub order_type: Option<String>,
    pub side: Option<Side>,
    pub price: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub filled: Option<Decimal>,
    pub average: Option<Decimal>,
    pub status: OrderStatus,
    pub timestamp: Option<u64>,
    pub fee: Option<Fee>,
}

/// Unified `BASE/QUOTE` form of a venue symbol
pub fn unified_symbol(symbol: &str) -> String {
    strip_venue_prefix(symbol).replacen('_', "/", 1)
}

impl OrderResponse {
    pub fn normalize(self, fallback_symbol: Option<&str>) -> Order {
        let symbol = self
            .symbol
            .as_deref()
            .or(fallback_symbol)
            .map(unified_symbol);
        let fee = if self.total_fee.is_some() || self.fee_asset.is_some() {
            Some(Fee {
                currency: self.fee_asset,
                cost: self.total_fee,
            })
        } else {
            None
        };

        Order {
            id: self.order_id,
            client_order_id: self.client_order_id,
            symbol,
            order_type: self.order_type,
            side: self.side,
            price: self.price,
            amount: self.quantity,
            filled: self.executed,
            average: self.average_executed_price,
            status: OrderStatus::from_wire(self.status.as_deref()),
            timestamp: self.created_time,
            fee,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeRow {
    #[serde(default, deserialize_with = "de_id")]
    pub id: Option<String>,
    pub symbol: String,
    #[serde(default, deserialize_with = "de_id")]
    pub order_id: Option<String>,
    pub side: Side,
    pub executed_price: Decimal,
    pub executed_quantity: Decimal,
    #[serde(default, deserialize_with = "de_seconds_as_millis")]
    pub executed_timestamp: Option<u64>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub fee_asset: Option<String>,
    #[serde(default)]
    pub is_maker: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Liquidity {
    Maker,
    Taker,
}

/// Own fill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTrade {
    pub id: Option<String>,
    pub order_id: Option<String>,
    /// Prefix-free market id
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub cost: Decimal,
    pub timestamp_ms: Option<u64>,
    pub liquidity: Option<Liquidity>,
    pub fee: Fee,
}

impl From<TradeRow> for AccountTrade {
    fn from(row: TradeRow) -> Self {
        let liquidity = row.is_maker.as_ref().map(|flag| match flag {
            Value::String(s) if s == "0" => Liquidity::Taker,
            Value::Number(n) if n.as_u64() == Some(0) => Liquidity::Taker,
            Value::Bool(false) => Liquidity::Taker,
            _ => Liquidity::Maker,
        });

        Self {
            id: row.id,
            order_id: row.order_id,
            symbol: strip_venue_prefix(&row.symbol).to_string(),
            side: row.side,
            price: row.executed_price,
            amount: row.executed_quantity,
            cost: row.executed_price * row.executed_quantity,
            timestamp_ms: row.executed_timestamp,
            liquidity,
            fee: Fee {
                currency: row.fee_asset,
                cost: row.fee,
            },
        }
    }
}

/// Reply to a cancel request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CancelResult {
    #[serde(default)]
    pub status: Option<String>,
}
