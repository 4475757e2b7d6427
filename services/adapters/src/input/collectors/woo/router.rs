//! Inbound frame classification and normalization
//!
//! Each frame is handled by its `event` discriminator if present, otherwise
//! by its `topic`. Topics are matched against [`TOPIC_ROUTES`] in order and
//! the first match wins. Data for markets missing from the channel's
//! registry is dropped without an error.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use types::{
    strip_venue_prefix, BboUpdate, Candle, Level2Point, Level2Snapshot, Level2Update, Market,
    OrderReport, Ticker, Trade, VenueId,
};

use super::auth::AuthHandshake;
use super::encoder::EXECUTION_REPORT_TOPIC;
use super::messages::{
    self, BboData, EventMessage, ExecutionReportData, KlineData, OrderBookUpdateData,
    SnapshotData, TickerData, TopicFrame, TradeData,
};
use super::registry::SubscriptionRegistry;
use crate::input::Channel;
use crate::output::ClientEvent;
use crate::{AdapterError, Result};

/// How a route recognizes its topic
#[derive(Debug, Clone, Copy)]
pub enum TopicMatch {
    Exact(&'static str),
    Contains(&'static str),
}

impl TopicMatch {
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicMatch::Exact(expected) => topic == *expected,
            TopicMatch::Contains(suffix) => topic.contains(suffix),
        }
    }
}

type Handler = fn(&InboundRouter, &Value) -> Result<Option<ClientEvent>>;

pub struct TopicRoute {
    pub matcher: TopicMatch,
    pub channel: Channel,
    handler: Handler,
}

/// Topic dispatch table in priority order
pub static TOPIC_ROUTES: [TopicRoute; 6] = [
    TopicRoute {
        matcher: TopicMatch::Exact(EXECUTION_REPORT_TOPIC),
        channel: Channel::Orders,
        handler: InboundRouter::orders,
    },
    TopicRoute {
        matcher: TopicMatch::Contains("@trade"),
        channel: Channel::Trade,
        handler: InboundRouter::trade,
    },
    TopicRoute {
        matcher: TopicMatch::Contains("@kline"),
        channel: Channel::Candle,
        handler: InboundRouter::candle,
    },
    TopicRoute {
        matcher: TopicMatch::Contains("@ticker"),
        channel: Channel::Ticker,
        handler: InboundRouter::ticker,
    },
    TopicRoute {
        matcher: TopicMatch::Contains("@orderbookupdate"),
        channel: Channel::Level2,
        handler: InboundRouter::level2_update,
    },
    TopicRoute {
        matcher: TopicMatch::Contains("@bbo"),
        channel: Channel::Bbo,
        handler: InboundRouter::bbo,
    },
];

/// Channel a topic routes to, if any
pub fn classify_topic(topic: &str) -> Option<Channel> {
    TOPIC_ROUTES
        .iter()
        .find(|route| route.matcher.matches(topic))
        .map(|route| route.channel)
}

pub struct InboundRouter {
    venue: VenueId,
    registry: Arc<SubscriptionRegistry>,
    auth: Arc<AuthHandshake>,
}

impl InboundRouter {
    pub fn new(
        venue: VenueId,
        registry: Arc<SubscriptionRegistry>,
        auth: Arc<AuthHandshake>,
    ) -> Self {
        Self {
            venue,
            registry,
            auth,
        }
    }

    /// Classify one raw text frame, which may be a batch
    ///
    /// Events come back in arrival order. Failures become
    /// [`ClientEvent::Error`] entries and never abort the rest of a batch.
    pub fn route(&self, raw: &str) -> Vec<ClientEvent> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                return vec![ClientEvent::Error(self.parse_error("inbound frame", e))];
            }
        };

        let mut events = Vec::new();
        match &value {
            Value::Array(frames) => {
                for frame in frames {
                    self.route_frame(frame, &mut events);
                }
            }
            frame => self.route_frame(frame, &mut events),
        }
        events
    }

    fn route_frame(&self, frame: &Value, events: &mut Vec<ClientEvent>) {
        let outcome = if frame.get("event").is_some() {
            self.route_event(frame)
        } else if let Some(topic) = messages::topic_of(frame) {
            self.route_topic(topic, frame)
        } else {
            tracing::debug!("Ignoring {} frame without event or topic: {}", self.venue, frame);
            Ok(None)
        };

        match outcome {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("{} frame surfaced an error: {}", self.venue, e);
                events.push(ClientEvent::Error(e));
            }
        }
    }

    fn route_event(&self, frame: &Value) -> Result<Option<ClientEvent>> {
        let message = EventMessage::deserialize(frame)
            .map_err(|e| self.parse_error("event frame", e))?;

        match message {
            EventMessage::Subscribe { success, topic } | EventMessage::Unsubscribe { success, topic } => {
                if success == Some(false) {
                    return Err(AdapterError::SubscriptionRejected {
                        topic,
                        payload: frame.clone(),
                    });
                }
                tracing::debug!("{} acknowledged {:?}", self.venue, topic);
                Ok(None)
            }
            EventMessage::Auth { success } => {
                self.auth.resolve(success);
                if success {
                    Ok(None)
                } else {
                    Err(AdapterError::AuthenticationFailed { venue: self.venue })
                }
            }
            EventMessage::Error { error_msg } => {
                tracing::error!("{} reported error: {:?}", self.venue, error_msg);
                Err(AdapterError::RemoteError {
                    venue: self.venue,
                    payload: frame.clone(),
                })
            }
            EventMessage::Pong => Ok(Some(ClientEvent::Pong)),
            EventMessage::Request { data: Some(data) } => self.level2_snapshot(data),
            EventMessage::Request { data: None } | EventMessage::Ping | EventMessage::Unknown => {
                tracing::debug!("Ignoring {} event frame: {}", self.venue, frame);
                Ok(None)
            }
        }
    }

    fn route_topic(&self, topic: &str, frame: &Value) -> Result<Option<ClientEvent>> {
        match TOPIC_ROUTES.iter().find(|route| route.matcher.matches(topic)) {
            Some(route) => (route.handler)(self, frame),
            None => {
                tracing::debug!("Ignoring {} frame on unrouted topic {}", self.venue, topic);
                Ok(None)
            }
        }
    }

    fn decode<'a, T: Deserialize<'a>>(&self, frame: &'a Value, what: &str) -> Result<T> {
        T::deserialize(frame).map_err(|e| self.parse_error(what, e))
    }

    fn parse_error(&self, what: &str, error: serde_json::Error) -> AdapterError {
        AdapterError::ParseError {
            venue: self.venue,
            message: format!("malformed {}", what),
            error: error.to_string(),
        }
    }

    fn resolve(&self, channel: Channel, symbol: &str) -> Option<Market> {
        let market = self.registry.lookup(channel, symbol);
        if market.is_none() {
            tracing::debug!(
                "Dropping {} {} frame for unsubscribed {}",
                self.venue,
                channel,
                symbol
            );
        }
        market
    }

    fn orders(&self, frame: &Value) -> Result<Option<ClientEvent>> {
        let msg: TopicFrame<ExecutionReportData> = self.decode(frame, "execution report")?;
        let data = msg.data;

        Ok(Some(ClientEvent::Orders(OrderReport {
            exchange: self.venue,
            symbol: strip_venue_prefix(&data.symbol).to_string(),
            order_type: data.order_type,
            side: data.side,
            order_id: data.order_id,
            time: data.timestamp,
            size: data.quantity,
            filled_size: data.total_executed_quantity,
            price: data.price,
            remain_size: data.quantity - data.total_executed_quantity,
            status: data.status,
            timestamp: data.timestamp,
        })))
    }

    fn trade(&self, frame: &Value) -> Result<Option<ClientEvent>> {
        let msg: TopicFrame<TradeData> = self.decode(frame, "trade")?;
        let Some(market) = self.resolve(Channel::Trade, &msg.data.symbol) else {
            return Ok(None);
        };

        let trade = Trade {
            exchange: self.venue,
            base: market.base.clone(),
            quote: market.quote.clone(),
            trade_id: None,
            side: msg.data.side,
            unix: None,
            price: msg.data.price,
            amount: msg.data.size,
            buy_order_id: None,
            sell_order_id: None,
        };
        Ok(Some(ClientEvent::Trade(trade, market)))
    }

    fn candle(&self, frame: &Value) -> Result<Option<ClientEvent>> {
        let msg: TopicFrame<KlineData> = self.decode(frame, "kline")?;
        let Some(market) = self.resolve(Channel::Candle, &msg.data.symbol) else {
            return Ok(None);
        };

        let data = msg.data;
        let candle = Candle {
            timestamp_ms: data.start_time,
            open: data.open,
            high: data.high,
            low: data.low,
            close: data.close,
            volume: data.volume,
        };
        Ok(Some(ClientEvent::Candle(candle, market)))
    }

    fn ticker(&self, frame: &Value) -> Result<Option<ClientEvent>> {
        let msg: TopicFrame<TickerData> = self.decode(frame, "ticker")?;
        let Some(market) = self.resolve(Channel::Ticker, &msg.data.symbol) else {
            return Ok(None);
        };

        let data = msg.data;
        let ticker = Ticker {
            exchange: self.venue,
            base: market.base.clone(),
            quote: market.quote.clone(),
            timestamp: None,
            last: data.close,
            open: data.open,
            high: data.high,
            low: data.low,
            volume: data.volume,
            quote_volume: None,
            change: None,
            change_percent: None,
            bid: None,
            bid_volume: None,
            ask: None,
            ask_volume: None,
        };
        Ok(Some(ClientEvent::Ticker(ticker, market)))
    }

    fn level2_update(&self, frame: &Value) -> Result<Option<ClientEvent>> {
        let msg: TopicFrame<OrderBookUpdateData> = self.decode(frame, "orderbook update")?;
        let Some(market) = self.resolve(Channel::Level2, &msg.data.symbol) else {
            return Ok(None);
        };

        let update = Level2Update {
            exchange: self.venue,
            base: market.base.clone(),
            quote: market.quote.clone(),
            sequence_id: msg.ts.unwrap_or_default(),
            prev_sequence_id: msg.data.prev_ts,
            asks: messages::to_points(&msg.data.asks),
            bids: messages::to_points(&msg.data.bids),
        };
        Ok(Some(ClientEvent::Level2Update(update, market)))
    }

    fn bbo(&self, frame: &Value) -> Result<Option<ClientEvent>> {
        let msg: TopicFrame<BboData> = self.decode(frame, "bbo")?;
        let Some(market) = self.resolve(Channel::Bbo, &msg.data.symbol) else {
            return Ok(None);
        };

        let data = msg.data;
        let bbo = BboUpdate {
            exchange: self.venue,
            base: market.base.clone(),
            quote: market.quote.clone(),
            sequence_id: msg.ts.unwrap_or_default(),
            ask: Level2Point::new(data.ask, data.ask_size),
            bid: Level2Point::new(data.bid, data.bid_size),
        };
        Ok(Some(ClientEvent::Bbo(bbo, market)))
    }

    fn level2_snapshot(&self, data: SnapshotData) -> Result<Option<ClientEvent>> {
        let Some(market) = self.resolve(Channel::Level2, &data.symbol) else {
            return Ok(None);
        };

        let snapshot = Level2Snapshot {
            exchange: self.venue,
            base: market.base.clone(),
            quote: market.quote.clone(),
            sequence_id: data.ts,
            asks: messages::to_points(&data.asks),
            bids: messages::to_points(&data.bids),
        };
        Ok(Some(ClientEvent::Level2Snapshot(snapshot, market)))
    }
}
