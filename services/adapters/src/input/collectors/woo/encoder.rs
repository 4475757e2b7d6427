//! Outbound frame construction for the Woo stream

use serde_json::json;
use types::{CandlePeriod, Market};

use super::messages::{
    AuthParams, AuthRequest, SnapshotParams, SnapshotRequest, SubscriptionRequest,
};
use crate::input::Channel;
use crate::rest::Signer;
use crate::{AdapterError, Result};

/// Account-scoped execution report topic, shared by every symbol
pub const EXECUTION_REPORT_TOPIC: &str = "executionreport";

/// Connection-scoped identity stamped on every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    client_id: String,
}

impl SessionContext {
    /// `PRIV_<ms>` for authenticated sessions, `PUB_<ms>` otherwise
    pub fn new(private: bool) -> Self {
        let prefix = if private { "PRIV" } else { "PUB" };
        Self {
            client_id: format!("{}_{}", prefix, chrono::Utc::now().timestamp_millis()),
        }
    }

    pub fn with_client_id(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

/// Builds subscribe, unsubscribe, snapshot and auth frames
#[derive(Debug, Clone)]
pub struct SubscriptionEncoder {
    session: SessionContext,
    candle_period: CandlePeriod,
}

impl SubscriptionEncoder {
    pub fn new(session: SessionContext, candle_period: CandlePeriod) -> Self {
        Self {
            session,
            candle_period,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Wire topic for a channel and market
    pub fn topic(&self, channel: Channel, market: &Market) -> Result<String> {
        let topic = match channel {
            Channel::Ticker => format!("{}@ticker", market.symbol),
            Channel::Trade => format!("{}@trade", market.symbol),
            Channel::Candle => format!("{}@kline_{}", market.symbol, self.candle_period),
            Channel::Level2 => format!("{}@orderbookupdate", market.symbol),
            Channel::Bbo => format!("{}@bbo", market.symbol),
            Channel::Orders => EXECUTION_REPORT_TOPIC.to_string(),
            Channel::Level2Snapshots | Channel::Level3 => {
                return Err(AdapterError::NotSupported(format!(
                    "{} channel on Woo",
                    channel
                )))
            }
        };
        Ok(topic)
    }

    /// Frames for a subscribe, in send order
    ///
    /// Level2 is a two-frame protocol: the subscribe frame, then a snapshot
    /// request seeding the consumer's book.
    pub fn subscribe_frames(&self, channel: Channel, market: &Market) -> Result<Vec<String>> {
        let mut frames = vec![self.subscription(channel, market, "subscribe")?];
        if channel == Channel::Level2 {
            frames.push(self.snapshot_request(market)?);
        }
        Ok(frames)
    }

    pub fn unsubscribe_frame(&self, channel: Channel, market: &Market) -> Result<String> {
        self.subscription(channel, market, "unsubscribe")
    }

    fn subscription(&self, channel: Channel, market: &Market, event: &'static str) -> Result<String> {
        let topic = self.topic(channel, market)?;
        Ok(serde_json::to_string(&SubscriptionRequest {
            id: self.session.client_id(),
            topic: &topic,
            event,
        })?)
    }

    pub fn snapshot_request(&self, market: &Market) -> Result<String> {
        Ok(serde_json::to_string(&SnapshotRequest {
            id: self.session.client_id(),
            event: "request",
            params: SnapshotParams {
                kind: "orderbook",
                symbol: &market.symbol,
            },
        })?)
    }

    /// Signed auth challenge for `timestamp_ms`
    pub fn auth_frame(&self, signer: &Signer, timestamp_ms: u64) -> Result<String> {
        Ok(serde_json::to_string(&AuthRequest {
            id: self.session.client_id(),
            event: "auth",
            params: AuthParams {
                apikey: signer.api_key(),
                sign: signer.sign_challenge(timestamp_ms)?,
                timestamp: timestamp_ms.to_string(),
            },
        })?)
    }

    /// Heartbeat frame; carries no id
    pub fn ping_frame() -> String {
        json!({"event": "ping"}).to_string()
    }
}
