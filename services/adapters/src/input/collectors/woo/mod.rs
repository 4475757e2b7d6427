//! Woo exchange streaming client
//!
//! Public market data (ticker, trade, kline, orderbook updates, BBO) and the
//! private execution report stream over one WebSocket connection.
//!
//! ## Data Format Reference
//!
//! Requests are JSON objects stamped with the connection's client id:
//!
//! ```text
//! {"id":"PUB_1639246424000","topic":"SPOT_BTC_USDT@trade","event":"subscribe"}
//! {"id":"PRIV_1639246424000","event":"auth","params":{"apikey":"..","sign":"..","timestamp":"1639246424000"}}
//! {"id":"PUB_1639246424000","event":"request","params":{"type":"orderbook","symbol":"SPOT_BTC_USDT"}}
//! {"event":"ping"}
//! ```
//!
//! See [`messages`] for the inbound shapes.

pub mod auth;
pub mod client;
pub mod encoder;
pub mod heartbeat;
pub mod messages;
pub mod registry;
pub mod router;

pub use auth::{AuthHandshake, AuthState};
pub use client::{WooClient, WOO_CAPABILITIES};
pub use encoder::{SessionContext, SubscriptionEncoder, EXECUTION_REPORT_TOPIC};
pub use registry::SubscriptionRegistry;
pub use router::{classify_topic, InboundRouter};
