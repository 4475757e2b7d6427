//! # Woo Adapter - Streaming and REST Client for the Woo Exchange
//!
//! ## Purpose
//!
//! Connects to the Woo WebSocket API, keeps the connection alive across
//! drops, authenticates for private data, and normalizes every inbound frame
//! into the venue-agnostic events defined in the `types` crate. A REST
//! collaborator covers reference data, balances and order management with
//! the same credentials.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Woo public and private WebSocket streams, Woo REST v1/v2
//! - **Output Destinations**: any [`EventSink`]; [`ChannelSink`] hands events to a tokio channel
//! - **Configuration**: [`WooConfig`] from TOML with `WOO_*` environment overrides
//! - **Error Handling**: [`AdapterError`] travels on the event path as [`ClientEvent::Error`]
//!
//! ## Component Layout
//!
//! ```text
//! Transport (input::connection)
//!     |  TransportEvent
//!     v
//! WooClient ---- Heartbeat (ping every interval while connected)
//!     |    \---- AuthHandshake (single in-flight challenge)
//!     |     \--- SubscriptionRegistry (replayed after reconnect)
//!     v
//! InboundRouter --> ClientEvent --> EventSink
//! ```
//!
//! ## Connection Lifecycle
//!
//! - `connect()` is idempotent; the transport reconnects on its own with backoff
//! - Every `Connected` resets auth, arms the heartbeat and replays the registry,
//!   so subscriptions made before the socket is up go out once it is
//! - `Disconnected` and `Closed` disarm the heartbeat and reset auth
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use adapter_service::{
//!     AdapterError, ChannelSink, Channel, StreamingClient, WooClient, WooConfig,
//! };
//! use std::sync::Arc;
//! use types::{Market, VenueId};
//!
//! # async fn run() -> adapter_service::Result<()> {
//! let config = WooConfig::from_env();
//! let (sink, mut events) = ChannelSink::new();
//! let client = WooClient::new(&config, Arc::new(sink))?;
//!
//! client.connect().await?;
//! let market = Market::spot(VenueId::Woo, "BTC", "USDT");
//! match client.subscribe(Channel::Trade, &market).await {
//!     // recorded; sent when the connection comes up
//!     Ok(()) | Err(AdapterError::NotConnected { .. }) => {}
//!     Err(e) => return Err(e),
//! }
//!
//! while let Some(event) = events.recv().await {
//!     println!("{}: {:?}", event.name(), event);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod rate_limit;
pub mod rest;

pub use config::{BaseAdapterConfig, WooConfig, WooCredentials};
pub use error::{AdapterError, Result};
pub use input::collectors::woo::{AuthState, WOO_CAPABILITIES};
pub use input::collectors::WooClient;
pub use input::{
    Capabilities, Channel, ConnectionState, StreamingClient, Transport, TransportEvent,
    TransportFactory,
};
pub use output::{ChannelSink, ClientEvent, EventSink};
pub use rate_limit::{OutboundThrottle, RequestPacer};
pub use rest::{Signer, WooRestClient};

pub use types::{Market, VenueId};
