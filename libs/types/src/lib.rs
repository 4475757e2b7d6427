//! # Woo Adapter Types Library
//!
//! Exchange-agnostic vocabulary shared by the streaming client, the REST
//! collaborator and downstream consumers.
//!
//! ## Design Philosophy
//!
//! - **One event shape per channel**: every venue normalizes into the same
//!   [`Ticker`], [`Trade`], [`Candle`], [`Level2Update`], [`Level2Snapshot`],
//!   [`BboUpdate`] and [`OrderReport`] values
//! - **Immutable markets**: a [`Market`] is created once at subscribe time and
//!   never mutated afterwards
//! - **No precision loss**: prices and sizes are carried as `rust_decimal::Decimal`
//! - **No I/O**: this crate only describes data
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Market, VenueId};
//!
//! let market = Market::spot(VenueId::Woo, "BTC", "USDT");
//! assert_eq!(market.symbol, "SPOT_BTC_USDT");
//! assert_eq!(market.id, "BTC_USDT");
//! ```

pub mod common;
pub mod events;
pub mod market;
pub mod venue;

pub use common::errors::TypeError;
pub use events::{
    BboUpdate, Candle, CandlePeriod, Level2Point, Level2Snapshot, Level2Update, OrderReport,
    Side, Ticker, Trade,
};
pub use market::{strip_venue_prefix, Market, SPOT_PREFIX};
pub use venue::VenueId;
