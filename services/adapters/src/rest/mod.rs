//! REST collaborator for account and reference data
//!
//! Shares credentials with the streaming client through [`Signer`].

pub mod client;
pub mod models;
pub mod signer;

pub use client::{normalize, venue_symbol, Params, WooRestClient};
pub use models::{
    AccountTrade, Balance, CancelResult, Currency, Fee, Liquidity, MarketInfo, Ohlcv, Order,
    OrderBook, OrderRequest, OrderStatus, OrderType, TradingFees,
};
pub use signer::Signer;
