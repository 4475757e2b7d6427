//! Error types for market identifier and enum parsing

use thiserror::Error;

/// Errors raised while parsing venue symbols and enumerations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Symbol does not follow the `BASE_QUOTE` or `PREFIX_BASE_QUOTE` layout
    #[error("Invalid symbol '{symbol}': expected BASE_QUOTE")]
    InvalidSymbol { symbol: String },

    /// Side string is neither BUY nor SELL
    #[error("Invalid side: {0}")]
    InvalidSide(String),

    /// Candle period string not recognized
    #[error("Unknown candle period: {0}")]
    UnknownCandlePeriod(String),

    /// Venue name not recognized
    #[error("Unknown venue: {0}")]
    UnknownVenue(String),
}
