//! Market descriptors and venue symbol handling
//!
//! Woo spot symbols carry a market-type prefix on the wire (`SPOT_BTC_USDT`).
//! Registries and normalized records key markets by the prefix-stripped id
//! (`BTC_USDT`); every inbound symbol must pass through
//! [`strip_venue_prefix`] before lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{TypeError, VenueId};

/// Market-type marker prepended to spot symbols on the wire
pub const SPOT_PREFIX: &str = "SPOT_";

/// Strip the venue market-type prefix from a symbol
///
/// Symbols without the prefix are returned unchanged.
pub fn strip_venue_prefix(symbol: &str) -> &str {
    symbol.strip_prefix(SPOT_PREFIX).unwrap_or(symbol)
}

/// Immutable descriptor of a tradable instrument on one venue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Market {
    /// Venue that lists the market
    pub exchange: VenueId,
    /// Base asset code, e.g. `BTC`
    pub base: String,
    /// Quote asset code, e.g. `USDT`
    pub quote: String,
    /// Venue symbol used in topics and requests, e.g. `SPOT_BTC_USDT`
    pub symbol: String,
    /// Prefix-free remote id used as the registry key, e.g. `BTC_USDT`
    pub id: String,
}

impl Market {
    /// Build a spot market from base and quote codes
    pub fn spot(exchange: VenueId, base: impl Into<String>, quote: impl Into<String>) -> Self {
        let base = base.into().to_ascii_uppercase();
        let quote = quote.into().to_ascii_uppercase();
        let id = format!("{}_{}", base, quote);

        Self {
            exchange,
            symbol: format!("{}{}", SPOT_PREFIX, id),
            id,
            base,
            quote,
        }
    }

    /// Parse a venue symbol such as `SPOT_BTC_USDT`, `BTC_USDT` or `BTC/USDT`
    pub fn from_symbol(exchange: VenueId, symbol: &str) -> Result<Self, TypeError> {
        let stripped = strip_venue_prefix(symbol.trim());
        let mut parts = stripped.split(|c| c == '_' || c == '/');

        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Ok(Self::spot(exchange, base, quote))
            }
            _ => Err(TypeError::InvalidSymbol {
                symbol: symbol.to_string(),
            }),
        }
    }

    /// Registry key for this market
    pub fn key(&self) -> &str {
        strip_venue_prefix(&self.id)
    }

    /// Unified `BASE/QUOTE` display symbol
    pub fn pair(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.exchange, self.base, self.quote)
    }
}
