//! Venue registry
//!
//! Venues are identified by a small enum so events and errors can carry the
//! origin without string allocation. Display output is the exchange's
//! canonical name as it appears on emitted events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// Trading venue identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum VenueId {
    /// WOO X spot exchange
    Woo = 130,
    /// Kraken spot exchange
    Kraken = 101,
    /// KuCoin spot exchange
    Kucoin = 105,
}

impl VenueId {
    /// Canonical exchange name carried on normalized events
    pub fn name(&self) -> &'static str {
        match self {
            VenueId::Woo => "Woo",
            VenueId::Kraken => "Kraken",
            VenueId::Kucoin => "Kucoin",
        }
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VenueId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "woo" => Ok(VenueId::Woo),
            "kraken" => Ok(VenueId::Kraken),
            "kucoin" => Ok(VenueId::Kucoin),
            _ => Err(TypeError::UnknownVenue(s.to_string())),
        }
    }
}
