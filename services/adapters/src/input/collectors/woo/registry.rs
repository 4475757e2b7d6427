//! Per-channel subscription registry
//!
//! Maps the prefix-stripped remote id to the [`Market`] a caller subscribed
//! with, one independent namespace per channel. Membership is desired state:
//! entries are written on subscribe intent and removed on unsubscribe,
//! regardless of what the exchange acknowledged.

use parking_lot::RwLock;
use std::collections::HashMap;
use types::{strip_venue_prefix, Market};

use crate::input::Channel;

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    channels: RwLock<HashMap<Channel, HashMap<String, Market>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record subscribe intent; last writer wins
    pub fn insert(&self, channel: Channel, market: Market) {
        let key = market.key().to_string();
        self.channels
            .write()
            .entry(channel)
            .or_default()
            .insert(key, market);
    }

    /// Drop the entry for `market`, returning it if present
    pub fn remove(&self, channel: Channel, market: &Market) -> Option<Market> {
        let mut channels = self.channels.write();
        let entries = channels.get_mut(&channel)?;
        let removed = entries.remove(market.key());
        if entries.is_empty() {
            channels.remove(&channel);
        }
        removed
    }

    /// Resolve an inbound symbol (prefixed or not) to its market
    pub fn lookup(&self, channel: Channel, symbol: &str) -> Option<Market> {
        self.channels
            .read()
            .get(&channel)
            .and_then(|entries| entries.get(strip_venue_prefix(symbol)))
            .cloned()
    }

    pub fn contains(&self, channel: Channel, market: &Market) -> bool {
        self.lookup(channel, market.key()).is_some()
    }

    /// Markets currently desired on `channel`
    pub fn markets(&self, channel: Channel) -> Vec<Market> {
        self.channels
            .read()
            .get(&channel)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Every (channel, market) pair, for replay after reconnect
    pub fn snapshot(&self) -> Vec<(Channel, Market)> {
        let channels = self.channels.read();
        Channel::TRACKED
            .iter()
            .filter_map(|channel| channels.get(channel).map(|entries| (*channel, entries)))
            .flat_map(|(channel, entries)| {
                entries.values().cloned().map(move |market| (channel, market))
            })
            .collect()
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.channels
            .read()
            .get(&channel)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.read().values().all(HashMap::is_empty)
    }
}
