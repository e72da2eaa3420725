// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Legacy price-feed registry.
//!
//! Early vault deployments let the owner attach an oracle feed to each
//! asset. Deposits have since moved to quoting through the conversion
//! service, and nothing in the deposit flow reads these entries. They are
//! still stored and queryable so existing integrations keep working.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::AssetId;

/// Asset → feed identifier.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PriceFeedRegistry {
    feeds: HashMap<AssetId, String>,
}

impl PriceFeedRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the feed for `asset`, returning the previous one.
    pub fn register(&mut self, asset: AssetId, feed: String) -> Option<String> {
        self.feeds.insert(asset, feed)
    }

    /// Returns the feed registered for `asset`.
    pub fn get(&self, asset: &AssetId) -> Option<&str> {
        self.feeds.get(asset).map(String::as_str)
    }

    /// Number of registered feeds.
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    /// Returns `true` if no feeds are registered.
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_replaces_previous_feed() {
        let mut registry = PriceFeedRegistry::new();
        let weth = AssetId::new("WETH");

        assert_eq!(registry.register(weth.clone(), "feed:eth-usd:v1".into()), None);
        assert_eq!(
            registry.register(weth.clone(), "feed:eth-usd:v2".into()),
            Some("feed:eth-usd:v1".into())
        );
        assert_eq!(registry.get(&weth), Some("feed:eth-usd:v2"));
        assert_eq!(registry.len(), 1);
    }
}
