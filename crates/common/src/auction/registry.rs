//! Lookup of bidder adapters by code or alias.

use std::collections::HashMap;
use std::sync::Arc;

use super::provider::BidderAdapter;

/// Adapters known to the host, addressable by bidder code and aliases.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn BidderAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its code and every alias.
    pub fn register(&mut self, adapter: Arc<dyn BidderAdapter>) {
        let code = adapter.code();
        log::info!("Registering bidder adapter: {}", code);

        for alias in adapter.aliases() {
            if self
                .adapters
                .insert((*alias).to_string(), adapter.clone())
                .is_some()
            {
                log::warn!("Bidder alias '{}' was already registered, replacing", alias);
            }
        }
        self.adapters.insert(code.to_string(), adapter);
    }

    /// Find the adapter for a bidder code or alias.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<Arc<dyn BidderAdapter>> {
        self.adapters.get(code).cloned()
    }

    /// Number of distinct adapters registered.
    #[must_use]
    pub fn adapter_count(&self) -> usize {
        let mut codes: Vec<&str> = self.adapters.values().map(|a| a.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        codes.len()
    }
}
