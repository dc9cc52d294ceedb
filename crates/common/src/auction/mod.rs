//! Host-facing bidding contract.
//!
//! This module defines what the host framework hands to a bidder adapter and
//! what it gets back, plus the seams through which adapters reach the page.
//!
//! Note: Individual adapters are located in the `integrations` module
//! (e.g., `crate::integrations::sublime`).

use crate::settings::Settings;
use std::sync::Arc;

pub mod context;
pub mod environment;
pub mod provider;
pub mod registry;
pub mod types;

pub use context::AuctionScope;
pub use environment::{BeaconSender, HostEnvironment, PageEnvironment, ScriptTag};
pub use provider::BidderAdapter;
pub use registry::AdapterRegistry;
pub use types::{
    BidRequest, BidderRequest, Identifier, NormalizedBid, OutboundRequest, ServerResponse, Size,
    TimeoutData,
};

/// Type alias for adapter builder functions.
type AdapterBuilder = fn(&Settings, &HostEnvironment) -> Vec<Arc<dyn BidderAdapter>>;

/// Returns the list of all available adapter builder functions.
fn adapter_builders() -> &'static [AdapterBuilder] {
    &[crate::integrations::sublime::register_adapters]
}

/// Build a registry holding every adapter enabled by `settings`.
///
/// Callers can reuse the returned [`AdapterRegistry`] across auctions.
#[must_use]
pub fn build_registry(settings: &Settings, env: &HostEnvironment) -> AdapterRegistry {
    log::info!("Building bidder adapter registry");

    let mut registry = AdapterRegistry::new();
    for builder in adapter_builders() {
        for adapter in builder(settings, env) {
            registry.register(adapter);
        }
    }

    log::info!(
        "Adapter registry built with {} adapters",
        registry.adapter_count()
    );

    registry
}
