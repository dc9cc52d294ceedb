//! Auction-scoped correlation context.
//!
//! Every telemetry event and notification is correlated to the zone and bid
//! it belongs to. That information travels explicitly in an [`AuctionScope`]
//! built per descriptor, so overlapping auctions never share a mutable
//! "current zone".

use std::time::Instant;

use super::types::{BidRequest, Identifier, TimeoutData};

/// Correlation data for one descriptor of one auction.
#[derive(Debug, Clone)]
pub struct AuctionScope {
    pub zone_id: Option<Identifier>,
    pub request_id: Option<String>,
    pub transaction_id: Option<String>,
    /// Page-level origin elapsed times are measured from
    pub origin: Instant,
}

impl AuctionScope {
    #[must_use]
    pub fn new(zone_id: Option<Identifier>, origin: Instant) -> Self {
        Self {
            zone_id,
            request_id: None,
            transaction_id: None,
            origin,
        }
    }

    /// Scope for a descriptor about to be turned into a request.
    #[must_use]
    pub fn for_bid(bid: &BidRequest, origin: Instant) -> Self {
        Self {
            zone_id: bid.zone_id().cloned(),
            request_id: non_empty(&bid.bid_id),
            transaction_id: non_empty(&bid.transaction_id),
            origin,
        }
    }

    /// Scope for a host timeout notification entry.
    #[must_use]
    pub fn for_timeout(data: &TimeoutData, origin: Instant) -> Self {
        Self {
            zone_id: data.zone_id().cloned(),
            request_id: non_empty(&data.bid_id),
            transaction_id: None,
            origin,
        }
    }

    /// Same zone and origin, correlated to another request id.
    #[must_use]
    pub fn with_request_id(&self, request_id: &str) -> Self {
        Self {
            request_id: non_empty(request_id).or_else(|| self.request_id.clone()),
            ..self.clone()
        }
    }

    /// Key used to correlate telemetry: request id, else transaction id.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.request_id
            .as_deref()
            .or(self.transaction_id.as_deref())
    }

    /// Milliseconds since the page origin.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Zone id rendered for the wire, empty when unknown.
    #[must_use]
    pub fn zone_label(&self) -> String {
        self.zone_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

impl Default for AuctionScope {
    fn default() -> Self {
        Self::new(None, Instant::now())
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::types::BidParams;
    use std::time::Duration;

    #[test]
    fn test_scope_for_bid_carries_identity() {
        let bid = BidRequest {
            bid_id: "abc1234".to_string(),
            transaction_id: "tx-1".to_string(),
            params: Some(BidParams {
                zone_id: Some(Identifier::from(14312)),
                ..BidParams::default()
            }),
            ..BidRequest::default()
        };

        let scope = AuctionScope::for_bid(&bid, Instant::now());
        assert_eq!(scope.zone_label(), "14312");
        assert_eq!(scope.correlation_id(), Some("abc1234"));
        assert_eq!(scope.transaction_id.as_deref(), Some("tx-1"));
    }

    #[test]
    fn test_correlation_falls_back_to_transaction_id() {
        let bid = BidRequest {
            transaction_id: "tx-1".to_string(),
            ..BidRequest::default()
        };

        let scope = AuctionScope::for_bid(&bid, Instant::now());
        assert_eq!(scope.correlation_id(), Some("tx-1"));
        assert_eq!(AuctionScope::default().correlation_id(), None);
    }

    #[test]
    fn test_with_request_id_keeps_previous_when_empty() {
        let scope = AuctionScope {
            request_id: Some("first".to_string()),
            ..AuctionScope::default()
        };
        assert_eq!(
            scope.with_request_id("second").correlation_id(),
            Some("second")
        );
        assert_eq!(scope.with_request_id("").correlation_id(), Some("first"));
    }

    #[test]
    fn test_elapsed_is_measured_from_origin() {
        let origin = Instant::now()
            .checked_sub(Duration::from_millis(250))
            .unwrap_or_else(Instant::now);
        let scope = AuctionScope::new(None, origin);
        let expected = u64::try_from(origin.elapsed().as_millis()).unwrap();
        assert!(scope.elapsed_ms() >= expected);
    }

    #[test]
    fn test_scope_for_timeout_uses_first_zone() {
        let data = TimeoutData {
            bid_id: "b1".to_string(),
            params: vec![
                BidParams::default(),
                BidParams {
                    zone_id: Some(Identifier::from("z9")),
                    ..BidParams::default()
                },
            ],
            ..TimeoutData::default()
        };

        let scope = AuctionScope::for_timeout(&data, Instant::now());
        assert_eq!(scope.zone_label(), "z9");
        assert_eq!(scope.correlation_id(), Some("b1"));
    }
}
