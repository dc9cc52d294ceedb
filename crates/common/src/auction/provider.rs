//! Trait definition for bidder adapters.

use super::types::{
    BidRequest, BidderRequest, NormalizedBid, OutboundRequest, ServerResponse, SyncOptions,
    TimeoutData, UserSync,
};

/// Calling convention between the host bidding framework and an adapter.
///
/// None of these methods fail: malformed input degrades to documented
/// defaults and "no bid" is an empty vector. Network I/O is performed by the
/// host with the [`OutboundRequest`]s returned from `build_requests`.
pub trait BidderAdapter: Send + Sync {
    /// Bidder code the host routes to this adapter (e.g. "sublime").
    fn code(&self) -> &'static str;

    /// Alternative codes accepted for this adapter.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether a descriptor can take part in the auction.
    fn is_bid_request_valid(&self, bid: &BidRequest) -> bool;

    /// Map validated descriptors into outbound requests.
    fn build_requests(
        &self,
        valid_bids: &[BidRequest],
        bidder_request: &BidderRequest,
    ) -> Vec<OutboundRequest>;

    /// Map one server response into zero or more bids.
    fn interpret_response(
        &self,
        response: &ServerResponse,
        request: &OutboundRequest,
    ) -> Vec<NormalizedBid>;

    /// User syncs to perform after the auction.
    fn get_user_syncs(
        &self,
        _sync_options: &SyncOptions,
        _responses: &[ServerResponse],
    ) -> Vec<UserSync> {
        Vec::new()
    }

    /// Called when this adapter's request missed the auction deadline.
    fn on_timeout(&self, _timeout_data: &[TimeoutData]) {}

    /// Called when one of this adapter's bids won the auction.
    fn on_bid_won(&self, _bid: &NormalizedBid) {}
}
