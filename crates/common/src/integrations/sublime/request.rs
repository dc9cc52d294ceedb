//! Outbound request construction for both wire shapes.

use error_stack::Report;
use http::Method;
use serde_json::{json, Map, Value as Json};

use crate::auction::context::AuctionScope;
use crate::auction::types::{
    BidRequest, BidderRequest, OutboundRequest, RequestContext, RequestData, RequestOptions, Size,
};
use crate::constants::{CONTENT_TYPE_JSON, DEFAULT_HEIGHT, DEFAULT_WIDTH, SUBLIME_VERSION};
use crate::error::AdapterError;

use super::config::SublimeConfig;
use super::params::ResolvedParams;

/// Currency for the auction: context override, else the configured default.
#[must_use]
pub fn currency_code(bidder_request: &BidderRequest, config: &SublimeConfig) -> String {
    bidder_request
        .currency
        .as_deref()
        .filter(|currency| !currency.is_empty())
        .unwrap_or(&config.default_currency)
        .to_string()
}

/// Fields shared by every descriptor of one call.
#[must_use]
pub fn shared_payload(bidder_request: &BidderRequest, config: &SublimeConfig) -> Map<String, Json> {
    let mut payload = Map::new();
    payload.insert("sublimeVersion".to_string(), json!(SUBLIME_VERSION));
    payload.insert("prebidVersion".to_string(), json!(config.prebid_version));
    payload.insert(
        "currencyCode".to_string(),
        json!(currency_code(bidder_request, config)),
    );
    if let Some(timeout) = bidder_request.timeout {
        payload.insert("timeout".to_string(), json!(timeout));
    }

    if let Some(referer_info) = &bidder_request.referer_info {
        if let Some(referer) = &referer_info.referer {
            payload.insert("referer".to_string(), json!(referer));
        }
        if let Some(num_iframes) = referer_info.num_iframes {
            payload.insert("numIframes".to_string(), json!(num_iframes));
        }
    }

    if let Some(consent) = &bidder_request.gdpr_consent {
        if let Some(consent_string) = &consent.consent_string {
            payload.insert("gdprConsent".to_string(), json!(consent_string));
        }
        payload.insert("gdpr".to_string(), json!(consent.applies()));
    }

    payload
}

/// Sizes posted for a descriptor: candidate sizes, else banner sizes.
#[must_use]
pub fn wire_sizes(bid: &BidRequest) -> Vec<Size> {
    if bid.sizes.is_empty() {
        bid.media_types
            .as_ref()
            .and_then(|media| media.banner.as_ref())
            .map(|banner| banner.sizes.clone())
            .unwrap_or_default()
    } else {
        bid.sizes.clone()
    }
}

/// Fields describing one descriptor.
#[must_use]
pub fn descriptor_payload(bid: &BidRequest, params: &ResolvedParams) -> Map<String, Json> {
    let sizes: Vec<Json> = wire_sizes(bid)
        .iter()
        .map(|size| json!({ "w": size.width, "h": size.height }))
        .collect();

    let mut payload = Map::new();
    payload.insert("adUnitCode".to_string(), json!(bid.ad_unit_code));
    payload.insert("auctionId".to_string(), json!(bid.auction_id));
    payload.insert("bidder".to_string(), json!(bid.bidder));
    payload.insert("bidderRequestId".to_string(), json!(bid.bidder_request_id));
    payload.insert("bidRequestsCount".to_string(), json!(bid.bid_requests_count));
    payload.insert("requestId".to_string(), json!(bid.bid_id));
    payload.insert("sizes".to_string(), Json::Array(sizes));
    payload.insert("transactionId".to_string(), json!(bid.transaction_id));
    payload.insert("zoneId".to_string(), Json::from(params.zone_id.clone()));
    payload
}

fn request_context(
    scope: AuctionScope,
    declared_size: Option<Size>,
    bidder_request: &BidderRequest,
    config: &SublimeConfig,
) -> RequestContext {
    RequestContext {
        scope,
        declared_size,
        referrer: bidder_request
            .referer_info
            .as_ref()
            .and_then(|info| info.referer.clone()),
        currency: Some(currency_code(bidder_request, config)),
    }
}

/// `POST {protocol}://{bidHost}/bid` with the merged JSON payload.
///
/// # Errors
///
/// Returns [`AdapterError::Request`] if the bid URL cannot be built.
pub fn build_auction_request(
    bid: &BidRequest,
    params: &ResolvedParams,
    shared: &Map<String, Json>,
    bidder_request: &BidderRequest,
    config: &SublimeConfig,
    scope: AuctionScope,
) -> Result<OutboundRequest, Report<AdapterError>> {
    let url = params.bid_url()?;

    let mut data = shared.clone();
    data.extend(descriptor_payload(bid, params));
    let declared_size = wire_sizes(bid).first().copied();

    Ok(OutboundRequest {
        method: Method::POST,
        url,
        data: RequestData::Json(data),
        options: RequestOptions {
            content_type: Some(CONTENT_TYPE_JSON.to_string()),
            with_credentials: true,
        },
        context: request_context(scope, declared_size, bidder_request, config),
    })
}

/// `GET {protocol}://{bidHost}/bid?prebid=1&request_id=..&z=..&w=..&h=..`
///
/// # Errors
///
/// Returns [`AdapterError::Request`] if the bid URL cannot be built.
pub fn build_tag_callback_request(
    bid: &BidRequest,
    params: &ResolvedParams,
    bidder_request: &BidderRequest,
    config: &SublimeConfig,
    scope: AuctionScope,
) -> Result<OutboundRequest, Report<AdapterError>> {
    let url = params.bid_url()?;
    let size = bid
        .first_banner_size()
        .unwrap_or(Size::new(DEFAULT_WIDTH, DEFAULT_HEIGHT));

    let query = vec![
        ("prebid".to_string(), "1".to_string()),
        ("request_id".to_string(), bid.bid_id.clone()),
        ("z".to_string(), params.zone_id.to_string()),
        ("w".to_string(), size.width.to_string()),
        ("h".to_string(), size.height.to_string()),
    ];

    Ok(OutboundRequest {
        method: Method::GET,
        url,
        data: RequestData::Query(query),
        options: RequestOptions {
            content_type: None,
            with_credentials: true,
        },
        context: request_context(scope, Some(size), bidder_request, config),
    })
}
