//! Core types exchanged with the host bidding framework.

use error_stack::{Report, ResultExt};
use http::header;
use http::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as Json};
use std::fmt;
use url::Url;

use crate::error::AdapterError;
use crate::gdpr::GdprConsent;

use super::context::AuctionScope;

/// Identifier that may arrive from the page as a string or a number
/// (zone ids, creative ids, deal ids).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(serde_json::Number),
    Text(String),
}

impl Identifier {
    /// Truthiness as the page sees it: non-empty strings and non-zero numbers.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Identifier::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Identifier::Text(s) => !s.is_empty(),
        }
    }

    /// Lenient conversion from an arbitrary JSON value. Anything other than a
    /// string or a number is treated as absent.
    #[must_use]
    pub fn from_json(value: &Json) -> Option<Self> {
        match value {
            Json::String(s) => Some(Identifier::Text(s.clone())),
            Json::Number(n) => Some(Identifier::Number(n.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{n}"),
            Identifier::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for Identifier {
    fn from(value: u64) -> Self {
        Identifier::Number(value.into())
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

impl From<Identifier> for Json {
    fn from(value: Identifier) -> Self {
        match value {
            Identifier::Number(n) => Json::Number(n),
            Identifier::Text(s) => Json::String(s),
        }
    }
}

/// Deserialize an optional [`Identifier`], mapping unsupported JSON types to `None`.
pub(crate) fn deserialize_lenient_identifier<'de, D>(
    deserializer: D,
) -> Result<Option<Identifier>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Json>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Identifier::from_json))
}

/// Creative size in pixels. Serialized as `[width, height]` like the page does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<[u32; 2]> for Size {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<Size> for [u32; 2] {
    fn from(size: Size) -> Self {
        [size.width, size.height]
    }
}

/// Adapter parameters configured by the publisher for one ad unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BidParams {
    #[serde(deserialize_with = "deserialize_lenient_identifier")]
    pub zone_id: Option<Identifier>,
    pub protocol: Option<String>,
    pub bid_host: Option<String>,
    pub sac_host: Option<String>,
    pub callback_name: Option<String>,
}

/// Banner media type declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerMediaType {
    pub sizes: Vec<Size>,
}

/// Media types declared on the ad unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaTypes {
    pub banner: Option<BannerMediaType>,
}

/// One bid request descriptor, owned by the host and read-only here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BidRequest {
    pub bidder: String,
    pub auction_id: String,
    pub transaction_id: String,
    pub ad_unit_code: String,
    pub bid_id: String,
    pub bidder_request_id: String,
    pub bid_requests_count: u32,
    pub sizes: Vec<Size>,
    pub params: Option<BidParams>,
    pub media_types: Option<MediaTypes>,
}

impl BidRequest {
    /// Zone id configured for this descriptor, if any.
    #[must_use]
    pub fn zone_id(&self) -> Option<&Identifier> {
        self.params.as_ref().and_then(|p| p.zone_id.as_ref())
    }

    /// First declared banner size, if any.
    #[must_use]
    pub fn first_banner_size(&self) -> Option<Size> {
        self.media_types
            .as_ref()
            .and_then(|m| m.banner.as_ref())
            .and_then(|b| b.sizes.first().copied())
    }
}

/// Page location metadata supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefererInfo {
    pub referer: Option<String>,
    pub num_iframes: Option<u32>,
    pub reached_top: Option<bool>,
}

/// Context shared by every descriptor of one `build_requests` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BidderRequest {
    pub auction_id: String,
    pub bidder_request_id: String,
    /// Auction timeout budget in milliseconds
    pub timeout: Option<u32>,
    /// Ad-server currency override
    pub currency: Option<String>,
    pub referer_info: Option<RefererInfo>,
    pub gdpr_consent: Option<GdprConsent>,
}

/// Raw response delivered by the host transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerResponse {
    pub body: Option<Json>,
}

impl ServerResponse {
    #[must_use]
    pub fn new(body: Json) -> Self {
        Self { body: Some(body) }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { body: None }
    }
}

/// Bid handed back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBid {
    pub request_id: String,
    pub cpm: f64,
    pub width: u32,
    pub height: u32,
    pub creative_id: Identifier,
    pub deal_id: Identifier,
    pub currency: String,
    pub net_revenue: bool,
    pub ttl: u32,
    /// Page referrer of the auction that produced the bid
    pub referrer: String,
    pub ad: String,
    /// Zone the bid was won for, kept for `on_bid_won` correlation
    #[serde(skip)]
    pub zone_id: Option<Identifier>,
}

/// Entry of the host's timeout notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeoutData {
    pub bidder: String,
    pub bid_id: String,
    pub ad_unit_code: String,
    pub auction_id: String,
    pub timeout: Option<u32>,
    pub params: Vec<BidParams>,
}

impl TimeoutData {
    #[must_use]
    pub fn zone_id(&self) -> Option<&Identifier> {
        self.params.iter().find_map(|p| p.zone_id.as_ref())
    }
}

/// User sync capabilities announced by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncOptions {
    pub iframe_enabled: bool,
    pub pixel_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Iframe,
    Image,
}

/// User sync pixel or iframe requested from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSync {
    #[serde(rename = "type")]
    pub kind: SyncKind,
    pub url: String,
}

/// Payload of an outbound request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestData {
    /// Flat query parameters, in order
    Query(Vec<(String, String)>),
    /// JSON object body
    Json(Map<String, Json>),
    /// `application/x-www-form-urlencoded` body
    Form(Vec<(String, String)>),
}

/// Transport options forwarded to the host's HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub with_credentials: bool,
}

/// Data about the originating descriptor that travels with a request but is
/// never sent on the wire.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub scope: AuctionScope,
    /// Size the request asked the bid host for
    pub declared_size: Option<Size>,
    pub referrer: Option<String>,
    /// Currency requested by the auction context
    pub currency: Option<String>,
}

/// Outbound HTTP request descriptor handed to the host transport.
///
/// Carries the [`RequestContext`] of the descriptor it was built from so the
/// response can be interpreted without shared state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRequest {
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    pub url: Url,
    pub data: RequestData,
    pub options: RequestOptions,
    #[serde(skip)]
    pub context: RequestContext,
}

fn serialize_method<S>(method: &Method, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(method.as_str())
}

impl OutboundRequest {
    /// Full URL including query parameters for `GET` payloads.
    #[must_use]
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if let RequestData::Query(pairs) = &self.data {
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs.iter());
            }
        }
        url
    }

    /// Encoded request body (empty for `GET`).
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Request`] if the JSON body cannot be serialized.
    pub fn body_bytes(&self) -> Result<Vec<u8>, Report<AdapterError>> {
        match &self.data {
            RequestData::Query(_) => Ok(Vec::new()),
            RequestData::Json(map) => {
                serde_json::to_vec(map).change_context(AdapterError::Request {
                    message: "Failed to serialize request body".to_string(),
                })
            }
            RequestData::Form(pairs) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs.iter())
                    .finish();
                Ok(encoded.into_bytes())
            }
        }
    }

    /// Convert into an [`http::Request`] for hosts that perform the I/O
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Request`] if the body cannot be serialized or
    /// the request cannot be assembled.
    pub fn to_http_request(&self) -> Result<http::Request<Vec<u8>>, Report<AdapterError>> {
        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.full_url().as_str());

        if let Some(content_type) = &self.options.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        builder
            .body(self.body_bytes()?)
            .change_context(AdapterError::Request {
                message: format!("Failed to assemble HTTP request for {}", self.url),
            })
    }
}
