//! Interpretation of `/bid` responses into normalized bids.
//!
//! The server is lenient about types (numbers may arrive as strings, flags as
//! anything), so fields are read as raw JSON and coerced here with the same
//! truthiness rules the page uses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value as Json};

use crate::auction::types::{Identifier, NormalizedBid, OutboundRequest, ServerResponse, Size};
use crate::constants::{DEFAULT_CREATIVE_ID, DEFAULT_DEAL_ID, DEFAULT_HEIGHT, DEFAULT_WIDTH};

use super::config::SublimeConfig;
use super::telemetry::{TelemetryEmitter, TelemetryEvent};

static NO_AD_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<!-- No ad -->").expect("no-ad marker pattern is valid"));

/// Raw `/bid` response body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SublimeBidResponse {
    request_id: Option<Json>,
    #[serde(rename = "requestId")]
    request_id_camel: Option<Json>,
    cpm: Option<Json>,
    ad: Option<Json>,
    currency: Option<Json>,
    width: Option<Json>,
    height: Option<Json>,
    #[serde(rename = "creativeId")]
    creative_id: Option<Json>,
    #[serde(rename = "dealId")]
    deal_id: Option<Json>,
    timeout: Option<Json>,
    #[serde(rename = "netRevenue")]
    net_revenue: Option<Json>,
    ttl: Option<Json>,
}

/// Why a well-formed response produced no bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoBidReason {
    Timeout,
    NoAdMarker,
    EmptyMarkup,
}

impl NoBidReason {
    fn event(self) -> TelemetryEvent {
        match self {
            Self::Timeout => TelemetryEvent::ResponseTimeout,
            Self::NoAdMarker => TelemetryEvent::NoAd,
            Self::EmptyMarkup => TelemetryEvent::EmptyAdMarkup,
        }
    }
}

/// Map one server response into zero or one bid.
#[must_use]
pub fn interpret(
    response: &ServerResponse,
    request: &OutboundRequest,
    config: &SublimeConfig,
    telemetry: &TelemetryEmitter,
) -> Vec<NormalizedBid> {
    let scope = &request.context.scope;

    let body = match &response.body {
        None | Some(Json::Null) => {
            telemetry.emit(scope, TelemetryEvent::NoResponseBody);
            return Vec::new();
        }
        Some(Json::String(raw)) if raw.is_empty() => {
            telemetry.emit(scope, TelemetryEvent::NoResponseBody);
            return Vec::new();
        }
        Some(Json::Object(body)) => body,
        Some(other) => {
            log::warn!("Sublime: ignoring non-object response body: {}", other);
            telemetry.emit(scope, TelemetryEvent::MalformedResponseBody);
            return Vec::new();
        }
    };

    let parsed = parse_body(body);

    if let Some(reason) = classify(&parsed) {
        log::debug!("Sublime: no bid for zone {}: {:?}", scope.zone_label(), reason);
        telemetry.emit(scope, reason.event());
        return Vec::new();
    }

    let request_id =
        first_text(&[&parsed.request_id, &parsed.request_id_camel]).unwrap_or_default();
    let bid_scope = scope.with_request_id(&request_id);

    let cpm = parsed.cpm.as_ref().and_then(as_f64).filter(|cpm| *cpm != 0.0);
    if cpm.is_none() {
        telemetry.emit(&bid_scope, TelemetryEvent::ResponseMissingCpm);
    }

    let fallback = fallback_size(request.context.declared_size);
    let bid = NormalizedBid {
        request_id,
        cpm: cpm.unwrap_or(0.0),
        width: positive_u32(parsed.width.as_ref()).unwrap_or(fallback.width),
        height: positive_u32(parsed.height.as_ref()).unwrap_or(fallback.height),
        creative_id: truthy_identifier(parsed.creative_id.as_ref())
            .unwrap_or_else(|| Identifier::from(DEFAULT_CREATIVE_ID)),
        deal_id: truthy_identifier(parsed.deal_id.as_ref())
            .unwrap_or_else(|| Identifier::from(DEFAULT_DEAL_ID)),
        currency: first_text(&[&parsed.currency])
            .or_else(|| request.context.currency.clone())
            .unwrap_or_else(|| config.default_currency.clone()),
        net_revenue: match &parsed.net_revenue {
            Some(Json::Bool(net)) => *net,
            _ => true,
        },
        ttl: positive_u32(parsed.ttl.as_ref()).unwrap_or(config.ttl_seconds),
        referrer: request.context.referrer.clone().unwrap_or_default(),
        ad: first_text(&[&parsed.ad]).unwrap_or_default(),
        zone_id: scope.zone_id.clone(),
    };

    telemetry.emit(&bid_scope, TelemetryEvent::Bid);
    vec![bid]
}

fn parse_body(body: &Map<String, Json>) -> SublimeBidResponse {
    // All fields are optional raw JSON.
    serde_json::from_value(Json::Object(body.clone())).unwrap_or_default()
}

/// Timeout first, then the no-ad marker, then missing markup.
fn classify(parsed: &SublimeBidResponse) -> Option<NoBidReason> {
    if parsed.timeout.as_ref().is_some_and(is_truthy) {
        return Some(NoBidReason::Timeout);
    }

    let ad = first_text(&[&parsed.ad]);
    match ad {
        Some(markup) if NO_AD_MARKER.is_match(&markup) => Some(NoBidReason::NoAdMarker),
        Some(_) => None,
        None => Some(NoBidReason::EmptyMarkup),
    }
}

/// 1×1 when the request declared exactly 1×1, else 1800×1000.
fn fallback_size(declared: Option<Size>) -> Size {
    match declared {
        Some(size) if size == Size::new(1, 1) => size,
        _ => Size::new(DEFAULT_WIDTH, DEFAULT_HEIGHT),
    }
}

fn is_truthy(value: &Json) -> bool {
    match value {
        Json::Null => false,
        Json::Bool(flag) => *flag,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Json::String(s) => !s.is_empty(),
        Json::Array(_) | Json::Object(_) => true,
    }
}

fn as_f64(value: &Json) -> Option<f64> {
    match value {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn positive_u32(value: Option<&Json>) -> Option<u32> {
    let number = as_f64(value?)?;
    (1.0..=f64::from(u32::MAX))
        .contains(&number)
        .then(|| number as u32)
}

fn truthy_identifier(value: Option<&Json>) -> Option<Identifier> {
    value
        .filter(|v| is_truthy(v))
        .and_then(Identifier::from_json)
}

/// First non-empty string (or number rendered as text) among `candidates`.
fn first_text(candidates: &[&Option<Json>]) -> Option<String> {
    candidates.iter().find_map(|candidate| match candidate {
        Some(Json::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Json::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
