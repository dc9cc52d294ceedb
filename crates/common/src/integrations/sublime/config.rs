//! Recognized configuration options for the Sublime adapter.
//!
//! Every option has a documented default so an empty `[adapter]` table is a
//! working configuration. Values are validated once, when [`crate::settings::Settings`]
//! is built, and never re-checked on the request path.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::constants::{
    DEFAULT_BID_HOST, DEFAULT_CALLBACK_NAME, DEFAULT_CURRENCY, DEFAULT_NOTIFY_TTL_MS,
    DEFAULT_PROTOCOL, DEFAULT_TAG_HOST, DEFAULT_TELEMETRY_HOST, DEFAULT_TTL_SECONDS,
};

/// Wire shape used to reach the bid host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// `POST /bid` with a JSON payload, one request per zone.
    #[default]
    Auction,
    /// Legacy `GET /bid` query string, one zone per page, answered through the
    /// injected tag's callback.
    TagCallback,
}

/// Body encoding for `POST /notify`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyEncoding {
    #[default]
    Json,
    Form,
}

/// Adapter options (`[adapter]` table).
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SublimeConfig {
    /// Scheme used for the bid host (`https` unless overridden per bid)
    #[serde(default = "default_protocol")]
    #[validate(custom(function = "validate_protocol"))]
    pub protocol: String,

    /// Host serving `/bid` and `/notify`
    #[serde(default = "default_bid_host")]
    #[validate(length(min = 1))]
    pub bid_host: String,

    /// Host serving the injected `sublime/{zone}/prebid` script
    #[serde(default = "default_tag_host")]
    #[validate(length(min = 1))]
    pub tag_host: String,

    /// Callback name announced to the injected tag in `tag_callback` mode
    #[serde(default = "default_callback_name")]
    #[validate(length(min = 1))]
    pub callback_name: String,

    /// Currency applied when neither the context nor the server gives one
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub default_currency: String,

    /// Bid time-to-live in seconds when the server omits it
    #[serde(default = "default_ttl_seconds")]
    #[validate(range(min = 1))]
    pub ttl_seconds: u32,

    #[serde(default)]
    pub transport: TransportMode,

    /// Whether the analytics tag is injected into the page at all
    #[serde(default = "default_inject_tag")]
    pub inject_tag: bool,

    #[serde(default)]
    pub notify_encoding: NotifyEncoding,

    /// How long a pending tag notification stays resolvable
    #[serde(default = "default_notify_ttl_ms")]
    #[validate(range(min = 1))]
    pub notify_ttl_ms: u64,

    /// Host framework version reported as `prebidVersion`
    #[serde(default = "default_prebid_version")]
    pub prebid_version: String,
}

/// Telemetry options (`[telemetry]` table).
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    /// Pixel host receiving `GET /?t=..&z=..&e=..`
    #[serde(default = "default_telemetry_host")]
    #[validate(length(min = 1))]
    pub host: String,
}

fn validate_protocol(protocol: &str) -> Result<(), ValidationError> {
    match protocol {
        "http" | "https" => Ok(()),
        _ => Err(ValidationError::new("protocol must be http or https")),
    }
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn default_bid_host() -> String {
    DEFAULT_BID_HOST.to_string()
}

fn default_tag_host() -> String {
    DEFAULT_TAG_HOST.to_string()
}

fn default_callback_name() -> String {
    DEFAULT_CALLBACK_NAME.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_ttl_seconds() -> u32 {
    DEFAULT_TTL_SECONDS
}

fn default_inject_tag() -> bool {
    true
}

fn default_notify_ttl_ms() -> u64 {
    DEFAULT_NOTIFY_TTL_MS
}

fn default_prebid_version() -> String {
    "unknown".to_string()
}

fn default_telemetry_enabled() -> bool {
    true
}

fn default_telemetry_host() -> String {
    DEFAULT_TELEMETRY_HOST.to_string()
}

impl Default for SublimeConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            bid_host: default_bid_host(),
            tag_host: default_tag_host(),
            callback_name: default_callback_name(),
            default_currency: default_currency(),
            ttl_seconds: default_ttl_seconds(),
            transport: TransportMode::default(),
            inject_tag: default_inject_tag(),
            notify_encoding: NotifyEncoding::default(),
            notify_ttl_ms: default_notify_ttl_ms(),
            prebid_version: default_prebid_version(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            host: default_telemetry_host(),
        }
    }
}
