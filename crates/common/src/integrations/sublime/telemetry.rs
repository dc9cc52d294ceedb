//! Fire-and-forget telemetry for the Sublime adapter.
//!
//! Events go to an installed [`AnalyticsBridge`] when there is one, otherwise
//! to a pixel on the telemetry host delivered through the host's
//! [`BeaconSender`]. Delivery failures are logged and swallowed.

use std::fmt;
use std::sync::Arc;

use error_stack::{Report, ResultExt};
use url::Url;

use crate::auction::context::AuctionScope;
use crate::auction::environment::BeaconSender;
use crate::error::AdapterError;

use super::config::TelemetryConfig;

/// Lifecycle events reported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    BuildRequest,
    NoResponseBody,
    MalformedResponseBody,
    ResponseTimeout,
    NoAd,
    EmptyAdMarkup,
    ResponseMissingCpm,
    Bid,
    BidTimeout,
    BidWon,
}

impl TelemetryEvent {
    /// Event name as sent on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BuildRequest => "build request",
            Self::NoResponseBody => "no response body",
            Self::MalformedResponseBody => "malformed response body",
            Self::ResponseTimeout => "response timeout",
            Self::NoAd => "no ad",
            Self::EmptyAdMarkup => "empty ad markup",
            Self::ResponseMissingCpm => "response missing cpm",
            Self::Bid => "bid",
            Self::BidTimeout => "bid timeout",
            Self::BidWon => "bidwon",
        }
    }
}

impl fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options handed to an [`AnalyticsBridge`] with each event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryOptions {
    pub request_id: Option<String>,
}

/// Third-party analytics library living on the page.
pub trait AnalyticsBridge: Send + Sync {
    /// Forward one event.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the event could not be handed
    /// over.
    fn send_event(
        &self,
        zone_id: &str,
        event: &str,
        options: &TelemetryOptions,
    ) -> Result<(), Report<AdapterError>>;
}

/// Emits telemetry events for one adapter instance.
#[derive(Clone)]
pub struct TelemetryEmitter {
    config: TelemetryConfig,
    beacon: Arc<dyn BeaconSender>,
    bridge: Option<Arc<dyn AnalyticsBridge>>,
}

impl TelemetryEmitter {
    #[must_use]
    pub fn new(config: TelemetryConfig, beacon: Arc<dyn BeaconSender>) -> Self {
        Self {
            config,
            beacon,
            bridge: None,
        }
    }

    /// Route events through `bridge` instead of the pixel endpoint.
    #[must_use]
    pub fn with_bridge(mut self, bridge: Arc<dyn AnalyticsBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Emit `event` for `scope`. Never fails and never blocks on delivery.
    pub fn emit(&self, scope: &AuctionScope, event: TelemetryEvent) {
        if !self.config.enabled {
            return;
        }

        log::debug!(
            "Sublime: telemetry '{}' zone={} reqid={}",
            event,
            scope.zone_label(),
            scope.correlation_id().unwrap_or("-")
        );

        let result = match &self.bridge {
            Some(bridge) => bridge.send_event(
                &scope.zone_label(),
                event.as_str(),
                &TelemetryOptions {
                    request_id: scope.correlation_id().map(str::to_string),
                },
            ),
            None => self
                .pixel_url(scope, event, chrono::Utc::now().timestamp_millis())
                .and_then(|url| self.beacon.send_beacon(&url)),
        };

        if let Err(err) = result {
            log::debug!("Sublime: telemetry '{}' was not delivered: {:?}", event, err);
        }
    }

    /// `https://{host}/?t={epochMs}&z={zone}&e={event}&et={elapsedMs}[&reqid={id}]`
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Telemetry`] if the configured host does not
    /// form a valid URL.
    pub fn pixel_url(
        &self,
        scope: &AuctionScope,
        event: TelemetryEvent,
        timestamp_ms: i64,
    ) -> Result<Url, Report<AdapterError>> {
        let raw = format!("https://{}/", self.config.host);
        let mut url = Url::parse(&raw).change_context(AdapterError::Telemetry {
            message: format!("Invalid telemetry host: {}", self.config.host),
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("t", &timestamp_ms.to_string())
                .append_pair("z", &scope.zone_label())
                .append_pair("e", event.as_str())
                .append_pair("et", &scope.elapsed_ms().to_string());
            if let Some(request_id) = scope.correlation_id() {
                query.append_pair("reqid", request_id);
            }
        }

        Ok(url)
    }
}
