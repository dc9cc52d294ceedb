//! Sublime bidder adapter.
//!
//! Maps the host's bid descriptors onto the Sublime bid host (`POST /bid`, or
//! the legacy `GET /bid` answered through the injected tag), injects the
//! Sublime tag into the page and normalizes the server's answer into a single
//! bid. Telemetry pixels are fired along the way.

use std::sync::Arc;
use std::time::Duration;

use error_stack::Report;

use crate::auction::context::AuctionScope;
use crate::auction::environment::{HostEnvironment, ScriptTag};
use crate::auction::provider::BidderAdapter;
use crate::auction::types::{
    BidRequest, BidderRequest, NormalizedBid, OutboundRequest, ServerResponse, TimeoutData,
};
use crate::constants::{BIDDER_ALIASES, BIDDER_CODE};
use crate::error::AdapterError;
use crate::settings::Settings;

pub mod config;
pub mod notify;
pub mod params;
pub mod request;
pub mod response;
pub mod tag;
pub mod telemetry;

use config::TransportMode;
use notify::{NotifyContext, NotifyRegistry, TagNotification};
use params::ResolvedParams;
use telemetry::{AnalyticsBridge, TelemetryEmitter, TelemetryEvent};

/// Everything produced by one `build` call.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub requests: Vec<OutboundRequest>,
    /// Script handed to the page, if one was injected
    pub tag: Option<ScriptTag>,
    /// Non-fatal problems, also logged at `warn`
    pub warnings: Vec<String>,
}

/// The Sublime adapter. Cheap to share behind an `Arc`.
pub struct SublimeAdapter {
    settings: Settings,
    env: HostEnvironment,
    telemetry: TelemetryEmitter,
    notify: NotifyRegistry,
}

impl SublimeAdapter {
    #[must_use]
    pub fn new(settings: Settings, env: HostEnvironment) -> Self {
        let telemetry = TelemetryEmitter::new(settings.telemetry.clone(), env.beacon.clone());
        let notify = NotifyRegistry::new(Duration::from_millis(settings.adapter.notify_ttl_ms));
        Self {
            settings,
            env,
            telemetry,
            notify,
        }
    }

    /// Route telemetry through a page analytics library instead of pixels.
    #[must_use]
    pub fn with_analytics_bridge(mut self, bridge: Arc<dyn AnalyticsBridge>) -> Self {
        self.telemetry = self.telemetry.with_bridge(bridge);
        self
    }

    /// Build outbound requests for `bids`, injecting the tag for the first
    /// valid descriptor. Invalid descriptors are skipped.
    #[must_use]
    pub fn build(&self, bids: &[BidRequest], bidder_request: &BidderRequest) -> BuildOutput {
        let config = &self.settings.adapter;
        let valid: Vec<(&BidRequest, ResolvedParams)> = bids
            .iter()
            .filter_map(|bid| ResolvedParams::resolve(bid, config).map(|params| (bid, params)))
            .collect();

        let mut output = BuildOutput {
            requests: Vec::new(),
            tag: None,
            warnings: Vec::new(),
        };

        let Some((first_bid, first_params)) = valid.first() else {
            log::debug!("Sublime: no valid bid requests to build");
            return output;
        };

        if valid.len() > 1 {
            let ignored: Vec<String> = valid[1..]
                .iter()
                .map(|(_, params)| params.zone_id.to_string())
                .collect();
            let warning = format!(
                "Sublime: only one zone per page is supported, ignoring zone(s) {} for tag injection",
                ignored.join(", ")
            );
            log::warn!("{}", warning);
            output.warnings.push(warning);
        }

        let shared = request::shared_payload(bidder_request, config);
        let built = match config.transport {
            TransportMode::Auction => &valid[..],
            TransportMode::TagCallback => &valid[..1],
        };

        for (bid, params) in built {
            let scope = AuctionScope::for_bid(bid, self.env.origin);
            self.telemetry.emit(&scope, TelemetryEvent::BuildRequest);

            let result = match config.transport {
                TransportMode::Auction => request::build_auction_request(
                    bid,
                    params,
                    &shared,
                    bidder_request,
                    config,
                    scope,
                ),
                TransportMode::TagCallback => request::build_tag_callback_request(
                    bid,
                    params,
                    bidder_request,
                    config,
                    scope,
                ),
            };

            match result {
                Ok(request) => {
                    log::debug!(
                        "Sublime: built {} {} for zone {}",
                        request.method,
                        request.url,
                        params.zone_id
                    );
                    output.requests.push(request);
                }
                Err(err) => {
                    let warning = format!(
                        "Sublime: skipping zone {}: {}",
                        params.zone_id,
                        err.current_context()
                    );
                    log::warn!("{} ({:?})", warning, err);
                    output.warnings.push(warning);
                }
            }
        }

        if config.inject_tag {
            match self.inject_tag(first_bid, first_params) {
                Ok(script) => output.tag = Some(script),
                Err(err) => {
                    let warning = format!(
                        "Sublime: tag injection failed for zone {}: {}",
                        first_params.zone_id,
                        err.current_context()
                    );
                    log::warn!("{} ({:?})", warning, err);
                    output.warnings.push(warning);
                }
            }
        }

        output
    }

    fn inject_tag(
        &self,
        bid: &BidRequest,
        params: &ResolvedParams,
    ) -> Result<ScriptTag, Report<AdapterError>> {
        let script = match self.settings.adapter.transport {
            TransportMode::Auction => tag::script_tag(params, None, None)?,
            TransportMode::TagCallback => {
                let context = NotifyContext {
                    notify_url: params.notify_url()?,
                    request_id: bid.bid_id.clone(),
                    transaction_id: bid.transaction_id.clone(),
                    zone_id: params.zone_id.clone(),
                    scope: AuctionScope::for_bid(bid, self.env.origin),
                };
                // The script URL is validated before the token is registered
                // so a failure leaves nothing pending.
                let src = tag::script_url(params, Some(&params.callback_name))?;
                let token = self.notify.register(context);
                ScriptTag {
                    src,
                    callback_name: Some(params.callback_name.clone()),
                    correlation_token: Some(token),
                }
            }
        };

        self.env.page.insert_script(&script)?;
        log::info!("Sublime: injected tag {}", script.src);
        Ok(script)
    }

    /// Resolve a tag notification into the `POST /notify` request to send.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Notify`] if `token` is unknown, already used or
    /// expired.
    pub fn handle_notification(
        &self,
        token: &str,
        notification: &TagNotification,
    ) -> Result<OutboundRequest, Report<AdapterError>> {
        let context = self.notify.resolve(token)?;
        log::debug!(
            "Sublime: tag reported for zone {} (has ad: {}, {} notification(s) still pending)",
            context.zone_id,
            notification.has_ad,
            self.notify.pending()
        );
        Ok(notify::build_notify_request(
            &context,
            notification,
            self.settings.adapter.notify_encoding,
        ))
    }

    /// Settings the adapter was built with.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl BidderAdapter for SublimeAdapter {
    fn code(&self) -> &'static str {
        BIDDER_CODE
    }

    fn aliases(&self) -> &'static [&'static str] {
        BIDDER_ALIASES
    }

    fn is_bid_request_valid(&self, bid: &BidRequest) -> bool {
        bid.zone_id().is_some_and(|zone_id| zone_id.is_truthy())
    }

    fn build_requests(
        &self,
        valid_bids: &[BidRequest],
        bidder_request: &BidderRequest,
    ) -> Vec<OutboundRequest> {
        self.build(valid_bids, bidder_request).requests
    }

    fn interpret_response(
        &self,
        response: &ServerResponse,
        request: &OutboundRequest,
    ) -> Vec<NormalizedBid> {
        response::interpret(response, request, &self.settings.adapter, &self.telemetry)
    }

    fn on_timeout(&self, timeout_data: &[TimeoutData]) {
        for data in timeout_data {
            let scope = AuctionScope::for_timeout(data, self.env.origin);
            log::warn!(
                "Sublime: bid timeout for zone {} (bid {})",
                scope.zone_label(),
                data.bid_id
            );
            self.telemetry.emit(&scope, TelemetryEvent::BidTimeout);
        }
    }

    fn on_bid_won(&self, bid: &NormalizedBid) {
        log::info!("Sublime: bid {} won at cpm {}", bid.request_id, bid.cpm);
        let scope = AuctionScope::new(bid.zone_id.clone(), self.env.origin)
            .with_request_id(&bid.request_id);
        self.telemetry.emit(&scope, TelemetryEvent::BidWon);
    }
}

/// Register the Sublime adapter with the host registry.
#[must_use]
pub fn register_adapters(
    settings: &Settings,
    env: &HostEnvironment,
) -> Vec<Arc<dyn BidderAdapter>> {
    vec![Arc::new(SublimeAdapter::new(settings.clone(), env.clone()))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value as Json};
    use std::time::Instant;

    use crate::auction::types::{
        BannerMediaType, BidParams, Identifier, MediaTypes, RequestData, Size,
    };
    use crate::integrations::sublime::config::NotifyEncoding;
    use crate::test_support::tests::{
        create_test_settings, recording_environment, RecordingBeacon, RecordingBridge,
        RecordingPage,
    };

    fn bid(bid_id: &str, zone_id: Option<Identifier>) -> BidRequest {
        BidRequest {
            bidder: "sublime".to_string(),
            ad_unit_code: "sublime_code".to_string(),
            bid_id: bid_id.to_string(),
            transaction_id: format!("tx-{bid_id}"),
            sizes: vec![Size::new(1800, 1000)],
            params: Some(BidParams {
                zone_id,
                ..BidParams::default()
            }),
            ..BidRequest::default()
        }
    }

    fn adapter() -> (SublimeAdapter, Arc<RecordingPage>, Arc<RecordingBeacon>) {
        let (env, page, beacon) = recording_environment();
        (SublimeAdapter::new(create_test_settings(), env), page, beacon)
    }

    fn tag_callback_adapter() -> (SublimeAdapter, Arc<RecordingPage>, Arc<RecordingBeacon>) {
        let mut settings = create_test_settings();
        settings.adapter.transport = TransportMode::TagCallback;
        let (env, page, beacon) = recording_environment();
        (SublimeAdapter::new(settings, env), page, beacon)
    }

    #[test]
    fn test_code_and_aliases() {
        let (adapter, _, _) = adapter();
        assert_eq!(adapter.code(), "sublime");
        assert_eq!(adapter.aliases(), &["sskz", "sublime-skinz"]);
    }

    #[test]
    fn test_validity_follows_zone_truthiness() {
        let (adapter, _, _) = adapter();

        assert!(adapter.is_bid_request_valid(&bid("b", Some(Identifier::from(14312)))));
        assert!(adapter.is_bid_request_valid(&bid("b", Some(Identifier::from("z")))));
        assert!(!adapter.is_bid_request_valid(&bid("b", Some(Identifier::from("")))));
        assert!(!adapter.is_bid_request_valid(&bid("b", Some(Identifier::from(0)))));
        assert!(!adapter.is_bid_request_valid(&bid("b", None)));

        let without_params = BidRequest {
            params: None,
            ..bid("b", None)
        };
        assert!(!adapter.is_bid_request_valid(&without_params));

        let from_json: BidRequest = serde_json::from_value(json!({
            "bidder": "sublime",
            "params": { "zoneId": null, "sacHost": "sac.ayads.co" }
        }))
        .unwrap();
        assert!(!adapter.is_bid_request_valid(&from_json));
    }

    #[test]
    fn test_end_to_end_auction() {
        let (adapter, page, beacon) = adapter();
        let bids = vec![bid("abc1234", Some(Identifier::from(14312)))];

        let requests = adapter.build_requests(&bids, &BidderRequest::default());
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.url.host_str(), Some("pbjs.sskzlabs.com"));
        let RequestData::Json(data) = &request.data else {
            panic!("default transport should post JSON");
        };
        assert_eq!(data["zoneId"], json!(14312));

        let response = ServerResponse::new(json!({
            "request_id": "abc1234",
            "cpm": 0.5,
            "ad": "<creative/>"
        }));
        let result = adapter.interpret_response(&response, request);

        assert_eq!(
            result,
            vec![NormalizedBid {
                request_id: "abc1234".to_string(),
                cpm: 0.5,
                width: 1800,
                height: 1000,
                creative_id: Identifier::from(1),
                deal_id: Identifier::from(1),
                currency: "EUR".to_string(),
                net_revenue: true,
                ttl: 600,
                referrer: String::new(),
                ad: "<creative/>".to_string(),
                zone_id: Some(Identifier::from(14312)),
            }]
        );

        let scripts = page.scripts();
        assert_eq!(scripts.len(), 1);
        assert_eq!(
            scripts[0].src.as_str(),
            "https://sac.ayads.co/sublime/14312/prebid?callback=false"
        );
        assert_eq!(scripts[0].correlation_token, None);
        assert_eq!(beacon.events(), vec!["build request", "bid"]);
    }

    #[test]
    fn test_empty_object_response_is_no_bid() {
        let (adapter, _, _) = adapter();
        let bids = vec![bid("abc1234", Some(Identifier::from(14312)))];
        let requests = adapter.build_requests(&bids, &BidderRequest::default());

        let result = adapter.interpret_response(&ServerResponse::new(json!({})), &requests[0]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_second_zone_is_reported() {
        let (adapter, page, _) = adapter();
        let bids = vec![
            bid("first", Some(Identifier::from(14312))),
            bid("second", Some(Identifier::from(14312))),
        ];

        let output = adapter.build(&bids, &BidderRequest::default());

        assert_eq!(output.requests.len(), 2);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].contains("14312"));
        assert_eq!(page.scripts().len(), 1);
    }

    #[test]
    fn test_invalid_descriptors_are_skipped() {
        let (adapter, page, beacon) = adapter();
        let bids = vec![
            bid("skipped", Some(Identifier::from(0))),
            bid("kept", Some(Identifier::from("z-9"))),
        ];

        let output = adapter.build(&bids, &BidderRequest::default());

        assert_eq!(output.requests.len(), 1);
        assert!(output.warnings.is_empty());
        assert_eq!(
            output.tag.map(|tag| tag.src.to_string()),
            Some("https://sac.ayads.co/sublime/z-9/prebid?callback=false".to_string())
        );
        assert_eq!(page.scripts().len(), 1);
        assert_eq!(beacon.request_id_of("build request").as_deref(), Some("kept"));
    }

    #[test]
    fn test_no_valid_descriptors_builds_nothing() {
        let (adapter, page, beacon) = adapter();
        let output = adapter.build(&[bid("b", None)], &BidderRequest::default());

        assert!(output.requests.is_empty());
        assert!(output.tag.is_none());
        assert!(page.scripts().is_empty());
        assert!(beacon.urls().is_empty());
    }

    #[test]
    fn test_tag_injection_can_be_disabled() {
        let mut settings = create_test_settings();
        settings.adapter.inject_tag = false;
        let (env, page, _) = recording_environment();
        let adapter = SublimeAdapter::new(settings, env);

        let output = adapter.build(
            &[bid("b", Some(Identifier::from(1)))],
            &BidderRequest::default(),
        );
        assert_eq!(output.requests.len(), 1);
        assert!(output.tag.is_none());
        assert!(page.scripts().is_empty());
    }

    #[test]
    fn test_failed_injection_is_a_warning() {
        let page = Arc::new(RecordingPage::failing());
        let env = HostEnvironment::new(page, Arc::new(RecordingBeacon::default()));
        let adapter = SublimeAdapter::new(create_test_settings(), env);

        let output = adapter.build(
            &[bid("b", Some(Identifier::from(1)))],
            &BidderRequest::default(),
        );
        assert_eq!(output.requests.len(), 1);
        assert!(output.tag.is_none());
        assert_eq!(output.warnings.len(), 1);
    }

    #[test]
    fn test_tag_callback_transport_builds_first_zone_only() {
        let (adapter, page, _) = tag_callback_adapter();
        let bids = vec![
            bid("abc1234", Some(Identifier::from(14312))),
            bid("other", Some(Identifier::from(99))),
        ];

        let output = adapter.build(&bids, &BidderRequest::default());

        assert_eq!(output.requests.len(), 1);
        assert_eq!(
            output.requests[0].full_url().as_str(),
            "https://pbjs.sskzlabs.com/bid?prebid=1&request_id=abc1234&z=14312&w=1800&h=1000"
        );
        assert!(output.warnings[0].contains("99"));

        let scripts = page.scripts();
        assert_eq!(
            scripts[0].src.as_str(),
            "https://sac.ayads.co/sublime/14312/prebid?callback=sublime_prebid_callback"
        );
        assert!(scripts[0].correlation_token.is_some());
    }

    #[test]
    fn test_notification_resolves_once() {
        let (adapter, _, _) = tag_callback_adapter();
        let output = adapter.build(
            &[bid("abc1234", Some(Identifier::from(14312)))],
            &BidderRequest::default(),
        );
        let token = output
            .tag
            .and_then(|tag| tag.correlation_token)
            .expect("tag callback transport should register a token");

        let notification = TagNotification {
            has_ad: true,
            ad: "<div/>".to_string(),
            cpm: 0.5,
            currency: "EUR".to_string(),
        };
        let request = adapter.handle_notification(&token, &notification).unwrap();
        assert_eq!(request.url.as_str(), "https://pbjs.sskzlabs.com/notify");
        let body: Json = serde_json::from_slice(&request.body_bytes().unwrap()).unwrap();
        assert_eq!(body["requestId"], json!("abc1234"));
        assert_eq!(body["transactionId"], json!("tx-abc1234"));
        assert_eq!(body["zoneId"], json!(14312));
        assert_eq!(body["a"], json!("1"));

        assert!(adapter.handle_notification(&token, &notification).is_err());
    }

    #[test]
    fn test_notification_honours_form_encoding() {
        let mut settings = create_test_settings();
        settings.adapter.transport = TransportMode::TagCallback;
        settings.adapter.notify_encoding = NotifyEncoding::Form;
        let (env, _, _) = recording_environment();
        let adapter = SublimeAdapter::new(settings, env);

        let token = adapter
            .build(
                &[bid("abc1234", Some(Identifier::from(14312)))],
                &BidderRequest::default(),
            )
            .tag
            .and_then(|tag| tag.correlation_token)
            .expect("token should be registered");

        let request = adapter
            .handle_notification(&token, &TagNotification::default())
            .unwrap();
        assert_eq!(
            request.options.content_type.as_deref(),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_on_timeout_emits_per_entry() {
        let (adapter, _, beacon) = adapter();
        let timeouts = vec![
            TimeoutData {
                bid_id: "b1".to_string(),
                params: vec![BidParams {
                    zone_id: Some(Identifier::from(14312)),
                    ..BidParams::default()
                }],
                ..TimeoutData::default()
            },
            TimeoutData {
                bid_id: "b2".to_string(),
                ..TimeoutData::default()
            },
        ];

        adapter.on_timeout(&timeouts);

        assert_eq!(beacon.events(), vec!["bid timeout", "bid timeout"]);
        assert_eq!(beacon.request_id_of("bid timeout").as_deref(), Some("b1"));
    }

    #[test]
    fn test_on_bid_won_emits_event() {
        let bridge = Arc::new(RecordingBridge::default());
        let (env, _, beacon) = recording_environment();
        let adapter =
            SublimeAdapter::new(create_test_settings(), env).with_analytics_bridge(bridge.clone());

        adapter.on_bid_won(&NormalizedBid {
            request_id: "abc1234".to_string(),
            cpm: 0.5,
            width: 1800,
            height: 1000,
            creative_id: Identifier::from(1),
            deal_id: Identifier::from(1),
            currency: "EUR".to_string(),
            net_revenue: true,
            ttl: 600,
            referrer: String::new(),
            ad: "<div/>".to_string(),
            zone_id: Some(Identifier::from(14312)),
        });

        assert!(beacon.urls().is_empty());
        assert_eq!(
            bridge.events(),
            vec![(
                "14312".to_string(),
                "bidwon".to_string(),
                Some("abc1234".to_string())
            )]
        );
    }

    #[test]
    fn test_user_syncs_are_empty() {
        let (adapter, _, _) = adapter();
        assert!(adapter
            .get_user_syncs(&Default::default(), &[ServerResponse::empty()])
            .is_empty());
    }

    #[test]
    fn test_referrer_reaches_the_bid() {
        let (adapter, _, _) = adapter();
        let bidder_request: BidderRequest = serde_json::from_value(json!({
            "refererInfo": { "referer": "https://publisher.example.com/" },
            "currency": "USD"
        }))
        .unwrap();
        let requests = adapter.build_requests(
            &[bid("abc1234", Some(Identifier::from(14312)))],
            &bidder_request,
        );

        let bids = adapter.interpret_response(
            &ServerResponse::new(json!({ "requestId": "abc1234", "cpm": 1, "ad": "<div/>" })),
            &requests[0],
        );
        assert_eq!(bids[0].referrer, "https://publisher.example.com/");
        assert_eq!(bids[0].currency, "USD");
    }

    #[test]
    fn test_won_bid_pixel_carries_its_zone() {
        let (adapter, _, beacon) = adapter();
        let requests = adapter.build_requests(
            &[bid("abc1234", Some(Identifier::from(14312)))],
            &BidderRequest::default(),
        );
        let bids = adapter.interpret_response(
            &ServerResponse::new(json!({ "requestId": "abc1234", "cpm": 1, "ad": "<div/>" })),
            &requests[0],
        );

        adapter.on_bid_won(&bids[0]);

        assert_eq!(beacon.param_of("bidwon", "z").as_deref(), Some("14312"));
        assert_eq!(beacon.request_id_of("bidwon").as_deref(), Some("abc1234"));
    }

    #[test]
    fn test_elapsed_time_is_measured_from_page_origin() {
        let origin = Instant::now()
            .checked_sub(Duration::from_millis(120))
            .expect("clock should reach back 120ms");
        let (env, _, beacon) = recording_environment();
        let adapter = SublimeAdapter::new(create_test_settings(), env.with_origin(origin));

        adapter.on_timeout(&[TimeoutData {
            bid_id: "b1".to_string(),
            ..TimeoutData::default()
        }]);
        let requests = adapter.build_requests(
            &[bid("abc1234", Some(Identifier::from(14312)))],
            &BidderRequest::default(),
        );
        let bids = adapter.interpret_response(
            &ServerResponse::new(json!({ "requestId": "abc1234", "cpm": 1, "ad": "<div/>" })),
            &requests[0],
        );
        adapter.on_bid_won(&bids[0]);

        for event in ["bid timeout", "build request", "bid", "bidwon"] {
            let elapsed: u64 = beacon
                .param_of(event, "et")
                .and_then(|et| et.parse().ok())
                .unwrap_or_else(|| panic!("{event} should carry et"));
            assert!(elapsed >= 120, "{event} reported et={elapsed}");
        }
    }

    #[test]
    fn test_size_fallback_follows_posted_sizes() {
        let (adapter, _, _) = adapter();
        let descriptor = BidRequest {
            sizes: vec![Size::new(1, 1)],
            media_types: Some(MediaTypes {
                banner: Some(BannerMediaType {
                    sizes: vec![Size::new(300, 250)],
                }),
            }),
            ..bid("abc1234", Some(Identifier::from(14312)))
        };
        let requests = adapter.build_requests(&[descriptor], &BidderRequest::default());

        let bids = adapter.interpret_response(
            &ServerResponse::new(json!({ "requestId": "abc1234", "cpm": 1, "ad": "<div/>" })),
            &requests[0],
        );
        assert_eq!((bids[0].width, bids[0].height), (1, 1));
    }

    #[test]
    fn test_size_fallback_follows_queried_size() {
        let (adapter, _, _) = tag_callback_adapter();
        let descriptor = BidRequest {
            sizes: vec![Size::new(1, 1)],
            ..bid("abc1234", Some(Identifier::from(14312)))
        };
        let requests = adapter.build_requests(&[descriptor], &BidderRequest::default());
        assert!(requests[0].full_url().as_str().ends_with("&w=1800&h=1000"));

        let bids = adapter.interpret_response(
            &ServerResponse::new(json!({ "requestId": "abc1234", "cpm": 1, "ad": "<div/>" })),
            &requests[0],
        );
        assert_eq!((bids[0].width, bids[0].height), (1800, 1000));
    }
}
