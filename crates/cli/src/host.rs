//! Host seams for running the adapter from the command line.
//!
//! There is no page here, so injected scripts are only logged. Beacons and
//! bid requests go over the network with `ureq` unless running dry.

use std::sync::Arc;

use error_stack::Report;
use serde_json::Value as Json;
use sublime_common::auction::environment::{
    BeaconSender, HostEnvironment, PageEnvironment, ScriptTag,
};
use sublime_common::auction::types::{OutboundRequest, ServerResponse};
use sublime_common::error::AdapterError;
use url::Url;

use crate::error::CliError;

/// Logs script insertions instead of touching a page.
#[derive(Debug, Default)]
pub struct LoggingPage;

impl PageEnvironment for LoggingPage {
    fn insert_script(&self, script: &ScriptTag) -> Result<(), Report<AdapterError>> {
        log::info!(
            "Would insert <script src=\"{}\"> (callback: {}, token: {})",
            script.src,
            script.callback_name.as_deref().unwrap_or("none"),
            script.correlation_token.as_deref().unwrap_or("none")
        );
        Ok(())
    }
}

/// Fires telemetry pixels with `ureq`.
#[derive(Debug, Default)]
pub struct UreqBeacon {
    dry_run: bool,
}

impl UreqBeacon {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl BeaconSender for UreqBeacon {
    fn send_beacon(&self, url: &Url) -> Result<(), Report<AdapterError>> {
        if self.dry_run {
            log::info!("[Dry Run] Beacon: {}", url);
            return Ok(());
        }

        ureq::get(url.as_str()).call().map_err(|e| {
            Report::new(AdapterError::Telemetry {
                message: format!("Beacon to {} failed: {}", url, e),
            })
        })?;
        Ok(())
    }
}

/// Host environment used by every CLI command.
pub fn environment(dry_run: bool) -> HostEnvironment {
    HostEnvironment::new(Arc::new(LoggingPage), Arc::new(UreqBeacon::new(dry_run)))
}

/// Perform `request` and wrap the answer for the adapter.
pub fn send(request: &OutboundRequest) -> Result<ServerResponse, CliError> {
    let url = request.full_url();
    log::debug!("{} {}", request.method, url);

    let response = if request.method == "GET" {
        ureq::get(url.as_str()).call()?
    } else {
        let body = request.body_bytes()?;
        let mut builder = ureq::post(url.as_str());
        if let Some(content_type) = &request.options.content_type {
            builder = builder.header("Content-Type", content_type);
        }
        builder.send(&body[..])?
    };

    let body = response.into_body().read_to_string()?;
    Ok(server_response(&body))
}

/// JSON bodies are parsed, anything else is handed over as a string.
pub fn server_response(body: &str) -> ServerResponse {
    if body.trim().is_empty() {
        return ServerResponse::empty();
    }
    match serde_json::from_str::<Json>(body) {
        Ok(json) => ServerResponse::new(json),
        Err(_) => ServerResponse::new(Json::String(body.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_response_parses_json() {
        let response = server_response(r#"{"cpm": 0.5}"#);
        assert_eq!(response.body, Some(json!({ "cpm": 0.5 })));
    }

    #[test]
    fn test_server_response_keeps_raw_text() {
        let response = server_response("<!-- No ad -->");
        assert_eq!(response.body, Some(json!("<!-- No ad -->")));
    }

    #[test]
    fn test_server_response_empty_body() {
        assert_eq!(server_response("  ").body, None);
    }

    #[test]
    fn test_dry_run_beacon_does_not_send() {
        let beacon = UreqBeacon::new(true);
        let url = Url::parse("https://antenna.ayads.co/?e=bid").unwrap();
        assert!(beacon.send_beacon(&url).is_ok());
    }

    #[test]
    fn test_logging_page_accepts_scripts() {
        let script = ScriptTag {
            src: Url::parse("https://sac.ayads.co/sublime/1/prebid?callback=false").unwrap(),
            callback_name: None,
            correlation_token: None,
        };
        assert!(LoggingPage.insert_script(&script).is_ok());
    }
}
