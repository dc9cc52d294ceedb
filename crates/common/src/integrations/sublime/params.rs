//! Per-descriptor parameter resolution.
//!
//! Overrides resolve as: explicit bid param, then `[adapter]` setting, then
//! the module default (already folded into the setting's serde default).

use error_stack::{Report, ResultExt};
use url::Url;

use crate::auction::types::{BidRequest, Identifier};
use crate::constants::{BID_PATH, NOTIFY_PATH};
use crate::error::AdapterError;

use super::config::SublimeConfig;

/// Parameters of one valid descriptor after overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParams {
    pub zone_id: Identifier,
    pub protocol: String,
    pub bid_host: String,
    pub tag_host: String,
    pub callback_name: String,
}

impl ResolvedParams {
    /// Resolve the descriptor's parameters. Returns `None` when the zone id is
    /// missing or falsy, i.e. when the descriptor is not auctionable.
    #[must_use]
    pub fn resolve(bid: &BidRequest, config: &SublimeConfig) -> Option<Self> {
        let params = bid.params.as_ref()?;
        let zone_id = params.zone_id.as_ref().filter(|z| z.is_truthy())?;

        Some(Self {
            zone_id: zone_id.clone(),
            protocol: pick(params.protocol.as_deref(), &config.protocol),
            bid_host: pick(params.bid_host.as_deref(), &config.bid_host),
            tag_host: pick(params.sac_host.as_deref(), &config.tag_host),
            callback_name: pick(params.callback_name.as_deref(), &config.callback_name),
        })
    }

    /// `{protocol}://{bidHost}/bid`
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Request`] if the protocol or host do not form a
    /// valid URL.
    pub fn bid_url(&self) -> Result<Url, Report<AdapterError>> {
        self.bid_host_url(BID_PATH)
    }

    /// `{protocol}://{bidHost}/notify`
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Request`] if the protocol or host do not form a
    /// valid URL.
    pub fn notify_url(&self) -> Result<Url, Report<AdapterError>> {
        self.bid_host_url(NOTIFY_PATH)
    }

    fn bid_host_url(&self, path: &str) -> Result<Url, Report<AdapterError>> {
        let raw = format!("{}://{}{}", self.protocol, self.bid_host, path);
        Url::parse(&raw).change_context(AdapterError::Request {
            message: format!("Invalid bid host URL: {raw}"),
        })
    }
}

/// Explicit non-blank override, else the configured value.
fn pick(explicit: Option<&str>, configured: &str) -> String {
    explicit
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(configured)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::types::BidParams;

    fn bid_with(params: BidParams) -> BidRequest {
        BidRequest {
            bid_id: "abc1234".to_string(),
            params: Some(params),
            ..BidRequest::default()
        }
    }

    #[test]
    fn test_resolve_uses_defaults() {
        let bid = bid_with(BidParams {
            zone_id: Some(Identifier::from(14312)),
            ..BidParams::default()
        });

        let resolved = ResolvedParams::resolve(&bid, &SublimeConfig::default()).unwrap();
        assert_eq!(resolved.zone_id, Identifier::from(14312));
        assert_eq!(resolved.protocol, "https");
        assert_eq!(resolved.bid_host, "pbjs.sskzlabs.com");
        assert_eq!(resolved.tag_host, "sac.ayads.co");
        assert_eq!(resolved.callback_name, "sublime_prebid_callback");
        assert_eq!(
            resolved.bid_url().unwrap().as_str(),
            "https://pbjs.sskzlabs.com/bid"
        );
        assert_eq!(
            resolved.notify_url().unwrap().as_str(),
            "https://pbjs.sskzlabs.com/notify"
        );
    }

    #[test]
    fn test_explicit_params_win_over_settings() {
        let config = SublimeConfig {
            bid_host: "configured.example.com".to_string(),
            ..SublimeConfig::default()
        };
        let bid = bid_with(BidParams {
            zone_id: Some(Identifier::from("z-1")),
            protocol: Some("http".to_string()),
            bid_host: Some("bid.example.com".to_string()),
            sac_host: Some("tag.example.com".to_string()),
            callback_name: Some("cb".to_string()),
        });

        let resolved = ResolvedParams::resolve(&bid, &config).unwrap();
        assert_eq!(resolved.bid_url().unwrap().as_str(), "http://bid.example.com/bid");
        assert_eq!(resolved.tag_host, "tag.example.com");
        assert_eq!(resolved.callback_name, "cb");
    }

    #[test]
    fn test_blank_override_falls_back_to_settings() {
        let config = SublimeConfig {
            bid_host: "configured.example.com".to_string(),
            ..SublimeConfig::default()
        };
        let bid = bid_with(BidParams {
            zone_id: Some(Identifier::from(7)),
            bid_host: Some("  ".to_string()),
            ..BidParams::default()
        });

        let resolved = ResolvedParams::resolve(&bid, &config).unwrap();
        assert_eq!(resolved.bid_host, "configured.example.com");
    }

    #[test]
    fn test_falsy_zone_is_not_resolved() {
        for zone_id in [None, Some(Identifier::from(0)), Some(Identifier::from(""))] {
            let bid = bid_with(BidParams {
                zone_id,
                ..BidParams::default()
            });
            assert!(ResolvedParams::resolve(&bid, &SublimeConfig::default()).is_none());
        }
        assert!(ResolvedParams::resolve(&BidRequest::default(), &SublimeConfig::default()).is_none());
    }

    #[test]
    fn test_invalid_host_is_an_error() {
        let bid = bid_with(BidParams {
            zone_id: Some(Identifier::from(1)),
            bid_host: Some("bad host/with spaces".to_string()),
            ..BidParams::default()
        });

        let resolved = ResolvedParams::resolve(&bid, &SublimeConfig::default()).unwrap();
        let err = resolved.bid_url().unwrap_err();
        assert!(matches!(err.current_context(), AdapterError::Request { .. }));
    }
}
