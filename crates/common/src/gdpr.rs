//! GDPR consent data passed through to the bid host.
//!
//! The consent string is opaque and forwarded unmodified. The applies flag is
//! read leniently: anything that is not a JSON boolean counts as "applies".

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GdprConsent {
    pub consent_string: Option<String>,
    pub gdpr_applies: Option<Json>,
}

impl GdprConsent {
    /// Whether GDPR applies. Non-boolean or missing flags default to `true`.
    #[must_use]
    pub fn applies(&self) -> bool {
        match &self.gdpr_applies {
            Some(Json::Bool(applies)) => *applies,
            _ => true,
        }
    }
}
