//! Correlation of out-of-band tag notifications.
//!
//! When the injected tag runs it reports what it actually rendered. Each
//! injection registers a [`NotifyContext`] under a random token; the page glue
//! hands the token back with the [`TagNotification`] and the adapter turns it
//! into a fire-and-forget `POST /notify`. Tokens resolve once and expire after
//! the configured TTL, so a late tag can never pick up another auction's
//! context.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use error_stack::Report;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use url::Url;
use uuid::Uuid;

use crate::auction::context::AuctionScope;
use crate::auction::types::{Identifier, OutboundRequest, RequestContext, RequestData, RequestOptions};
use crate::constants::{CONTENT_TYPE_FORM, CONTENT_TYPE_JSON};
use crate::error::AdapterError;

use super::config::NotifyEncoding;

/// What the adapter remembers about an injection until the tag reports.
#[derive(Debug, Clone)]
pub struct NotifyContext {
    pub notify_url: Url,
    pub request_id: String,
    pub transaction_id: String,
    pub zone_id: Identifier,
    pub scope: AuctionScope,
}

/// Report delivered by the injected tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagNotification {
    pub has_ad: bool,
    pub ad: String,
    pub cpm: f64,
    pub currency: String,
}

struct PendingNotify {
    context: NotifyContext,
    registered_at: Instant,
}

/// Pending notify contexts keyed by opaque token.
pub struct NotifyRegistry {
    ttl: Duration,
    entries: Mutex<HashMap<String, PendingNotify>>,
}

impl NotifyRegistry {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store `context` and return the token that resolves it.
    pub fn register(&self, context: NotifyContext) -> String {
        let token = Uuid::new_v4().to_string();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        self.purge_expired(&mut entries);
        entries.insert(
            token.clone(),
            PendingNotify {
                context,
                registered_at: Instant::now(),
            },
        );
        token
    }

    /// Take the context registered under `token`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Notify`] if the token is unknown, was already
    /// resolved, or has expired.
    pub fn resolve(&self, token: &str) -> Result<NotifyContext, Report<AdapterError>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        self.purge_expired(&mut entries);
        entries
            .remove(token)
            .map(|pending| pending.context)
            .ok_or_else(|| {
                Report::new(AdapterError::Notify {
                    message: format!("Unknown or expired notify token: {token}"),
                })
            })
    }

    /// Number of unexpired pending contexts.
    #[must_use]
    pub fn pending(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        self.purge_expired(&mut entries);
        entries.len()
    }

    fn purge_expired(&self, entries: &mut HashMap<String, PendingNotify>) {
        let before = entries.len();
        entries.retain(|_, pending| pending.registered_at.elapsed() < self.ttl);
        let purged = before - entries.len();
        if purged > 0 {
            log::debug!("Sublime: purged {} expired notify entries", purged);
        }
    }
}

/// `POST {protocol}://{bidHost}/notify` for a resolved context.
#[must_use]
pub fn build_notify_request(
    context: &NotifyContext,
    notification: &TagNotification,
    encoding: NotifyEncoding,
) -> OutboundRequest {
    let fields: Vec<(&str, Json)> = vec![
        ("a", json!(if notification.has_ad { "1" } else { "0" })),
        ("ad", json!(notification.ad)),
        ("cpm", json!(notification.cpm)),
        ("currency", json!(notification.currency)),
        ("notify", json!(1)),
        ("requestId", json!(context.request_id)),
        ("transactionId", json!(context.transaction_id)),
        ("zoneId", Json::from(context.zone_id.clone())),
    ];

    let (data, content_type) = match encoding {
        NotifyEncoding::Json => {
            let body: Map<String, Json> = fields
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect();
            (RequestData::Json(body), CONTENT_TYPE_JSON)
        }
        NotifyEncoding::Form => {
            let pairs = fields
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Json::String(s) => s,
                        other => other.to_string(),
                    };
                    (key.to_string(), value)
                })
                .collect();
            (RequestData::Form(pairs), CONTENT_TYPE_FORM)
        }
    };

    OutboundRequest {
        method: Method::POST,
        url: context.notify_url.clone(),
        data,
        options: RequestOptions {
            content_type: Some(content_type.to_string()),
            with_credentials: true,
        },
        context: RequestContext {
            scope: context.scope.clone(),
            ..RequestContext::default()
        },
    }
}
