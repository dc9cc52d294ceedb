//! Side-effect seams implemented by the host environment.
//!
//! The adapter never touches the page or the network itself. Script insertion
//! and pixel delivery go through these traits so the host decides how (and
//! whether) they happen.

use std::sync::Arc;
use std::time::Instant;

use error_stack::Report;
use url::Url;

use crate::error::AdapterError;

/// Script tag the adapter asks the host to insert into the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: Url,
    /// Callback name announced to the script, if any
    pub callback_name: Option<String>,
    /// Opaque token the page glue passes back when the script reports
    pub correlation_token: Option<String>,
}

/// Inserts remote scripts into the page.
pub trait PageEnvironment: Send + Sync {
    /// Insert `script` into the page. Loading happens asynchronously and out
    /// of band.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the script could not be queued.
    fn insert_script(&self, script: &ScriptTag) -> Result<(), Report<AdapterError>>;
}

/// Delivers fire-and-forget telemetry pixels.
pub trait BeaconSender: Send + Sync {
    /// Fire a `GET` beacon to `url` without waiting for an answer.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the beacon could not be queued.
    fn send_beacon(&self, url: &Url) -> Result<(), Report<AdapterError>>;
}

/// Host seams handed to an adapter at construction.
#[derive(Clone)]
pub struct HostEnvironment {
    pub page: Arc<dyn PageEnvironment>,
    pub beacon: Arc<dyn BeaconSender>,
    /// Page-level time origin (navigation start) telemetry reports against
    pub origin: Instant,
}

impl HostEnvironment {
    /// Environment whose time origin is now.
    #[must_use]
    pub fn new(page: Arc<dyn PageEnvironment>, beacon: Arc<dyn BeaconSender>) -> Self {
        Self {
            page,
            beacon,
            origin: Instant::now(),
        }
    }

    /// Use `origin` as the page time origin, e.g. the host's navigation start.
    #[must_use]
    pub fn with_origin(mut self, origin: Instant) -> Self {
        self.origin = origin;
        self
    }

    /// Environment that drops every side effect. Useful for hosts that only
    /// need the request/response mapping.
    #[must_use]
    pub fn detached() -> Self {
        let noop = Arc::new(Detached);
        Self::new(noop.clone(), noop)
    }
}

struct Detached;

impl PageEnvironment for Detached {
    fn insert_script(&self, script: &ScriptTag) -> Result<(), Report<AdapterError>> {
        log::trace!("Detached environment: dropping script {}", script.src);
        Ok(())
    }
}

impl BeaconSender for Detached {
    fn send_beacon(&self, url: &Url) -> Result<(), Report<AdapterError>> {
        log::trace!("Detached environment: dropping beacon {}", url);
        Ok(())
    }
}
