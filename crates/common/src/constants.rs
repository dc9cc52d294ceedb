pub const BIDDER_CODE: &str = "sublime";
pub const BIDDER_ALIASES: &[&str] = &["sskz", "sublime-skinz"];

/// Version tag sent as `sublimeVersion` in auction payloads.
pub const SUBLIME_VERSION: &str = "0.5.2";

pub const DEFAULT_PROTOCOL: &str = "https";
pub const DEFAULT_BID_HOST: &str = "pbjs.sskzlabs.com";
pub const DEFAULT_TAG_HOST: &str = "sac.ayads.co";
pub const DEFAULT_TELEMETRY_HOST: &str = "antenna.ayads.co";
pub const DEFAULT_CALLBACK_NAME: &str = "sublime_prebid_callback";
pub const DEFAULT_CURRENCY: &str = "EUR";
pub const DEFAULT_TTL_SECONDS: u32 = 600;
pub const DEFAULT_NOTIFY_TTL_MS: u64 = 30_000;

/// Fallback creative size when neither the response nor the request gives one.
pub const DEFAULT_WIDTH: u32 = 1800;
pub const DEFAULT_HEIGHT: u32 = 1000;

/// Sentinel used for `creativeId` and `dealId` when the server omits them.
pub const DEFAULT_CREATIVE_ID: u64 = 1;
pub const DEFAULT_DEAL_ID: u64 = 1;

pub const BID_PATH: &str = "/bid";
pub const NOTIFY_PATH: &str = "/notify";

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
