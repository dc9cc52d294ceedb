//! Script tag for the Sublime analytics/creative loader.

use error_stack::{Report, ResultExt};
use url::Url;

use crate::auction::environment::ScriptTag;
use crate::error::AdapterError;

use super::params::ResolvedParams;

/// `https://{tagHost}/sublime/{zoneId}/prebid?callback={callbackName|false}`
///
/// # Errors
///
/// Returns [`AdapterError::Request`] if the tag host does not form a valid
/// URL.
pub fn script_url(
    params: &ResolvedParams,
    callback_name: Option<&str>,
) -> Result<Url, Report<AdapterError>> {
    let raw = format!("https://{}/", params.tag_host);
    let mut url = Url::parse(&raw).change_context(AdapterError::Request {
        message: format!("Invalid tag host: {}", params.tag_host),
    })?;

    url.path_segments_mut()
        .map_err(|()| {
            Report::new(AdapterError::Request {
                message: format!("Tag host cannot carry a path: {}", params.tag_host),
            })
        })?
        .clear()
        .extend(["sublime", &params.zone_id.to_string(), "prebid"]);

    url.query_pairs_mut()
        .append_pair("callback", callback_name.unwrap_or("false"));

    Ok(url)
}

/// Script tag for `params`, optionally announcing a callback and the notify
/// token the page glue hands back with it.
///
/// # Errors
///
/// Returns [`AdapterError::Request`] if the script URL cannot be built.
pub fn script_tag(
    params: &ResolvedParams,
    callback_name: Option<&str>,
    correlation_token: Option<String>,
) -> Result<ScriptTag, Report<AdapterError>> {
    Ok(ScriptTag {
        src: script_url(params, callback_name)?,
        callback_name: callback_name.map(str::to_string),
        correlation_token,
    })
}
