//! Bid commands: validate descriptors, build requests, interpret responses
//! and run a full round trip against the bid host.

use std::fs;
use std::path::{Path, PathBuf};

use sublime_common::auction::types::{BidRequest, BidderRequest, NormalizedBid};
use sublime_common::auction::{build_registry, BidderAdapter};
use sublime_common::integrations::sublime::SublimeAdapter;
use sublime_common::settings::Settings;

use crate::error::CliError;
use crate::host;

/// Read a JSON array of bid descriptors.
pub(crate) fn load_bids(path: &Path) -> Result<Vec<BidRequest>, CliError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Read the shared auction context, or use an empty one.
pub(crate) fn load_context(path: Option<&Path>) -> Result<BidderRequest, CliError> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        }
        None => Ok(BidderRequest::default()),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report which descriptors a registered adapter would auction.
///
/// Descriptors are routed by their `bidder` code, so aliases resolve the same
/// way they do in a host.
pub fn validate_bids(settings: Settings, bids: PathBuf) -> Result<(), CliError> {
    let bids = load_bids(&bids)?;
    let registry = build_registry(&settings, &host::environment(true));

    let valid = count_valid(&bids, |bid| {
        let ok = match registry.get(&bid.bidder) {
            Some(adapter) => adapter.is_bid_request_valid(bid),
            None => {
                log::warn!("No adapter registered for bidder '{}'", bid.bidder);
                false
            }
        };
        println!(
            "{} bid {} (bidder {}, ad unit {})",
            if ok { "valid  " } else { "invalid" },
            bid.bid_id,
            bid.bidder,
            bid.ad_unit_code
        );
        ok
    });
    println!("{} of {} bid requests are valid", valid, bids.len());

    Ok(())
}

fn count_valid(bids: &[BidRequest], mut check: impl FnMut(&BidRequest) -> bool) -> usize {
    bids.iter().filter(|&bid| check(bid)).count()
}

/// Print the outbound requests for a set of descriptors.
pub fn build(
    settings: Settings,
    bids: PathBuf,
    context: Option<PathBuf>,
) -> Result<(), CliError> {
    let bids = load_bids(&bids)?;
    let context = load_context(context.as_deref())?;
    let adapter = SublimeAdapter::new(settings, host::environment(true));

    let output = adapter.build(&bids, &context);
    for warning in &output.warnings {
        log::warn!("{}", warning);
    }
    print_json(&output.requests)
}

/// Interpret a saved `/bid` response against the first request built from
/// `bids` and the optional auction `context`.
pub fn interpret(
    settings: Settings,
    response: PathBuf,
    bids: PathBuf,
    context: Option<PathBuf>,
) -> Result<(), CliError> {
    let normalized = replay(&settings, &response, &bids, context.as_deref())?;
    print_json(&normalized)
}

fn replay(
    settings: &Settings,
    response: &Path,
    bids: &Path,
    context: Option<&Path>,
) -> Result<Vec<NormalizedBid>, CliError> {
    let bids = load_bids(bids)?;
    let context = load_context(context)?;
    let body = fs::read_to_string(response)?;
    let adapter = SublimeAdapter::new(settings.clone(), host::environment(true));

    let requests = adapter.build_requests(&bids, &context);
    let request = requests
        .first()
        .ok_or_else(|| CliError::Adapter("No valid bid request to interpret against".into()))?;

    Ok(adapter.interpret_response(&host::server_response(&body), request))
}

/// Build, send and interpret every request; print the resulting bids.
pub fn run(
    settings: Settings,
    bids: PathBuf,
    context: Option<PathBuf>,
    dry_run: bool,
) -> Result<(), CliError> {
    let bids = load_bids(&bids)?;
    let context = load_context(context.as_deref())?;
    let adapter = SublimeAdapter::new(settings, host::environment(dry_run));

    let output = adapter.build(&bids, &context);
    for warning in &output.warnings {
        log::warn!("{}", warning);
    }

    if dry_run {
        println!("[Dry Run] Would send {} request(s):", output.requests.len());
        for request in &output.requests {
            println!("  {} {}", request.method, request.full_url());
        }
        return Ok(());
    }

    let mut normalized: Vec<NormalizedBid> = Vec::new();
    for request in &output.requests {
        match host::send(request) {
            Ok(response) => normalized.extend(adapter.interpret_response(&response, request)),
            Err(e) => log::warn!("Request to {} failed: {}", request.url, e),
        }
    }

    print_json(&normalized)
}
