//! Configuration commands.
//!
//! Configuration is loaded from TOML files and merged with environment variables
//! prefixed with `SUBLIME__`. For example, `SUBLIME__ADAPTER__BID_HOST`
//! will override `adapter.bid_host` in the TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use sublime_common::settings::Settings;

use crate::error::CliError;

/// Load settings from `file`, or the bundled `sublime.toml` when no file is
/// given, merged with `SUBLIME__*` environment variables.
pub(crate) fn load_settings(file: Option<&Path>, verbose: bool) -> Result<Settings, CliError> {
    let settings = match file {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            if verbose {
                println!("Loading config from: {}", path.display());
                println!("Environment variables with SUBLIME__ prefix will be merged");
            }
            Settings::from_toml(&content)?
        }
        None => {
            if verbose {
                println!("Using bundled configuration");
            }
            Settings::new()?
        }
    };

    Ok(settings)
}

/// Validate a configuration file and print the effective settings.
pub fn validate(file: PathBuf, verbose: bool) -> Result<(), CliError> {
    let settings = load_settings(Some(file.as_path()), verbose)?;

    let merged_toml = settings
        .to_canonical_toml()
        .map_err(|e| CliError::Config(format!("Failed to serialize merged config: {e:?}")))?;

    println!("Configuration is valid");
    println!("  File: {}", file.display());
    println!("  Bid host: {}", settings.adapter.bid_host);
    println!("  Tag host: {}", settings.adapter.tag_host);
    println!("  Transport: {:?}", settings.adapter.transport);

    if verbose {
        println!("\nEffective configuration:");
        println!("---");
        println!("{}", merged_toml);
        println!("---");
    }

    Ok(())
}
