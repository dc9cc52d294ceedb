//! Sublime adapter CLI.
//!
//! This tool provides commands for:
//! - Validating configuration files
//! - Checking which bid descriptors the adapter accepts
//! - Printing the outbound requests built for a set of descriptors
//! - Interpreting a saved `/bid` response
//! - Running a full round trip against the bid host

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

mod bids;
mod config;
mod error;
mod host;

use error::CliError;

#[derive(Parser)]
#[command(name = "sublimecli")]
#[command(about = "Local host harness for the Sublime bidder adapter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the bundled sublime.toml)
    #[arg(long, short = 'f', global = true, env = "SUBLIME_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    ValidateConfig,

    /// Report which bid descriptors are valid
    ValidateBids {
        /// JSON array of bid descriptors
        #[arg(long, short)]
        bids: PathBuf,
    },

    /// Print the outbound requests for a set of bid descriptors
    Build {
        /// JSON array of bid descriptors
        #[arg(long, short)]
        bids: PathBuf,

        /// JSON auction context (timeout, currency, referer, consent)
        #[arg(long, short)]
        context: Option<PathBuf>,
    },

    /// Interpret a saved bid response
    Interpret {
        /// Saved response body
        #[arg(long, short)]
        response: PathBuf,

        /// JSON array of bid descriptors the response answers
        #[arg(long, short)]
        bids: PathBuf,

        /// JSON auction context (timeout, currency, referer, consent)
        #[arg(long, short)]
        context: Option<PathBuf>,
    },

    /// Build, send and interpret; print the resulting bids
    Run {
        /// JSON array of bid descriptors
        #[arg(long, short)]
        bids: PathBuf,

        /// JSON auction context (timeout, currency, referer, consent)
        #[arg(long, short)]
        context: Option<PathBuf>,

        /// Dry run - show what would be sent without sending anything
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    sublime_common::logging::init_logging(level);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::ValidateConfig = cli.command {
        let file = cli
            .config
            .ok_or_else(|| CliError::Config("validate-config needs --config <FILE>".into()))?;
        return config::validate(file, cli.verbose);
    }

    let settings = config::load_settings(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::ValidateConfig => Ok(()),
        Commands::ValidateBids { bids } => bids::validate_bids(settings, bids),
        Commands::Build { bids, context } => bids::build(settings, bids, context),
        Commands::Interpret {
            response,
            bids,
            context,
        } => bids::interpret(settings, response, bids, context),
        Commands::Run {
            bids,
            context,
            dry_run,
        } => bids::run(settings, bids, context, dry_run),
    }
}
