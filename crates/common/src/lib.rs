//! Sublime bidder adapter for header-bidding hosts.
//!
//! This crate provides the adapter logic, the host-facing contract types and
//! the configuration/logging plumbing shared by every host binary.
//!
//! # Modules
//!
//! - [`auction`]: Host bidding contract, adapter registry and host seams
//! - [`constants`]: Wire defaults and bidder identity
//! - [`error`]: Error types and error handling utilities
//! - [`gdpr`]: GDPR consent pass-through data
//! - [`integrations`]: Adapter implementations (`sublime`)
//! - [`logging`]: `fern` logger setup
//! - [`settings`]: Configuration management and validation
//! - [`test_support`]: Testing utilities and recording doubles

pub mod auction;
pub mod constants;
pub mod error;
pub mod gdpr;
pub mod integrations;
pub mod logging;
pub mod settings;
pub mod test_support;
