//! Error types for the Sublime adapter.
//!
//! Errors never cross the host bidding contract: the contract methods degrade
//! to documented defaults and log instead. Internal fallible steps return
//! [`error_stack::Report<AdapterError>`] so the cause chain stays attached.

use derive_more::{Display, Error};

/// Errors raised by fallible internal steps of the adapter.
#[derive(Debug, Display, Error)]
pub enum AdapterError {
    /// Settings could not be loaded or failed validation.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// An outbound request could not be constructed.
    #[display("Request error: {message}")]
    Request { message: String },

    /// A server response could not be read.
    #[display("Response error: {message}")]
    Response { message: String },

    /// A tag notification could not be correlated or encoded.
    #[display("Notify error: {message}")]
    Notify { message: String },

    /// A telemetry event could not be delivered.
    #[display("Telemetry error: {message}")]
    Telemetry { message: String },
}
