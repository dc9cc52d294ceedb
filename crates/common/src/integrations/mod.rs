//! Bidder adapter implementations.

pub mod sublime;
