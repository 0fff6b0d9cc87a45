//! hive-flows: value flow reports for the Hive and Hive-Engine ledgers
//!
//! Scans account histories on both ledgers within a time window and reports
//! inbound value per sender category or outbound value per recipient, in
//! native units and USD. Remote access goes through a discovered, health
//! checked endpoint pool with retries and endpoint rotation.

#[macro_use]
pub mod config;

pub mod aggregation;
pub mod analyzer;
pub mod apis;
pub mod arguments;
pub mod constants;
pub mod errors;
pub mod logger;
pub mod pricing;
pub mod rpc;
pub mod scanner;
pub mod summary;

pub use analyzer::{FlowAnalyzer, InboundsRequest, OutboundsRequest};
pub use errors::FlowError;
