//! Resilient remote access
//!
//! - `transport`: the raw JSON-over-HTTP seam (`Transport`, `HttpTransport`)
//! - `registry`: per-class endpoint discovery, health caching and selection
//! - `client`: retry with exponential backoff and endpoint rotation

pub mod client;
pub mod registry;
pub mod transport;
pub mod types;

#[cfg(test)]
pub mod mock;

pub use client::{retry_with_backoff, ResilientClient, RetryPolicy};
pub use registry::EndpointHealthRegistry;
pub use transport::{HttpTransport, Transport};
pub use types::{DiscoveryEntry, Endpoint, HealthCacheEntry, ServiceClass};
