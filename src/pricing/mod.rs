//! Price resolution
//!
//! - [`NativePriceCache`]: process-wide TTL memo of the native asset's USD price
//! - [`TokenPriceBook`]: per-call token price memo backed by the token market

pub mod cache;
pub mod tokens;

pub use cache::{NativePriceCache, PriceQuote};
pub use tokens::{SymbolPricer, TokenPriceBook};
