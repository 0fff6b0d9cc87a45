//! Report building
//!
//! Turns per-account scan sums from both ledgers into priced, sorted reports:
//! native sums are converted with the native USD price, token sums through a
//! [`SymbolPricer`](crate::pricing::SymbolPricer) that resolves each symbol
//! at most once per call. Values stay unrounded until serialization.

pub mod inbound;
pub mod ordered;
pub mod outbound;
pub mod rounding;
pub mod types;

pub use inbound::{assemble_inbounds, build_inbound_report, Category};
pub use ordered::OrderedMap;
pub use outbound::{assemble_outbounds, build_outbound_report, has_activity, no_transfers};
pub use rounding::round_to;
pub use types::{
    AccountOutcome, FlowLine, InboundReport, InboundsResponse, OutboundReport, OutboundsResponse,
    TokenLine,
};

use crate::errors::FlowError;
use crate::pricing::SymbolPricer;
use crate::scanner::BucketSums;

/// Fill the native columns of a line from one bucket
fn apply_native(line: &mut FlowLine, sums: &BucketSums, native_usd: f64) {
    line.hive += sums.amount;
    line.hive_usd += sums.amount * native_usd;
    line.hive_count += sums.count;
    line.total_usd = line.combined_usd();
}

/// Price and add every token symbol of one bucket
async fn apply_tokens(
    line: &mut FlowLine,
    sums: &BucketSums,
    native_usd: f64,
    pricer: &mut dyn SymbolPricer,
) -> Result<(), FlowError> {
    for (symbol, symbol_sums) in sums.symbols.iter() {
        let price = pricer.usd_price(symbol, native_usd).await?;
        line.add_token(
            symbol,
            TokenLine {
                amount: symbol_sums.amount,
                usd: symbol_sums.amount * price,
                count: symbol_sums.count,
            },
        );
    }
    Ok(())
}

/// Stable sort, highest combined USD value first
fn sort_by_value<T>(entries: Vec<(String, T)>, value: impl Fn(&T) -> f64) -> OrderedMap<String, T> {
    let mut entries = entries;
    entries.sort_by(|a, b| value(&b.1).total_cmp(&value(&a.1)));
    entries.into_iter().collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Fixed price table that counts lookups per symbol
    #[derive(Default)]
    pub struct TablePricer {
        pub prices: HashMap<String, f64>,
        pub lookups: HashMap<String, usize>,
    }

    impl TablePricer {
        pub fn with(prices: &[(&str, f64)]) -> Self {
            Self {
                prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
                lookups: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl SymbolPricer for TablePricer {
        async fn usd_price(&mut self, symbol: &str, _native_usd: f64) -> Result<f64, FlowError> {
            *self.lookups.entry(symbol.to_string()).or_insert(0) += 1;
            Ok(self.prices.get(symbol).copied().unwrap_or(0.0))
        }
    }
}
