use super::types::{AccountOutcome, FlowLine, OutboundReport, OutboundsResponse};
use super::{apply_native, apply_tokens, sort_by_value, OrderedMap};
use crate::constants::NO_TRANSFERS_MESSAGE;
use crate::errors::FlowError;
use crate::pricing::SymbolPricer;
use crate::scanner::AccumulatedSums;

pub fn has_activity(native: &AccumulatedSums, tokens: &AccumulatedSums) -> bool {
    !native.is_empty() || !tokens.is_empty()
}

/// Slot for a sender with no outbound records on either ledger
pub fn no_transfers() -> AccountOutcome<OutboundReport> {
    AccountOutcome::NoTransfers {
        recipients: OrderedMap::new(),
        message: NO_TRANSFERS_MESSAGE.to_string(),
    }
}

/// Price one sender's per-recipient sums, highest value recipient first
///
/// Recipients with equal value keep their first-encountered order (native
/// ledger first, then token ledger).
pub async fn build_outbound_report(
    native: &AccumulatedSums,
    tokens: &AccumulatedSums,
    native_usd: f64,
    pricer: &mut dyn SymbolPricer,
) -> Result<OutboundReport, FlowError> {
    let mut lines: OrderedMap<String, FlowLine> = OrderedMap::new();

    for (recipient, sums) in native.buckets.iter() {
        let line = lines.get_or_insert_with(recipient.clone(), FlowLine::default);
        apply_native(line, sums, native_usd);
    }
    for (recipient, sums) in tokens.buckets.iter() {
        let line = lines.get_or_insert_with(recipient.clone(), FlowLine::default);
        apply_tokens(line, sums, native_usd, pricer).await?;
    }

    let mut totals = FlowLine::default();
    for line in lines.values() {
        totals.merge(line);
    }

    Ok(OutboundReport {
        recipients: sort_by_value(lines.into_iter().collect(), FlowLine::combined_usd),
        totals,
    })
}

/// Assemble the batch response; senders keep request order
pub fn assemble_outbounds(
    outcomes: Vec<(String, Result<AccountOutcome<OutboundReport>, FlowError>)>,
    warnings: Vec<String>,
) -> OutboundsResponse {
    let senders = outcomes
        .into_iter()
        .map(|(account, outcome)| {
            let slot = outcome.unwrap_or_else(|e| AccountOutcome::Failed {
                error: e.to_string(),
            });
            (account, slot)
        })
        .collect();

    OutboundsResponse { senders, warnings }
}
