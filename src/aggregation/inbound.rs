use super::types::{AccountOutcome, FlowLine, InboundReport, InboundsResponse};
use super::{apply_native, apply_tokens, sort_by_value, OrderedMap};
use crate::errors::FlowError;
use crate::logger::{self, LogTag};
use crate::pricing::SymbolPricer;
use crate::scanner::AccumulatedSums;

/// One inbound category with the source account on each ledger
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub key: String,
    pub hive_account: Option<String>,
    pub token_account: Option<String>,
}

impl Category {
    fn empty_line(&self) -> FlowLine {
        FlowLine {
            hive_account: self.hive_account.clone(),
            token_account: self.token_account.clone(),
            ..FlowLine::default()
        }
    }
}

/// Price one receiver's category sums from both ledgers
pub async fn build_inbound_report(
    categories: &[Category],
    native: &AccumulatedSums,
    tokens: &AccumulatedSums,
    native_usd: f64,
    pricer: &mut dyn SymbolPricer,
) -> Result<InboundReport, FlowError> {
    let mut report = InboundReport::default();

    for category in categories {
        let mut line = category.empty_line();

        if let Some(sums) = native.bucket(&category.key) {
            apply_native(&mut line, sums, native_usd);
        }
        if let Some(sums) = tokens.bucket(&category.key) {
            apply_tokens(&mut line, sums, native_usd, pricer).await?;
        }

        if line.is_empty() {
            continue;
        }
        report.totals.merge(&line);
        report.categories.insert(category.key.clone(), line);
    }

    Ok(report)
}

/// Assemble the batch response
///
/// Successful reports come first, highest value first (ties keep request
/// order), followed by failures in request order. `senders` totals each
/// category across all successful receivers; categories with no activity
/// anywhere are left out.
pub fn assemble_inbounds(
    categories: &[Category],
    outcomes: Vec<(String, Result<InboundReport, FlowError>)>,
    warnings: Vec<String>,
) -> InboundsResponse {
    let mut reports: Vec<(String, InboundReport)> = Vec::new();
    let mut failures: Vec<(String, String)> = Vec::new();

    for (account, outcome) in outcomes {
        match outcome {
            Ok(report) => reports.push((account, report)),
            Err(e) => failures.push((account, e.to_string())),
        }
    }

    let mut senders: OrderedMap<String, FlowLine> = OrderedMap::new();
    for category in categories {
        let mut summary = category.empty_line();
        for (_, report) in &reports {
            if let Some(line) = report.categories.get(&category.key) {
                summary.merge(line);
            }
        }
        if !summary.is_empty() {
            senders.insert(category.key.clone(), summary);
        }
    }

    let sorted = sort_by_value(reports, |report| report.totals.combined_usd());

    let mut recipients: OrderedMap<String, AccountOutcome<InboundReport>> = OrderedMap::new();
    for (account, report) in sorted {
        recipients.insert(account, AccountOutcome::Report(report));
    }
    for (account, error) in failures {
        recipients.insert(account, AccountOutcome::Failed { error });
    }

    logger::debug(
        LogTag::Aggregation,
        &format!(
            "Inbound batch: {} reports, {} categories with activity",
            recipients.len(),
            senders.len()
        ),
    );

    InboundsResponse {
        recipients,
        senders,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::test_support::TablePricer;
    use crate::apis::{LedgerRecord, RecordKind};
    use chrono::DateTime;

    fn record(from: &str, symbol: &str, amount: f64) -> LedgerRecord {
        LedgerRecord {
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            from: from.to_string(),
            to: "r".to_string(),
            symbol: symbol.to_string(),
            amount,
            kind: RecordKind::Transfer,
        }
    }

    fn categories() -> Vec<Category> {
        vec![
            Category {
                key: "rewards".to_string(),
                hive_account: Some("payout".to_string()),
                token_account: Some("payout-he".to_string()),
            },
            Category {
                key: "exchange".to_string(),
                hive_account: Some("exch".to_string()),
                token_account: None,
            },
        ]
    }

    #[tokio::test]
    async fn test_category_totals_from_both_ledgers() {
        let mut native = AccumulatedSums::default();
        native.add("rewards".to_string(), &record("payout", "HIVE", 10.0));
        native.add("rewards".to_string(), &record("payout", "HIVE", 5.0));

        let mut tokens = AccumulatedSums::default();
        tokens.add("rewards".to_string(), &record("payout-he", "BEE", 4.0));

        let mut pricer = TablePricer::with(&[("BEE", 0.5)]);
        let report = build_inbound_report(&categories(), &native, &tokens, 0.2, &mut pricer)
            .await
            .unwrap();

        let rewards = report.categories.get(&"rewards".to_string()).unwrap();
        assert_eq!(rewards.hive, 15.0);
        assert_eq!(rewards.hive_count, 2);
        assert_eq!(rewards.hive_usd, 3.0);
        assert_eq!(rewards.token_usd, 2.0);
        assert_eq!(rewards.total_usd, 5.0);
        assert!(!report.categories.contains_key(&"exchange".to_string()));
        assert_eq!(report.totals.transactions(), 3);
    }

    #[tokio::test]
    async fn test_dust_token_value_keeps_eight_decimals() {
        let native = AccumulatedSums::default();
        let mut tokens = AccumulatedSums::default();
        tokens.add("rewards".to_string(), &record("payout-he", "DUST", 0.000000005));

        let mut pricer = TablePricer::with(&[("DUST", 1.0)]);
        let report = build_inbound_report(&categories(), &native, &tokens, 1.0, &mut pricer)
            .await
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["categories"]["rewards"]["tokens"]["DUST"]["usd"], serde_json::json!(0.00000001));
        assert_eq!(json["categories"]["rewards"]["tokens"]["DUST"]["amount"], serde_json::json!(0.0));
    }

    fn report_worth(usd: f64) -> InboundReport {
        let mut line = FlowLine {
            hive: usd,
            hive_usd: usd,
            hive_count: 1,
            ..FlowLine::default()
        };
        line.total_usd = line.combined_usd();
        let mut report = InboundReport::default();
        report.totals.merge(&line);
        report.categories.insert("rewards".to_string(), line);
        report
    }

    #[test]
    fn test_assemble_sorts_and_appends_failures() {
        let outcomes = vec![
            ("low".to_string(), Ok(report_worth(1.0))),
            ("broken".to_string(), Err(FlowError::validation("boom"))),
            ("tie-a".to_string(), Ok(report_worth(5.0))),
            ("high".to_string(), Ok(report_worth(9.0))),
            ("tie-b".to_string(), Ok(report_worth(5.0))),
        ];

        let response = assemble_inbounds(&categories(), outcomes, Vec::new());
        let order: Vec<&String> = response.recipients.keys().collect();
        assert_eq!(order, vec!["high", "tie-a", "tie-b", "low", "broken"]);
        assert!(response.recipients.get(&"broken".to_string()).unwrap().is_failed());

        let rewards = response.senders.get(&"rewards".to_string()).unwrap();
        assert_eq!(rewards.hive, 20.0);
        assert_eq!(rewards.hive_count, 4);
        assert_eq!(rewards.hive_account.as_deref(), Some("payout"));
    }

    #[test]
    fn test_inactive_category_left_out_of_sender_summary() {
        let response = assemble_inbounds(
            &categories(),
            vec![
                ("a".to_string(), Ok(report_worth(2.0))),
                ("b".to_string(), Ok(InboundReport::default())),
            ],
            Vec::new(),
        );

        assert_eq!(response.senders.len(), 1);
        assert!(response.senders.contains_key(&"rewards".to_string()));
        assert!(!response.senders.contains_key(&"exchange".to_string()));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["senders"].get("exchange").is_none());
    }

    #[test]
    fn test_failed_slot_serializes_as_error() {
        let response = assemble_inbounds(
            &categories(),
            vec![("x".to_string(), Err(FlowError::validation("bad")))],
            Vec::new(),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["recipients"]["x"]["error"], "Validation error: bad");
        assert!(json.get("warnings").is_none());
    }
}
