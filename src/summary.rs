/// Terminal rendering of analysis responses
///
/// Tables use comfy-table with the UTF8_FULL preset; headings and account
/// failures are colored. `--json` output bypasses this module's tables and
/// prints the serialized response as-is.
use crate::aggregation::{
    AccountOutcome, FlowLine, InboundReport, InboundsResponse, OutboundReport, OutboundsResponse,
};
use crate::errors::FlowError;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use serde::Serialize;

/// Pretty JSON with the same shape library callers receive
pub fn render_json<T: Serialize>(response: &T) -> Result<String, FlowError> {
    Ok(serde_json::to_string_pretty(response)?)
}

// =============================================================================
// INBOUNDS
// =============================================================================

pub fn render_inbounds(response: &InboundsResponse) -> String {
    let mut out = String::new();

    for (receiver, outcome) in response.recipients.iter() {
        out.push_str(&heading(&format!("Inbound to @{}", receiver)));
        match outcome {
            AccountOutcome::Report(report) => out.push_str(&inbound_table(report)),
            AccountOutcome::NoTransfers { message, .. } => {
                out.push_str(&format!("  {}\n", message.dimmed()));
            }
            AccountOutcome::Failed { error } => out.push_str(&failure(error)),
        }
        out.push('\n');
    }

    if !response.senders.is_empty() {
        out.push_str(&heading("Sender categories"));
        let mut table = flow_table("Category");
        for (key, line) in response.senders.iter() {
            table.add_row(flow_row(&category_label(key, line), line));
        }
        out.push_str(&format!("{}\n", table));
    }

    out.push_str(&render_warnings(&response.warnings));
    out
}

fn inbound_table(report: &InboundReport) -> String {
    if report.categories.is_empty() {
        return format!("  {}\n", "no inbound transfers from the given categories".dimmed());
    }

    let mut table = flow_table("Category");
    for (key, line) in report.categories.iter() {
        table.add_row(flow_row(&category_label(key, line), line));
    }
    table.add_row(flow_row("TOTAL", &report.totals));
    format!("{}\n", table)
}

fn category_label(key: &str, line: &FlowLine) -> String {
    let accounts: Vec<&str> = [line.hive_account.as_deref(), line.token_account.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if accounts.is_empty() {
        key.to_string()
    } else {
        format!("{} ({})", key, accounts.join(" / "))
    }
}

// =============================================================================
// OUTBOUNDS
// =============================================================================

pub fn render_outbounds(response: &OutboundsResponse) -> String {
    let mut out = String::new();

    for (sender, outcome) in response.senders.iter() {
        out.push_str(&heading(&format!("Outbound from @{}", sender)));
        match outcome {
            AccountOutcome::Report(report) => out.push_str(&outbound_table(report)),
            AccountOutcome::NoTransfers { message, .. } => {
                out.push_str(&format!("  {}\n", message.dimmed()));
            }
            AccountOutcome::Failed { error } => out.push_str(&failure(error)),
        }
        out.push('\n');
    }

    out.push_str(&render_warnings(&response.warnings));
    out
}

fn outbound_table(report: &OutboundReport) -> String {
    let mut table = flow_table("Recipient");
    for (recipient, line) in report.recipients.iter() {
        table.add_row(flow_row(&format!("@{}", recipient), line));
    }
    table.add_row(flow_row("TOTAL", &report.totals));
    format!("{}\n", table)
}

// =============================================================================
// SHARED
// =============================================================================

fn flow_table(first_column: &str) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header([
        first_column,
        "HIVE",
        "HIVE USD",
        "Tokens",
        "Token USD",
        "Total USD",
        "Txs",
    ]);
    table
}

fn flow_row(label: &str, line: &FlowLine) -> Vec<Cell> {
    vec![
        Cell::new(label),
        numeric(format!("{:.3}", line.hive)),
        numeric(format!("${:.2}", line.hive_usd)),
        Cell::new(token_summary(line)),
        numeric(format!("${:.2}", line.token_usd)),
        numeric(format!("${:.2}", line.total_usd)),
        numeric(line.transactions().to_string()),
    ]
}

fn numeric(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// `BEE 4.00, LEO 1.50`; symbols in first-seen order
fn token_summary(line: &FlowLine) -> String {
    if line.tokens.is_empty() {
        return "-".to_string();
    }
    line.tokens
        .iter()
        .map(|(symbol, token)| format!("{} {:.2}", symbol, token.amount))
        .collect::<Vec<_>>()
        .join(", ")
}

fn heading(title: &str) -> String {
    format!("{}\n", title.bright_cyan().bold())
}

fn failure(error: &str) -> String {
    format!("  {} {}\n", "FAILED".bright_red().bold(), error.red())
}

fn render_warnings(warnings: &[String]) -> String {
    warnings
        .iter()
        .map(|w| format!("{} {}\n", "WARNING".bright_yellow().bold(), w))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{OrderedMap, TokenLine};

    fn line(hive: f64, usd: f64) -> FlowLine {
        FlowLine {
            hive,
            hive_usd: usd,
            hive_count: 1,
            total_usd: usd,
            ..FlowLine::default()
        }
    }

    #[test]
    fn test_outbound_rendering() {
        let mut recipients = OrderedMap::new();
        let mut tipped = line(12.5, 6.25);
        tipped.add_token(
            "BEE",
            TokenLine {
                amount: 4.0,
                usd: 1.0,
                count: 2,
            },
        );
        recipients.insert("bob".to_string(), tipped.clone());

        let mut senders = OrderedMap::new();
        senders.insert(
            "alice".to_string(),
            AccountOutcome::Report(OutboundReport {
                recipients,
                totals: tipped,
            }),
        );
        senders.insert(
            "carol".to_string(),
            AccountOutcome::Failed {
                error: "Service unavailable".to_string(),
            },
        );

        let text = render_outbounds(&OutboundsResponse {
            senders,
            warnings: vec!["'x' is not a valid Hive account name".to_string()],
        });

        assert!(text.contains("@bob"));
        assert!(text.contains("12.500"));
        assert!(text.contains("BEE 4.00"));
        assert!(text.contains("$7.25"));
        assert!(text.contains("Service unavailable"));
        assert!(text.contains("not a valid Hive account name"));
    }

    #[test]
    fn test_category_label_names_accounts() {
        let mut line = line(1.0, 0.5);
        line.hive_account = Some("payout".to_string());
        line.token_account = Some("payout-he".to_string());
        assert_eq!(category_label("rewards", &line), "rewards (payout / payout-he)");
        assert_eq!(category_label("plain", &FlowLine::default()), "plain");
    }

    #[test]
    fn test_json_matches_serialized_response() {
        let text = render_json(&OutboundsResponse::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({"senders": {}}));
    }
}
