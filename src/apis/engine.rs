/// Hive-Engine token ledger: account history service and market metrics
///
/// History: `GET {endpoint}/accountHistory?account=&limit=&offset=&type=user`,
/// rows newest first with unix-second timestamps; the next page is at
/// `offset + limit`.
///
/// Prices: JSON-RPC `find` on the `market.metrics` table at
/// `{endpoint}/contracts`, one row per symbol carrying `lastPrice` in the
/// native asset.
use super::types::{HistoryPage, LedgerRecord, RecordKind};
use super::{jsonrpc_result, lenient_f64};
use crate::constants::{TOKEN_STAKE_OP, TOKEN_TRANSFER_OP};
use crate::errors::FlowError;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

pub fn history_url(endpoint: &str) -> String {
    format!("{}/accountHistory", endpoint.trim_end_matches('/'))
}

pub fn history_query(account: &str, limit: u32, offset: i64) -> Vec<(String, String)> {
    vec![
        ("account".to_string(), account.to_string()),
        ("limit".to_string(), limit.to_string()),
        ("offset".to_string(), offset.to_string()),
        ("type".to_string(), "user".to_string()),
    ]
}

fn row_timestamp(row: &Value) -> Option<DateTime<Utc>> {
    let seconds = match row.get("timestamp")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp(seconds, 0)
}

fn decode_row(row: &Value, timestamp: DateTime<Utc>) -> Option<LedgerRecord> {
    let kind = match row.get("operation")?.as_str()? {
        TOKEN_TRANSFER_OP => RecordKind::TokenTransfer,
        TOKEN_STAKE_OP => RecordKind::TokenStake,
        _ => return None,
    };

    Some(LedgerRecord {
        timestamp,
        from: row.get("from")?.as_str()?.to_string(),
        to: row.get("to")?.as_str()?.to_string(),
        symbol: row.get("symbol")?.as_str()?.to_string(),
        amount: lenient_f64(row.get("quantity")?)?,
        kind,
    })
}

/// Decode an account history response into a newest-first page
pub fn parse_history_response(body: Value, offset: i64, limit: u32) -> Result<HistoryPage, FlowError> {
    let rows = body
        .as_array()
        .ok_or_else(|| FlowError::invalid_response("accountHistory response is not an array"))?;

    let mut decoded: Vec<(DateTime<Utc>, Option<LedgerRecord>)> = Vec::with_capacity(rows.len());
    for row in rows {
        let timestamp = row_timestamp(row).ok_or_else(|| {
            FlowError::invalid_response(format!("accountHistory row without timestamp: {}", row))
        })?;
        decoded.push((timestamp, decode_row(row, timestamp)));
    }

    // Stable: rows sharing a timestamp keep the service's order
    decoded.sort_by(|a, b| b.0.cmp(&a.0));

    let oldest_timestamp = decoded.last().map(|(ts, _)| *ts);
    let next = if decoded.is_empty() {
        None
    } else {
        Some(offset + limit as i64)
    };

    Ok(HistoryPage {
        raw_len: decoded.len(),
        records: decoded.into_iter().filter_map(|(_, record)| record).collect(),
        oldest_timestamp,
        next,
    })
}

pub fn contracts_url(endpoint: &str) -> String {
    format!("{}/contracts", endpoint.trim_end_matches('/'))
}

/// JSON-RPC body looking up one symbol in `market.metrics`
pub fn metrics_request(symbol: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "find",
        "params": {
            "contract": "market",
            "table": "metrics",
            "query": { "symbol": symbol },
            "limit": 1,
            "offset": 0,
            "indexes": [],
        },
    })
}

/// Last traded price in the native asset; None when the symbol has no market
pub fn parse_last_price(body: Value) -> Result<Option<f64>, FlowError> {
    let result = jsonrpc_result(body)?;
    let rows = match result {
        Value::Array(rows) => rows,
        Value::Null => return Ok(None),
        other => {
            return Err(FlowError::invalid_response(format!(
                "market.metrics result is not an array: {}",
                other
            )))
        }
    };

    Ok(rows
        .first()
        .and_then(|row| row.get("lastPrice"))
        .and_then(lenient_f64))
}
