/// Hive native ledger: `condenser_api.get_account_history`
///
/// Pages are addressed by operation index, newest first: `start = -1` means
/// "most recent", the node returns up to `limit` operations ending at
/// `start` in ascending index order, and the next older page starts at the
/// lowest returned index minus one. A negative next start means history is
/// exhausted.
use super::types::{HistoryPage, LedgerRecord, RecordKind};
use super::{jsonrpc_result, lenient_f64};
use crate::constants::{NATIVE_NAI, NATIVE_SYMBOL, TRANSFER_OP, TRANSFER_OP_ID};
use crate::errors::FlowError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Value};

pub const ACCOUNT_HISTORY_METHOD: &str = "condenser_api.get_account_history";

/// Cursor of the newest page
pub const LATEST: i64 = -1;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const HBD_NAI: &str = "@@000000013";
const VESTS_NAI: &str = "@@000000037";

/// Page limit for a start index; the node requires `start >= limit - 1`
pub fn page_limit(start: i64, page_size: u32) -> u32 {
    if start < 0 {
        return page_size;
    }
    (start + 1).min(page_size as i64).max(1) as u32
}

/// JSON-RPC body for one history page
pub fn history_request(account: &str, start: i64, limit: u32, operation_filter: bool) -> Value {
    let mut params = vec![json!(account), json!(start), json!(limit)];
    if operation_filter {
        // operation_filter_low / operation_filter_high bitmask
        params.push(json!(1u64 << TRANSFER_OP_ID));
        params.push(json!(0));
    }

    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": ACCOUNT_HISTORY_METHOD,
        "params": params,
    })
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Decode an asset amount in legacy (`"10.000 HIVE"`) or NAI object form
pub fn parse_amount(value: &Value) -> Option<(f64, String)> {
    match value {
        Value::String(raw) => {
            let mut parts = raw.split_whitespace();
            let amount = parts.next()?.parse::<f64>().ok()?;
            let symbol = parts.next()?.to_string();
            Some((amount, symbol))
        }
        Value::Object(map) => {
            let raw_amount = lenient_f64(map.get("amount")?)?;
            let precision = map.get("precision")?.as_u64()? as i32;
            let nai = map.get("nai")?.as_str()?;
            let symbol = match nai {
                NATIVE_NAI => NATIVE_SYMBOL.to_string(),
                HBD_NAI => "HBD".to_string(),
                VESTS_NAI => "VESTS".to_string(),
                other => other.to_string(),
            };
            Some((raw_amount / 10f64.powi(precision), symbol))
        }
        _ => None,
    }
}

/// Decode a transfer operation into a record; other operations yield None
fn decode_transfer(op: &Value, timestamp: DateTime<Utc>) -> Option<LedgerRecord> {
    let (name, data) = match op {
        Value::Array(pair) if pair.len() == 2 => (pair[0].as_str()?, &pair[1]),
        // appbase style: {"type": "transfer_operation", "value": {...}}
        Value::Object(map) => (map.get("type")?.as_str()?, map.get("value")?),
        _ => return None,
    };
    if name != TRANSFER_OP && name != "transfer_operation" {
        return None;
    }

    let (amount, symbol) = parse_amount(data.get("amount")?)?;
    // Only the native asset counts; HBD transfers are excluded
    if symbol != NATIVE_SYMBOL {
        return None;
    }

    Some(LedgerRecord {
        timestamp,
        from: data.get("from")?.as_str()?.to_string(),
        to: data.get("to")?.as_str()?.to_string(),
        symbol,
        amount,
        kind: RecordKind::Transfer,
    })
}

/// Decode a `get_account_history` response into a newest-first page
pub fn parse_history_response(body: Value) -> Result<HistoryPage, FlowError> {
    let result = jsonrpc_result(body)?;
    let rows = result
        .as_array()
        .ok_or_else(|| FlowError::invalid_response("account history result is not an array"))?;

    let mut decoded: Vec<(i64, Option<LedgerRecord>)> = Vec::with_capacity(rows.len());
    let mut oldest_timestamp: Option<DateTime<Utc>> = None;

    for row in rows {
        let index = row
            .get(0)
            .and_then(|i| i.as_i64())
            .ok_or_else(|| FlowError::invalid_response("history row without index"))?;
        let entry = row
            .get(1)
            .ok_or_else(|| FlowError::invalid_response("history row without operation"))?;

        let raw_timestamp = entry
            .get("timestamp")
            .and_then(|t| t.as_str())
            .ok_or_else(|| FlowError::invalid_response(format!("history row {} without timestamp", index)))?;
        let timestamp = parse_timestamp(raw_timestamp).ok_or_else(|| {
            FlowError::invalid_response(format!("bad timestamp '{}' at row {}", raw_timestamp, index))
        })?;

        oldest_timestamp = Some(match oldest_timestamp {
            Some(current) if current <= timestamp => current,
            _ => timestamp,
        });

        let record = entry.get("op").and_then(|op| decode_transfer(op, timestamp));
        decoded.push((index, record));
    }

    // Rows arrive oldest first; normalize to newest first
    decoded.sort_by(|a, b| b.0.cmp(&a.0));

    let lowest_index = decoded.last().map(|(index, _)| *index);
    let next = lowest_index
        .map(|lowest| lowest - 1)
        .filter(|next| *next >= 0);

    Ok(HistoryPage {
        raw_len: decoded.len(),
        records: decoded.into_iter().filter_map(|(_, record)| record).collect(),
        oldest_timestamp,
        next,
    })
}
