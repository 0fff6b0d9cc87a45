/// Wire codecs for the remote services
///
/// Each submodule builds request payloads and decodes responses for one
/// service. They never perform I/O themselves: the scanner and pricing
/// layers send the payloads through `rpc::Transport` under a
/// `ResilientClient`, which keeps the codecs pure and easy to test.
pub mod coingecko;
pub mod engine;
pub mod hive;
pub mod types;

pub use types::{HistoryPage, LedgerRecord, RecordKind};

use crate::errors::FlowError;
use serde_json::Value;

/// Extract `result` from a JSON-RPC 2.0 response, surfacing `error` objects
pub fn jsonrpc_result(body: Value) -> Result<Value, FlowError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| error.to_string());
        return Err(FlowError::invalid_response(format!("JSON-RPC error: {}", message)));
    }

    match body {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| FlowError::invalid_response("JSON-RPC response without result")),
        other => Err(FlowError::invalid_response(format!(
            "Expected JSON-RPC object, got {}",
            other
        ))),
    }
}

/// Read a number that may arrive as a JSON number or a numeric string
pub fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_jsonrpc_result() {
        let ok = jsonrpc_result(json!({"jsonrpc": "2.0", "id": 1, "result": [1, 2]})).unwrap();
        assert_eq!(ok, json!([1, 2]));

        let err = jsonrpc_result(json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "Unable to acquire database lock"}}));
        match err {
            Err(FlowError::InvalidResponse(msg)) => assert!(msg.contains("database lock")),
            other => panic!("unexpected {:?}", other),
        }

        assert!(jsonrpc_result(json!({"jsonrpc": "2.0", "id": 1})).is_err());
    }

    #[test]
    fn test_lenient_f64() {
        assert_eq!(lenient_f64(&json!("0.0123")), Some(0.0123));
        assert_eq!(lenient_f64(&json!(2.5)), Some(2.5));
        assert_eq!(lenient_f64(&json!("abc")), None);
        assert_eq!(lenient_f64(&json!(null)), None);
    }
}
