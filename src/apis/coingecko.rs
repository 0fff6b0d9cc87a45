/// CoinGecko simple price
///
/// API Documentation: https://docs.coingecko.com/reference/simple-price
///
/// `GET {url}?ids={asset}&vs_currencies=usd` returns `{"<asset>": {"usd": n}}`.
use super::lenient_f64;
use crate::errors::FlowError;
use serde_json::Value;

pub fn price_query(asset_id: &str) -> Vec<(String, String)> {
    vec![
        ("ids".to_string(), asset_id.to_string()),
        ("vs_currencies".to_string(), "usd".to_string()),
    ]
}

pub fn parse_usd_price(body: &Value, asset_id: &str) -> Result<f64, FlowError> {
    let price = body
        .get(asset_id)
        .and_then(|asset| asset.get("usd"))
        .and_then(lenient_f64)
        .ok_or_else(|| {
            FlowError::invalid_response(format!("No USD price for '{}' in {}", asset_id, body))
        })?;

    if !price.is_finite() || price < 0.0 {
        return Err(FlowError::invalid_response(format!(
            "Implausible USD price {} for '{}'",
            price, asset_id
        )));
    }

    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_usd_price() {
        assert_eq!(parse_usd_price(&json!({"hive": {"usd": 0.31}}), "hive").unwrap(), 0.31);
        assert!(parse_usd_price(&json!({}), "hive").is_err());
        assert!(parse_usd_price(&json!({"hive": {"eur": 0.3}}), "hive").is_err());
    }
}
