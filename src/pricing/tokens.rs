use crate::apis::engine;
use crate::constants::SWAP_NATIVE_SYMBOL;
use crate::errors::FlowError;
use crate::logger::{self, LogTag};
use crate::rpc::{ResilientClient, ServiceClass, Transport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// USD price lookup by token symbol
#[async_trait]
pub trait SymbolPricer: Send {
    async fn usd_price(&mut self, symbol: &str, native_usd: f64) -> Result<f64, FlowError>;
}

/// Token prices for one orchestrated call
///
/// Each symbol's market price is requested at most once per book, however
/// many accounts or categories hold it. The memo stores the price in native
/// units so a refreshed native USD price still applies.
pub struct TokenPriceBook {
    client: Arc<ResilientClient>,
    transport: Arc<dyn Transport>,
    memo: HashMap<String, f64>,
    held: Option<String>,
}

impl TokenPriceBook {
    pub fn new(client: Arc<ResilientClient>, transport: Arc<dyn Transport>) -> Self {
        Self {
            client,
            transport,
            memo: HashMap::new(),
            held: None,
        }
    }

    pub fn resolved_symbols(&self) -> usize {
        self.memo.len()
    }

    async fn last_price(&mut self, symbol: &str) -> Result<f64, FlowError> {
        if let Some(price) = self.memo.get(symbol) {
            return Ok(*price);
        }

        let transport = &self.transport;
        let body = engine::metrics_request(symbol);
        let price = self
            .client
            .call(ServiceClass::EngineRpc, &mut self.held, |endpoint, _| {
                let body = &body;
                async move {
                    let response = transport
                        .post_json(&engine::contracts_url(&endpoint), body)
                        .await?;
                    engine::parse_last_price(response)
                }
            })
            .await?;

        let price = match price {
            Some(price) => price,
            None => {
                logger::debug(
                    LogTag::Price,
                    &format!("{} has no market metrics, pricing at 0", symbol),
                );
                0.0
            }
        };

        self.memo.insert(symbol.to_string(), price);
        Ok(price)
    }
}

#[async_trait]
impl SymbolPricer for TokenPriceBook {
    async fn usd_price(&mut self, symbol: &str, native_usd: f64) -> Result<f64, FlowError> {
        if symbol == SWAP_NATIVE_SYMBOL {
            return Ok(native_usd);
        }
        Ok(self.last_price(symbol).await? * native_usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointsConfig;
    use crate::rpc::mock::MockTransport;
    use crate::rpc::{EndpointHealthRegistry, RetryPolicy};
    use serde_json::json;
    use std::time::Duration;

    fn book(mock: &Arc<MockTransport>) -> TokenPriceBook {
        let settings = EndpointsConfig {
            engine_rpc_defaults: vec!["https://engine".to_string()],
            ..EndpointsConfig::default()
        };
        let registry = Arc::new(EndpointHealthRegistry::new(mock.clone(), settings));
        let client = Arc::new(ResilientClient::new(
            registry,
            RetryPolicy {
                retries: 0,
                base_delay: Duration::from_millis(1),
                call_timeout: Duration::from_secs(1),
            },
        ));
        TokenPriceBook::new(client, mock.clone())
    }

    fn metrics_route(mock: &MockTransport) {
        mock.route("https://engine/contracts", |call| {
            let symbol = call
                .body
                .as_ref()
                .and_then(|b| b["params"]["query"]["symbol"].as_str())
                .unwrap_or_default()
                .to_string();
            match symbol.as_str() {
                "BEE" => Ok(json!({"jsonrpc": "2.0", "id": 1, "result": [{"symbol": "BEE", "lastPrice": "0.5"}]})),
                _ => Ok(json!({"jsonrpc": "2.0", "id": 1, "result": []})),
            }
        });
    }

    #[tokio::test]
    async fn test_each_symbol_looked_up_once() {
        let mock = Arc::new(MockTransport::new());
        metrics_route(&mock);
        let mut book = book(&mock);

        assert_eq!(book.usd_price("BEE", 0.2).await.unwrap(), 0.1);
        assert_eq!(book.usd_price("BEE", 0.4).await.unwrap(), 0.2);
        assert_eq!(mock.calls_to("https://engine/contracts"), 1);
        assert_eq!(book.resolved_symbols(), 1);
    }

    #[tokio::test]
    async fn test_missing_market_prices_at_zero() {
        let mock = Arc::new(MockTransport::new());
        metrics_route(&mock);
        let mut book = book(&mock);

        assert_eq!(book.usd_price("NOPE", 0.3).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_swap_native_needs_no_lookup() {
        let mock = Arc::new(MockTransport::new());
        let mut book = book(&mock);

        assert_eq!(book.usd_price("SWAP.HIVE", 0.3).await.unwrap(), 0.3);
        assert_eq!(mock.calls_to("https://engine"), 0);
    }

    #[tokio::test]
    async fn test_unreachable_market_is_an_error() {
        let mock = Arc::new(MockTransport::new());
        let mut book = book(&mock);

        let err = book.usd_price("BEE", 0.3).await.unwrap_err();
        assert!(matches!(err, FlowError::ServiceUnavailable { .. }));
    }
}
