use super::{HistorySource, Ledger};
use crate::apis::{engine, HistoryPage};
use crate::errors::FlowError;
use crate::rpc::{ResilientClient, ServiceClass, Transport};
use async_trait::async_trait;
use std::sync::Arc;

/// Token ledger history via the Hive-Engine account history service
pub struct EngineHistorySource {
    client: Arc<ResilientClient>,
    transport: Arc<dyn Transport>,
    page_size: u32,
}

impl EngineHistorySource {
    pub fn new(client: Arc<ResilientClient>, transport: Arc<dyn Transport>, page_size: u32) -> Self {
        Self {
            client,
            transport,
            page_size,
        }
    }
}

#[async_trait]
impl HistorySource for EngineHistorySource {
    fn ledger(&self) -> Ledger {
        Ledger::Token
    }

    fn first_cursor(&self) -> i64 {
        0
    }

    async fn fetch_page(
        &self,
        account: &str,
        cursor: i64,
        held: &mut Option<String>,
    ) -> Result<HistoryPage, FlowError> {
        let query = engine::history_query(account, self.page_size, cursor);
        let transport = &self.transport;
        let page_size = self.page_size;

        self.client
            .call(ServiceClass::EngineHistory, held, |endpoint, _| {
                let query = &query;
                async move {
                    let response = transport
                        .get_json(&engine::history_url(&endpoint), query)
                        .await?;
                    engine::parse_history_response(response, cursor, page_size)
                }
            })
            .await
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

    #[tokio::test]
    async fn test_offsets_advance_by_page_size() {
        let mock = Arc::new(MockTransport::new());
        mock.route("https://engine-history/accountHistory", |call| {
            match call.query_param("offset") {
                Some("0") => Ok(json!([
                    {"timestamp": 1_700_000_000, "operation": "tokens_transfer", "symbol": "BEE", "from": "a", "to": "b", "quantity": "1"}
                ])),
                _ => Ok(json!([])),
            }
        });

        let settings = EndpointsConfig {
            engine_history_defaults: vec!["https://engine-history".to_string()],
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
        let source = EngineHistorySource::new(client, mock.clone(), 250);
        let mut held = None;

        let first = source.fetch_page("a", 0, &mut held).await.unwrap();
        assert_eq!(first.records.len(), 1);
        assert_eq!(first.next, Some(250));

        let second = source.fetch_page("a", 250, &mut held).await.unwrap();
        assert!(second.is_empty());

        let history_calls: Vec<_> = mock
            .calls()
            .into_iter()
            .filter(|c| c.url.ends_with("/accountHistory"))
            .collect();
        assert_eq!(history_calls[1].query_param("limit"), Some("250"));
        assert_eq!(history_calls[1].query_param("account"), Some("a"));
    }
}
