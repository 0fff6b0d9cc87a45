use super::{HistorySource, Ledger};
use crate::apis::{hive, HistoryPage};
use crate::errors::FlowError;
use crate::rpc::{ResilientClient, ServiceClass, Transport};
use async_trait::async_trait;
use std::sync::Arc;

/// Native ledger history via `condenser_api.get_account_history`
pub struct HiveHistorySource {
    client: Arc<ResilientClient>,
    transport: Arc<dyn Transport>,
    page_size: u32,
    operation_filter: bool,
}

impl HiveHistorySource {
    pub fn new(
        client: Arc<ResilientClient>,
        transport: Arc<dyn Transport>,
        page_size: u32,
        operation_filter: bool,
    ) -> Self {
        Self {
            client,
            transport,
            page_size,
            operation_filter,
        }
    }
}

#[async_trait]
impl HistorySource for HiveHistorySource {
    fn ledger(&self) -> Ledger {
        Ledger::Native
    }

    fn first_cursor(&self) -> i64 {
        hive::LATEST
    }

    async fn fetch_page(
        &self,
        account: &str,
        cursor: i64,
        held: &mut Option<String>,
    ) -> Result<HistoryPage, FlowError> {
        let limit = hive::page_limit(cursor, self.page_size);
        let body = hive::history_request(account, cursor, limit, self.operation_filter);
        let transport = &self.transport;

        self.client
            .call(ServiceClass::Hive, held, |endpoint, _| {
                let body = &body;
                async move {
                    let response = transport.post_json(&endpoint, body).await?;
                    hive::parse_history_response(response)
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
    async fn test_pages_backward_with_clamped_limit() {
        let mock = Arc::new(MockTransport::new());
        mock.route("https://hive-node", |call| {
            let params = &call.body.as_ref().unwrap()["params"];
            let start = params[1].as_i64().unwrap();
            let rows = if start == -1 {
                json!([
                    [8, {"timestamp": "2024-01-01T00:00:08", "op": ["transfer", {"from": "a", "to": "b", "amount": "1.000 HIVE"}]}],
                    [9, {"timestamp": "2024-01-01T00:00:09", "op": ["transfer", {"from": "a", "to": "b", "amount": "2.000 HIVE"}]}]
                ])
            } else {
                json!([])
            };
            Ok(json!({"jsonrpc": "2.0", "id": 1, "result": rows}))
        });

        let settings = EndpointsConfig {
            hive_defaults: vec!["https://hive-node".to_string()],
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
        let source = HiveHistorySource::new(client, mock.clone(), 1000, true);
        let mut held = None;

        let first = source.fetch_page("b", source.first_cursor(), &mut held).await.unwrap();
        assert_eq!(first.next, Some(7));
        assert_eq!(first.records[0].amount, 2.0);
        assert_eq!(held.as_deref(), Some("https://hive-node"));

        source.fetch_page("b", 7, &mut held).await.unwrap();
        let posts: Vec<_> = mock
            .calls()
            .into_iter()
            .filter(|c| c.url == "https://hive-node" && c.body.is_some())
            .collect();
        assert_eq!(posts[1].body.as_ref().unwrap()["params"], json!(["b", 7, 8, 4, 0]));
    }
}
