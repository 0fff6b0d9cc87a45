//! Raw transport seam
//!
//! Everything above this trait is transport-agnostic: the registry, the
//! resilient client, the ledger codecs and the price sources only speak
//! `Transport`. `HttpTransport` is the production implementation on top of
//! reqwest; tests substitute `rpc::mock::MockTransport`.

use crate::errors::FlowError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Overall backstop on a single HTTP exchange; callers apply tighter timeouts
const HTTP_BACKSTOP_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` with query parameters and decode a JSON body
    async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value, FlowError>;

    /// POST a JSON body to `url` and decode a JSON body
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, FlowError>;

    /// Cheap liveness check without a request body
    async fn probe(&self, url: &str, timeout: Duration) -> Result<(), FlowError>;
}

/// HTTP client wrapper used against the live services
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FlowError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_BACKSTOP_TIMEOUT_SECS))
            .user_agent(concat!("hive-flows/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FlowError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn decode(url: &str, response: reqwest::Response) -> Result<Value, FlowError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FlowError::HttpStatus {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FlowError::invalid_response(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value, FlowError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| FlowError::network(url, e.to_string()))?;

        Self::decode(url, response).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, FlowError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| FlowError::network(url, e.to_string()))?;

        Self::decode(url, response).await
    }

    async fn probe(&self, url: &str, timeout: Duration) -> Result<(), FlowError> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(FlowError::from)?;

        // Nodes commonly answer HEAD with 405; only server-side failures count
        if response.status().is_server_error() {
            return Err(FlowError::HttpStatus {
                endpoint: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}
