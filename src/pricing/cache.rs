use crate::apis::coingecko;
use crate::config::PriceConfig;
use crate::errors::FlowError;
use crate::logger::{self, LogTag};
use crate::rpc::{retry_with_backoff, RetryPolicy, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A fetched price and when it was fetched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub value: f64,
    pub fetched_at: Instant,
}

impl PriceQuote {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Process-wide TTL memo of the native asset's USD price
///
/// The memo is only replaced by a successful fetch. When a refresh fails
/// the stale value is served, or zero when nothing was ever fetched.
pub struct NativePriceCache {
    transport: Arc<dyn Transport>,
    url: String,
    asset_id: String,
    ttl: Duration,
    policy: RetryPolicy,
    memo: Mutex<Option<PriceQuote>>,
}

impl NativePriceCache {
    pub fn new(transport: Arc<dyn Transport>, config: &PriceConfig, policy: RetryPolicy) -> Self {
        Self {
            transport,
            url: config.url.clone(),
            asset_id: config.asset_id.clone(),
            ttl: Duration::from_secs(config.ttl_secs),
            policy,
            memo: Mutex::new(None),
        }
    }

    pub async fn cached(&self) -> Option<PriceQuote> {
        *self.memo.lock().await
    }

    /// Native asset USD price; never fails
    pub async fn get_native_usd(&self) -> f64 {
        // Held across the fetch so concurrent callers share one request
        let mut memo = self.memo.lock().await;

        if let Some(quote) = memo.as_ref() {
            if quote.is_fresh(self.ttl) {
                return quote.value;
            }
        }

        match self.fetch().await {
            Ok(value) => {
                logger::debug(
                    LogTag::Price,
                    &format!("{} price refreshed: ${:.4}", self.asset_id, value),
                );
                *memo = Some(PriceQuote {
                    value,
                    fetched_at: Instant::now(),
                });
                value
            }
            Err(e) => {
                let fallback = memo.as_ref().map(|q| q.value).unwrap_or(0.0);
                logger::warning(
                    LogTag::Price,
                    &format!(
                        "{} price fetch failed ({}), using {} value ${:.4}",
                        self.asset_id,
                        e,
                        if memo.is_some() { "stale" } else { "fallback" },
                        fallback
                    ),
                );
                fallback
            }
        }
    }

    async fn fetch(&self) -> Result<f64, FlowError> {
        let query = coingecko::price_query(&self.asset_id);
        retry_with_backoff(self.policy, "price", |_| {
            let query = &query;
            async move {
                let body = self.transport.get_json(&self.url, query).await?;
                coingecko::parse_usd_price(&body, &self.asset_id)
            }
        })
        .await
    }
}
