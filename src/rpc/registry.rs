//! Endpoint health registry
//!
//! Keeps, per service class, a TTL-cached list of known-good endpoints
//! sourced from a discovery feed with a static fallback. Selection is
//! uniformly random among cached endpoints, confirmed by a cheap probe;
//! endpoints that fail a probe or that a caller reports as bad are evicted.

use crate::config::EndpointsConfig;
use crate::errors::FlowError;
use crate::logger::{self, LogTag};
use crate::rpc::transport::Transport;
use crate::rpc::types::{DiscoveryEntry, Endpoint, HealthCacheEntry, ServiceClass};
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Instant};

pub struct EndpointHealthRegistry {
    transport: Arc<dyn Transport>,
    settings: EndpointsConfig,
    cache: Mutex<HashMap<ServiceClass, HealthCacheEntry>>,
}

impl EndpointHealthRegistry {
    pub fn new(transport: Arc<dyn Transport>, settings: EndpointsConfig) -> Self {
        let cache = ServiceClass::all()
            .into_iter()
            .map(|class| (class, HealthCacheEntry::empty()))
            .collect();

        Self {
            transport,
            settings,
            cache: Mutex::new(cache),
        }
    }

    fn discovery_url(&self, class: ServiceClass) -> &str {
        match class {
            ServiceClass::Hive => &self.settings.hive_discovery_url,
            ServiceClass::EngineRpc => &self.settings.engine_rpc_discovery_url,
            ServiceClass::EngineHistory => &self.settings.engine_history_discovery_url,
        }
    }

    fn required_feature(&self, class: ServiceClass) -> &str {
        match class {
            ServiceClass::Hive => &self.settings.hive_required_feature,
            ServiceClass::EngineRpc => &self.settings.engine_rpc_required_feature,
            ServiceClass::EngineHistory => &self.settings.engine_history_required_feature,
        }
    }

    fn defaults(&self, class: ServiceClass) -> &[String] {
        match class {
            ServiceClass::Hive => &self.settings.hive_defaults,
            ServiceClass::EngineRpc => &self.settings.engine_rpc_defaults,
            ServiceClass::EngineHistory => &self.settings.engine_history_defaults,
        }
    }

    fn staleness(&self) -> Duration {
        Duration::from_secs(self.settings.staleness_secs)
    }

    // =========================================================================
    // DISCOVERY
    // =========================================================================

    /// Fetch the discovery feed and keep only fully healthy, capable nodes
    pub async fn fetch_discovery(&self, class: ServiceClass) -> Result<Vec<String>, FlowError> {
        let url = self.discovery_url(class).to_string();
        let body = self.transport.get_json(&url, &[]).await?;

        let rows = match body {
            Value::Array(rows) => rows,
            other => {
                return Err(FlowError::invalid_response(format!(
                    "Discovery feed {} returned {} instead of an array",
                    url,
                    json_kind(&other)
                )))
            }
        };

        let required = self.required_feature(class);
        let mut eligible: Vec<String> = Vec::new();
        for row in rows {
            // Rows without an endpoint are skipped rather than failing the feed
            let Ok(entry) = serde_json::from_value::<DiscoveryEntry>(row) else {
                continue;
            };
            if !entry.is_eligible(required) {
                continue;
            }
            let normalized = entry.endpoint.trim_end_matches('/').to_string();
            if !normalized.is_empty() && !eligible.contains(&normalized) {
                eligible.push(normalized);
            }
        }

        Ok(eligible)
    }

    /// Re-discover endpoints for a class, falling back to the static list
    ///
    /// Never fails: discovery errors and empty results both fall back to
    /// the configured defaults. Returns the size of the new list.
    pub async fn refresh(&self, class: ServiceClass) -> usize {
        let discovery_timeout = Duration::from_secs(self.settings.discovery_timeout_secs);

        let urls = match timeout(discovery_timeout, self.fetch_discovery(class)).await {
            Ok(Ok(urls)) if !urls.is_empty() => {
                logger::debug(
                    LogTag::Discovery,
                    &format!("{}: {} eligible endpoints discovered", class, urls.len()),
                );
                urls
            }
            Ok(Ok(_)) => {
                logger::warning(
                    LogTag::Discovery,
                    &format!("{}: no eligible endpoints in discovery feed, using defaults", class),
                );
                self.defaults(class).to_vec()
            }
            Ok(Err(e)) => {
                logger::warning(
                    LogTag::Discovery,
                    &format!("{}: discovery failed ({}), using defaults", class, e),
                );
                self.defaults(class).to_vec()
            }
            Err(_) => {
                logger::warning(
                    LogTag::Discovery,
                    &format!(
                        "{}: discovery timed out after {}s, using defaults",
                        class,
                        discovery_timeout.as_secs()
                    ),
                );
                self.defaults(class).to_vec()
            }
        };

        let count = urls.len();
        let mut cache = self.cache.lock().await;
        cache.insert(
            class,
            HealthCacheEntry {
                endpoints: urls.into_iter().map(Endpoint::new).collect(),
                refreshed_at: Some(Instant::now()),
            },
        );
        count
    }

    async fn needs_refresh(&self, class: ServiceClass) -> bool {
        let cache = self.cache.lock().await;
        match cache.get(&class) {
            None => true,
            Some(entry) => match entry.refreshed_at {
                None => true,
                Some(at) => entry.endpoints.is_empty() || at.elapsed() >= self.staleness(),
            },
        }
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Pick a random cached endpoint other than `exclude`, refreshing when needed
    async fn pick(&self, class: ServiceClass, exclude: Option<&str>) -> Result<String, FlowError> {
        if self.needs_refresh(class).await {
            self.refresh(class).await;
        }

        if let Some(url) = self.choose_cached(class, exclude).await {
            return Ok(url);
        }

        // Everything usable was evicted: rediscover once before giving up
        self.refresh(class).await;
        self.choose_cached(class, exclude)
            .await
            .ok_or_else(|| FlowError::NoHealthyEndpoint {
                class: class.to_string(),
            })
    }

    async fn choose_cached(&self, class: ServiceClass, exclude: Option<&str>) -> Option<String> {
        let cache = self.cache.lock().await;
        let entry = cache.get(&class)?;
        let candidates: Vec<&Endpoint> = entry
            .endpoints
            .iter()
            .filter(|e| Some(e.url.as_str()) != exclude)
            .collect();
        candidates
            .choose(&mut rand::thread_rng())
            .map(|e| e.url.clone())
    }

    async fn select(&self, class: ServiceClass, exclude: Option<&str>) -> Result<String, FlowError> {
        let attempts = self.settings.selection_attempts;
        let probe_timeout = Duration::from_secs(self.settings.probe_timeout_secs);

        for attempt in 1..=attempts {
            let url = self.pick(class, exclude).await?;

            let probe = match timeout(probe_timeout, self.transport.probe(&url, probe_timeout)).await {
                Ok(result) => result,
                Err(_) => Err(FlowError::Timeout {
                    endpoint: url.clone(),
                    timeout_ms: probe_timeout.as_millis() as u64,
                }),
            };

            match probe {
                Ok(()) => {
                    self.mark_probe(class, &url, true).await;
                    logger::debug(
                        LogTag::Discovery,
                        &format!("{}: selected {} (probe {}/{})", class, url, attempt, attempts),
                    );
                    return Ok(url);
                }
                Err(e) => {
                    logger::warning(
                        LogTag::Discovery,
                        &format!("{}: probe failed for {} ({}), evicting", class, url, e),
                    );
                    self.mark_probe(class, &url, false).await;
                    self.evict(class, &url).await;
                }
            }
        }

        Err(FlowError::NoConnectivity {
            class: class.to_string(),
            attempts,
        })
    }

    async fn mark_probe(&self, class: ServiceClass, url: &str, alive: bool) {
        let mut cache = self.cache.lock().await;
        if let Some(endpoint) = cache
            .get_mut(&class)
            .and_then(|entry| entry.endpoints.iter_mut().find(|e| e.url == url))
        {
            if alive {
                endpoint.record_probe_success();
            } else {
                endpoint.record_probe_failure();
            }
        }
    }

    async fn evict(&self, class: ServiceClass, url: &str) -> bool {
        let mut cache = self.cache.lock().await;
        cache
            .get_mut(&class)
            .map(|entry| entry.remove(url))
            .unwrap_or(false)
    }

    /// Select a live endpoint for a class
    pub async fn get_endpoint(&self, class: ServiceClass) -> Result<String, FlowError> {
        self.select(class, None).await
    }

    /// Report `previous` as bad and select a live endpoint other than it
    pub async fn get_endpoint_excluding(
        &self,
        class: ServiceClass,
        previous: &str,
    ) -> Result<String, FlowError> {
        self.report_bad(class, previous).await;
        self.select(class, Some(previous)).await
    }

    /// Remove an endpoint before the next selection
    ///
    /// If this empties the list, the next selection triggers discovery.
    pub async fn report_bad(&self, class: ServiceClass, url: &str) {
        if self.evict(class, url).await {
            logger::debug(
                LogTag::Discovery,
                &format!("{}: {} reported bad and removed", class, url),
            );
        }
    }

    /// Snapshot of the cached endpoint URLs for a class
    pub async fn cached_urls(&self, class: ServiceClass) -> Vec<String> {
        let cache = self.cache.lock().await;
        cache.get(&class).map(|e| e.urls()).unwrap_or_default()
    }

    // =========================================================================
    // BACKGROUND REFRESH
    // =========================================================================

    /// Spawn the periodic refresh of every class
    ///
    /// The first tick fires immediately so the cache is warm before the first
    /// request. Runs until `shutdown` is notified; refresh failures only log.
    pub fn start_background_refresh(self: &Arc<Self>, shutdown: Arc<Notify>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = Duration::from_secs(self.settings.background_refresh_secs.max(1));

        tokio::spawn(async move {
            let mut ticker = interval(period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for class in ServiceClass::all() {
                            let count = registry.refresh(class).await;
                            logger::verbose(
                                LogTag::Discovery,
                                &format!("Background refresh {}: {} endpoints", class, count),
                            );
                        }
                    }
                    _ = shutdown.notified() => {
                        logger::debug(LogTag::Discovery, "Background refresh stopping");
                        break;
                    }
                }
            }
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
