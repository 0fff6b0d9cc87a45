use crate::constants::FULL_HEALTH_SCORE;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Remote service classes with independently tracked endpoint pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceClass {
    /// Native ledger JSON-RPC nodes
    Hive,
    /// Token ledger JSON-RPC nodes (contracts / market data)
    EngineRpc,
    /// Token ledger account-history service
    EngineHistory,
}

impl ServiceClass {
    pub fn all() -> [ServiceClass; 3] {
        [
            ServiceClass::Hive,
            ServiceClass::EngineRpc,
            ServiceClass::EngineHistory,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceClass::Hive => "hive",
            ServiceClass::EngineRpc => "engine_rpc",
            ServiceClass::EngineHistory => "engine_history",
        }
    }
}

impl std::fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A candidate service URL with its liveness bookkeeping
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub healthy: bool,
    pub last_probe: Option<Instant>,
    pub failure_count: u32,
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            healthy: true,
            last_probe: None,
            failure_count: 0,
        }
    }

    pub fn record_probe_success(&mut self) {
        self.healthy = true;
        self.last_probe = Some(Instant::now());
    }

    pub fn record_probe_failure(&mut self) {
        self.healthy = false;
        self.failure_count += 1;
        self.last_probe = Some(Instant::now());
    }
}

/// Cached endpoint list for one service class
#[derive(Debug, Clone)]
pub struct HealthCacheEntry {
    pub endpoints: Vec<Endpoint>,
    /// None until the first refresh
    pub refreshed_at: Option<Instant>,
}

impl HealthCacheEntry {
    pub fn empty() -> Self {
        Self {
            endpoints: Vec::new(),
            refreshed_at: None,
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.endpoints.iter().any(|e| e.url == url)
    }

    /// Drop an endpoint; returns true when something was removed
    pub fn remove(&mut self, url: &str) -> bool {
        let before = self.endpoints.len();
        self.endpoints.retain(|e| e.url != url);
        self.endpoints.len() != before
    }

    pub fn urls(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.url.clone()).collect()
    }
}

/// One row of a discovery feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryEntry {
    pub endpoint: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub fail: u32,
    #[serde(default)]
    pub features: Vec<String>,
}

impl DiscoveryEntry {
    /// Fully healthy, no recorded failures, and advertising the capability
    pub fn is_eligible(&self, required_feature: &str) -> bool {
        self.score == FULL_HEALTH_SCORE
            && self.fail == 0
            && self.features.iter().any(|f| f == required_feature)
    }
}
