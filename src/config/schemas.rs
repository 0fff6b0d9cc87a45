/// Configuration schemas - all config structures defined once with defaults
///
/// Each struct is defined using the config_struct! macro which provides:
/// - Single-source definition (no repetition)
/// - Embedded defaults
/// - Serde support
use crate::config_struct;
use crate::constants::{
    to_owned_list, DEFAULT_ENGINE_HISTORY_NODES, DEFAULT_ENGINE_RPC_NODES, DEFAULT_HIVE_NODES,
    ENGINE_HISTORY_DISCOVERY_URL, ENGINE_RPC_DISCOVERY_URL, HIVE_DISCOVERY_URL, NATIVE_PRICE_URL,
};

// ============================================================================
// ENDPOINT DISCOVERY CONFIGURATION
// ============================================================================

config_struct! {
    /// Discovery, health caching and selection settings per service class
    pub struct EndpointsConfig {
        hive_discovery_url: String = HIVE_DISCOVERY_URL.to_string(),
        engine_rpc_discovery_url: String = ENGINE_RPC_DISCOVERY_URL.to_string(),
        engine_history_discovery_url: String = ENGINE_HISTORY_DISCOVERY_URL.to_string(),

        // Capability a discovered node must advertise to be eligible
        hive_required_feature: String = "get_account_history".to_string(),
        engine_rpc_required_feature: String = "contracts".to_string(),
        engine_history_required_feature: String = "accountHistory".to_string(),

        // Static fallbacks when discovery yields nothing
        hive_defaults: Vec<String> = to_owned_list(DEFAULT_HIVE_NODES),
        engine_rpc_defaults: Vec<String> = to_owned_list(DEFAULT_ENGINE_RPC_NODES),
        engine_history_defaults: Vec<String> = to_owned_list(DEFAULT_ENGINE_HISTORY_NODES),

        /// Cached lists older than this are re-discovered on next use
        staleness_secs: u64 = 600,
        /// Interval of the background refresh task
        background_refresh_secs: u64 = 300,
        /// Probe-and-evict attempts before a connectivity failure
        selection_attempts: u32 = 3,
        probe_timeout_secs: u64 = 3,
        discovery_timeout_secs: u64 = 5,
    }
}

// ============================================================================
// RETRY CONFIGURATION
// ============================================================================

config_struct! {
    /// Retry and timeout policy for remote calls
    pub struct RetryConfig {
        retries: u32 = 3,
        base_delay_ms: u64 = 300,
        call_timeout_secs: u64 = 10,
    }
}

// ============================================================================
// PRICE CONFIGURATION
// ============================================================================

config_struct! {
    /// Native asset USD price source
    pub struct PriceConfig {
        url: String = NATIVE_PRICE_URL.to_string(),
        asset_id: String = "hive".to_string(),
        ttl_secs: u64 = 300,
    }
}

// ============================================================================
// SCAN CONFIGURATION
// ============================================================================

config_struct! {
    /// History scanning settings
    pub struct ScanConfig {
        /// Window used when a request names neither hours nor days
        window_hours: u64 = 24,
        hive_page_size: u32 = 1000,
        engine_page_size: u32 = 500,
        /// Delay between page requests (upstream rate limits)
        page_delay_ms: u64 = 250,
        /// Ask the node to return transfer operations only
        use_operation_filter: bool = true,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration structure containing all sub-configurations
    pub struct Config {
        endpoints: EndpointsConfig = EndpointsConfig::default(),
        retry: RetryConfig = RetryConfig::default(),
        price: PriceConfig = PriceConfig::default(),
        scan: ScanConfig = ScanConfig::default(),
    }
}

// ============================================================================
// IMPLEMENTATIONS
// ============================================================================

impl Config {
    /// Validate configuration values that would break scanning or retries
    pub fn validate(&self) -> Result<(), String> {
        if self.scan.hive_page_size == 0 || self.scan.engine_page_size == 0 {
            return Err("Page sizes must be > 0".to_string());
        }

        if self.scan.window_hours == 0 {
            return Err("scan.window_hours must be > 0".to_string());
        }

        if self.retry.retries > 10 {
            return Err("retry.retries must be <= 10".to_string());
        }

        if self.retry.call_timeout_secs == 0 {
            return Err("retry.call_timeout_secs must be > 0".to_string());
        }

        if self.endpoints.selection_attempts == 0 {
            return Err("endpoints.selection_attempts must be > 0".to_string());
        }

        let defaults = [
            ("hive_defaults", &self.endpoints.hive_defaults),
            ("engine_rpc_defaults", &self.endpoints.engine_rpc_defaults),
            ("engine_history_defaults", &self.endpoints.engine_history_defaults),
        ];
        for (name, list) in defaults {
            if list.is_empty() {
                return Err(format!("endpoints.{} cannot be empty", name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.retries, 3);
        assert_eq!(config.retry.base_delay_ms, 300);
        assert_eq!(config.endpoints.staleness_secs, 600);
        assert_eq!(config.endpoints.selection_attempts, 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scan]
            window_hours = 48

            [retry]
            retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.scan.window_hours, 48);
        assert_eq!(config.scan.hive_page_size, 1000);
        assert_eq!(config.retry.retries, 5);
        assert_eq!(config.retry.base_delay_ms, 300);
        assert!(!config.endpoints.hive_defaults.is_empty());
    }

    #[test]
    fn test_validate_rejects_empty_defaults() {
        let mut config = Config::default();
        config.endpoints.engine_history_defaults.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scan.engine_page_size = 0;
        assert!(config.validate().is_err());
    }
}
