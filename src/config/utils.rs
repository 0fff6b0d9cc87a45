/// Configuration utilities - loading and access helpers
///
/// This module provides utility functions for working with the configuration system:
/// - Loading configuration from disk (TOML, defaults when absent)
/// - Thread-safe access helpers on a shared `ConfigStore`
/// - The transient scan-window override used by the analyzer
use super::schemas::Config;
use crate::errors::FlowError;
use crate::logger::{self, LogTag};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Load configuration from a specific file path
///
/// If the file doesn't exist the schema defaults are used. A file that
/// exists but fails to parse or validate is an error.
pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<Config, FlowError> {
    let path = path.as_ref();

    let config = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str::<Config>(&contents).map_err(|e| {
            FlowError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?
    } else {
        logger::debug(
            LogTag::Config,
            &format!(
                "Config file '{}' not found, using default values",
                path.display()
            ),
        );
        Config::default()
    };

    config.validate().map_err(FlowError::Config)?;

    Ok(config)
}

/// Shared, lock-protected configuration owned by the analyzer
#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: RwLock<Config>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    /// Load from disk (see [`load_config_from_path`])
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FlowError> {
        Ok(Self::new(load_config_from_path(path)?))
    }

    fn read(&self) -> RwLockReadGuard<'_, Config> {
        // A panicking writer cannot leave a half-written Config behind
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Config> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Execute a function with read access to the configuration
    ///
    /// # Example
    /// ```
    /// use hive_flows::config::ConfigStore;
    ///
    /// let store = ConfigStore::default();
    /// let retries = store.with_config(|cfg| cfg.retry.retries);
    /// assert_eq!(retries, 3);
    /// ```
    pub fn with_config<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Config) -> R,
    {
        let config = self.read();
        f(&config)
    }

    /// Get a clone of the entire configuration
    ///
    /// Use when values must be held across await points.
    pub fn get_config_clone(&self) -> Config {
        self.with_config(|cfg| cfg.clone())
    }

    /// Mutate the configuration in place
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.write();
        f(&mut config);
    }

    /// Apply a transient scan-window override
    ///
    /// The previous value is restored when the returned guard drops, which
    /// covers early returns, errors and panics alike.
    pub fn override_window_hours(&self, hours: u64) -> WindowOverride<'_> {
        let mut config = self.write();
        let previous = config.scan.window_hours;
        config.scan.window_hours = hours;
        drop(config);

        logger::debug(
            LogTag::Config,
            &format!("Scan window override {}h (was {}h)", hours, previous),
        );

        WindowOverride {
            store: self,
            previous,
        }
    }
}

/// RAII guard restoring `scan.window_hours` on drop
#[derive(Debug)]
pub struct WindowOverride<'a> {
    store: &'a ConfigStore,
    previous: u64,
}

impl WindowOverride<'_> {
    pub fn previous_hours(&self) -> u64 {
        self.previous
    }
}

impl Drop for WindowOverride<'_> {
    fn drop(&mut self) {
        let previous = self.previous;
        self.store.update(|cfg| cfg.scan.window_hours = previous);
    }
}
