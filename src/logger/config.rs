/// Logger configuration and global access
use super::levels::LogLevel;
use super::tags::LogTag;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Messages above this level are dropped
    pub min_level: LogLevel,
    /// Tags with debug output enabled
    pub debug_tags: HashSet<LogTag>,
    /// When non-empty, only these tags are printed (errors always are)
    pub enabled_tags: HashSet<LogTag>,
    /// Plain-text log file (appended)
    pub log_file: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
            log_file: None,
        }
    }
}

impl LoggerConfig {
    /// Build from CLI-level switches
    ///
    /// `debug` holds tag keys (`client`, `scanner`, ...) or `all`.
    pub fn from_flags(verbose: bool, quiet: bool, debug: &[String]) -> Self {
        let mut config = LoggerConfig::default();

        if quiet {
            config.min_level = LogLevel::Warning;
        }

        for key in debug {
            if key.trim().eq_ignore_ascii_case("all") {
                config.debug_tags.extend(LogTag::all().iter().copied());
            } else if let Some(tag) = LogTag::from_debug_key(key) {
                config.debug_tags.insert(tag);
            }
        }

        if !config.debug_tags.is_empty() && config.min_level < LogLevel::Debug {
            config.min_level = LogLevel::Debug;
        }

        if verbose {
            config.min_level = LogLevel::Verbose;
        }

        config
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG
        .read()
        .map(|cfg| cfg.clone())
        .unwrap_or_default()
}

pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut cfg) = LOGGER_CONFIG.write() {
        *cfg = config;
    }
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG
        .read()
        .map(|cfg| cfg.debug_tags.contains(tag) || cfg.min_level == LogLevel::Verbose)
        .unwrap_or(false)
}
