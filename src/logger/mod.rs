//! Structured logging system for hive-flows
//!
//! This module provides a clean, ergonomic logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-subsystem debug control via `--debug <tag,...>`
//! - Colored console output on stderr, optional plain-text file sink
//!
//! ## Usage
//!
//! ```rust
//! use hive_flows::logger::{self, LogTag};
//!
//! logger::error(LogTag::Client, "All retries exhausted");
//! logger::warning(LogTag::Analyzer, "Invalid account name");
//! logger::info(LogTag::Scanner, "Scan finished");
//! logger::debug(LogTag::Discovery, "Discovery feed details"); // Only if --debug discovery
//! logger::verbose(LogTag::Scanner, "Raw page data"); // Only if --verbose
//! ```
//!
//! ## Initialization
//!
//! Call once at startup with the settings parsed from the command line:
//! ```rust
//! use hive_flows::logger::{self, LoggerConfig};
//!
//! logger::init(LoggerConfig::default());
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Installs the filtering configuration and opens the file sink when a
/// log file is configured. Safe to call more than once; the last call wins.
pub fn init(config: LoggerConfig) {
    if let Some(path) = &config.log_file {
        if let Err(e) = file::init_file_logging(path) {
            eprintln!("Failed to open log file '{}': {}", path.display(), e);
        }
    }
    set_logger_config(config);
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues)
///
/// Warnings are shown by default (unless --quiet is used).
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics)
///
/// Debug logs are ONLY shown when the tag is enabled with `--debug <tag>`.
///
/// # Example
/// ```rust
/// use hive_flows::logger::{self, LogTag};
///
/// // Only shown with --debug client
/// logger::debug(LogTag::Client, "Attempt 2 on https://api.hive.blog");
/// ```
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (very detailed tracing)
///
/// Verbose logs are ONLY shown when --verbose flag is provided.
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush pending file log writes
pub fn flush() {
    file::flush_file_logging();
}
