//! Configuration system
//!
//! Schemas are declared once with embedded defaults (`config_struct!`),
//! loaded from TOML, and shared through a [`ConfigStore`].

#[macro_use]
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{Config, EndpointsConfig, PriceConfig, RetryConfig, ScanConfig};
pub use utils::{load_config_from_path, ConfigStore, WindowOverride, CONFIG_FILE_PATH};
