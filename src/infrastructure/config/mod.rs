//! Application configuration.

pub mod app_config;
pub mod args;
pub mod catalog;
pub mod storage;

pub use app_config::{
    AppConfig, CacheConfig, DEFAULT_BASE_URL, LogLevel, NetworkConfig, ResolutionConfig,
};
pub use args::{CliArgs, DateArg};
pub use catalog::{builtin_catalog, load_catalog, parse_catalog};
pub use storage::{ConfigError, StorageManager};
