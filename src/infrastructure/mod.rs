//! Infrastructure layer with external service adapters.

/// On-disk strip cache.
pub mod cache;
/// Application configuration.
pub mod config;
/// Strip fetching over HTTP.
pub mod gocomics;

pub use cache::{DEFAULT_CAPACITY_PER_TITLE, DiskComicCache};
pub use config::{AppConfig, CliArgs, ConfigError, DateArg, LogLevel, StorageManager};
pub use gocomics::{GoComicsFetcher, RetryPolicy};
