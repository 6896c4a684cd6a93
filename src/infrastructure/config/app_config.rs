//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::services::ResolutionOptions;
use crate::domain::entities::TitleId;
use crate::infrastructure::cache::DEFAULT_CAPACITY_PER_TITLE;

pub(crate) const APP_NAME: &str = "comicstrip";
pub(crate) const APP_QUALIFIER: &str = "org";
pub(crate) const APP_ORGANIZATION: &str = "comicstrip";

/// Default site the fetcher scrapes.
pub const DEFAULT_BASE_URL: &str = "https://www.gocomics.com";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden by CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Title shown when none is given on the command line.
    #[serde(default = "default_title")]
    pub default_title: TitleId,

    /// External catalog replacing the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Resolution configuration.
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache root directory. Defaults to the platform cache dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Strips kept per title before the least recently used is evicted.
    #[serde(default = "default_capacity")]
    pub capacity_per_title: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            capacity_per_title: default_capacity(),
        }
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Base URL of the comic site.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Upper bound of the random jitter added to each delay, in milliseconds.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

impl NetworkConfig {
    /// Per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

/// Resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Retry with yesterday when today's strip is not out yet.
    #[serde(default = "default_true")]
    pub fallback_to_previous_day: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            fallback_to_previous_day: true,
        }
    }
}

impl From<&ResolutionConfig> for ResolutionOptions {
    fn from(config: &ResolutionConfig) -> Self {
        Self {
            fallback_to_previous_day: config.fallback_to_previous_day,
            ..Self::default()
        }
    }
}

fn default_title() -> TitleId {
    TitleId::new("garfield")
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY_PER_TITLE
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_jitter_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(catalog) = &args.catalog {
            self.catalog = Some(catalog.clone());
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.root = Some(cache_dir.clone());
        }
        if let Some(capacity) = args.capacity {
            self.cache.capacity_per_title = capacity;
        }
        if let Some(base_url) = &args.base_url {
            self.network.base_url.clone_from(base_url);
        }
        if let Some(timeout) = args.timeout_secs {
            self.network.timeout_secs = timeout;
        }
        if let Some(retries) = args.max_retries {
            self.network.max_retries = retries;
        }
        if args.no_fallback {
            self.resolution.fallback_to_previous_day = false;
        }
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("comicstrip.log"))
    }

    /// Returns default cache root, falling back to the temp dir.
    #[must_use]
    pub fn default_cache_dir() -> PathBuf {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).map_or_else(
            || std::env::temp_dir().join(APP_NAME).join("comics"),
            |dirs| dirs.cache_dir().join("comics"),
        )
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    /// Returns effective cache root.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache.root.clone().unwrap_or_else(Self::default_cache_dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LogLevel::Info,
            default_title: default_title(),
            catalog: None,
            cache: CacheConfig::default(),
            network: NetworkConfig::default(),
            resolution: ResolutionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            log_level = "debug"
            default_title = "peanuts"

            [cache]
            capacity_per_title = 50

            [network]
            base_url = "http://localhost:8080"
            max_retries = 1

            [resolution]
            fallback_to_previous_day = false
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.default_title.as_str(), "peanuts");
        assert_eq!(config.cache.capacity_per_title, 50);
        assert!(config.cache.root.is_none());
        assert_eq!(config.network.base_url, "http://localhost:8080");
        assert_eq!(config.network.max_retries, 1);
        assert_eq!(config.network.timeout_secs, 30);
        assert_eq!(config.network.jitter_ms, 250);
        assert!(!config.resolution.fallback_to_previous_day);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.default_title.as_str(), "garfield");
        assert_eq!(config.cache.capacity_per_title, 200);
        assert_eq!(config.network.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.network.timeout(), Duration::from_secs(30));
        assert_eq!(config.network.base_delay_ms, 500);
        assert_eq!(config.network.max_delay_ms, 8000);
        assert!(config.resolution.fallback_to_previous_day);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let content = toml::to_string_pretty(&AppConfig::default()).unwrap();
        let parsed: AppConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.cache.capacity_per_title, 200);
        assert_eq!(parsed.default_title.as_str(), "garfield");
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config = AppConfig::default();
        let args = CliArgs::parse_from([
            "comicstrip",
            "--capacity",
            "5",
            "--base-url",
            "http://127.0.0.1:9",
            "--cache-dir",
            "/tmp/strips",
            "--no-fallback",
            "peanuts",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.cache.capacity_per_title, 5);
        assert_eq!(config.network.base_url, "http://127.0.0.1:9");
        assert_eq!(config.effective_cache_dir(), PathBuf::from("/tmp/strips"));
        assert!(!config.resolution.fallback_to_previous_day);
        assert_eq!(config.network.max_retries, 3);
    }
}
