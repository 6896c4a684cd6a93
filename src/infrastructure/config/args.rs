use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Date requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateArg {
    /// Today's strip.
    Today,
    /// A random available strip.
    Random,
    /// A specific calendar date.
    On(chrono::NaiveDate),
}

impl std::str::FromStr for DateArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "random" => Ok(Self::Random),
            other => chrono::NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(Self::On)
                .map_err(|_| format!("expected YYYY-MM-DD, 'today' or 'random', got '{s}'")),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "comicstrip",
    version,
    about = "Fetch and cache daily comic strips",
    long_about = None
)]
pub struct CliArgs {
    /// Title slug (defaults to the configured title).
    #[arg(value_name = "TITLE")]
    pub title: Option<String>,

    /// Date: YYYY-MM-DD, today, or random.
    #[arg(value_name = "DATE", default_value = "today")]
    pub date: DateArg,

    /// List known titles and exit.
    #[arg(long)]
    pub list: bool,

    /// Print cache statistics and exit.
    #[arg(long)]
    pub stats: bool,

    /// Write the strip to this file instead of printing its cache path.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Title catalog file path.
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Cache root directory.
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Strips kept per title.
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Base URL of the comic site.
    #[arg(long, env = "COMICSTRIP_BASE_URL")]
    pub base_url: Option<String>,

    /// Per-attempt timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Retries after the first attempt.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Do not fall back to yesterday when today's strip is missing.
    #[arg(long)]
    pub no_fallback: bool,
}
