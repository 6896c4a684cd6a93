//! Port definition for the strip cache.

use bytes::Bytes;
use chrono::NaiveDate;

use crate::domain::entities::{ImageKind, TitleId};
use crate::domain::errors::ResolveError;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors that can occur during cache operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// I/O error during cache operation.
    #[error("IO error: {0}")]
    IoError(String),
    /// Failed to read or write the cache index.
    #[error("Index error: {0}")]
    IndexError(String),
    /// Title slug cannot be used as a directory name.
    #[error("Invalid title: {0}")]
    InvalidTitle(String),
}

impl CacheError {
    /// Creates an I/O error with context.
    #[must_use]
    pub fn io(context: &str, err: impl std::fmt::Display) -> Self {
        Self::IoError(format!("{context}: {err}"))
    }
}

impl From<CacheError> for ResolveError {
    fn from(err: CacheError) -> Self {
        Self::CacheWriteFailure {
            message: err.to_string(),
        }
    }
}

/// Per-title cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TitleCacheStats {
    /// Number of cached dates.
    pub entries: usize,
    /// Sum of cached file sizes in bytes.
    pub total_bytes: u64,
    /// Sum of recorded accesses.
    pub total_accesses: u64,
}

impl std::fmt::Display for TitleCacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} strips, {} bytes, {} accesses",
            self.entries, self.total_bytes, self.total_accesses
        )
    }
}

/// Port for the bounded, per-title strip cache.
/// Implementations must be thread-safe and must not serialize unrelated titles.
#[async_trait::async_trait]
pub trait ComicCachePort: Send + Sync {
    /// Looks up a strip, refreshing its recency on a hit.
    async fn get(&self, title: &TitleId, date: NaiveDate) -> Option<(Bytes, ImageKind)>;

    /// Stores a strip, evicting the least recently used entry of the title when full.
    async fn put(
        &self,
        title: &TitleId,
        date: NaiveDate,
        bytes: Bytes,
        kind: ImageKind,
    ) -> CacheResult<()>;

    /// Returns true if the strip is cached, without touching recency.
    async fn contains(&self, title: &TitleId, date: NaiveDate) -> bool;
}
