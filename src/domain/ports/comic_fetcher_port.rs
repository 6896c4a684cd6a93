//! Port definition for retrieving strips from the remote site.

use bytes::Bytes;
use chrono::NaiveDate;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::entities::Title;
use crate::domain::errors::ResolveError;

/// Errors surfaced by a fetcher after its own retry budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum FetchError {
    #[error("not available: {reason}")]
    NotAvailable { reason: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Creates not-available error.
    #[must_use]
    pub fn not_available(reason: impl Into<String>) -> Self {
        Self::NotAvailable {
            reason: reason.into(),
        }
    }

    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Returns whether another attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Parse { .. })
    }
}

impl From<FetchError> for ResolveError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotAvailable { reason } => Self::NotAvailable { reason },
            FetchError::Network { message } => Self::NetworkFailure { message },
            FetchError::Parse { message } => Self::ParseFailure { message },
            FetchError::Cancelled => Self::Superseded,
        }
    }
}

/// Port for downloading the raw image bytes of one strip.
///
/// Implementations never touch the cache and must return
/// [`FetchError::Cancelled`] promptly once `cancel` fires.
#[async_trait::async_trait]
pub trait ComicFetcher: Send + Sync {
    /// Fetches the strip image for `title` on `date`.
    async fn fetch(
        &self,
        title: &Title,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Bytes, FetchError>;
}
