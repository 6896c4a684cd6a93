//! Resolution error taxonomy.

use thiserror::Error;

/// Reasons a selection failed to resolve to an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ResolveError {
    #[error("strip not available: {reason}")]
    NotAvailable { reason: String },

    #[error("network failure: {message}")]
    NetworkFailure { message: String },

    #[error("could not find strip image on page: {message}")]
    ParseFailure { message: String },

    #[error("downloaded data is not a recognized image format")]
    UnknownFormat,

    #[error("failed to store strip in cache: {message}")]
    CacheWriteFailure { message: String },

    /// Internal marker for work overtaken by a newer selection.
    /// Never delivered to callers.
    #[error("resolution superseded by a newer selection")]
    Superseded,
}

impl ResolveError {
    /// Creates not-available error.
    #[must_use]
    pub fn not_available(reason: impl Into<String>) -> Self {
        Self::NotAvailable {
            reason: reason.into(),
        }
    }

    /// Creates network failure error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            message: message.into(),
        }
    }

    /// Creates parse failure error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseFailure {
            message: message.into(),
        }
    }

    /// Returns whether offering a retry action makes sense.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkFailure { .. } | Self::ParseFailure { .. }
        )
    }

    /// Returns whether the user should be steered to another date.
    #[must_use]
    pub const fn suggests_other_date(&self) -> bool {
        matches!(self, Self::NotAvailable { .. } | Self::UnknownFormat)
    }

    /// Returns whether the previous-day fallback may be attempted.
    #[must_use]
    pub const fn allows_fallback(&self) -> bool {
        matches!(
            self,
            Self::NotAvailable { .. } | Self::NetworkFailure { .. } | Self::ParseFailure { .. }
        )
    }
}
