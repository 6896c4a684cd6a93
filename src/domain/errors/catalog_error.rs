//! Title catalog error types.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while building the title catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum CatalogError {
    #[error("invalid title slug: {0:?}")]
    InvalidSlug(String),

    #[error("title {title} is missing {field}")]
    MissingField { title: String, field: &'static str },

    #[error("gap starts after it ends: {start} > {end}")]
    InvalidGap { start: NaiveDate, end: NaiveDate },

    #[error("title {0} is declared more than once")]
    DuplicateTitle(String),

    #[error("catalog contains no titles")]
    Empty,

    #[error("failed to parse catalog: {message}")]
    Parse { message: String },
}
