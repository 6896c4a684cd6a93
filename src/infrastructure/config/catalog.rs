//! Title catalog loading.
//!
//! The catalog is product data: which titles exist, when each one starts,
//! and which date ranges are known to be missing. A built-in copy ships with
//! the binary; a file with the same schema can replace it.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use super::storage::ConfigError;
use crate::domain::entities::{Gap, Title, TitleCatalog};
use crate::domain::errors::CatalogError;

const BUILTIN_CATALOG: &str = include_str!("default_catalog.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    titles: Vec<TitleRecord>,
}

#[derive(Debug, Deserialize)]
struct TitleRecord {
    id: String,
    display_name: String,
    #[serde(default)]
    author: String,
    earliest: NaiveDate,
    #[serde(default)]
    gaps: Vec<GapRecord>,
}

#[derive(Debug, Deserialize)]
struct GapRecord {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<TitleRecord> for Title {
    type Error = CatalogError;

    fn try_from(record: TitleRecord) -> Result<Self, Self::Error> {
        let gaps = record
            .gaps
            .into_iter()
            .map(|gap| Gap::new(gap.start, gap.end))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(
            record.id,
            record.display_name,
            record.author,
            record.earliest,
            gaps,
        )
    }
}

/// Parses a catalog from TOML text.
///
/// # Errors
/// Returns `CatalogError` if the text is not valid TOML or a title is invalid.
pub fn parse_catalog(content: &str) -> Result<TitleCatalog, CatalogError> {
    let file: CatalogFile = toml::from_str(content).map_err(|e| CatalogError::Parse {
        message: e.to_string(),
    })?;
    let titles = file
        .titles
        .into_iter()
        .map(Title::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    TitleCatalog::new(titles)
}

/// The catalog compiled into the binary.
///
/// # Errors
/// Returns `CatalogError` only if the embedded data is malformed.
pub fn builtin_catalog() -> Result<TitleCatalog, CatalogError> {
    parse_catalog(BUILTIN_CATALOG)
}

/// Loads the catalog from `path`, or the built-in one when `path` is `None`.
///
/// # Errors
/// Returns `ConfigError` if the file cannot be read or describes invalid titles.
pub fn load_catalog(path: Option<&Path>) -> Result<TitleCatalog, ConfigError> {
    let Some(path) = path else {
        let catalog = builtin_catalog()?;
        debug!(titles = catalog.len(), "Using built-in catalog");
        return Ok(catalog);
    };

    let content = std::fs::read_to_string(path)?;
    let catalog = parse_catalog(&content)?;
    info!(path = %path.display(), titles = catalog.len(), "Loaded title catalog");
    Ok(catalog)
}
