//! Comic title value objects.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::errors::CatalogError;

/// Identifier of a comic title, the slug used by the remote site
/// and as the cache directory name (e.g. `garfield`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleId(String);

impl TitleId {
    /// Creates a new `TitleId`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the slug is safe to use as a single path segment.
    #[must_use]
    pub fn is_valid_slug(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TitleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TitleId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Inclusive range of dates with no published strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// First missing date.
    pub start: NaiveDate,
    /// Last missing date.
    pub end: NaiveDate,
}

impl Gap {
    /// Creates a gap, rejecting reversed ranges.
    ///
    /// # Errors
    /// Returns error if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CatalogError> {
        if start > end {
            return Err(CatalogError::InvalidGap { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns true if the date lies within the gap.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns true if the gap intersects `[from, to]`.
    #[must_use]
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start <= to && from <= self.end
    }
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Static description of one comic strip series.
///
/// Titles are built once from the catalog and never mutated. Gaps are kept
/// sorted and merged so lookups can stop at the first range past a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    id: TitleId,
    display_name: String,
    author: String,
    earliest: NaiveDate,
    gaps: Vec<Gap>,
}

impl Title {
    /// Creates a title, normalizing its gap list.
    ///
    /// # Errors
    /// Returns error if the slug is not a valid path segment or the display name is empty.
    pub fn new(
        id: impl Into<TitleId>,
        display_name: impl Into<String>,
        author: impl Into<String>,
        earliest: NaiveDate,
        gaps: Vec<Gap>,
    ) -> Result<Self, CatalogError> {
        let id = id.into();
        if !id.is_valid_slug() {
            return Err(CatalogError::InvalidSlug(id.to_string()));
        }
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(CatalogError::MissingField {
                title: id.to_string(),
                field: "display_name",
            });
        }

        Ok(Self {
            id,
            display_name,
            author: author.into(),
            earliest,
            gaps: normalize_gaps(gaps),
        })
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> &TitleId {
        &self.id
    }

    /// Returns the human readable name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the author credit.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the earliest date the remote site carries.
    #[must_use]
    pub const fn earliest(&self) -> NaiveDate {
        self.earliest
    }

    /// Returns the sorted, non-overlapping gap list.
    #[must_use]
    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    /// Returns the gap containing `date`, if any.
    #[must_use]
    pub fn gap_containing(&self, date: NaiveDate) -> Option<&Gap> {
        self.gaps
            .iter()
            .take_while(|gap| gap.start <= date)
            .find(|gap| gap.contains(date))
    }
}

fn normalize_gaps(mut gaps: Vec<Gap>) -> Vec<Gap> {
    gaps.sort_by_key(|gap| gap.start);

    let mut merged: Vec<Gap> = Vec::with_capacity(gaps.len());
    for gap in gaps {
        match merged.last_mut() {
            Some(last) if gap.start <= last.end.succ_opt().unwrap_or(last.end) => {
                last.end = last.end.max(gap.end);
            }
            _ => merged.push(gap),
        }
    }
    merged
}
