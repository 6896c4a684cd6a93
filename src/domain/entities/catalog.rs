//! Immutable set of known titles.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Title, TitleId};
use crate::domain::errors::CatalogError;

/// Titles known at startup, in declaration order.
#[derive(Debug, Clone)]
pub struct TitleCatalog {
    titles: Vec<Arc<Title>>,
    by_id: HashMap<TitleId, usize>,
}

impl TitleCatalog {
    /// Builds a catalog, rejecting duplicate identifiers and empty lists.
    ///
    /// # Errors
    /// Returns error if `titles` is empty or an identifier repeats.
    pub fn new(titles: Vec<Title>) -> Result<Self, CatalogError> {
        if titles.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_id = HashMap::with_capacity(titles.len());
        for (idx, title) in titles.iter().enumerate() {
            if by_id.insert(title.id().clone(), idx).is_some() {
                return Err(CatalogError::DuplicateTitle(title.id().to_string()));
            }
        }

        Ok(Self {
            titles: titles.into_iter().map(Arc::new).collect(),
            by_id,
        })
    }

    /// Looks up a title.
    #[must_use]
    pub fn get(&self, id: &TitleId) -> Option<&Arc<Title>> {
        self.by_id.get(id).map(|&idx| &self.titles[idx])
    }

    /// Iterates titles in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Title>> {
        self.titles.iter()
    }

    /// Number of titles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    /// Always false for a constructed catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn title(id: &str) -> Title {
        Title::new(
            id,
            id.to_uppercase(),
            "Someone",
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_preserves_order() {
        let catalog = TitleCatalog::new(vec![title("pickles"), title("bc")]).unwrap();
        let ids: Vec<_> = catalog.iter().map(|t| t.id().as_str()).collect();
        assert_eq!(ids, vec!["pickles", "bc"]);
        assert!(catalog.get(&TitleId::new("bc")).is_some());
        assert!(catalog.get(&TitleId::new("ziggy")).is_none());
    }

    #[test]
    fn test_duplicates_rejected() {
        let result = TitleCatalog::new(vec![title("bc"), title("bc")]);
        assert_eq!(
            result.unwrap_err(),
            CatalogError::DuplicateTitle("bc".to_string())
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(TitleCatalog::new(Vec::new()).unwrap_err(), CatalogError::Empty);
    }
}
