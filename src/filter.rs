//! Client-side narrowing of a fetched snapshot.
use crate::model::ListRecord;

/// Categorical filter applied after search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Only records with a region set.
    HasRegion,
}

impl CategoryFilter {
    fn admits<R: ListRecord>(&self, record: &R) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::HasRegion => record.region().is_some(),
        }
    }
}

/// Client-side filter state of a list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    search: String,
    pub category: CategoryFilter,
}

impl FilterState {
    pub fn new(search: &str, category: CategoryFilter) -> Self {
        let mut state = Self {
            search: String::new(),
            category,
        };
        state.set_search(search);
        state
    }

    /// Store the term trimmed and lowercased.
    pub fn set_search(&mut self, term: &str) {
        self.search = term.trim().to_lowercase();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    fn matches_search<R: ListRecord>(&self, record: &R) -> bool {
        if self.search.is_empty() {
            return true;
        }
        [record.name(), record.region()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&self.search))
    }

    /// Search first, then the category filter. Order is preserved and the
    /// input is left untouched.
    pub fn apply<R: ListRecord>(&self, records: &[R]) -> Vec<R> {
        records
            .iter()
            .filter(|r| self.matches_search(*r))
            .filter(|r| self.category.admits(*r))
            .cloned()
            .collect()
    }
}
