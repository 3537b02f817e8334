use serde::Serialize;
use std::collections::BTreeSet;

use super::CatalogId;

/// Catalog ids already served within the current filter session
///
/// Only grows through the public API; the feed controller clears it when the
/// filters change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<CatalogId>);

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the id was not already present
    pub fn insert(&mut self, id: CatalogId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: &CatalogId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogId> {
        self.0.iter()
    }

    pub fn is_superset(&self, other: &ExclusionSet) -> bool {
        self.0.is_superset(&other.0)
    }

    pub fn to_vec(&self) -> Vec<CatalogId> {
        self.0.iter().copied().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<CatalogId> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = CatalogId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
