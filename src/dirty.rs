//! Change tracking against the last sync point.

use crate::attributes::AttributeStore;
use crate::value::Row;

/// Computes which attributes changed since the last snapshot.
///
/// Comparison uses the stored (post write-in cast) representation. Two date values
/// that decode identically but were stored with different precision count as dirty.
#[derive(Debug, Clone, Copy)]
pub struct DirtyTracker<'a> {
    store: &'a AttributeStore,
}

impl<'a> DirtyTracker<'a> {
    #[must_use]
    pub fn new(store: &'a AttributeStore) -> Self {
        Self { store }
    }

    /// Every key that is new since the snapshot or whose value differs from it,
    /// in attribute order.
    #[must_use]
    pub fn dirty(&self) -> Row {
        self.store
            .attributes()
            .iter()
            .filter(|(key, value)| self.store.original_value(key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// With no keys: whether anything is dirty. Otherwise whether any of `keys` is.
    #[must_use]
    pub fn is_dirty(&self, keys: &[&str]) -> bool {
        let dirty = self.dirty();
        if keys.is_empty() {
            return !dirty.is_empty();
        }
        keys.iter().any(|key| dirty.contains_key(*key))
    }

    /// Resync the whole snapshot.
    pub fn sync(store: &mut AttributeStore) {
        store.snapshot();
    }

    /// Move the baseline for a single key.
    pub fn sync_one(store: &mut AttributeStore, key: &str) {
        store.snapshot_key(key);
    }
}
