//! Current and original (snapshot) attribute state for one record.

use crate::error::ModelError;
use crate::value::{Row, Value};

/// Pure data container behind a record: the live attribute map and the snapshot
/// taken at the last sync point.
///
/// The store never coerces values. Casting and date normalization happen at the
/// record level before a value reaches [`AttributeStore::set`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    attributes: Row,
    original: Row,
}

impl AttributeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value for `key`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::AttributeNotFound` if the key has never been set.
    pub fn get(&self, key: &str) -> Result<&Value, ModelError> {
        self.attributes
            .get(key)
            .ok_or_else(|| ModelError::AttributeNotFound(key.to_string()))
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Insert or overwrite a value. A new key is appended after the existing ones.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Remove `key` from the live attributes, keeping the remaining order.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::AttributeNotFound` if the key is absent.
    pub fn delete(&mut self, key: &str) -> Result<Value, ModelError> {
        self.attributes
            .shift_remove(key)
            .ok_or_else(|| ModelError::AttributeNotFound(key.to_string()))
    }

    /// Copy the live attributes into the snapshot.
    pub fn snapshot(&mut self) {
        self.original = self.attributes.clone();
    }

    /// Copy one live value into the snapshot. Absent keys leave the snapshot untouched.
    pub fn snapshot_key(&mut self, key: &str) {
        if let Some(value) = self.attributes.get(key) {
            self.original.insert(key.to_string(), value.clone());
        }
    }

    /// Replace every live attribute at once, optionally snapshotting afterwards.
    pub fn raw_replace(&mut self, attributes: Row, sync: bool) {
        self.attributes = attributes;
        if sync {
            self.snapshot();
        }
    }

    #[must_use]
    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    #[must_use]
    pub fn original(&self) -> &Row {
        &self.original
    }

    #[must_use]
    pub fn original_value(&self, key: &str) -> Option<&Value> {
        self.original.get(key)
    }
}
