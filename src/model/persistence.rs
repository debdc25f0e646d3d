//! Save, update and delete for a single record.
//!
//! A record is either new (`exists == false`) or persisted. `save` inserts a new
//! record and updates a persisted one; both resync the snapshot on success. Nothing
//! is retried: executor errors are returned as they arrive, and a failed statement
//! leaves `exists` and the snapshot as they were before the call.

use crate::dirty::DirtyTracker;
use crate::error::ModelError;
use crate::model::{Model, Record};
use crate::query::Query;
use crate::timestamps::TimestampManager;
use crate::value::{Row, Value};

/// Options for [`Record::save_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Stamp `created_at`/`updated_at` before writing.
    pub timestamps: bool,
    /// Touch owning records. Accepted for compatibility; there are no owners to touch.
    pub touch: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            timestamps: true,
            touch: true,
        }
    }
}

/// Result of [`Record::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// New record: a table-wide update ran, affecting this many rows.
    Bulk(u64),
    /// Persisted record: the outcome of fill + save.
    Saved(bool),
}

#[derive(Debug, Clone, Copy)]
enum Adjust {
    Increment,
    Decrement,
}

impl<M: Model> Record<M> {
    /// Query on this record's connection.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ResolverNotSet` or `ModelError::ConnectionNotFound`.
    pub fn new_query(&self) -> Result<Query<M>, ModelError> {
        Query::resolve(self.connection_name())
    }

    /// Insert or update with default options.
    ///
    /// # Errors
    ///
    /// Propagates connection and executor failures.
    pub fn save(&mut self) -> Result<bool, ModelError> {
        self.save_with(SaveOptions::default())
    }

    /// Insert a new record or write the dirty columns of a persisted one.
    ///
    /// # Errors
    ///
    /// Propagates connection and executor failures.
    pub fn save_with(&mut self, options: SaveOptions) -> Result<bool, ModelError> {
        let query = self.new_query()?;

        let saved = if self.exists {
            self.perform_update(&query, options)?
        } else {
            self.perform_insert(&query, options)?
        };

        if saved {
            self.sync();
        }
        Ok(saved)
    }

    fn update_timestamps(&mut self) -> Result<(), ModelError> {
        let manager = TimestampManager::new(M::uses_timestamps());
        let store = &self.store;
        let stamps = manager.stamp_for_save(!self.exists, M::fresh_timestamp, |column| {
            DirtyTracker::new(store).is_dirty(&[column])
        });
        for (column, value) in stamps {
            self.set(column, value)?;
        }
        Ok(())
    }

    fn perform_update(&mut self, query: &Query<M>, options: SaveOptions) -> Result<bool, ModelError> {
        if self.dirty().is_empty() {
            log::trace!("{}: nothing to save", M::table_name());
            return Ok(true);
        }

        if options.timestamps {
            self.update_timestamps()?;
        }

        let dirty = self.dirty();
        if dirty.is_empty() {
            return Ok(true);
        }

        let key_name = M::primary_key().ok_or(ModelError::MissingPrimaryKey)?;
        let key = self.key_for_save_query(key_name)?;
        log::debug!(
            "updating {} where {} = {}: {} column(s)",
            M::table_name(),
            key_name,
            key,
            dirty.len()
        );
        query.clone().where_eq(key_name, key).update(&dirty)?;
        Ok(true)
    }

    /// The key of the row this record was loaded from, even if it has since changed.
    fn key_for_save_query(&self, key_name: &str) -> Result<Value, ModelError> {
        match self.get_original(key_name) {
            Some(original) => Ok(original.clone()),
            None => self.store.get(key_name).cloned(),
        }
    }

    fn perform_insert(&mut self, query: &Query<M>, options: SaveOptions) -> Result<bool, ModelError> {
        if options.timestamps {
            self.update_timestamps()?;
        }

        let attributes = self.attributes().clone();

        match M::primary_key() {
            Some(key_name) if M::incrementing() => {
                let id = query.insert_get_id(&attributes, key_name)?;
                log::debug!("inserted into {} with {} = {}", M::table_name(), key_name, id);
                self.set(key_name, id)?;
            }
            _ => {
                query.insert(&attributes)?;
                log::debug!("inserted into {}", M::table_name());
            }
        }

        self.exists = true;
        Ok(true)
    }

    /// Bulk update when new, fill + save when persisted.
    ///
    /// # Errors
    ///
    /// Propagates fill, connection and executor failures.
    pub fn update(&mut self, attributes: Row) -> Result<UpdateOutcome, ModelError> {
        if !self.exists {
            let affected = self.new_query()?.update(&attributes)?;
            return Ok(UpdateOutcome::Bulk(affected));
        }

        self.fill(attributes)?;
        Ok(UpdateOutcome::Saved(self.save()?))
    }

    /// Delete the persisted row. Returns `false` for a new record.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::MissingPrimaryKey` without issuing a query if the type
    /// declares no key; otherwise propagates executor failures.
    pub fn delete(&mut self) -> Result<bool, ModelError> {
        let key_name = M::primary_key().ok_or(ModelError::MissingPrimaryKey)?;

        if !self.exists {
            return Ok(false);
        }

        let key = self.store.get(key_name)?.clone();
        log::debug!("deleting from {} where {} = {}", M::table_name(), key_name, key);
        self.new_query()?.where_eq(key_name, key).delete()?;
        self.exists = false;
        Ok(true)
    }

    /// Stamp `updated_at` and save. Returns `false` if the type has no timestamps.
    ///
    /// # Errors
    ///
    /// Propagates save failures.
    pub fn touch(&mut self) -> Result<bool, ModelError> {
        if !M::uses_timestamps() {
            return Ok(false);
        }
        self.update_timestamps()?;
        self.save()
    }

    /// Add `amount` to `column`.
    ///
    /// On a new record this updates the column on every row of the table. On a
    /// persisted one it updates only this record's row, then adjusts the decoded
    /// in-memory value and moves its baseline. Returns the affected row count.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidCast` if the current value is not numeric, or
    /// propagates executor failures.
    pub fn increment(&mut self, column: &str, amount: impl Into<Value>) -> Result<u64, ModelError> {
        self.increment_or_decrement(column, amount.into(), Adjust::Increment)
    }

    /// Subtract `amount` from `column`. See [`Record::increment`].
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidCast` if the current value is not numeric, or
    /// propagates executor failures.
    pub fn decrement(&mut self, column: &str, amount: impl Into<Value>) -> Result<u64, ModelError> {
        self.increment_or_decrement(column, amount.into(), Adjust::Decrement)
    }

    fn increment_or_decrement(
        &mut self,
        column: &str,
        amount: Value,
        method: Adjust,
    ) -> Result<u64, ModelError> {
        let query = self.new_query()?;

        if !self.exists {
            return match method {
                Adjust::Increment => query.increment(column, amount, &Row::new()),
                Adjust::Decrement => query.decrement(column, amount, &Row::new()),
            };
        }

        let key_name = M::primary_key().ok_or(ModelError::MissingPrimaryKey)?;
        let key = self.store.get(key_name)?.clone();

        let current = self.get(column)?;
        let adjusted = adjust_value(column, &current, &amount, method)?;

        let query = query.where_eq(key_name, key);
        let affected = match method {
            Adjust::Increment => query.increment(column, amount, &Row::new())?,
            Adjust::Decrement => query.decrement(column, amount, &Row::new())?,
        };

        self.set(column, adjusted)?;
        self.sync_attribute(column);
        Ok(affected)
    }

    /// Reload this record's row. `None` for a new record or a vanished row.
    ///
    /// # Errors
    ///
    /// Propagates connection and executor failures.
    pub fn fresh(&self) -> Result<Option<Self>, ModelError> {
        if !self.exists {
            return Ok(None);
        }
        let key_name = M::primary_key().ok_or(ModelError::MissingPrimaryKey)?;
        let key = self.store.get(key_name)?.clone();
        self.new_query()?.where_eq(key_name, key).first()
    }
}

fn adjust_value(column: &str, current: &Value, amount: &Value, method: Adjust) -> Result<Value, ModelError> {
    let invalid = |reason: String| ModelError::InvalidCast {
        key: column.to_string(),
        cast: "numeric".to_string(),
        reason,
    };

    if let (Value::Int(a), Value::Int(b)) = (current, amount) {
        let result = match method {
            Adjust::Increment => a.checked_add(*b),
            Adjust::Decrement => a.checked_sub(*b),
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| invalid("integer overflow".to_string()));
    }

    match (current.as_f64(), amount.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::Float(match method {
            Adjust::Increment => a + b,
            Adjust::Decrement => a - b,
        })),
        _ => Err(invalid(format!(
            "cannot adjust {} value by {} value",
            current.kind(),
            amount.kind()
        ))),
    }
}
