//! A single active record: attribute access, mass assignment and dirty state.

use crate::attributes::AttributeStore;
use crate::cast::{is_blank, CastRegistry};
use crate::dirty::DirtyTracker;
use crate::error::ModelError;
use crate::guard::{GuardPolicy, Unguarded};
use crate::model::Model;
use crate::serialize::Serializer;
use crate::value::{Row, Value};
use std::fmt;
use std::marker::PhantomData;

/// One instance of record type `M`.
///
/// Attributes are dynamic: read them with [`Record::get`] and write them with
/// [`Record::set`]. Writes pass through the type's date and structured casts so the
/// store always holds the storage form; reads decode it again every time.
pub struct Record<M: Model> {
    pub(crate) exists: bool,
    pub(crate) store: AttributeStore,
    dates: Vec<String>,
    hidden: Option<Vec<String>>,
    visible: Option<Vec<String>>,
    connection: Option<String>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Record<M> {
    /// An empty, not yet persisted record.
    #[must_use]
    pub fn new() -> Self {
        Self {
            exists: false,
            store: AttributeStore::new(),
            dates: M::dates().iter().map(|d| (*d).to_string()).collect(),
            hidden: None,
            visible: None,
            connection: M::connection_name().map(str::to_string),
            _model: PhantomData,
        }
    }

    /// A new record protected-filled from `attributes`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::MassAssignment` if `M` is totally guarded, or a cast error.
    pub fn from_attributes(attributes: Row) -> Result<Self, ModelError> {
        let mut record = Self::new();
        record.fill(attributes)?;
        Ok(record)
    }

    /// A persisted record holding `row` verbatim, already synced.
    #[must_use]
    pub fn from_row(row: Row, connection: Option<&str>) -> Self {
        let mut record = Self::new();
        record.exists = true;
        record.store.raw_replace(row, true);
        if let Some(name) = connection {
            record.connection = Some(name.to_string());
        }
        record
    }

    pub(crate) fn casts(&self) -> CastRegistry<'_> {
        CastRegistry::new(M::casts(), &self.dates)
    }

    /// Mass-assign `attributes` under the type's guard policy.
    ///
    /// Table-qualified keys (`"users.name"`) are reduced to the column name. Keys that
    /// are not fillable are skipped, unless the type is totally guarded, in which case
    /// the first one fails the whole call.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::MassAssignment` or a cast error from [`Record::set`].
    pub fn fill(&mut self, attributes: Row) -> Result<&mut Self, ModelError> {
        let policy = GuardPolicy::of::<M>();
        let totally_guarded = policy.totally_guarded();
        let table = M::table_name();

        let attributes: Row = attributes
            .into_iter()
            .map(|(key, value)| (strip_table(&table, &key).to_string(), value))
            .collect();

        for (key, value) in policy.filter_fillable(attributes) {
            let key = key.as_str();
            if policy.is_fillable(key) {
                log::trace!("fill {}.{}", table, key);
                self.set(key, value)?;
            } else if totally_guarded {
                return Err(ModelError::MassAssignment(key.to_string()));
            } else {
                log::warn!("dropping guarded attribute `{}` on {}", key, table);
            }
        }

        Ok(self)
    }

    /// [`Record::fill`] with mass-assignment protection lifted for the call.
    ///
    /// # Errors
    ///
    /// Returns a cast error from [`Record::set`].
    pub fn force_fill(&mut self, attributes: Row) -> Result<&mut Self, ModelError> {
        let _unguarded = Unguarded::<M>::new();
        self.fill(attributes)
    }

    /// Decoded value of `key`.
    ///
    /// Cast columns are coerced to their declared kind; date columns come back as
    /// [`Value::DateTime`]. `Null` and empty text in a date column are returned as is.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::AttributeNotFound`, `InvalidCast` or `InvalidDate`.
    pub fn get(&self, key: &str) -> Result<Value, ModelError> {
        let value = self.store.get(key)?.clone();
        let casts = self.casts();

        if casts.has_cast(key) {
            return casts.cast(key, value);
        }
        if casts.is_date(key) && !is_blank(&value) {
            return casts.as_datetime(key, &value).map(Value::DateTime);
        }
        Ok(value)
    }

    /// Store `value` under `key` in its storage form.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidDate` if a date column receives an unparseable value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self, ModelError> {
        let value = self.casts().prepare_for_storage(key, value.into())?;
        self.store.set(key, value);
        Ok(self)
    }

    /// Remove `key` from the attributes and return its stored value.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::AttributeNotFound` if the key is absent.
    pub fn unset(&mut self, key: &str) -> Result<Value, ModelError> {
        self.store.delete(key)
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    /// Raw stored attributes.
    #[must_use]
    pub fn attributes(&self) -> &Row {
        self.store.attributes()
    }

    /// Snapshot taken at the last sync point.
    #[must_use]
    pub fn original(&self) -> &Row {
        self.store.original()
    }

    #[must_use]
    pub fn get_original(&self, key: &str) -> Option<&Value> {
        self.store.original_value(key)
    }

    /// Replace every attribute without guard or cast checks.
    pub fn set_raw_attributes(&mut self, attributes: Row, sync: bool) -> &mut Self {
        self.store.raw_replace(attributes, sync);
        self
    }

    #[must_use]
    pub fn dirty(&self) -> Row {
        DirtyTracker::new(&self.store).dirty()
    }

    /// With no keys, whether anything changed; otherwise whether any of `keys` did.
    #[must_use]
    pub fn is_dirty(&self, keys: &[&str]) -> bool {
        DirtyTracker::new(&self.store).is_dirty(keys)
    }

    pub fn sync(&mut self) -> &mut Self {
        DirtyTracker::sync(&mut self.store);
        self
    }

    pub fn sync_attribute(&mut self, key: &str) -> &mut Self {
        DirtyTracker::sync_one(&mut self.store, key);
        self
    }

    /// Whether the record has a persisted row.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Current primary key value, if the type has a key and it is set.
    #[must_use]
    pub fn key(&self) -> Option<&Value> {
        M::primary_key().and_then(|name| self.store.attributes().get(name))
    }

    #[must_use]
    pub fn key_name(&self) -> Option<&'static str> {
        M::primary_key()
    }

    /// `table.key`, for use in joined queries.
    #[must_use]
    pub fn qualified_key_name(&self) -> Option<String> {
        M::primary_key().map(|key| format!("{}.{}", M::table_name(), key))
    }

    #[must_use]
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    pub fn set_connection(&mut self, name: Option<&str>) -> &mut Self {
        self.connection = name.map(str::to_string);
        self
    }

    /// Keys excluded from [`Record::to_map`] unless `visible` is in use.
    #[must_use]
    pub fn hidden(&self) -> Vec<&str> {
        match &self.hidden {
            Some(hidden) => hidden.iter().map(String::as_str).collect(),
            None => M::hidden().to_vec(),
        }
    }

    pub fn set_hidden(&mut self, hidden: &[&str]) -> &mut Self {
        self.hidden = Some(hidden.iter().map(|k| (*k).to_string()).collect());
        self
    }

    pub fn add_hidden(&mut self, keys: &[&str]) -> &mut Self {
        let mut hidden: Vec<String> = self.hidden().into_iter().map(str::to_string).collect();
        hidden.extend(keys.iter().map(|k| (*k).to_string()));
        self.hidden = Some(hidden);
        self
    }

    /// When non-empty, the only keys [`Record::to_map`] emits.
    #[must_use]
    pub fn visible(&self) -> Vec<&str> {
        match &self.visible {
            Some(visible) => visible.iter().map(String::as_str).collect(),
            None => M::visible().to_vec(),
        }
    }

    pub fn set_visible(&mut self, visible: &[&str]) -> &mut Self {
        self.visible = Some(visible.iter().map(|k| (*k).to_string()).collect());
        self
    }

    pub fn add_visible(&mut self, keys: &[&str]) -> &mut Self {
        let mut visible: Vec<String> = self.visible().into_iter().map(str::to_string).collect();
        visible.extend(keys.iter().map(|k| (*k).to_string()));
        self.visible = Some(visible);
        self
    }

    /// Treat more columns as dates on this instance.
    pub fn add_dates(&mut self, keys: &[&str]) -> &mut Self {
        for key in keys {
            if !self.dates.iter().any(|d| d == key) {
                self.dates.push((*key).to_string());
            }
        }
        self
    }

    /// A new, unsaved copy without the key and timestamp columns (or without `except`).
    #[must_use]
    pub fn replicate(&self, except: Option<&[&str]>) -> Self {
        let default_except: Vec<&str> = M::primary_key()
            .into_iter()
            .chain([crate::timestamps::CREATED_AT, crate::timestamps::UPDATED_AT])
            .collect();
        let except = except.unwrap_or(&default_except);

        let mut copy = Self::new();
        copy.dates = self.dates.clone();
        copy.hidden = self.hidden.clone();
        copy.visible = self.visible.clone();
        copy.connection = self.connection.clone();
        for (key, value) in self.store.attributes() {
            if !except.contains(&key.as_str()) {
                copy.store.set(key.clone(), value.clone());
            }
        }
        copy
    }

    /// Externally visible attributes, decoded and filtered.
    ///
    /// # Errors
    ///
    /// Returns a cast error if a stored value cannot be decoded.
    pub fn to_map(&self) -> Result<Row, ModelError> {
        let hidden = self.hidden();
        let visible = self.visible();
        Serializer::new(self.casts(), &hidden, &visible, M::date_format()).to_map(&self.store)
    }

    /// # Errors
    ///
    /// Returns a cast error if a stored value cannot be decoded.
    pub fn to_json(&self) -> Result<serde_json::Value, ModelError> {
        Ok(Serializer::json_object(self.to_map()?))
    }

    /// # Errors
    ///
    /// Returns a cast error if a stored value cannot be decoded.
    pub fn to_json_string(&self) -> Result<String, ModelError> {
        Ok(self.to_json()?.to_string())
    }
}

fn strip_table<'k>(table: &str, key: &'k str) -> &'k str {
    key.strip_prefix(table)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(key)
}

impl<M: Model> Default for Record<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Record<M> {
    fn clone(&self) -> Self {
        Self {
            exists: self.exists,
            store: self.store.clone(),
            dates: self.dates.clone(),
            hidden: self.hidden.clone(),
            visible: self.visible.clone(),
            connection: self.connection.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &M::table_name())
            .field("exists", &self.exists)
            .field("attributes", self.store.attributes())
            .finish()
    }
}

impl<M: Model> serde::Serialize for Record<M> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}
