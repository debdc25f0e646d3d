//! Record types and their per-type metadata.
//!
//! A record type is any `'static` type implementing [`Model`]. Every method has a
//! default, so `impl Model for Post {}` declares a type backed by the `posts` table
//! with an `id` primary key, timestamps, and the totally guarded default policy.
//! Instances are [`Record<M>`] values: a dynamic attribute bag plus bookkeeping.

mod persistence;
mod record;

pub use persistence::{SaveOptions, UpdateOutcome};
pub use record::Record;

use crate::cast::{CastKind, DateFormat};
use crate::error::ModelError;
use crate::guard::Unguarded;
use crate::query::Query;
use crate::value::{Row, Value};
use chrono::{NaiveDateTime, Utc};
use convert_case::{Case, Casing};

/// Per-type declared metadata and the static entry points for a record type
///
/// # Example
///
/// ```
/// use activerow::{CastKind, Model};
///
/// struct BlogPost;
///
/// impl Model for BlogPost {
///     fn fillable() -> &'static [&'static str] {
///         &["title", "body", "tags"]
///     }
///
///     fn casts() -> &'static [(&'static str, CastKind)] {
///         &[("tags", CastKind::List)]
///     }
/// }
///
/// assert_eq!(BlogPost::table_name(), "blog_posts");
/// assert_eq!(BlogPost::primary_key(), Some("id"));
/// ```
pub trait Model: Sized + 'static {
    /// Table backing this type. Defaults to the snake-cased, pluralised type name.
    fn table_name() -> String {
        default_table_name(std::any::type_name::<Self>())
    }

    /// Connection used when a record does not pick one. `None` is the resolver default.
    fn connection_name() -> Option<&'static str> {
        None
    }

    /// `None` means the type declares no primary key.
    fn primary_key() -> Option<&'static str> {
        Some("id")
    }

    /// Whether the primary key is generated by the database on insert.
    fn incrementing() -> bool {
        true
    }

    fn fillable() -> &'static [&'static str] {
        &[]
    }

    fn guarded() -> &'static [&'static str] {
        &["*"]
    }

    fn hidden() -> &'static [&'static str] {
        &[]
    }

    fn visible() -> &'static [&'static str] {
        &[]
    }

    fn casts() -> &'static [(&'static str, CastKind)] {
        &[]
    }

    /// Date columns besides `created_at` and `updated_at`.
    fn dates() -> &'static [&'static str] {
        &[]
    }

    fn uses_timestamps() -> bool {
        true
    }

    fn date_format() -> DateFormat {
        DateFormat::Iso
    }

    /// Value written to timestamp columns.
    fn fresh_timestamp() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    /// One-time static setup, run by [`crate::registry::boot`].
    fn boot() {}

    /// Begin querying on the type's connection.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ResolverNotSet` or `ModelError::ConnectionNotFound`.
    fn query() -> Result<Query<Self>, ModelError> {
        Query::resolve(Self::connection_name())
    }

    /// Begin querying on a named connection.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ResolverNotSet` or `ModelError::ConnectionNotFound`.
    fn on(connection: &str) -> Result<Query<Self>, ModelError> {
        Query::resolve(Some(connection))
    }

    /// # Errors
    ///
    /// Propagates connection and executor failures.
    fn all() -> Result<Vec<Record<Self>>, ModelError> {
        Self::query()?.get()
    }

    /// # Errors
    ///
    /// Propagates connection and executor failures; `MissingPrimaryKey` without a key.
    fn find(id: impl Into<Value>) -> Result<Option<Record<Self>>, ModelError> {
        Self::query()?.find(id)
    }

    /// Records whose key is one of `ids`. No query is issued for an empty list.
    ///
    /// # Errors
    ///
    /// Propagates connection and executor failures; `MissingPrimaryKey` without a key.
    fn find_many<V: Into<Value>>(
        ids: impl IntoIterator<Item = V>,
    ) -> Result<Vec<Record<Self>>, ModelError> {
        let key = Self::primary_key().ok_or(ModelError::MissingPrimaryKey)?;
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Self::query()?.where_in(key, ids).get()
    }

    /// The record with key `id`, or an empty new one.
    ///
    /// # Errors
    ///
    /// Propagates connection and executor failures.
    fn find_or_new(id: impl Into<Value>) -> Result<Record<Self>, ModelError> {
        Ok(Self::find(id)?.unwrap_or_default())
    }

    /// Protected-fill a new record from `attributes` and save it.
    ///
    /// # Errors
    ///
    /// `MassAssignment` for a totally guarded type, otherwise save failures.
    fn create(attributes: Row) -> Result<Record<Self>, ModelError> {
        let mut record = Record::from_attributes(attributes)?;
        record.save()?;
        Ok(record)
    }

    /// [`Model::create`] with mass-assignment protection lifted for the call.
    ///
    /// # Errors
    ///
    /// Propagates save failures.
    fn force_create(attributes: Row) -> Result<Record<Self>, ModelError> {
        let _unguarded = Unguarded::<Self>::new();
        Self::create(attributes)
    }

    /// First record matching every attribute, or a new unsaved one filled with them.
    ///
    /// # Errors
    ///
    /// Propagates connection, executor and fill failures.
    fn first_or_new(attributes: Row) -> Result<Record<Self>, ModelError> {
        match Self::query()?.where_attributes(&attributes).first()? {
            Some(record) => Ok(record),
            None => Record::from_attributes(attributes),
        }
    }

    /// First record matching every attribute, or a newly created one.
    ///
    /// # Errors
    ///
    /// Propagates connection, executor, fill and save failures.
    fn first_or_create(attributes: Row) -> Result<Record<Self>, ModelError> {
        match Self::query()?.where_attributes(&attributes).first()? {
            Some(record) => Ok(record),
            None => Self::create(attributes),
        }
    }

    /// Find by `attributes` (or start a new record), fill `values`, and save.
    ///
    /// # Errors
    ///
    /// Propagates connection, executor, fill and save failures.
    fn update_or_create(attributes: Row, values: Row) -> Result<Record<Self>, ModelError> {
        let mut record = Self::first_or_new(attributes)?;
        record.fill(values)?;
        record.save()?;
        Ok(record)
    }

    /// Load and delete every record whose key is in `ids`; returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Stops at the first failing delete.
    fn destroy<V: Into<Value>>(ids: impl IntoIterator<Item = V>) -> Result<u64, ModelError> {
        let mut count = 0;
        for mut record in Self::find_many(ids)? {
            if record.delete()? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Wrap already-fetched rows as persisted records.
    fn hydrate(rows: Vec<Row>, connection: Option<&str>) -> Vec<Record<Self>> {
        rows.into_iter()
            .map(|row| Record::from_row(row, connection))
            .collect()
    }

    /// Run raw SQL on `connection` (or the type's) and hydrate the result.
    ///
    /// # Errors
    ///
    /// Propagates connection and executor failures.
    fn hydrate_raw(
        sql: &str,
        values: &[Value],
        connection: Option<&str>,
    ) -> Result<Vec<Record<Self>>, ModelError> {
        let query = Query::<Self>::resolve(connection.or(Self::connection_name()))?;
        let rows = query.raw(sql, values)?;
        Ok(Self::hydrate(rows, connection))
    }
}

fn default_table_name(type_name: &str) -> String {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    let base = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);
    pluralize(&base.to_case(Case::Snake))
}

fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }
    format!("{word}s")
}
