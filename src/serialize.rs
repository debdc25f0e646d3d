//! Externally visible projection of a record's attributes.

use crate::attributes::AttributeStore;
use crate::cast::{is_blank, CastRegistry, DateFormat};
use crate::error::ModelError;
use crate::guard::INTERNAL_PREFIX;
use crate::value::{Row, Value};

/// Builds the output map for a record.
///
/// A non-empty `visible` list is an allow-list and wins outright. Otherwise `hidden`
/// keys and internal (`_`-prefixed) keys are left out. Surviving date columns are
/// rendered as text in the record's [`DateFormat`]; cast columns are decoded.
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'a> {
    casts: CastRegistry<'a>,
    hidden: &'a [&'a str],
    visible: &'a [&'a str],
    date_format: DateFormat,
}

impl<'a> Serializer<'a> {
    #[must_use]
    pub fn new(
        casts: CastRegistry<'a>,
        hidden: &'a [&'a str],
        visible: &'a [&'a str],
        date_format: DateFormat,
    ) -> Self {
        Self {
            casts,
            hidden,
            visible,
            date_format,
        }
    }

    fn is_visible(&self, key: &str) -> bool {
        if !self.visible.is_empty() {
            return self.visible.contains(&key);
        }
        !self.hidden.contains(&key) && !key.starts_with(INTERNAL_PREFIX)
    }

    /// # Errors
    ///
    /// Returns `InvalidDate` or `InvalidCast` if a stored value cannot be decoded, or
    /// `InvalidDateFormat` if a date cannot be rendered.
    pub fn to_map(&self, store: &AttributeStore) -> Result<Row, ModelError> {
        let mut map: Row = store
            .attributes()
            .iter()
            .filter(|(key, _)| self.is_visible(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for key in self.casts.dates() {
            if let Some(value) = map.get_mut(key) {
                if !is_blank(value) {
                    let date = self.casts.as_datetime(key, value)?;
                    *value = Value::String(self.date_format.format(date)?);
                }
            }
        }

        for (key, _) in self.casts.casts() {
            if let Some(value) = map.get_mut(*key) {
                *value = self.casts.cast(key, std::mem::take(value))?;
            }
        }

        Ok(map)
    }

    /// Turn an output map into a JSON object, keeping its key order.
    #[must_use]
    pub fn json_object(map: Row) -> serde_json::Value {
        serde_json::Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, value.to_json()))
                .collect(),
        )
    }
}
