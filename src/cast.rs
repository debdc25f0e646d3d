//! Declared attribute casts and date-column handling.
//!
//! Casts are applied in two directions:
//!
//! - **write-in** ([`CastRegistry::prepare_for_storage`]): date columns are normalized to
//!   [`Value::DateTime`] and structured casts are encoded to JSON text, so the attribute
//!   store always holds the storage-ready form.
//! - **read-out** ([`CastRegistry::cast`], [`CastRegistry::as_datetime`]): the stored form
//!   is decoded on every access. Nothing is memoized.

use crate::error::ModelError;
use crate::timestamps::{CREATED_AT, UPDATED_AT};
use crate::value::{Value, ISO_FORMAT};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt::{self, Write};
use std::str::FromStr;

/// A declared coercion for one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Integer,
    Float,
    String,
    Boolean,
    List,
    Mapping,
    Json,
    Object,
    /// Unrecognized declaration. Values pass through unchanged.
    Other(&'static str),
}

impl CastKind {
    /// Structured casts are stored as JSON text and decoded on read.
    #[must_use]
    pub fn is_structured(self) -> bool {
        matches!(
            self,
            CastKind::List | CastKind::Mapping | CastKind::Json | CastKind::Object
        )
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CastKind::Integer => "integer",
            CastKind::Float => "float",
            CastKind::String => "string",
            CastKind::Boolean => "boolean",
            CastKind::List => "list",
            CastKind::Mapping => "dict",
            CastKind::Json => "json",
            CastKind::Object => "object",
            CastKind::Other(name) => name,
        }
    }
}

impl fmt::Display for CastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses the conventional cast names, case-insensitively.
///
/// Unknown names are not an error: they become [`CastKind::Other`] with the name
/// `"unknown"` and act as a passthrough.
impl FromStr for CastKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => CastKind::Integer,
            "real" | "float" | "double" => CastKind::Float,
            "str" | "string" => CastKind::String,
            "bool" | "boolean" => CastKind::Boolean,
            "list" | "array" => CastKind::List,
            "dict" | "map" | "mapping" => CastKind::Mapping,
            "json" => CastKind::Json,
            "object" => CastKind::Object,
            _ => CastKind::Other("unknown"),
        })
    }
}

/// How date columns are rendered on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// ISO-8601 (`2024-01-02T03:04:05`)
    #[default]
    Iso,
    /// A `chrono` strftime pattern
    Custom(&'static str),
}

impl DateFormat {
    #[must_use]
    pub fn pattern(self) -> &'static str {
        match self {
            DateFormat::Iso => ISO_FORMAT,
            DateFormat::Custom(pattern) => pattern,
        }
    }

    /// Render `value` with this format.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidDateFormat` if the pattern has an unknown specifier
    /// or one a naive date-time cannot fill (such as `%z`).
    pub fn format(self, value: NaiveDateTime) -> Result<String, ModelError> {
        let pattern = self.pattern();
        let mut out = String::new();
        write!(out, "{}", value.format(pattern))
            .map_err(|_| ModelError::InvalidDateFormat(pattern.to_string()))?;
        Ok(out)
    }
}

/// Declared casts and date columns for one record type (plus per-instance date
/// additions).
#[derive(Debug, Clone, Copy)]
pub struct CastRegistry<'a> {
    casts: &'a [(&'static str, CastKind)],
    dates: &'a [String],
}

impl<'a> CastRegistry<'a> {
    #[must_use]
    pub fn new(casts: &'a [(&'static str, CastKind)], dates: &'a [String]) -> Self {
        Self { casts, dates }
    }

    #[must_use]
    pub fn cast_kind(&self, key: &str) -> Option<CastKind> {
        self.casts
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, kind)| *kind)
    }

    #[must_use]
    pub fn has_cast(&self, key: &str) -> bool {
        self.cast_kind(key).is_some()
    }

    #[must_use]
    pub fn is_structured_cast(&self, key: &str) -> bool {
        self.cast_kind(key).is_some_and(CastKind::is_structured)
    }

    /// The two timestamp columns are always date columns.
    #[must_use]
    pub fn is_date(&self, key: &str) -> bool {
        key == CREATED_AT || key == UPDATED_AT || self.dates.iter().any(|d| d == key)
    }

    /// Every date column: the extra ones first, then the timestamp pair.
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.dates
            .iter()
            .map(String::as_str)
            .chain([CREATED_AT, UPDATED_AT])
    }

    pub fn casts(&self) -> impl Iterator<Item = &(&'static str, CastKind)> {
        self.casts.iter()
    }

    /// Write-in direction: the form the attribute store should hold for `value`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidDate` if a date column receives an unparseable value.
    pub fn prepare_for_storage(&self, key: &str, value: Value) -> Result<Value, ModelError> {
        let mut value = value;

        if self.is_date(key) && !is_blank(&value) {
            value = Value::DateTime(to_datetime(key, &value)?);
        }

        if self.is_structured_cast(key) {
            value = Value::String(value.to_json().to_string());
        }

        Ok(value)
    }

    /// Read-out direction: apply the declared cast to a stored value.
    ///
    /// Keys without a cast, and casts of kind [`CastKind::Other`], return the value
    /// unchanged. `Null` is never coerced.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidCast` if the stored value cannot be coerced.
    pub fn cast(&self, key: &str, value: Value) -> Result<Value, ModelError> {
        match self.cast_kind(key) {
            Some(kind) => cast_value(key, kind, value),
            None => Ok(value),
        }
    }

    /// Read-out direction for date columns.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidDate` if the stored value is not a date-time.
    pub fn as_datetime(&self, key: &str, value: &Value) -> Result<NaiveDateTime, ModelError> {
        to_datetime(key, value)
    }
}

/// `Null` or empty text. Date columns hold these as is.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn cast_value(key: &str, kind: CastKind, value: Value) -> Result<Value, ModelError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let invalid = |reason: String| ModelError::InvalidCast {
        key: key.to_string(),
        cast: kind.to_string(),
        reason,
    };

    match kind {
        CastKind::Integer => match value {
            Value::Int(i) => Ok(Value::Int(i)),
            Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| invalid(e.to_string())),
            other => Err(invalid(format!("unsupported {} value", other.kind()))),
        },
        CastKind::Float => match value {
            Value::Int(i) => Ok(Value::Float(i as f64)),
            Value::Float(f) => Ok(Value::Float(f)),
            Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| invalid(e.to_string())),
            other => Err(invalid(format!("unsupported {} value", other.kind()))),
        },
        CastKind::String => Ok(match value {
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }),
        CastKind::Boolean => Ok(Value::Bool(truthy(&value))),
        CastKind::List | CastKind::Mapping | CastKind::Json | CastKind::Object => match value {
            Value::String(text) => serde_json::from_str::<serde_json::Value>(&text)
                .map(Value::from)
                .map_err(|e| invalid(e.to_string())),
            other => Ok(other),
        },
        CastKind::Other(_) => Ok(value),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        Value::DateTime(_) => true,
        Value::Json(j) => match j {
            serde_json::Value::Array(a) => !a.is_empty(),
            serde_json::Value::Object(o) => !o.is_empty(),
            _ => true,
        },
    }
}

/// Normalize a date-ish value to a UTC date-time without offset.
///
/// Accepts date-times, RFC 3339 / ISO-8601 text (with or without offset, `T` or space
/// separated, optional fraction), bare dates, and Unix seconds as integer or float.
fn to_datetime(key: &str, value: &Value) -> Result<NaiveDateTime, ModelError> {
    let invalid = |reason: String| ModelError::InvalidDate {
        key: key.to_string(),
        reason,
    };

    match value {
        Value::DateTime(dt) => Ok(*dt),
        Value::Int(secs) => DateTime::from_timestamp(*secs, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| invalid(format!("timestamp {secs} out of range"))),
        Value::Float(secs) if secs.is_finite() => {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9).round() as u32;
            DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| invalid(format!("timestamp {secs} out of range")))
        }
        Value::String(text) => parse_datetime(text.trim()).ok_or_else(|| invalid(format!("unrecognized date `{text}`"))),
        other => Err(invalid(format!("unsupported {} value", other.kind()))),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(dt);
        }
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, pattern) {
            return Some(dt.naive_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
}
