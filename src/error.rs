//! Error types for record operations.
//!
//! `ModelError` covers everything the attribute and persistence layer can report.
//! Failures from the executor arrive wrapped, unmodified, in [`ModelError::Database`].

use crate::executor::LifeError;

/// Error type for record operations
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Protected fill hit a key that is not fillable while the record is totally guarded
    MassAssignment(String),
    /// The record type declares no primary key
    MissingPrimaryKey,
    /// Attribute was read or removed but is not present
    AttributeNotFound(String),
    /// A declared cast could not coerce the stored value
    InvalidCast {
        key: String,
        cast: String,
        reason: String,
    },
    /// A date column received a value that is not a recognizable date-time
    InvalidDate { key: String, reason: String },
    /// The output date format cannot render a date-time
    InvalidDateFormat(String),
    /// No connection resolver installed
    ResolverNotSet,
    /// The resolver does not know the requested connection
    ConnectionNotFound(String),
    /// Executor failure, passed through unchanged
    Database(LifeError),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::MassAssignment(key) => {
                write!(f, "Mass assignment rejected for attribute: {}", key)
            }
            ModelError::MissingPrimaryKey => {
                write!(f, "No primary key defined on the model")
            }
            ModelError::AttributeNotFound(key) => write!(f, "Attribute not found: {}", key),
            ModelError::InvalidCast { key, cast, reason } => write!(
                f,
                "Cannot cast attribute {} to {}: {}",
                key, cast, reason
            ),
            ModelError::InvalidDate { key, reason } => {
                write!(f, "Invalid date for attribute {}: {}", key, reason)
            }
            ModelError::InvalidDateFormat(pattern) => {
                write!(f, "Invalid date format: {}", pattern)
            }
            ModelError::ResolverNotSet => write!(f, "No connection resolver has been set"),
            ModelError::ConnectionNotFound(name) => write!(f, "Connection not found: {}", name),
            ModelError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LifeError> for ModelError {
    fn from(err: LifeError) -> Self {
        ModelError::Database(err)
    }
}
