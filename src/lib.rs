//! # activerow
//!
//! Active-record attribute and persistence-lifecycle engine.
//!
//! A [`Record`] is a loosely typed attribute bag for a record type declared with
//! [`Model`]. It enforces mass-assignment rules, casts values on the way in and out,
//! tracks changes against a snapshot, stamps timestamps, and decides whether a save
//! is an insert, an update, or nothing at all. Statements are rendered with
//! `sea-query` and run by whatever [`LifeExecutor`] the process-wide connection
//! resolver hands out.

pub mod attributes;
pub mod cast;
pub mod config;
pub mod connection;
pub mod dirty;
pub mod error;
pub mod executor;
pub mod guard;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod query;
pub mod registry;
pub mod serialize;
pub mod timestamps;
pub mod value;

pub use crate::cast::{CastKind, DateFormat};
pub use crate::config::DatabaseConfig;
pub use crate::connection::{
    resolve_connection, set_connection_resolver, unset_connection_resolver, ConnectionResolver,
    DatabaseManager,
};
pub use crate::error::ModelError;
pub use crate::executor::{Backend, LifeError, LifeExecutor};
pub use crate::model::{Model, Record, SaveOptions, UpdateOutcome};
pub use crate::query::Query;
pub use crate::value::{Row, Value};
