//! `LifeExecutor` Module
//!
//! Provides the `LifeExecutor` trait that abstracts statement execution.
//!
//! The record layer never talks to a driver directly: [`crate::query::Query`] renders
//! statements with `sea-query` for the executor's [`Backend`] and hands the SQL text
//! plus bound parameters to whichever executor the connection resolver returns.

use crate::value::{Row, Value};
use sea_query::{
    DeleteStatement, InsertStatement, MysqlQueryBuilder, PostgresQueryBuilder, SelectStatement,
    SqliteQueryBuilder, UpdateStatement, Values,
};
use serde::Deserialize;
use std::fmt;

/// `LifeExecutor` error type
#[derive(Debug, Clone, PartialEq)]
pub enum LifeError {
    /// Query execution error (connectivity, constraint violation, ...)
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for LifeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifeError::QueryError(s) => {
                write!(f, "Query error: {s}")
            }
            LifeError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            LifeError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for LifeError {}

impl From<sea_query::error::Error> for LifeError {
    fn from(err: sea_query::error::Error) -> Self {
        LifeError::QueryError(err.to_string())
    }
}

/// SQL dialect an executor speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Postgres,
    MySql,
    Sqlite,
}

/// Statements the query layer knows how to render for any [`Backend`].
pub(crate) enum Statement<'a> {
    Select(&'a SelectStatement),
    Insert(&'a InsertStatement),
    Update(&'a UpdateStatement),
    Delete(&'a DeleteStatement),
}

impl Backend {
    pub(crate) fn build(self, statement: Statement<'_>) -> (String, Values) {
        macro_rules! build_with {
            ($builder:expr) => {
                match statement {
                    Statement::Select(s) => s.build($builder),
                    Statement::Insert(s) => s.build($builder),
                    Statement::Update(s) => s.build($builder),
                    Statement::Delete(s) => s.build($builder),
                }
            };
        }

        match self {
            Backend::Postgres => build_with!(PostgresQueryBuilder),
            Backend::MySql => build_with!(MysqlQueryBuilder),
            Backend::Sqlite => build_with!(SqliteQueryBuilder),
        }
    }
}

/// Trait for executing database operations
///
/// Implementations own the actual connection (direct client, pooled connection,
/// transaction, test double). They are looked up by name through the process-wide
/// [`crate::connection::ConnectionResolver`] every time a record needs to run a query,
/// so a record never owns its connection.
///
/// Every call blocks until the statement completes; there is no retry at this layer.
pub trait LifeExecutor: Send + Sync {
    /// Dialect used to render statements for this executor.
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    /// Execute a SQL statement and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the statement execution fails.
    fn execute(&self, query: &str, params: &[sea_query::Value]) -> Result<u64, LifeError>;

    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query execution fails.
    fn query_all(&self, query: &str, params: &[sea_query::Value]) -> Result<Vec<Row>, LifeError>;

    /// Execute a query and return a single row
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query fails or returns no rows.
    fn query_one(&self, query: &str, params: &[sea_query::Value]) -> Result<Row, LifeError> {
        self.query_all(query, params)?
            .into_iter()
            .next()
            .ok_or_else(|| LifeError::QueryError("no rows returned".to_string()))
    }

    /// Run an insert that reports the generated primary key.
    ///
    /// The statement is rendered with `RETURNING <key>`; the default implementation reads
    /// `key` out of the single returned row. Drivers whose dialect has no `RETURNING`
    /// (MySQL) override this with their last-insert-id mechanism.
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the insert fails or the key column is missing from the result.
    fn insert_get_id(
        &self,
        query: &str,
        params: &[sea_query::Value],
        key: &str,
    ) -> Result<Value, LifeError> {
        let row = self.query_one(query, params)?;
        row.get(key)
            .cloned()
            .ok_or_else(|| LifeError::ParseError(format!("generated key `{key}` missing from result")))
    }
}
