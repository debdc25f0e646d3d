//! Recording executor for tests.
//!
//! `MockExecutor` records every statement it receives and answers from queues of
//! canned results. Unqueued calls succeed with neutral answers (one affected row, no
//! rows, generated id `1`).

use crate::executor::{Backend, LifeError, LifeExecutor};
use crate::value::{Row, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// What kind of call the executor saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Execute,
    Query,
    InsertGetId,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub kind: CallKind,
    pub sql: String,
    pub params: Vec<sea_query::Value>,
}

#[derive(Default)]
struct MockState {
    log: Vec<RecordedStatement>,
    affected: VecDeque<Result<u64, LifeError>>,
    rows: VecDeque<Result<Vec<Row>, LifeError>>,
    ids: VecDeque<Result<Value, LifeError>>,
}

#[derive(Default)]
pub struct MockExecutor {
    backend: Backend,
    state: Mutex<MockState>,
}

impl MockExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            state: Mutex::default(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Queue the result of the next `execute`.
    pub fn push_affected(&self, result: Result<u64, LifeError>) -> &Self {
        self.state().affected.push_back(result);
        self
    }

    /// Queue the result of the next `query_all`/`query_one`.
    pub fn push_rows(&self, result: Result<Vec<Row>, LifeError>) -> &Self {
        self.state().rows.push_back(result);
        self
    }

    /// Queue the result of the next `insert_get_id`.
    pub fn push_id(&self, result: Result<Value, LifeError>) -> &Self {
        self.state().ids.push_back(result);
        self
    }

    /// Every call seen so far, oldest first.
    #[must_use]
    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state().log.clone()
    }

    #[must_use]
    pub fn last_statement(&self) -> Option<RecordedStatement> {
        self.state().log.last().cloned()
    }

    /// Calls that write (`execute` and `insert_get_id`).
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state()
            .log
            .iter()
            .filter(|s| s.kind != CallKind::Query)
            .count()
    }

    pub fn clear(&self) {
        self.state().log.clear();
    }

    fn record(&self, kind: CallKind, sql: &str, params: &[sea_query::Value]) {
        self.state().log.push(RecordedStatement {
            kind,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }
}

impl LifeExecutor for MockExecutor {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn execute(&self, query: &str, params: &[sea_query::Value]) -> Result<u64, LifeError> {
        self.record(CallKind::Execute, query, params);
        self.state().affected.pop_front().unwrap_or(Ok(1))
    }

    fn query_all(&self, query: &str, params: &[sea_query::Value]) -> Result<Vec<Row>, LifeError> {
        self.record(CallKind::Query, query, params);
        self.state().rows.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn insert_get_id(
        &self,
        query: &str,
        params: &[sea_query::Value],
        _key: &str,
    ) -> Result<Value, LifeError> {
        self.record(CallKind::InsertGetId, query, params);
        self.state().ids.pop_front().unwrap_or(Ok(Value::Int(1)))
    }
}
