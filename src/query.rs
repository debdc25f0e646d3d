//! Table-level query builder for record types.
//!
//! [`Query`] is what the static factories on [`Model`] hand out. It carries the
//! resolved executor, the table, and a `WHERE` condition, and renders each operation
//! with `sea-query` for the executor's [`crate::executor::Backend`].

use crate::error::ModelError;
use crate::executor::{LifeExecutor, Statement};
use crate::model::{Model, Record};
use crate::value::{Row, Value};
use sea_query::{ConditionalStatement, DynIden, Expr, ExprTrait, Order, Query as Sql, Values};
use std::marker::PhantomData;
use std::sync::Arc;

fn iden(name: &str) -> DynIden {
    DynIden::from(name.to_string())
}

fn bind(value: Value) -> Expr {
    Expr::val(sea_query::Value::from(value))
}

/// Query builder for one record type
///
/// # Example
///
/// ```no_run
/// use activerow::Model;
/// use sea_query::Order;
///
/// struct User;
/// impl Model for User {}
///
/// # fn run() -> Result<(), activerow::ModelError> {
/// let admins = User::query()?
///     .where_eq("role", "admin")
///     .order_by("id", Order::Desc)
///     .limit(10)
///     .get()?;
/// # Ok(())
/// # }
/// ```
pub struct Query<M: Model> {
    executor: Arc<dyn LifeExecutor>,
    connection: Option<String>,
    table: String,
    wheres: Vec<Expr>,
    orders: Vec<(String, Order)>,
    limit: Option<u64>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Clone for Query<M> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            connection: self.connection.clone(),
            table: self.table.clone(),
            wheres: self.wheres.clone(),
            orders: self.orders.clone(),
            limit: self.limit,
            _model: PhantomData,
        }
    }
}

impl<M: Model> Query<M> {
    /// Query `M`'s table on `executor`. Records it loads remember `connection`.
    pub fn new(executor: Arc<dyn LifeExecutor>, connection: Option<String>) -> Self {
        Self {
            executor,
            connection,
            table: M::table_name(),
            wheres: Vec::new(),
            orders: Vec::new(),
            limit: None,
            _model: PhantomData,
        }
    }

    /// Resolve `connection` (or the default) through the process-wide resolver.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ResolverNotSet` or `ModelError::ConnectionNotFound`.
    pub fn resolve(connection: Option<&str>) -> Result<Self, ModelError> {
        let executor = crate::connection::resolve_connection(connection)?;
        Ok(Self::new(executor, connection.map(str::to_string)))
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// `column = value`, or `column IS NULL` for [`Value::Null`].
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        let col = Expr::col(iden(column));
        let expr = match value.into() {
            Value::Null => col.is_null(),
            value => col.eq(bind(value)),
        };
        self.wheres.push(expr);
        self
    }

    #[must_use]
    pub fn where_in<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Expr> = values.into_iter().map(|v| bind(v.into())).collect();
        self.wheres.push(Expr::col(iden(column)).is_in(values));
        self
    }

    /// One `where_eq` per entry.
    #[must_use]
    pub fn where_attributes(self, attributes: &Row) -> Self {
        attributes
            .iter()
            .fold(self, |query, (column, value)| query.where_eq(column, value.clone()))
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.orders.push((column.to_string(), order));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn apply_wheres(&self, statement: &mut impl ConditionalStatement) {
        for expr in &self.wheres {
            statement.and_where(expr.clone());
        }
    }

    fn render(&self, statement: Statement<'_>) -> (String, Vec<sea_query::Value>) {
        let (sql, Values(params)) = self.executor.backend().build(statement);
        log::debug!("{} | {} bound value(s)", sql, params.len());
        (sql, params)
    }

    fn select_statement(&self) -> sea_query::SelectStatement {
        let mut select = Sql::select();
        select.column(sea_query::Asterisk).from(iden(&self.table));
        self.apply_wheres(&mut select);
        for (column, order) in &self.orders {
            select.order_by(iden(column), order.clone());
        }
        if let Some(limit) = self.limit {
            select.limit(limit);
        }
        select
    }

    /// Raw rows matched by the query.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Database` if the executor fails.
    pub fn rows(&self) -> Result<Vec<Row>, ModelError> {
        let select = self.select_statement();
        let (sql, params) = self.render(Statement::Select(&select));

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("query_all", sql = %sql).entered();

        Ok(self.executor.query_all(&sql, &params)?)
    }

    /// Matched rows hydrated as persisted records.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Database` if the executor fails.
    pub fn get(&self) -> Result<Vec<Record<M>>, ModelError> {
        let connection = self.connection.as_deref();
        Ok(self
            .rows()?
            .into_iter()
            .map(|row| Record::from_row(row, connection))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `ModelError::Database` if the executor fails.
    pub fn first(&self) -> Result<Option<Record<M>>, ModelError> {
        Ok(self.clone().limit(1).get()?.into_iter().next())
    }

    /// The record whose primary key is `id`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::MissingPrimaryKey` if `M` declares none.
    pub fn find(&self, id: impl Into<Value>) -> Result<Option<Record<M>>, ModelError> {
        let key = M::primary_key().ok_or(ModelError::MissingPrimaryKey)?;
        self.clone().where_eq(key, id).first()
    }

    fn write(&self, statement: Statement<'_>) -> Result<u64, ModelError> {
        let (sql, params) = self.render(statement);

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("execute", sql = %sql).entered();

        Ok(self.executor.execute(&sql, &params)?)
    }

    fn insert_statement(&self, attributes: &Row) -> Result<sea_query::InsertStatement, ModelError> {
        let mut insert = Sql::insert();
        insert.into_table(iden(&self.table));
        if attributes.is_empty() {
            // One all-default row in the backend's own spelling.
            insert.or_default_values();
        } else {
            insert.columns(attributes.keys().map(|k| iden(k)));
            insert
                .values(attributes.values().cloned().map(bind))
                .map_err(crate::executor::LifeError::from)?;
        }
        Ok(insert)
    }

    /// Plain `INSERT` of `attributes`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Database` if the statement cannot be built or fails.
    pub fn insert(&self, attributes: &Row) -> Result<u64, ModelError> {
        let insert = self.insert_statement(attributes)?;
        self.write(Statement::Insert(&insert))
    }

    /// `INSERT ... RETURNING key` and hand back the generated key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Database` if the statement fails or reports no key.
    pub fn insert_get_id(&self, attributes: &Row, key: &str) -> Result<Value, ModelError> {
        let mut insert = self.insert_statement(attributes)?;
        insert.returning_col(iden(key));
        let (sql, params) = self.render(Statement::Insert(&insert));

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("insert_get_id", sql = %sql).entered();

        Ok(self.executor.insert_get_id(&sql, &params, key)?)
    }

    /// `UPDATE` every matched row. An empty `attributes` map writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Database` if the executor fails.
    pub fn update(&self, attributes: &Row) -> Result<u64, ModelError> {
        if attributes.is_empty() {
            return Ok(0);
        }
        let mut update = Sql::update();
        update.table(iden(&self.table));
        self.apply_wheres(&mut update);
        for (column, value) in attributes {
            update.value(iden(column), bind(value.clone()));
        }
        self.write(Statement::Update(&update))
    }

    /// # Errors
    ///
    /// Returns `ModelError::Database` if the executor fails.
    pub fn delete(&self) -> Result<u64, ModelError> {
        let mut delete = Sql::delete();
        delete.from_table(iden(&self.table));
        self.apply_wheres(&mut delete);
        self.write(Statement::Delete(&delete))
    }

    /// `column = column + amount` on every matched row, plus any `extra` columns.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Database` if the executor fails.
    pub fn increment(&self, column: &str, amount: impl Into<Value>, extra: &Row) -> Result<u64, ModelError> {
        self.adjust(column, Expr::col(iden(column)).add(bind(amount.into())), extra)
    }

    /// `column = column - amount` on every matched row, plus any `extra` columns.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Database` if the executor fails.
    pub fn decrement(&self, column: &str, amount: impl Into<Value>, extra: &Row) -> Result<u64, ModelError> {
        self.adjust(column, Expr::col(iden(column)).sub(bind(amount.into())), extra)
    }

    fn adjust(&self, column: &str, expr: Expr, extra: &Row) -> Result<u64, ModelError> {
        let mut update = Sql::update();
        update
            .table(iden(&self.table))
            .value(iden(column), expr);
        self.apply_wheres(&mut update);
        for (name, value) in extra {
            update.value(iden(name), bind(value.clone()));
        }
        self.write(Statement::Update(&update))
    }

    /// Run arbitrary SQL on this query's executor and return the rows.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Database` if the executor fails.
    pub fn raw(&self, sql: &str, values: &[Value]) -> Result<Vec<Row>, ModelError> {
        let params: Vec<sea_query::Value> = values.iter().cloned().map(Into::into).collect();
        log::debug!("{} | {} bound value(s)", sql, params.len());

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("query_all", sql = %sql).entered();

        Ok(self.executor.query_all(sql, &params)?)
    }
}
