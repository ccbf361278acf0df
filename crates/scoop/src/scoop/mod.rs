//! The statement builder/executor.
//!
//! A [`Scoop`] accumulates table, condition, projection, ordering and paging state through
//! `&mut self` builder calls, then renders and runs one statement per terminal call
//! (`find`, `first`, `create`, `create_in_batches`, `updates`, `delete`, `count`, `exist`,
//! `chunk`).
//!
//! State persists across terminal calls: a second `find` on the same Scoop reuses the
//! conditions, limit and offset of the first. Use [`Scoop::reset`] or a fresh Scoop when
//! that is not wanted.
//!
//! # Example
//! ```ignore
//! use scoop::{Model, Scoop, SqliteConnection};
//!
//! #[derive(Debug, Default, Model)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     age: i32,
//!     created_at: i64,
//!     deleted_at: i64,
//! }
//!
//! let conn = SqliteConnection::open_in_memory()?;
//! let mut user = User { name: "ann".into(), age: 30, ..Default::default() };
//! Scoop::new(&conn).create(&mut user).await?;
//!
//! let mut adults = Vec::new();
//! Scoop::new(&conn)
//!     .gte("age", 18)
//!     .order("name DESC")
//!     .limit(10)
//!     .find(&mut adults)
//!     .await?;
//! ```

mod insert;
mod select;
mod update;


use crate::cache;
use crate::client::{Connection, RawRows};
use crate::condition::{Clause, Cond};
use crate::config::ScoopConfig;
use crate::dialect::{Dialect, is_valid_table_name};
use crate::error::{OrmError, OrmResult};
use crate::model::{FieldRef, Model, ModelMeta};
use crate::transaction::TxState;
use crate::value::{Encode, Expr, Value};
use std::sync::Arc;
use std::time::Instant;

/// Rows returned by `find`/`first`.
pub type FindResult = OrmResult<u64>;
/// Rows inserted by `create`/`create_in_batches`.
pub type CreateResult = OrmResult<u64>;
/// Rows changed by `updates`/`updates_model`.
pub type UpdateResult = OrmResult<u64>;
/// Rows removed (or soft-deleted) by `delete`.
pub type DeleteResult = OrmResult<u64>;
/// Outcome of `chunk`.
pub type ChunkResult = OrmResult<()>;

/// Builder/executor bound to one table and one connection.
///
/// Not meant for concurrent reuse: every builder call mutates the instance.
pub struct Scoop<'c, C: Connection> {
    pub(crate) conn: &'c C,
    pub(crate) config: ScoopConfig,
    pub(crate) dialect: Dialect,
    pub(crate) table: String,
    pub(crate) cond: Cond,
    pub(crate) selects: Vec<String>,
    pub(crate) groups: Vec<String>,
    pub(crate) orders: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) unscoped: bool,
    pub(crate) ignore: bool,
    pub(crate) meta: ModelMeta,
    /// Transaction nesting level, reported to the logger.
    pub(crate) depth: usize,
    pub(crate) tx: TxState,
}

impl<C: Connection> std::fmt::Debug for Scoop<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scoop")
            .field("dialect", &self.dialect)
            .field("table", &self.table)
            .field("cond", &self.cond)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("unscoped", &self.unscoped)
            .field("ignore", &self.ignore)
            .field("depth", &self.depth)
            .field("tx", &self.tx)
            .finish_non_exhaustive()
    }
}

impl<'c, C: Connection> Scoop<'c, C> {
    /// A Scoop with the default configuration.
    pub fn new(conn: &'c C) -> Self {
        Self::with_config(conn, ScoopConfig::default())
    }

    pub fn with_config(conn: &'c C, config: ScoopConfig) -> Self {
        let dialect = config.dialect.unwrap_or_else(|| conn.dialect());
        Self {
            conn,
            config,
            dialect,
            table: String::new(),
            cond: Cond::new(dialect),
            selects: Vec::new(),
            groups: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            unscoped: false,
            ignore: false,
            meta: ModelMeta::default(),
            depth: 0,
            tx: TxState::None,
        }
    }

    /// A Scoop on the same connection with the same table and model, but no conditions.
    pub(crate) fn fork(&self) -> Self {
        Self {
            conn: self.conn,
            config: self.config.clone(),
            dialect: self.dialect,
            table: self.table.clone(),
            cond: Cond::new(self.dialect),
            selects: Vec::new(),
            groups: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            unscoped: false,
            ignore: false,
            meta: self.meta.clone(),
            depth: self.depth,
            tx: TxState::None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// A fresh condition in this Scoop's dialect, for `or` groups.
    pub fn new_cond(&self) -> Cond {
        Cond::new(self.dialect)
    }

    /// Clear conditions, projection, ordering, paging and flags.
    ///
    /// Table, model and transaction state are kept.
    pub fn reset(&mut self) -> &mut Self {
        self.cond = Cond::new(self.dialect);
        self.selects.clear();
        self.groups.clear();
        self.orders.clear();
        self.limit = None;
        self.offset = None;
        self.unscoped = false;
        self.ignore = false;
        self
    }

    /// Target table.
    ///
    /// Names outside `[A-Za-z0-9_.]` are logged as a warning and used verbatim, unquoted.
    pub fn table(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !is_valid_table_name(&name) {
            tracing::warn!(
                target: "scoop",
                table = %name,
                "table name contains characters outside [A-Za-z0-9_.]; using it verbatim"
            );
        }
        self.table = name;
        self
    }

    /// Bind a model type: its conventional columns drive soft delete and timestamps, and its
    /// table is used unless [`Scoop::table`] was called.
    pub fn model<T: Model>(&mut self) -> &mut Self {
        self.bind::<T>();
        self
    }

    pub(crate) fn bind<T: Model>(&mut self) {
        self.meta = ModelMeta::of::<T>();
        if self.table.is_empty() {
            self.table = cache::table_name::<T>().to_string();
        }
    }

    /// Include soft-deleted rows and make `delete` a hard delete.
    pub fn unscoped(&mut self) -> &mut Self {
        self.unscoped = true;
        self
    }

    /// Ignore duplicate-key conflicts on insert.
    pub fn ignore(&mut self) -> &mut Self {
        self.ignore = true;
        self
    }

    /// Result columns. Plain identifiers are quoted; anything else (`COUNT(*)`,
    /// `age + 1 AS next`) is written into the SQL verbatim, so never pass user input here.
    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selects.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn group(&mut self, column: impl Into<String>) -> &mut Self {
        self.groups.push(column.into());
        self
    }

    /// `ORDER BY` term: a column, optionally followed by `ASC` or `DESC`.
    ///
    /// Any other term is written into the SQL verbatim, so never pass user input here.
    pub fn order(&mut self, term: impl Into<String>) -> &mut Self {
        self.orders.push(term.into());
        self
    }

    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(&mut self, n: u64) -> &mut Self {
        self.offset = Some(n);
        self
    }

    /// Override the error returned by `first` when nothing matches.
    pub fn not_found_error(
        &mut self,
        f: impl Fn() -> OrmError + Send + Sync + 'static,
    ) -> &mut Self {
        self.config.not_found = Arc::new(f);
        self
    }

    /// Override the error returned by `create` on a duplicate key.
    pub fn duplicated_key_error(
        &mut self,
        f: impl Fn() -> OrmError + Send + Sync + 'static,
    ) -> &mut Self {
        self.config.duplicated_key = Arc::new(f);
        self
    }

    fn with_cond(&mut self, f: impl FnOnce(Cond) -> Cond) -> &mut Self {
        let cond = std::mem::take(&mut self.cond);
        self.cond = f(cond);
        self
    }

    /// Add a predicate in any [`Clause`] shape. See [`Cond::where_`].
    pub fn where_(&mut self, clause: impl Into<Clause>) -> &mut Self {
        self.with_cond(|c| c.where_(clause))
    }

    pub fn raw(&mut self, expr: Expr) -> &mut Self {
        self.with_cond(|c| c.raw(expr))
    }

    pub fn op(&mut self, column: &str, op: &str, value: impl Encode) -> &mut Self {
        self.with_cond(|c| c.op(column, op, value))
    }

    pub fn eq(&mut self, column: &str, value: impl Encode) -> &mut Self {
        self.with_cond(|c| c.eq(column, value))
    }

    pub fn ne(&mut self, column: &str, value: impl Encode) -> &mut Self {
        self.with_cond(|c| c.ne(column, value))
    }

    pub fn gt(&mut self, column: &str, value: impl Encode) -> &mut Self {
        self.with_cond(|c| c.gt(column, value))
    }

    pub fn gte(&mut self, column: &str, value: impl Encode) -> &mut Self {
        self.with_cond(|c| c.gte(column, value))
    }

    pub fn lt(&mut self, column: &str, value: impl Encode) -> &mut Self {
        self.with_cond(|c| c.lt(column, value))
    }

    pub fn lte(&mut self, column: &str, value: impl Encode) -> &mut Self {
        self.with_cond(|c| c.lte(column, value))
    }

    /// `column IN (...)`; an empty list makes every terminal call a no-op.
    pub fn in_list<I>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Encode,
    {
        self.with_cond(|c| c.in_list(column, values))
    }

    /// `column NOT IN (...)`; an empty list adds nothing.
    pub fn not_in<I>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Encode,
    {
        self.with_cond(|c| c.not_in(column, values))
    }

    pub fn between(&mut self, column: &str, from: impl Encode, to: impl Encode) -> &mut Self {
        self.with_cond(|c| c.between(column, from, to))
    }

    pub fn not_between(&mut self, column: &str, from: impl Encode, to: impl Encode) -> &mut Self {
        self.with_cond(|c| c.not_between(column, from, to))
    }

    pub fn is_null(&mut self, column: &str) -> &mut Self {
        self.with_cond(|c| c.is_null(column))
    }

    pub fn is_not_null(&mut self, column: &str) -> &mut Self {
        self.with_cond(|c| c.is_not_null(column))
    }

    pub fn like(&mut self, column: &str, value: &str) -> &mut Self {
        self.with_cond(|c| c.like(column, value))
    }

    pub fn left_like(&mut self, column: &str, value: &str) -> &mut Self {
        self.with_cond(|c| c.left_like(column, value))
    }

    pub fn right_like(&mut self, column: &str, value: &str) -> &mut Self {
        self.with_cond(|c| c.right_like(column, value))
    }

    pub fn not_like(&mut self, column: &str, value: &str) -> &mut Self {
        self.with_cond(|c| c.not_like(column, value))
    }

    pub fn not_left_like(&mut self, column: &str, value: &str) -> &mut Self {
        self.with_cond(|c| c.not_left_like(column, value))
    }

    pub fn not_right_like(&mut self, column: &str, value: &str) -> &mut Self {
        self.with_cond(|c| c.not_right_like(column, value))
    }

    pub fn or(&mut self, members: impl IntoIterator<Item = Cond>) -> &mut Self {
        self.with_cond(|c| c.or(members))
    }

    // ==================== Rendering helpers ====================

    /// Quoted table name, or an error when none was set.
    pub(crate) fn table_sql(&self) -> OrmResult<String> {
        if self.table.trim().is_empty() {
            return Err(OrmError::validation(
                "scoop: table name is empty; call table() or model() first",
            ));
        }
        if is_valid_table_name(&self.table) {
            Ok(self.dialect.quote(&self.table))
        } else {
            Ok(self.table.clone())
        }
    }

    pub(crate) fn quote(&self, ident: &str) -> String {
        self.dialect.quote(ident)
    }

    /// The soft-delete column, unless unscoped.
    pub(crate) fn soft_delete_field(&self) -> Option<FieldRef> {
        if self.unscoped {
            None
        } else {
            self.meta.deleted_at
        }
    }

    /// WHERE body (without the keyword) and its parameters, including the soft-delete guard.
    pub(crate) fn filter(&self) -> (String, Vec<Value>) {
        let mut sql = self.cond.to_sql();
        if let Some(field) = self.soft_delete_field() {
            let guard = format!("{} = 0", self.quote(field.column));
            if sql.is_empty() {
                sql = guard;
            } else {
                sql.push_str(" AND ");
                sql.push_str(&guard);
            }
        }
        (sql, self.cond.params().to_vec())
    }

    pub(crate) fn push_where(sql: &mut String, filter: &str) {
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
    }

    // ==================== Execution ====================

    pub(crate) async fn run_query(&self, sql: &str, params: &[Value]) -> OrmResult<RawRows> {
        let begin = Instant::now();
        let sql = self.dialect.finalize(sql);
        let result = self.conn.query(&sql, params).await;
        let rows = result.as_ref().map_or(0, |r| r.len() as u64);
        self.config.logger.trace(
            self.depth,
            begin,
            &|| (sql.to_string(), rows),
            result.as_ref().err(),
        );
        result
    }

    pub(crate) async fn run_execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let begin = Instant::now();
        let sql = self.dialect.finalize(sql);
        let result = self.conn.execute(&sql, params).await;
        let rows = *result.as_ref().unwrap_or(&0);
        self.config.logger.trace(
            self.depth,
            begin,
            &|| (sql.to_string(), rows),
            result.as_ref().err(),
        );
        result
    }

    pub(crate) fn not_found(&self) -> OrmError {
        (self.config.not_found)()
    }

    /// Replace a driver unique-violation with the configured sentinel.
    pub(crate) fn map_duplicate(&self, err: OrmError) -> OrmError {
        if err.is_unique_violation() {
            (self.config.duplicated_key)()
        } else {
            err
        }
    }
}

impl<C: Connection> Drop for Scoop<'_, C> {
    fn drop(&mut self) {
        if self.tx.is_open() {
            tracing::warn!(
                target: "scoop",
                depth = self.depth,
                "scoop dropped with an open transaction; call commit() or rollback()"
            );
        }
    }
}
