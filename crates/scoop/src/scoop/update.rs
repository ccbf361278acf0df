use super::{DeleteResult, Scoop, UpdateResult};
use crate::cache;
use crate::client::Connection;
use crate::error::OrmError;
use crate::model::Model;
use crate::value::{Assign, Value};

impl<'c, C: Connection> Scoop<'c, C> {
    /// Update the named columns of every matching row.
    ///
    /// Values may be plain values or [`Expr`](crate::Expr)s for computed updates:
    ///
    /// ```ignore
    /// scoop
    ///     .model::<Post>()
    ///     .eq("id", 7)
    ///     .updates([
    ///         ("title", Assign::from("new title")),
    ///         ("views", Expr::new("views + ?").arg(1).into()),
    ///     ])
    ///     .await?;
    /// ```
    ///
    /// The update timestamp of the bound model is stamped, and soft-deleted rows are left
    /// alone unless unscoped. A condition known to match nothing returns `Ok(0)`.
    pub async fn updates<I, K, V>(&mut self, assignments: I) -> UpdateResult
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Assign>,
    {
        if self.cond.is_skip() {
            return Ok(0);
        }
        let set: Vec<(String, Assign)> = assignments
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.run_update(set).await
    }

    /// Sparse update from a record: only non-zero, non-managed fields are written.
    ///
    /// A record with nothing to write is an error, not a no-op.
    pub async fn updates_model<T: Model>(&mut self, record: &T) -> UpdateResult {
        self.bind::<T>();
        if self.cond.is_skip() {
            return Ok(0);
        }
        let values = record.values()?;
        let set: Vec<(String, Assign)> = cache::update_columns::<T>()
            .iter()
            .filter_map(|&(idx, column)| {
                let value = values.get(idx)?;
                (!value.is_zero()).then(|| (column.to_string(), Assign::Value(value.clone())))
            })
            .collect();
        self.run_update(set).await
    }

    async fn run_update(&self, mut set: Vec<(String, Assign)>) -> UpdateResult {
        if set.is_empty() {
            return Err(OrmError::validation("scoop: nothing to update"));
        }
        if let Some(updated) = self.meta.updated_at {
            let now = Assign::Value(updated.timestamp.now());
            match set.iter().position(|(c, _)| c.as_str() == updated.column) {
                Some(pos) => {
                    if matches!(&set[pos].1, Assign::Value(v) if updated.timestamp.is_unset(v)) {
                        set[pos].1 = now;
                    }
                }
                None => set.push((updated.column.to_string(), now)),
            }
        }

        let table = self.table_sql()?;
        let mut params = Vec::new();
        let mut sets = Vec::with_capacity(set.len());
        for (column, assign) in set {
            let column = self.quote(&column);
            match assign {
                Assign::Value(v) => {
                    sets.push(format!("{column} = ?"));
                    params.push(v);
                }
                Assign::Expr(expr) => {
                    sets.push(format!("{column} = {}", expr.sql));
                    params.extend(expr.args);
                }
            }
        }

        let (filter, where_params) = self.filter();
        let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
        Self::push_where(&mut sql, &filter);
        params.extend(where_params);
        self.run_execute(&sql, &params).await
    }

    /// Delete matching rows.
    ///
    /// A model with a soft-delete column gets `deleted_at` stamped instead, only on rows not
    /// already deleted. [`Scoop::unscoped`] forces a hard `DELETE`.
    pub async fn delete(&mut self) -> DeleteResult {
        if self.cond.is_skip() {
            return Ok(0);
        }
        let table = self.table_sql()?;
        let (filter, where_params) = self.filter();

        let (mut sql, mut params) = match self.soft_delete_field() {
            Some(deleted) => {
                let mut sets = vec![format!("{} = ?", self.quote(deleted.column))];
                let mut params: Vec<Value> = vec![deleted.timestamp.now()];
                if let Some(updated) = self.meta.updated_at {
                    sets.push(format!("{} = ?", self.quote(updated.column)));
                    params.push(updated.timestamp.now());
                }
                (format!("UPDATE {table} SET {}", sets.join(", ")), params)
            }
            None => (format!("DELETE FROM {table}"), Vec::new()),
        };
        Self::push_where(&mut sql, &filter);
        params.extend(where_params);
        self.run_execute(&sql, &params).await
    }
}
