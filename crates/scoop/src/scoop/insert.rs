use super::{CreateResult, Scoop};
use crate::client::Connection;
use crate::error::{OrmError, OrmResult};
use crate::model::{FieldRef, Model};
use crate::statement::{InsertStatement, PooledStatement};
use crate::value::Value;

/// Fill zero timestamps and the soft-delete sentinel in `values`.
///
/// Returns the stamped fields so they can be written back into the record.
fn stamp_for_insert<T: Model>(values: &mut [Value]) -> Vec<usize> {
    let mut stamped = Vec::new();
    for (idx, field) in T::fields().iter().enumerate() {
        let Some(value) = values.get_mut(idx) else {
            break;
        };
        if field.ignore {
            continue;
        }
        if (field.auto_create_time || field.auto_update_time) && field.timestamp.is_unset(value) {
            *value = field.timestamp.now();
            stamped.push(idx);
        } else if field.soft_delete && *value == Value::Null {
            *value = Value::Int(0);
        }
    }
    stamped
}

/// Field indexes to insert: everything except ignored fields and a zero auto-increment key.
fn insert_plan<T: Model>(values: &[Value]) -> Vec<usize> {
    T::fields()
        .iter()
        .enumerate()
        .filter(|(idx, f)| {
            !f.ignore && !(f.auto_increment && values.get(*idx).is_none_or(Value::is_zero))
        })
        .map(|(idx, _)| idx)
        .collect()
}

fn write_back<T: Model>(record: &mut T, indexes: &[usize], values: &[Value]) -> OrmResult<()> {
    for &idx in indexes {
        let raw = values.get(idx).and_then(Value::to_raw);
        record.decode_field(idx, raw.as_deref())?;
    }
    Ok(())
}

fn check_width<T: Model>(values: &[Value]) -> OrmResult<()> {
    let expected = T::fields().len();
    if values.len() != expected {
        return Err(OrmError::Other(format!(
            "Model::values returned {} values for {expected} fields",
            values.len()
        )));
    }
    Ok(())
}

impl<'c, C: Connection> Scoop<'c, C> {
    /// The auto-increment key of `values`, when it still has to be generated.
    fn pending_id(&self, values: &[Value]) -> Option<FieldRef> {
        self.meta
            .id
            .filter(|id| id.auto_increment && values.get(id.index).is_none_or(Value::is_zero))
    }

    /// Whether an insert writing `plan` must be rendered as `DEFAULT VALUES`.
    fn default_values(&self, plan: &[usize]) -> bool {
        plan.is_empty() && !self.dialect.traits().empty_row_tuple
    }

    /// `INSERT ... (cols) VALUES ` with the dialect's ignore handling, minus the row tuples.
    ///
    /// With no column to write on a dialect without empty row tuples the whole statement
    /// body is `DEFAULT VALUES` and no row is pushed afterwards.
    fn insert_head<T: Model>(&self, stmt: &mut PooledStatement) -> OrmResult<()> {
        let table = self.table_sql()?;
        stmt.sql.push_str(self.dialect.insert_verb(self.ignore));
        stmt.sql.push(' ');
        stmt.sql.push_str(&table);
        if self.default_values(&stmt.fields) {
            stmt.sql.push_str(" DEFAULT VALUES");
            return Ok(());
        }
        let fields = T::fields();
        let columns: Vec<String> = stmt
            .fields
            .iter()
            .map(|&idx| self.quote(fields[idx].column))
            .collect();
        stmt.sql.push_str(" (");
        stmt.sql.push_str(&columns.join(", "));
        stmt.sql.push_str(") VALUES ");
        Ok(())
    }

    fn insert_tail(&self, stmt: &mut PooledStatement, returning: Option<FieldRef>) {
        stmt.sql.push_str(self.dialect.insert_suffix(self.ignore));
        if let Some(id) = returning {
            stmt.sql.push_str(" RETURNING ");
            stmt.sql.push_str(&self.quote(id.column));
        }
    }

    fn push_row(stmt: &mut PooledStatement, values: &[Value]) {
        let placeholders = vec!["?"; stmt.fields.len()].join(", ");
        if stmt.sql.ends_with(')') {
            stmt.sql.push_str(", ");
        }
        stmt.sql.push('(');
        stmt.sql.push_str(&placeholders);
        stmt.sql.push(')');
        for i in 0..stmt.fields.len() {
            let idx = stmt.fields[i];
            stmt.params.push(values[idx].clone());
        }
    }

    /// Insert one record.
    ///
    /// Zero auto-increment keys and ignored fields are left out, zero create/update
    /// timestamps are stamped (and written back), and a NULL soft-delete field is stored as
    /// `0`. The generated id is written back when the dialect can report it: Postgres folds
    /// `RETURNING` into the insert, MySQL and SQLite issue a follow-up query.
    ///
    /// A duplicate key yields the configured duplicated-key error.
    pub async fn create<T: Model>(&mut self, record: &mut T) -> CreateResult {
        self.bind::<T>();
        self.insert_one(record).await
    }

    async fn insert_one<T: Model>(&self, record: &mut T) -> OrmResult<u64> {
        let mut values = record.values()?;
        check_width::<T>(&values)?;
        let stamped = stamp_for_insert::<T>(&mut values);
        let pending = self.pending_id(&values);
        let returning = pending.filter(|_| self.dialect.traits().returning);

        let mut stmt = InsertStatement::checkout();
        stmt.fields = insert_plan::<T>(&values);
        self.insert_head::<T>(&mut stmt)?;
        if !self.default_values(&stmt.fields) {
            Self::push_row(&mut stmt, &values);
        }
        self.insert_tail(&mut stmt, returning);

        let (affected, id) = if let Some(id) = returning {
            let rows = self
                .run_query(&stmt.sql, &stmt.params)
                .await
                .map_err(|e| self.map_duplicate(e))?;
            let generated = rows.scalar().map(<[u8]>::to_vec);
            (rows.len() as u64, generated.map(|raw| (id, raw)))
        } else {
            let affected = self
                .run_execute(&stmt.sql, &stmt.params)
                .await
                .map_err(|e| self.map_duplicate(e))?;
            let mut generated = None;
            if let (Some(id), Some(query), true) = (
                pending,
                self.dialect.traits().last_insert_id,
                affected > 0,
            ) {
                let rows = self.run_query(query, &[]).await?;
                generated = rows.scalar().map(|raw| (id, raw.to_vec()));
            }
            (affected, generated)
        };

        write_back(record, &stamped, &values)?;
        if let Some((id, raw)) = id {
            record.decode_field(id.index, Some(&raw))?;
        }
        Ok(affected)
    }

    /// Insert `records` with one multi-row INSERT per `batch_size` records.
    ///
    /// The column list of each batch comes from its first record. Batches are not atomic
    /// as a whole: on failure the rows inserted by earlier batches stay, and the error is an
    /// [`OrmError::Batch`] carrying their count. Generated ids are written back on Postgres.
    pub async fn create_in_batches<T: Model>(
        &mut self,
        records: &mut [T],
        batch_size: usize,
    ) -> CreateResult {
        if batch_size == 0 {
            return Err(OrmError::validation("scoop: batch size must be positive"));
        }
        self.bind::<T>();
        let mut total = 0u64;
        for batch in records.chunks_mut(batch_size) {
            match self.insert_batch(batch).await {
                Ok(n) => total += n,
                Err(source) => {
                    return Err(OrmError::Batch {
                        rows_affected: total,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(total)
    }

    async fn insert_batch<T: Model>(&self, batch: &mut [T]) -> OrmResult<u64> {
        let mut rows = Vec::with_capacity(batch.len());
        for record in batch.iter() {
            let mut values = record.values()?;
            check_width::<T>(&values)?;
            let stamped = stamp_for_insert::<T>(&mut values);
            rows.push((values, stamped));
        }
        let Some((first, _)) = rows.first() else {
            return Ok(0);
        };
        let plan = insert_plan::<T>(first);
        if self.default_values(&plan) {
            // DEFAULT VALUES takes exactly one row.
            let mut total = 0;
            for record in batch.iter_mut() {
                total += self.insert_one(record).await?;
            }
            return Ok(total);
        }
        let returning = self
            .pending_id(first)
            .filter(|_| self.dialect.traits().returning);

        let mut stmt = InsertStatement::checkout();
        stmt.fields = plan;
        self.insert_head::<T>(&mut stmt)?;
        for (values, _) in &rows {
            Self::push_row(&mut stmt, values);
        }
        self.insert_tail(&mut stmt, returning);

        let (affected, ids) = match returning {
            Some(id) => {
                let result = self
                    .run_query(&stmt.sql, &stmt.params)
                    .await
                    .map_err(|e| self.map_duplicate(e))?;
                let ids: Vec<_> = result
                    .rows
                    .iter()
                    .map(|r| r.first().cloned().flatten())
                    .collect();
                (result.len() as u64, Some((id, ids)))
            }
            None => {
                let affected = self
                    .run_execute(&stmt.sql, &stmt.params)
                    .await
                    .map_err(|e| self.map_duplicate(e))?;
                (affected, None)
            }
        };

        for (record, (values, stamped)) in batch.iter_mut().zip(&rows) {
            write_back(record, stamped, values)?;
        }
        // With ON CONFLICT DO NOTHING fewer ids than records come back; they can't be matched.
        if let Some((id, ids)) = ids {
            if ids.len() == batch.len() {
                for (record, raw) in batch.iter_mut().zip(ids) {
                    record.decode_field(id.index, raw.as_deref())?;
                }
            }
        }
        Ok(affected)
    }
}
