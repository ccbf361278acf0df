use super::{ChunkResult, FindResult, Scoop};
use crate::cache::{self, lookup_column};
use crate::client::{Connection, RawRows};
use crate::error::{OrmError, OrmResult};
use crate::model::{Model, ModelMeta};
use crate::value::Value;

/// Paging for one rendered SELECT.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Window {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Decode every row of `rows` into a fresh `T`.
///
/// Result columns that map to no field are skipped. A `0` in a nullable soft-delete column
/// decodes to `None`.
pub(crate) fn decode_rows<T: Model>(rows: &RawRows, meta: &ModelMeta) -> OrmResult<Vec<T>> {
    let index = cache::column_index::<T>();
    let targets: Vec<Option<usize>> = rows
        .columns
        .iter()
        .map(|c| lookup_column(&index, c))
        .collect();
    let live_sentinel = meta.deleted_at.filter(|f| f.nullable).map(|f| f.index);

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows.rows {
        let mut item = T::default();
        for (cell, target) in row.iter().zip(&targets) {
            let Some(idx) = *target else {
                continue;
            };
            let mut raw = cell.as_deref();
            if Some(idx) == live_sentinel && raw == Some(&b"0"[..]) {
                raw = None;
            }
            item.decode_field(idx, raw)?;
        }
        out.push(item);
    }
    Ok(out)
}

impl<'c, C: Connection> Scoop<'c, C> {
    fn order_term(&self, term: &str) -> String {
        let trimmed = term.trim();
        if let Some((column, dir)) = trimmed.rsplit_once(char::is_whitespace) {
            let dir = dir.to_ascii_uppercase();
            if dir == "ASC" || dir == "DESC" {
                return format!("{} {dir}", self.quote(column.trim()));
            }
        }
        self.quote(trimmed)
    }

    fn projection(&self) -> String {
        if self.selects.is_empty() {
            return "*".to_string();
        }
        self.selects
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `SELECT <projection> FROM <table> [WHERE] [GROUP BY] [ORDER BY] [LIMIT] [OFFSET]`.
    pub(super) fn render_select(
        &self,
        projection: &str,
        ordered: bool,
        window: Window,
    ) -> OrmResult<(String, Vec<Value>)> {
        let table = self.table_sql()?;
        let (filter, params) = self.filter();

        let mut sql = format!("SELECT {projection} FROM {table}");
        Self::push_where(&mut sql, &filter);
        if !self.groups.is_empty() {
            let groups: Vec<String> = self.groups.iter().map(|g| self.quote(g)).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&groups.join(", "));
        }
        if ordered && !self.orders.is_empty() {
            let orders: Vec<String> = self.orders.iter().map(|o| self.order_term(o)).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        let offset = window.offset.filter(|&o| o > 0);
        match (window.limit, offset) {
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(_)) => {
                if let Some(unbounded) = self.dialect.traits().unbounded_limit {
                    sql.push_str(&format!(" LIMIT {unbounded}"));
                }
            }
            (None, None) => {}
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        Ok((sql, params))
    }

    fn window(&self) -> Window {
        Window {
            limit: self.limit,
            offset: self.offset,
        }
    }

    /// Append every matching row to `out`.
    ///
    /// Soft-deleted rows are excluded unless [`Scoop::unscoped`] was called. A condition known
    /// to match nothing returns `Ok(0)` without querying.
    pub async fn find<T: Model>(&mut self, out: &mut Vec<T>) -> FindResult {
        self.bind::<T>();
        if self.cond.is_skip() {
            return Ok(0);
        }
        let (sql, params) = self.render_select(&self.projection(), true, self.window())?;
        let rows = self.run_query(&sql, &params).await?;
        let items = decode_rows::<T>(&rows, &self.meta)?;
        let n = items.len() as u64;
        out.extend(items);
        Ok(n)
    }

    /// Load the first matching row into `out`.
    ///
    /// Renders with `LIMIT 1` and no offset, leaving the Scoop's own paging untouched.
    /// No match returns the configured not-found error.
    pub async fn first<T: Model>(&mut self, out: &mut T) -> FindResult {
        self.bind::<T>();
        if self.cond.is_skip() {
            return Err(self.not_found());
        }
        let window = Window {
            limit: Some(1),
            offset: None,
        };
        let (sql, params) = self.render_select(&self.projection(), true, window)?;
        let rows = self.run_query(&sql, &params).await?;
        let mut items = decode_rows::<T>(&rows, &self.meta)?;
        if items.is_empty() {
            return Err(self.not_found());
        }
        *out = items.swap_remove(0);
        Ok(1)
    }

    /// Number of matching rows (or groups, when `group` was used).
    pub async fn count(&mut self) -> OrmResult<u64> {
        if self.cond.is_skip() {
            return Ok(0);
        }
        let (sql, params) = if self.groups.is_empty() {
            self.render_select("COUNT(*)", false, Window::default())?
        } else {
            let (inner, params) = self.render_select("1", false, Window::default())?;
            (format!("SELECT COUNT(*) FROM ({inner}) AS scoop_groups"), params)
        };
        let rows = self.run_query(&sql, &params).await?;
        let count = rows.scalar_i64()?.unwrap_or(0);
        u64::try_from(count).map_err(|_| OrmError::decode("count", format!("negative count {count}")))
    }

    /// Whether at least one row matches.
    pub async fn exist(&mut self) -> OrmResult<bool> {
        if self.cond.is_skip() {
            return Ok(false);
        }
        let window = Window {
            limit: Some(1),
            offset: None,
        };
        match self.meta.id {
            Some(id) => {
                let (sql, params) = self.render_select(&self.quote(id.column), false, window)?;
                let rows = self.run_query(&sql, &params).await?;
                Ok(!rows.is_empty())
            }
            None => {
                let (sql, params) = self.render_select("COUNT(*)", false, window)?;
                let rows = self.run_query(&sql, &params).await?;
                Ok(rows.scalar_i64()?.unwrap_or(0) > 0)
            }
        }
    }

    /// Walk the matching rows `size` at a time.
    ///
    /// Each page is loaded into `dest` (cleared first) and handed to `f` with its offset.
    /// Stops at the first empty page or the first error from `f`. Rows are ordered by
    /// primary key when no order was given. The Scoop's limit, offset and ordering are
    /// restored afterwards.
    pub async fn chunk<T, F>(&mut self, dest: &mut Vec<T>, size: u64, mut f: F) -> ChunkResult
    where
        T: Model,
        F: FnMut(&mut Vec<T>, u64) -> OrmResult<()>,
    {
        if size == 0 {
            return Err(OrmError::validation("scoop: chunk size must be positive"));
        }
        self.bind::<T>();
        let saved = (self.limit, self.offset, self.orders.len());
        if self.orders.is_empty() {
            if let Some(id) = self.meta.id {
                self.orders.push(id.column.to_string());
            }
        }

        let mut offset = saved.1.unwrap_or(0);
        let result = loop {
            self.limit = Some(size);
            self.offset = Some(offset);
            dest.clear();
            match self.find(dest).await {
                Err(e) => break Err(e),
                Ok(0) => break Ok(()),
                Ok(_) => {}
            }
            if let Err(e) = f(dest, offset) {
                break Err(e);
            }
            offset += size;
        };

        self.limit = saved.0;
        self.offset = saved.1;
        self.orders.truncate(saved.2);
        result
    }
}
