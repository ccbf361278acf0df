//! Host connection contract.

use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::value::Value;

/// Result rows as raw column text, ready for the row decoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRows {
    pub columns: Vec<String>,
    /// One entry per row; `None` is SQL NULL.
    pub rows: Vec<Vec<Option<Vec<u8>>>>,
}

impl RawRows {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row, if any.
    pub fn scalar(&self) -> Option<&[u8]> {
        self.rows.first()?.first()?.as_deref()
    }

    /// First column of the first row parsed as an integer.
    pub fn scalar_i64(&self) -> OrmResult<Option<i64>> {
        let Some(raw) = self.scalar() else {
            return Ok(None);
        };
        let column = self.columns.first().map(String::as_str).unwrap_or("?column?");
        crate::decode::decode_column::<i64>(column, Some(raw)).map(Some)
    }
}

/// A database connection or transaction that scoop can run statements on.
///
/// Statements always use `?` placeholders; Postgres adapters receive them already renumbered
/// to `$n` by [`Dialect::finalize`].
pub trait Connection: Send + Sync {
    /// SQL dialect spoken by this connection.
    fn dialect(&self) -> Dialect;

    /// Run a statement that returns rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<RawRows>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Start a transaction.
    fn begin(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send {
        async move { self.execute("BEGIN", &[]).await.map(|_| ()) }
    }

    fn commit(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send {
        async move { self.execute("COMMIT", &[]).await.map(|_| ()) }
    }

    fn rollback(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send {
        async move { self.execute("ROLLBACK", &[]).await.map(|_| ()) }
    }
}

impl<C: Connection> Connection for &C {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<RawRows> {
        (**self).query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        (**self).execute(sql, params).await
    }

    async fn begin(&self) -> OrmResult<()> {
        (**self).begin().await
    }

    async fn commit(&self) -> OrmResult<()> {
        (**self).commit().await
    }

    async fn rollback(&self) -> OrmResult<()> {
        (**self).rollback().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_reads_first_cell() {
        let mut rows = RawRows::new(vec!["count".into()]);
        assert_eq!(rows.scalar_i64().unwrap(), None);
        rows.rows.push(vec![Some(b"7".to_vec())]);
        assert_eq!(rows.scalar_i64().unwrap(), Some(7));
        rows.rows[0][0] = Some(b"seven".to_vec());
        assert!(rows.scalar_i64().is_err());
    }
}
