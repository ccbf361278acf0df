//! [`Connection`] over an embedded SQLite database (rusqlite).

use crate::client::{Connection, RawRows};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// A single SQLite connection guarded by a mutex.
///
/// rusqlite calls are blocking; each statement holds the lock only for its own duration.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteConnection {
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> OrmResult<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(OrmError::from_sqlite_error)?;
        Ok(Self::new(conn))
    }

    pub fn open(path: impl AsRef<Path>) -> OrmResult<Self> {
        let conn = rusqlite::Connection::open(path).map_err(OrmError::from_sqlite_error)?;
        Ok(Self::new(conn))
    }

    /// Run several `;`-separated statements without parameters (schema setup, fixtures).
    pub fn execute_batch(&self, sql: &str) -> OrmResult<()> {
        self.lock()?
            .execute_batch(sql)
            .map_err(OrmError::from_sqlite_error)
    }

    fn lock(&self) -> OrmResult<MutexGuard<'_, rusqlite::Connection>> {
        self.conn
            .lock()
            .map_err(|_| OrmError::Connection("sqlite connection mutex poisoned".to_string()))
    }

    fn query_sync(&self, sql: &str, params: &[Value]) -> OrmResult<RawRows> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(OrmError::from_sqlite_error)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut out = RawRows::new(columns);

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(to_sqlite)))
            .map_err(OrmError::from_sqlite_error)?;
        while let Some(row) = rows.next().map_err(OrmError::from_sqlite_error)? {
            let mut cells = Vec::with_capacity(width);
            for idx in 0..width {
                let cell = row.get_ref(idx).map_err(OrmError::from_sqlite_error)?;
                cells.push(raw_cell(cell));
            }
            out.rows.push(cells);
        }
        Ok(out)
    }

    fn execute_sync(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let conn = self.lock()?;
        let affected = conn
            .execute(sql, rusqlite::params_from_iter(params.iter().map(to_sqlite)))
            .map_err(OrmError::from_sqlite_error)?;
        Ok(affected as u64)
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<RawRows> {
        self.query_sync(sql, params)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.execute_sync(sql, params)
    }
}

fn to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Int(i) => SqliteValue::Integer(*i),
        Value::Float(f) => SqliteValue::Real(*f),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
    }
}

fn raw_cell(value: ValueRef<'_>) -> Option<Vec<u8>> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string().into_bytes()),
        ValueRef::Real(f) => Some(f.to_string().into_bytes()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(t.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn query_returns_text_cells() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER, b TEXT, c REAL, d BLOB)")
            .unwrap();
        let n = conn
            .execute(
                "INSERT INTO t (a, b, c, d) VALUES (?, ?, ?, ?)",
                &[
                    Value::Bool(true),
                    Value::Text("x".into()),
                    Value::Float(1.5),
                    Value::Null,
                ],
            )
            .await
            .unwrap();
        assert_eq!(n, 1);

        let rows = conn.query("SELECT a, b, c, d FROM t", &[]).await.unwrap();
        assert_eq!(rows.columns, ["a", "b", "c", "d"]);
        assert_eq!(
            rows.rows[0],
            vec![
                Some(b"1".to_vec()),
                Some(b"x".to_vec()),
                Some(b"1.5".to_vec()),
                None
            ]
        );
    }

    #[tokio::test]
    async fn unique_failures_map_to_unique_violation() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE u (name TEXT UNIQUE)").unwrap();
        let insert = "INSERT INTO u (name) VALUES (?)";
        conn.execute(insert, &[Value::Text("a".into())]).await.unwrap();
        let err = conn
            .execute(insert, &[Value::Text("a".into())])
            .await
            .unwrap_err();
        assert!(err.is_unique_violation(), "{err}");
    }
}
