//! Process-wide pool of INSERT scratch buffers.

use crate::value::Value;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

const POOL_CAPACITY: usize = 64;

static POOL: Mutex<Vec<InsertStatement>> = Mutex::new(Vec::new());

/// Scratch buffers for rendering one INSERT.
#[derive(Debug, Default)]
pub(crate) struct InsertStatement {
    /// Field indexes written by this statement, in column order.
    pub fields: Vec<usize>,
    pub sql: String,
    pub params: Vec<Value>,
}

impl InsertStatement {
    fn reset(&mut self) {
        self.fields.clear();
        self.sql.clear();
        self.params.clear();
    }

    /// Check a statement out of the process-wide pool.
    pub(crate) fn checkout() -> PooledStatement {
        let stmt = POOL
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        PooledStatement(Some(stmt))
    }
}

/// A pooled statement, reset and returned to the pool on drop.
#[derive(Debug)]
pub(crate) struct PooledStatement(Option<InsertStatement>);

impl Deref for PooledStatement {
    type Target = InsertStatement;

    fn deref(&self) -> &InsertStatement {
        // Only `drop` takes the value out.
        self.0.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledStatement {
    fn deref_mut(&mut self) -> &mut InsertStatement {
        self.0.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledStatement {
    fn drop(&mut self) {
        let Some(mut stmt) = self.0.take() else {
            return;
        };
        stmt.reset();
        let mut pool = POOL.lock().unwrap_or_else(PoisonError::into_inner);
        if pool.len() < POOL_CAPACITY {
            pool.push(stmt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returned_statements_come_back_empty() {
        {
            let mut stmt = InsertStatement::checkout();
            stmt.fields.extend([1, 2]);
            stmt.sql.push_str("INSERT INTO t (a, b) VALUES (?, ?)");
            stmt.params.push(Value::Int(1));
        }
        // Other tests may share the pool; every checkout must be clean regardless.
        for _ in 0..4 {
            let stmt = InsertStatement::checkout();
            assert!(stmt.fields.is_empty());
            assert!(stmt.sql.is_empty());
            assert!(stmt.params.is_empty());
        }
    }
}
