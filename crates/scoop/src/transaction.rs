//! Transactions and savepoints on a [`Scoop`].
//!
//! `begin` on a Scoop outside a transaction issues `BEGIN`; on a Scoop already inside one it
//! opens a savepoint, so nested units of work can be rolled back on their own.
//!
//! # Example
//!
//! ```ignore
//! use scoop::{OrmResult, Scoop};
//!
//! # async fn demo(conn: &scoop::SqliteConnection) -> OrmResult<()> {
//! let tx = Scoop::new(conn).begin().await?;
//! Scoop::commit_or_rollback(tx, async |tx| {
//!     tx.table("accounts")
//!         .eq("id", 1)
//!         .updates([("balance", scoop::Expr::new("balance - ?").arg(100))])
//!         .await?;
//!     Ok(())
//! })
//! .await?;
//! # Ok(()) }
//! ```

use crate::client::Connection;
use crate::error::{OrmError, OrmResult};
use crate::scoop::Scoop;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Global counter for savepoint naming.
static SAVEPOINT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_savepoint_name() -> String {
    let n = SAVEPOINT_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("scoop_sp_{n}")
}

/// Transaction ownership of a Scoop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum TxState {
    /// Not a transaction handle.
    #[default]
    None,
    /// Owns a top-level transaction.
    Open,
    /// Owns a savepoint inside an outer transaction.
    Savepoint(String),
    /// Committed or rolled back.
    Done,
}

impl TxState {
    pub(crate) fn is_open(&self) -> bool {
        matches!(self, TxState::Open | TxState::Savepoint(_))
    }
}

#[derive(Clone, Copy)]
enum TxOp {
    Begin,
    Commit,
    Rollback,
}

impl TxOp {
    fn sql(self) -> &'static str {
        match self {
            TxOp::Begin => "BEGIN",
            TxOp::Commit => "COMMIT",
            TxOp::Rollback => "ROLLBACK",
        }
    }
}

impl<'c, C: Connection> Scoop<'c, C> {
    /// Whether this Scoop owns an open transaction or savepoint.
    pub fn in_transaction(&self) -> bool {
        self.tx.is_open()
    }

    async fn tx_call(&self, op: TxOp) -> OrmResult<()> {
        let begin = Instant::now();
        let result = match op {
            TxOp::Begin => self.conn.begin().await,
            TxOp::Commit => self.conn.commit().await,
            TxOp::Rollback => self.conn.rollback().await,
        };
        self.config.logger.trace(
            self.depth,
            begin,
            &|| (op.sql().to_string(), 0),
            result.as_ref().err(),
        );
        result
    }

    /// Start a transaction, or a savepoint when already inside one.
    ///
    /// The returned Scoop shares the connection, table and model of `self`, starts with no
    /// conditions, and is one level deeper.
    pub async fn begin(&self) -> OrmResult<Scoop<'c, C>> {
        let mut tx = self.fork();
        tx.depth = self.depth + 1;
        if self.in_transaction() {
            let name = next_savepoint_name();
            tx.run_execute(&format!("SAVEPOINT {name}"), &[]).await?;
            tx.tx = TxState::Savepoint(name);
        } else {
            tx.tx_call(TxOp::Begin).await?;
            tx.tx = TxState::Open;
        }
        Ok(tx)
    }

    /// Commit the transaction (or release the savepoint) owned by this Scoop.
    pub async fn commit(&mut self) -> OrmResult<()> {
        match std::mem::take(&mut self.tx) {
            TxState::Open => {
                self.tx = TxState::Done;
                self.tx_call(TxOp::Commit).await
            }
            TxState::Savepoint(name) => {
                self.tx = TxState::Done;
                self.run_execute(&format!("RELEASE SAVEPOINT {name}"), &[])
                    .await
                    .map(|_| ())
            }
            state => {
                self.tx = state;
                Err(OrmError::validation("scoop: commit outside a transaction"))
            }
        }
    }

    /// Roll back the transaction (or to the savepoint) owned by this Scoop.
    pub async fn rollback(&mut self) -> OrmResult<()> {
        match std::mem::take(&mut self.tx) {
            TxState::Open => {
                self.tx = TxState::Done;
                self.tx_call(TxOp::Rollback).await
            }
            TxState::Savepoint(name) => {
                self.tx = TxState::Done;
                self.run_execute(&format!("ROLLBACK TO SAVEPOINT {name}"), &[])
                    .await
                    .map(|_| ())
            }
            state => {
                self.tx = state;
                Err(OrmError::validation("scoop: rollback outside a transaction"))
            }
        }
    }

    /// Run `f` on `tx`, committing on `Ok` and rolling back on `Err`.
    ///
    /// The error from `f` is returned unchanged when the rollback succeeds; a failed
    /// rollback is reported together with it.
    pub async fn commit_or_rollback<T, F>(mut tx: Scoop<'c, C>, f: F) -> OrmResult<T>
    where
        F: AsyncFnOnce(&mut Scoop<'c, C>) -> OrmResult<T>,
    {
        if !tx.in_transaction() {
            return Err(OrmError::validation(
                "scoop: commit_or_rollback needs a Scoop returned by begin()",
            ));
        }
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(error) => match tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err(OrmError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }

    /// `begin` followed by [`Scoop::commit_or_rollback`].
    pub async fn transaction<T, F>(&self, f: F) -> OrmResult<T>
    where
        F: AsyncFnOnce(&mut Scoop<'c, C>) -> OrmResult<T>,
    {
        let tx = self.begin().await?;
        Self::commit_or_rollback(tx, f).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savepoint_names_are_unique() {
        let a = next_savepoint_name();
        let b = next_savepoint_name();
        assert_ne!(a, b);
        assert!(a.starts_with("scoop_sp_"));
    }

    #[test]
    fn open_states() {
        assert!(TxState::Open.is_open());
        assert!(TxState::Savepoint("x".into()).is_open());
        assert!(!TxState::None.is_open());
        assert!(!TxState::Done.is_open());
    }
}
