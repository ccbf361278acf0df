//! Statement logging.
//!
//! Every statement scoop executes is reported to a [`QueryLogger`] with the nesting depth of
//! the issuing Scoop, its start time, a lazy `(sql, rows)` producer and the error, if any.

use crate::error::OrmError;
use std::time::{Duration, Instant};
use tracing::Level;

/// Sink for executed statements.
pub trait QueryLogger: Send + Sync {
    /// Called once per statement after it completes.
    ///
    /// `sql_and_rows` renders the statement; implementations should only call it when the
    /// event will actually be recorded.
    fn trace(
        &self,
        depth: usize,
        begin: Instant,
        sql_and_rows: &dyn Fn() -> (String, u64),
        err: Option<&OrmError>,
    );
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl QueryLogger for NoopLogger {
    fn trace(&self, _: usize, _: Instant, _: &dyn Fn() -> (String, u64), _: Option<&OrmError>) {}
}

/// Emits `tracing` events on target `scoop.sql`.
///
/// Failures are logged at `ERROR` (a not-found lookup is not a failure), statements slower
/// than `slow_threshold` at `WARN`, everything else at `DEBUG`.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    pub slow_threshold: Option<Duration>,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self {
            slow_threshold: Some(Duration::from_millis(200)),
            max_sql_length: Some(1024),
        }
    }
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    fn truncate_sql(&self, sql: String) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(&sql, max)),
            _ => sql,
        }
    }

    fn level(&self, elapsed: Duration, err: Option<&OrmError>) -> Level {
        match err {
            Some(e) if !e.is_not_found() => Level::ERROR,
            _ if self.slow_threshold.is_some_and(|t| elapsed > t) => Level::WARN,
            _ => Level::DEBUG,
        }
    }
}

impl QueryLogger for TracingLogger {
    fn trace(
        &self,
        depth: usize,
        begin: Instant,
        sql_and_rows: &dyn Fn() -> (String, u64),
        err: Option<&OrmError>,
    ) {
        let elapsed = begin.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        match self.level(elapsed, err) {
            Level::ERROR => {
                if !tracing::enabled!(target: "scoop.sql", Level::ERROR) {
                    return;
                }
                let (sql, rows) = sql_and_rows();
                let sql = self.truncate_sql(sql);
                let error = err.map(ToString::to_string).unwrap_or_default();
                tracing::error!(
                    target: "scoop.sql",
                    depth,
                    elapsed_ms,
                    rows,
                    sql = %sql,
                    error = %error,
                    "statement failed"
                );
            }
            Level::WARN => {
                if !tracing::enabled!(target: "scoop.sql", Level::WARN) {
                    return;
                }
                let (sql, rows) = sql_and_rows();
                let sql = self.truncate_sql(sql);
                tracing::warn!(target: "scoop.sql", depth, elapsed_ms, rows, sql = %sql, "slow statement");
            }
            _ => {
                if !tracing::enabled!(target: "scoop.sql", Level::DEBUG) {
                    return;
                }
                let (sql, rows) = sql_and_rows();
                let sql = self.truncate_sql(sql);
                tracing::debug!(target: "scoop.sql", depth, elapsed_ms, rows, sql = %sql, "statement");
            }
        }
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
        let logger = TracingLogger::new().max_sql_length(6);
        assert_eq!(logger.truncate_sql("SELECT * FROM t".into()), "SELECT...");
    }

    #[test]
    fn levels() {
        let logger = TracingLogger::new().slow_threshold(Duration::from_millis(10));
        let fast = Duration::from_millis(1);
        let slow = Duration::from_millis(50);
        assert_eq!(logger.level(fast, None), Level::DEBUG);
        assert_eq!(logger.level(slow, None), Level::WARN);
        assert_eq!(
            logger.level(fast, Some(&OrmError::Other("x".into()))),
            Level::ERROR
        );
        assert_eq!(
            logger.level(fast, Some(&OrmError::record_not_found())),
            Level::DEBUG
        );
    }

    #[test]
    fn noop_never_renders() {
        NoopLogger.trace(0, Instant::now(), &|| -> (String, u64) { panic!("rendered") }, None);
    }
}
