//! Scoop configuration.

use crate::dialect::Dialect;
use crate::error::OrmError;
use crate::monitor::{QueryLogger, TracingLogger};
use std::fmt;
use std::sync::Arc;

/// Produces a fresh sentinel error each time it is needed.
pub type ErrorFactory = Arc<dyn Fn() -> OrmError + Send + Sync>;

/// Shared settings for every [`Scoop`](crate::Scoop) built from a connection.
///
/// # Example
/// ```ignore
/// use scoop::{Dialect, ScoopConfig, TracingLogger};
/// use std::time::Duration;
///
/// let config = ScoopConfig::new()
///     .dialect(Dialect::MySql)
///     .logger(TracingLogger::new().slow_threshold(Duration::from_millis(50)))
///     .not_found_error(|| MyError::Missing.into());
/// ```
#[derive(Clone)]
pub struct ScoopConfig {
    /// Overrides the dialect reported by the connection.
    pub dialect: Option<Dialect>,
    pub logger: Arc<dyn QueryLogger>,
    /// Returned by `first` when no row matches.
    pub not_found: ErrorFactory,
    /// Returned by `create` when the engine reports a duplicate key.
    pub duplicated_key: ErrorFactory,
}

impl Default for ScoopConfig {
    fn default() -> Self {
        Self {
            dialect: None,
            logger: Arc::new(TracingLogger::default()),
            not_found: Arc::new(OrmError::record_not_found),
            duplicated_key: Arc::new(OrmError::duplicated_key),
        }
    }
}

impl fmt::Debug for ScoopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoopConfig")
            .field("dialect", &self.dialect)
            .field("not_found", &(self.not_found)().to_string())
            .field("duplicated_key", &(self.duplicated_key)().to_string())
            .finish_non_exhaustive()
    }
}

impl ScoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn logger(mut self, logger: impl QueryLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn not_found_error(mut self, f: impl Fn() -> OrmError + Send + Sync + 'static) -> Self {
        self.not_found = Arc::new(f);
        self
    }

    pub fn duplicated_key_error(
        mut self,
        f: impl Fn() -> OrmError + Send + Sync + 'static,
    ) -> Self {
        self.duplicated_key = Arc::new(f);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::NoopLogger;

    #[test]
    fn defaults_use_builtin_sentinels() {
        let config = ScoopConfig::new();
        assert!((config.not_found)().is_not_found());
        assert!((config.duplicated_key)().is_unique_violation());
        assert_eq!(config.dialect, None);
    }

    #[test]
    fn overrides() {
        let config = ScoopConfig::new()
            .dialect(Dialect::Sqlite)
            .logger(NoopLogger)
            .not_found_error(|| OrmError::Other("gone".into()));
        assert_eq!(config.dialect, Some(Dialect::Sqlite));
        assert_eq!((config.not_found)().to_string(), "gone");
        assert!(format!("{config:?}").contains("gone"));
    }
}
