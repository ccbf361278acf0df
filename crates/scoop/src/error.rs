//! Error types for scoop

use thiserror::Error;

/// Result type alias for scoop operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Message carried by the default not-found sentinel.
pub const RECORD_NOT_FOUND: &str = "record not found";

/// Message carried by the default duplicated-key sentinel.
pub const DUPLICATED_KEY: &str = "duplicated key";

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// PostgreSQL query execution error
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// SQLite query execution error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Usage error detected before touching the database
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A batch insert failed after earlier batches were applied.
    #[error("batch insert failed after {rows_affected} rows: {source}")]
    Batch {
        rows_affected: u64,
        #[source]
        source: Box<OrmError>,
    },

    /// Caller-supplied sentinel (see `ScoopConfig::not_found_error`).
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The default sentinel returned when `first` matches no rows.
    pub fn record_not_found() -> Self {
        Self::NotFound(RECORD_NOT_FOUND.to_string())
    }

    /// The default sentinel returned when an insert hits a unique constraint.
    pub fn duplicated_key() -> Self {
        Self::UniqueViolation(DUPLICATED_KEY.to_string())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Rows applied before a failing batch, if this is a batch error.
    pub fn batch_rows_affected(&self) -> Option<u64> {
        match self {
            Self::Batch { rows_affected, .. } => Some(*rows_affected),
            _ => None,
        }
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    #[cfg(feature = "postgres")]
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            if db_err.code().code() == "23505" {
                let constraint = db_err.constraint().unwrap_or("unknown");
                return Self::UniqueViolation(format!("{}: {}", constraint, db_err.message()));
            }
        }
        Self::Query(err)
    }

    /// Parse a rusqlite error into a more specific OrmError
    #[cfg(feature = "sqlite")]
    pub fn from_sqlite_error(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, _) = &err {
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return Self::UniqueViolation(err.to_string());
            }
        }
        Self::Sqlite(err)
    }
}

/// Driver-agnostic duplicate-key detection on error text.
///
/// Used for drivers that only surface messages: MySQL (`Error 1062` / `Duplicate entry`),
/// SQLite (`UNIQUE constraint failed`) and PostgreSQL (`duplicate key value`).
pub fn is_duplicate_message(message: &str) -> bool {
    message.contains("Duplicate entry")
        || message.contains("Error 1062")
        || message.contains("UNIQUE constraint failed")
        || message.contains("duplicate key value")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_messages_are_detected_per_driver() {
        assert!(is_duplicate_message(
            "Error 1062: Duplicate entry 'a' for key 'uniq_name'"
        ));
        assert!(is_duplicate_message("UNIQUE constraint failed: users.name"));
        assert!(is_duplicate_message(
            "duplicate key value violates unique constraint \"users_name_key\""
        ));
        assert!(!is_duplicate_message("syntax error at or near \"FROM\""));
    }

    #[test]
    fn sentinels_are_distinguishable() {
        assert!(OrmError::record_not_found().is_not_found());
        assert!(OrmError::duplicated_key().is_unique_violation());
        assert!(!OrmError::duplicated_key().is_not_found());
    }

    #[test]
    fn batch_error_reports_partial_rows() {
        let err = OrmError::Batch {
            rows_affected: 4,
            source: Box::new(OrmError::Other("boom".into())),
        };
        assert_eq!(err.batch_rows_affected(), Some(4));
        assert_eq!(err.to_string(), "batch insert failed after 4 rows: boom");
    }
}
