//! Convenient imports for typical `scoop` usage.
//!
//! ```ignore
//! use scoop::prelude::*;
//! ```

pub use crate::{
    Assign, Cond, Connection, Dialect, Expr, Json, List, Model, OrmError, OrmResult, Scoop,
    ScoopConfig,
};

#[cfg(feature = "sqlite")]
pub use crate::SqliteConnection;
