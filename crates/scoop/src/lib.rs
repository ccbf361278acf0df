//! # scoop
//!
//! A dialect-aware SQL statement builder and executor for MySQL, PostgreSQL and SQLite.
//!
//! ## Features
//!
//! - **One builder, several databases**: identifier quoting, insert-ignore, placeholders and
//!   id retrieval follow the connection's [`Dialect`]
//! - **Composable conditions**: [`Cond`] builds `WHERE` fragments from maps, tuples, raw
//!   expressions and nested `OR` groups
//! - **Model conventions**: `id`, `created_at`, `updated_at` and `deleted_at` are managed
//!   automatically (see [`Model`])
//! - **Soft delete**: `deleted_at = 0` means live; reads filter deleted rows unless
//!   [`Scoop::unscoped`]
//! - **Transactions**: `begin` nests through savepoints; [`Scoop::commit_or_rollback`] settles
//!   a unit of work
//! - **Statement logging**: every statement is reported to a [`QueryLogger`]
//!   ([`TracingLogger`] by default)
//!
//! ## Example
//!
//! ```ignore
//! use scoop::{Model, Scoop, SqliteConnection};
//!
//! #[derive(Debug, Default, Model)]
//! struct Post {
//!     id: i64,
//!     title: String,
//!     views: i64,
//!     created_at: i64,
//!     updated_at: i64,
//!     deleted_at: i64,
//! }
//!
//! let conn = SqliteConnection::open_in_memory()?;
//! let mut post = Post { title: "hello".into(), ..Default::default() };
//! Scoop::new(&conn).create(&mut post).await?;
//!
//! Scoop::new(&conn)
//!     .model::<Post>()
//!     .eq("id", post.id)
//!     .updates([("views", scoop::Expr::new("views + ?").arg(1))])
//!     .await?;
//!
//! let mut posts = Vec::new();
//! Scoop::new(&conn).like("title", "hel").find(&mut posts).await?;
//! ```

pub mod cache;
pub mod client;
pub mod condition;
pub mod config;
pub mod decode;
pub mod dialect;
pub mod error;
pub mod model;
pub mod monitor;
pub mod prelude;
mod scoop;
mod statement;
pub mod transaction;
pub mod value;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use client::{Connection, RawRows};
pub use condition::{Clause, Cond};
pub use config::{ErrorFactory, ScoopConfig};
pub use decode::{Decode, Json, decode_column, decode_json_column, encode_json};
pub use dialect::{Dialect, DialectTraits};
pub use error::{DUPLICATED_KEY, OrmError, OrmResult, RECORD_NOT_FOUND, is_duplicate_message};
pub use model::{FieldInfo, FieldRef, Model, ModelMeta, TimestampKind};
pub use monitor::{NoopLogger, QueryLogger, TracingLogger};
pub use scoop::{ChunkResult, CreateResult, DeleteResult, FindResult, Scoop, UpdateResult};
pub use value::{Assign, Encode, Expr, List, Value};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConnection;

#[cfg(feature = "derive")]
pub use scoop_derive::Model;
