//! Derive macros for scoop
//!
//! Provides `#[derive(Model)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod model;
mod sql_ident;

/// Derive `scoop::Model` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use scoop::Model;
///
/// #[derive(Debug, Default, Model)]
/// #[orm(table = "users")]
/// struct User {
///     id: i64,
///     #[orm(column = "user_name")]
///     name: String,
///     email: Option<String>,
///     #[orm(json)]
///     tags: Vec<String>,
///     created_at: i64,
///     #[orm(auto_update_time = "milli")]
///     touched_at: i64,
///     deleted_at: i64,
///     #[orm(ignore)]
///     scratch: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (default: the snake_cased type name)
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(id)]` - Mark field as primary key (default: the field named `id`)
/// - `#[orm(auto_increment = false)]` - Primary key is not generated by the database
/// - `#[orm(ignore)]` - Never read or written
/// - `#[orm(auto_create_time)]`, `#[orm(auto_update_time)]` - Stamped on insert / update
///   (default: `created_at`, `updated_at`); add `= "milli"` for integer milliseconds
/// - `#[orm(soft_delete)]` - Integer soft-delete column, `0` meaning live
///   (default: an integer `deleted_at`)
/// - `#[orm(json)]` - Store a serde type as JSON text
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
