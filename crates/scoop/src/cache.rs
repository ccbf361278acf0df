//! Process-wide per-type caches.
//!
//! Keys are `TypeId`s, so the key space is bounded by the model types compiled into the
//! binary and entries are never evicted.

use crate::model::Model;
use heck::ToSnakeCase;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

type TypeMap<V> = OnceLock<RwLock<HashMap<TypeId, V>>>;

fn get_or_insert<V: Clone>(cache: &'static TypeMap<V>, key: TypeId, init: impl FnOnce() -> V) -> V {
    let lock = cache.get_or_init(|| RwLock::new(HashMap::new()));

    // Fast path: shared lock.
    if let Some(v) = lock.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
        return v.clone();
    }

    let mut map = lock.write().unwrap_or_else(PoisonError::into_inner);
    // Another writer may have filled it while we waited.
    if let Some(v) = map.get(&key) {
        return v.clone();
    }
    let v = init();
    map.insert(key, v.clone());
    v
}

/// Resolved table name for a model type.
///
/// Uses [`Model::table_name`] when given, otherwise the snake_cased type name
/// (`UserProfile` becomes `user_profile`).
pub fn table_name<T: Model>() -> Arc<str> {
    static CACHE: TypeMap<Arc<str>> = OnceLock::new();
    get_or_insert(&CACHE, TypeId::of::<T>(), || match T::table_name() {
        Some(name) => Arc::from(name),
        None => Arc::from(derive_table_name(std::any::type_name::<T>())),
    })
}

pub(crate) fn derive_table_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let last = base.rsplit("::").next().unwrap_or(base);
    last.to_snake_case()
}

/// Columns eligible for a struct-based sparse update, as `(field index, column)`.
///
/// Ignored, primary-key and auto-managed timestamp fields are excluded.
pub fn update_columns<T: Model>() -> Arc<[(usize, &'static str)]> {
    static CACHE: TypeMap<Arc<[(usize, &'static str)]>> = OnceLock::new();
    get_or_insert(&CACHE, TypeId::of::<T>(), || {
        T::fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.ignore && !f.is_managed())
            .map(|(i, f)| (i, f.column))
            .collect()
    })
}

/// Result-column name to field index.
///
/// Keyed by column name and field name, each also lowercased, so `SELECT name AS Name`
/// still lands on the right field.
pub fn column_index<T: Model>() -> Arc<HashMap<String, usize>> {
    static CACHE: TypeMap<Arc<HashMap<String, usize>>> = OnceLock::new();
    get_or_insert(&CACHE, TypeId::of::<T>(), || {
        let mut map = HashMap::new();
        for (i, f) in T::fields().iter().enumerate() {
            if f.ignore {
                continue;
            }
            for key in [f.column, f.name] {
                map.entry(key.to_string()).or_insert(i);
                map.entry(key.to_lowercase()).or_insert(i);
            }
        }
        Arc::new(map)
    })
}

/// Field index for a result column, trying exact, lowercase and snake_case forms.
pub(crate) fn lookup_column(index: &HashMap<String, usize>, column: &str) -> Option<usize> {
    index
        .get(column)
        .or_else(|| index.get(&column.to_lowercase()))
        .or_else(|| index.get(&column.to_snake_case()))
        .copied()
}
