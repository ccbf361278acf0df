//! Schema introspection contract implemented by `#[derive(Model)]`.

use crate::error::OrmResult;
use crate::value::{NAIVE_DATETIME_FORMAT, Value};
use chrono::{SecondsFormat, Utc};

/// How an auto-managed timestamp column is stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampKind {
    /// Seconds since the Unix epoch.
    #[default]
    Unix,
    /// Milliseconds since the Unix epoch.
    UnixMilli,
    /// RFC 3339 text (`DateTime<Utc>` fields).
    Rfc3339,
    /// `YYYY-MM-DD HH:MM:SS` text (`NaiveDateTime` fields).
    Naive,
}

impl TimestampKind {
    /// The current time in this representation.
    pub fn now(self) -> Value {
        let now = Utc::now();
        match self {
            TimestampKind::Unix => Value::Int(now.timestamp()),
            TimestampKind::UnixMilli => Value::Int(now.timestamp_millis()),
            TimestampKind::Rfc3339 => {
                Value::Text(now.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            TimestampKind::Naive => {
                Value::Text(now.naive_utc().format(NAIVE_DATETIME_FORMAT).to_string())
            }
        }
    }

    /// Whether `value` still holds the zero time of this representation.
    ///
    /// Text kinds also treat the Unix epoch as unset, since that is what a defaulted
    /// `DateTime<Utc>` or `NaiveDateTime` encodes to.
    pub fn is_unset(self, value: &Value) -> bool {
        match (self, value) {
            (TimestampKind::Rfc3339, Value::Text(s)) => s == "1970-01-01T00:00:00Z",
            (TimestampKind::Naive, Value::Text(s)) => s == "1970-01-01 00:00:00",
            _ => value.is_zero(),
        }
    }
}

/// One persisted field of a model, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Rust field name.
    pub name: &'static str,
    /// Database column name.
    pub column: &'static str,
    pub primary_key: bool,
    pub auto_increment: bool,
    /// Never read from or written to the database.
    pub ignore: bool,
    pub auto_create_time: bool,
    pub auto_update_time: bool,
    /// The `deleted_at` column: `0` means live, a timestamp means deleted.
    pub soft_delete: bool,
    /// The Rust type is an `Option`.
    pub nullable: bool,
    pub timestamp: TimestampKind,
}

impl FieldInfo {
    /// A plain column with no flags.
    pub const fn new(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column,
            primary_key: false,
            auto_increment: false,
            ignore: false,
            auto_create_time: false,
            auto_update_time: false,
            soft_delete: false,
            nullable: false,
            timestamp: TimestampKind::Unix,
        }
    }

    pub const fn primary_key(mut self, auto_increment: bool) -> Self {
        self.primary_key = true;
        self.auto_increment = auto_increment;
        self
    }

    pub const fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub const fn auto_create_time(mut self, kind: TimestampKind) -> Self {
        self.auto_create_time = true;
        self.timestamp = kind;
        self
    }

    pub const fn auto_update_time(mut self, kind: TimestampKind) -> Self {
        self.auto_update_time = true;
        self.timestamp = kind;
        self
    }

    pub const fn soft_delete(mut self, kind: TimestampKind) -> Self {
        self.soft_delete = true;
        self.timestamp = kind;
        self
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Whether the field is managed by scoop rather than by sparse updates.
    pub const fn is_managed(&self) -> bool {
        self.primary_key || self.auto_create_time || self.auto_update_time || self.soft_delete
    }
}

/// A struct mapped to a table.
///
/// Normally implemented with `#[derive(Model)]`:
///
/// ```ignore
/// use scoop::Model;
///
/// #[derive(Debug, Default, Model)]
/// #[orm(table = "users")]
/// struct User {
///     id: i64,
///     name: String,
///     created_at: i64,
///     deleted_at: Option<i64>,
/// }
/// ```
pub trait Model: Default + Send + Sync + 'static {
    /// Persisted fields in declaration order.
    fn fields() -> &'static [FieldInfo];

    /// Explicit table name. `None` derives one from the type name.
    fn table_name() -> Option<&'static str> {
        None
    }

    /// One value per entry of [`Model::fields`]; ignored fields yield `Value::Null`.
    fn values(&self) -> OrmResult<Vec<Value>>;

    /// Assign the field at `index` from a raw column value.
    fn decode_field(&mut self, index: usize, raw: Option<&[u8]>) -> OrmResult<()>;
}

/// Conventional columns of a model, derived once from its fields.
#[derive(Debug, Clone, Default)]
pub struct ModelMeta {
    pub id: Option<FieldRef>,
    pub created_at: Option<FieldRef>,
    pub updated_at: Option<FieldRef>,
    pub deleted_at: Option<FieldRef>,
}

/// Position and column of a conventional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub index: usize,
    pub column: &'static str,
    pub auto_increment: bool,
    pub nullable: bool,
    pub timestamp: TimestampKind,
}

impl FieldRef {
    fn of(index: usize, field: &FieldInfo) -> Self {
        Self {
            index,
            column: field.column,
            auto_increment: field.auto_increment,
            nullable: field.nullable,
            timestamp: field.timestamp,
        }
    }
}

impl ModelMeta {
    pub fn from_fields(fields: &[FieldInfo]) -> Self {
        let mut meta = Self::default();
        for (index, field) in fields.iter().enumerate() {
            if field.ignore {
                continue;
            }
            let r = Some(FieldRef::of(index, field));
            if field.primary_key && meta.id.is_none() {
                meta.id = r;
            } else if field.auto_create_time && meta.created_at.is_none() {
                meta.created_at = r;
            } else if field.auto_update_time && meta.updated_at.is_none() {
                meta.updated_at = r;
            } else if field.soft_delete && meta.deleted_at.is_none() {
                meta.deleted_at = r;
            }
        }
        meta
    }

    pub fn of<T: Model>() -> Self {
        Self::from_fields(T::fields())
    }

    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    pub fn has_created_at(&self) -> bool {
        self.created_at.is_some()
    }

    pub fn has_updated_at(&self) -> bool {
        self.updated_at.is_some()
    }

    pub fn has_deleted_at(&self) -> bool {
        self.deleted_at.is_some()
    }
}
