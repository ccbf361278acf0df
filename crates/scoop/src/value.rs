//! Bound parameter values and raw SQL expressions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Format used for `NaiveDateTime` values in SQL text.
pub(crate) const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Format used for `NaiveDate` values in SQL text.
pub(crate) const NAIVE_DATE_FORMAT: &str = "%Y-%m-%d";

/// A single bound parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Whether this is the zero value of its kind.
    ///
    /// Zero values are skipped by sparse updates and mark an auto-increment
    /// id as "not yet assigned".
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::Text(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
        }
    }

    /// Text form of the value as a driver would return it in a result row.
    pub(crate) fn to_raw(&self) -> Option<Vec<u8>> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(if *b { b"true".to_vec() } else { b"false".to_vec() }),
            Value::Int(i) => Some(i.to_string().into_bytes()),
            Value::Float(f) => Some(f.to_string().into_bytes()),
            Value::Text(s) => Some(s.clone().into_bytes()),
            Value::Bytes(b) => Some(b.clone()),
        }
    }
}

/// Conversion of a Rust value into a bound parameter.
pub trait Encode {
    fn encode(&self) -> Value;
}

impl Encode for Value {
    fn encode(&self) -> Value {
        self.clone()
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self) -> Value {
        (**self).encode()
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self) -> Value {
        match self {
            Some(v) => v.encode(),
            None => Value::Null,
        }
    }
}

macro_rules! encode_int {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode(&self) -> Value {
                    Value::Int(i64::from(*self))
                }
            }
        )*
    };
}

encode_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! encode_wide_int {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode(&self) -> Value {
                    match i64::try_from(*self) {
                        Ok(v) => Value::Int(v),
                        Err(_) => Value::Text(self.to_string()),
                    }
                }
            }
        )*
    };
}

encode_wide_int!(isize, u64, usize);

impl Encode for f32 {
    fn encode(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl Encode for f64 {
    fn encode(&self) -> Value {
        Value::Float(*self)
    }
}

impl Encode for bool {
    fn encode(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Encode for str {
    fn encode(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl Encode for String {
    fn encode(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl Encode for Vec<u8> {
    fn encode(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl Encode for serde_json::Value {
    fn encode(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl Encode for DateTime<Utc> {
    fn encode(&self) -> Value {
        Value::Text(self.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl Encode for NaiveDateTime {
    fn encode(&self) -> Value {
        Value::Text(self.format(NAIVE_DATETIME_FORMAT).to_string())
    }
}

impl Encode for NaiveDate {
    fn encode(&self) -> Value {
        Value::Text(self.format(NAIVE_DATE_FORMAT).to_string())
    }
}

/// Raw SQL with its own bound arguments.
///
/// Used for computed updates (`count = count + ?`) and hand-written predicates.
/// The SQL is passed through verbatim; only the arguments are bound.
///
/// ```ignore
/// let bump = Expr::new("view_count + ?").arg(1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Expr {
    /// Create an expression with no arguments.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Bind the next `?` in the expression.
    #[must_use]
    pub fn arg(mut self, value: impl Encode) -> Self {
        self.args.push(value.encode());
        self
    }
}

/// Values for `IN` / `NOT IN` in the `(column, op, values)` clause shape.
///
/// ```ignore
/// scoop.where_(("id", "IN", List::from_iter([1, 2, 3])));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct List(pub Vec<Value>);

impl<T: Encode> FromIterator<T> for List {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        List(iter.into_iter().map(|v| v.encode()).collect())
    }
}

/// Right-hand side of an `UPDATE ... SET column = <assign>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Assign {
    Value(Value),
    Expr(Expr),
}

impl<T: Encode> From<T> for Assign {
    fn from(value: T) -> Self {
        Assign::Value(value.encode())
    }
}

impl From<Expr> for Assign {
    fn from(expr: Expr) -> Self {
        Assign::Expr(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values() {
        assert!(Value::Null.is_zero());
        assert!(0i32.encode().is_zero());
        assert!("".encode().is_zero());
        assert!(false.encode().is_zero());
        assert!(0.0f64.encode().is_zero());
        assert!(!Some(3u8).encode().is_zero());
        assert!(!"x".encode().is_zero());
    }

    #[test]
    fn wide_unsigned_overflows_to_text() {
        assert_eq!(u64::MAX.encode(), Value::Text(u64::MAX.to_string()));
        assert_eq!(7u64.encode(), Value::Int(7));
    }

    #[test]
    fn raw_form_matches_driver_text() {
        assert_eq!(Value::Int(42).to_raw(), Some(b"42".to_vec()));
        assert_eq!(Value::Bool(true).to_raw(), Some(b"true".to_vec()));
        assert_eq!(Value::Null.to_raw(), None);
    }

    #[test]
    fn assign_from_value_and_expr() {
        assert_eq!(Assign::from("bob"), Assign::Value(Value::Text("bob".into())));
        let expr = Expr::new("n + ?").arg(2);
        assert_eq!(
            Assign::from(expr.clone()),
            Assign::Expr(Expr {
                sql: "n + ?".into(),
                args: vec![Value::Int(2)],
            })
        );
    }
}
