//! Row decoder: raw column bytes into typed fields.
//!
//! Every driver adapter hands over the text form of a column (`RawRows`), so decoding is a
//! parse of UTF-8 text. Malformed input is always an error; nothing is coerced to zero.

use crate::error::{OrmError, OrmResult};
use crate::value::{NAIVE_DATE_FORMAT, NAIVE_DATETIME_FORMAT, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::str::FromStr;

/// A type that can be decoded from one raw column value.
pub trait Decode: Sized {
    /// Decode a non-NULL column.
    fn decode(raw: &[u8]) -> Result<Self, String>;

    /// Decode a NULL column. Only `Option<T>` accepts NULL.
    fn decode_null() -> Result<Self, String> {
        Err("unexpected NULL".to_string())
    }
}

fn text(raw: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(raw).map_err(|e| format!("invalid UTF-8: {e}"))
}

fn parse<T>(raw: &[u8]) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let s = text(raw)?;
    s.parse::<T>()
        .map_err(|e| format!("cannot parse {s:?} as {}: {e}", std::any::type_name::<T>()))
}

macro_rules! decode_from_str {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                fn decode(raw: &[u8]) -> Result<Self, String> {
                    parse(raw)
                }
            }
        )*
    };
}

decode_from_str!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

impl Decode for bool {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        match raw {
            b"true" | b"1" => Ok(true),
            b"false" | b"0" => Ok(false),
            other => Err(format!(
                "invalid boolean {:?}",
                String::from_utf8_lossy(other)
            )),
        }
    }
}

impl Decode for String {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        text(raw).map(str::to_string)
    }
}

impl Decode for Vec<u8> {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        Ok(raw.to_vec())
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        T::decode(raw).map(Some)
    }

    fn decode_null() -> Result<Self, String> {
        Ok(None)
    }
}

impl Decode for DateTime<Utc> {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        let s = text(raw)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        // SQLite CURRENT_TIMESTAMP and MySQL DATETIME carry no offset.
        NaiveDateTime::parse_from_str(s, NAIVE_DATETIME_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
    }
}

impl Decode for NaiveDateTime {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        let s = text(raw)?;
        NaiveDateTime::parse_from_str(s, NAIVE_DATETIME_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(|e| format!("invalid datetime {s:?}: {e}"))
    }
}

impl Decode for NaiveDate {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        let s = text(raw)?;
        NaiveDate::parse_from_str(s, NAIVE_DATE_FORMAT)
            .map_err(|e| format!("invalid date {s:?}: {e}"))
    }
}

impl Decode for serde_json::Value {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(raw).map_err(|e| e.to_string())
    }
}

/// Wrapper for a field stored as JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned> Decode for Json<T> {
    fn decode(raw: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(raw)
            .map(Json)
            .map_err(|e| e.to_string())
    }
}

/// Decode one column, attributing failures to `column`.
pub fn decode_column<T: Decode>(column: &str, raw: Option<&[u8]>) -> OrmResult<T> {
    let decoded = match raw {
        Some(bytes) => T::decode(bytes),
        None => T::decode_null(),
    };
    decoded.map_err(|message| OrmError::decode(column, message))
}

/// Decode a JSON column into any deserializable type.
///
/// NULL decodes to `T::default()` so that an optional structured field can be left unset.
pub fn decode_json_column<T>(column: &str, raw: Option<&[u8]>) -> OrmResult<T>
where
    T: DeserializeOwned + Default,
{
    match raw {
        None => Ok(T::default()),
        Some(bytes) => {
            serde_json::from_slice(bytes).map_err(|e| OrmError::decode(column, e.to_string()))
        }
    }
}

/// Encode a structured value as JSON text. JSON `null` becomes SQL NULL.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> OrmResult<Value> {
    let json = serde_json::to_value(value)
        .map_err(|e| OrmError::Serialization(e.to_string()))?;
    if json.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Text(json.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn integers_fail_loudly() {
        assert_eq!(decode_column::<i64>("n", Some(b"-42")).unwrap(), -42);
        assert!(decode_column::<i32>("n", Some(b"")).is_err());
        assert!(decode_column::<i32>("n", Some(b"12abc")).is_err());
        assert!(decode_column::<u8>("n", Some(b"300")).is_err());
    }

    #[test]
    fn booleans_accept_only_canonical_text() {
        assert!(decode_column::<bool>("b", Some(b"true")).unwrap());
        assert!(decode_column::<bool>("b", Some(b"1")).unwrap());
        assert!(!decode_column::<bool>("b", Some(b"0")).unwrap());
        assert!(!decode_column::<bool>("b", Some(b"false")).unwrap());
        let err = decode_column::<bool>("b", Some(b"yes")).unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "b"));
    }

    #[test]
    fn null_needs_option() {
        assert_eq!(decode_column::<Option<i64>>("x", None).unwrap(), None);
        assert!(decode_column::<i64>("x", None).is_err());
        assert!(decode_column::<String>("x", None).is_err());
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive() {
        let a = decode_column::<DateTime<Utc>>("t", Some(b"2024-05-01T10:00:00Z")).unwrap();
        let b = decode_column::<DateTime<Utc>>("t", Some(b"2024-05-01 10:00:00")).unwrap();
        assert_eq!(a, b);
        let d = decode_column::<NaiveDate>("d", Some(b"2024-05-01")).unwrap();
        assert_eq!(d.to_string(), "2024-05-01");
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        tags: Vec<String>,
    }

    #[test]
    fn structured_values_go_through_json() {
        let prefs = Prefs {
            theme: "dark".into(),
            tags: vec!["a".into()],
        };
        let Value::Text(json) = encode_json(&prefs).unwrap() else {
            panic!("expected text");
        };
        let back: Prefs = decode_json_column("prefs", Some(json.as_bytes())).unwrap();
        assert_eq!(back, prefs);
        assert_eq!(encode_json(&Option::<Prefs>::None).unwrap(), Value::Null);
        assert_eq!(
            decode_json_column::<Prefs>("prefs", None).unwrap(),
            Prefs::default()
        );
        assert!(decode_json_column::<Prefs>("prefs", Some(b"{")).is_err());
    }
}
