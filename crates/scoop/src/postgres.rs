//! [`Connection`] for `tokio_postgres::Client`.

use crate::client::{Connection, RawRows};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::{NAIVE_DATE_FORMAT, NAIVE_DATETIME_FORMAT, Value};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{IsNull, ToSql, Type};

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                _ => int_to_sql(i64::from(*b), ty, out),
            },
            Value::Int(i) => int_to_sql(*i, ty, out),
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                _ => text_to_sql(&f.to_string(), ty, out),
            },
            Value::Text(s) => text_to_sql(s, ty, out),
            Value::Bytes(b) => match *ty {
                Type::BYTEA => b.as_slice().to_sql(ty, out),
                _ => text_to_sql(std::str::from_utf8(b)?, ty, out),
            },
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn int_to_sql(i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql(ty, out),
        Type::INT8 => i.to_sql(ty, out),
        Type::FLOAT4 => (i as f32).to_sql(ty, out),
        Type::FLOAT8 => (i as f64).to_sql(ty, out),
        Type::BOOL => (i != 0).to_sql(ty, out),
        Type::OID => u32::try_from(i)?.to_sql(ty, out),
        _ => text_to_sql(&i.to_string(), ty, out),
    }
}

fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => s.parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => s.parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => s.parse::<i64>()?.to_sql(ty, out),
        Type::FLOAT4 => s.parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => s.parse::<f64>()?.to_sql(ty, out),
        Type::BOOL => match s {
            "true" | "1" => true.to_sql(ty, out),
            "false" | "0" => false.to_sql(ty, out),
            _ => Err(format!("invalid boolean {s:?}").into()),
        },
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(s)?
            .with_timezone(&Utc)
            .to_sql(ty, out),
        Type::TIMESTAMP => NaiveDateTime::parse_from_str(s, NAIVE_DATETIME_FORMAT)?.to_sql(ty, out),
        Type::DATE => NaiveDate::parse_from_str(s, NAIVE_DATE_FORMAT)?.to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(s)?.to_sql(ty, out),
        Type::NUMERIC => parse_decimal(s)?.to_sql(ty, out),
        Type::BYTEA => s.as_bytes().to_sql(ty, out),
        _ => s.to_sql(ty, out),
    }
}

/// NUMERIC parameters accept plain (`12.50`) and scientific (`1.25e1`) notation.
fn parse_decimal(s: &str) -> Result<Decimal, BoxError> {
    s.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|e| format!("invalid numeric {s:?}: {e}").into())
}

impl Connection for tokio_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<RawRows> {
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|v| v as _).collect();
        let stmt = self.prepare(sql).await.map_err(OrmError::from_db_error)?;
        let columns = stmt.columns().iter().map(|c| c.name().to_string()).collect();
        let rows = tokio_postgres::Client::query(self, &stmt, &refs)
            .await
            .map_err(OrmError::from_db_error)?;
        let mut out = RawRows::new(columns);
        for row in &rows {
            out.rows.push(raw_row(row)?);
        }
        Ok(out)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|v| v as _).collect();
        tokio_postgres::Client::execute(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn begin(&self) -> OrmResult<()> {
        self.batch_execute("BEGIN")
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn commit(&self) -> OrmResult<()> {
        self.batch_execute("COMMIT")
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn rollback(&self) -> OrmResult<()> {
        self.batch_execute("ROLLBACK")
            .await
            .map_err(OrmError::from_db_error)
    }
}

fn raw_row(row: &Row) -> OrmResult<Vec<Option<Vec<u8>>>> {
    let mut cells = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        cells.push(raw_cell(row, idx, column.type_(), column.name())?);
    }
    Ok(cells)
}

fn cell<'a, T, F>(row: &'a Row, idx: usize, name: &str, render: F) -> OrmResult<Option<Vec<u8>>>
where
    T: tokio_postgres::types::FromSql<'a>,
    F: FnOnce(T) -> String,
{
    let value: Option<T> = row
        .try_get(idx)
        .map_err(|e| OrmError::decode(name, e.to_string()))?;
    Ok(value.map(|v| render(v).into_bytes()))
}

fn raw_cell(row: &Row, idx: usize, ty: &Type, name: &str) -> OrmResult<Option<Vec<u8>>> {
    match *ty {
        Type::BOOL => cell(row, idx, name, |v: bool| v.to_string()),
        Type::INT2 => cell(row, idx, name, |v: i16| v.to_string()),
        Type::INT4 => cell(row, idx, name, |v: i32| v.to_string()),
        Type::INT8 => cell(row, idx, name, |v: i64| v.to_string()),
        Type::OID => cell(row, idx, name, |v: u32| v.to_string()),
        Type::FLOAT4 => cell(row, idx, name, |v: f32| v.to_string()),
        Type::FLOAT8 => cell(row, idx, name, |v: f64| v.to_string()),
        Type::JSON | Type::JSONB => cell(row, idx, name, |v: serde_json::Value| v.to_string()),
        Type::TIMESTAMPTZ => cell(row, idx, name, |v: DateTime<Utc>| {
            v.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        }),
        Type::TIMESTAMP => cell(row, idx, name, |v: NaiveDateTime| {
            v.format(NAIVE_DATETIME_FORMAT).to_string()
        }),
        Type::DATE => cell(row, idx, name, |v: NaiveDate| {
            v.format(NAIVE_DATE_FORMAT).to_string()
        }),
        Type::UUID => cell(row, idx, name, |v: uuid::Uuid| v.to_string()),
        Type::NUMERIC => cell(row, idx, name, |v: Decimal| v.to_string()),
        Type::BYTEA => {
            let value: Option<Vec<u8>> = row
                .try_get(idx)
                .map_err(|e| OrmError::decode(name, e.to_string()))?;
            Ok(value)
        }
        _ => cell(row, idx, name, |v: String| v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Value, ty: &Type) -> Result<Vec<u8>, BoxError> {
        let mut buf = BytesMut::new();
        value.to_sql(ty, &mut buf)?;
        Ok(buf.to_vec())
    }

    #[test]
    fn integers_follow_target_width() {
        assert_eq!(encode(&Value::Int(7), &Type::INT4).unwrap(), 7i32.to_be_bytes());
        assert_eq!(encode(&Value::Int(7), &Type::INT8).unwrap(), 7i64.to_be_bytes());
        assert!(encode(&Value::Int(i64::MAX), &Type::INT2).is_err());
    }

    #[test]
    fn text_is_parsed_for_typed_columns() {
        assert_eq!(
            encode(&Value::Text("42".into()), &Type::INT8).unwrap(),
            42i64.to_be_bytes()
        );
        assert!(encode(&Value::Text("{\"a\":1}".into()), &Type::JSONB).is_ok());
        assert!(encode(&Value::Text("nope".into()), &Type::UUID).is_err());
        assert_eq!(encode(&Value::Text("hi".into()), &Type::TEXT).unwrap(), b"hi");
    }

    #[test]
    fn numeric_is_bound_as_decimal() {
        let mut expected = BytesMut::new();
        Decimal::new(1250, 2)
            .to_sql(&Type::NUMERIC, &mut expected)
            .unwrap();
        assert_eq!(
            encode(&Value::Text("12.50".into()), &Type::NUMERIC).unwrap(),
            expected.to_vec()
        );
        assert!(encode(&Value::Float(1.5), &Type::NUMERIC).is_ok());
        assert!(encode(&Value::Int(3), &Type::NUMERIC).is_ok());
        assert!(encode(&Value::Text("1.5e3".into()), &Type::NUMERIC).is_ok());
        assert!(encode(&Value::Text("lots".into()), &Type::NUMERIC).is_err());
    }

    #[test]
    fn null_is_null() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            Value::Null.to_sql(&Type::INT4, &mut buf).unwrap(),
            IsNull::Yes
        ));
    }
}
