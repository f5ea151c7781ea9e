//! Driver rows to [`SqlRow`].
//!
//! Two paths: column-by-column through [`AnyRow`] for drivers whose types the
//! `Any` driver covers, and a single JSON text column (see
//! [`rows_as_json`](crate::named::rows_as_json)) for everything else.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value;
use sqlx::any::AnyRow;
use sqlx::{Column, Row, ValueRef};

use storeql_data::executor::{DriverError, DriverErrorKind};
use storeql_data::{SqlRow, SqlValue};

use crate::error::SqlxErrorExt;

pub(crate) fn decode_any_row(row: &AnyRow) -> Result<SqlRow, DriverError> {
    let mut columns = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        columns.push((column.name().to_string(), decode_any_value(row, index)?));
    }
    Ok(SqlRow::new(columns))
}

fn decode_any_value(row: &AnyRow, index: usize) -> Result<SqlValue, DriverError> {
    let is_null = row
        .try_get_raw(index)
        .map_err(SqlxErrorExt::into_driver_error)?
        .is_null();
    if is_null {
        return Ok(SqlValue::Null);
    }
    if let Ok(i) = row.try_get::<i64, _>(index) {
        return Ok(SqlValue::Int(i));
    }
    if let Ok(f) = row.try_get::<f64, _>(index) {
        return Ok(SqlValue::Float(f));
    }
    if let Ok(b) = row.try_get::<bool, _>(index) {
        return Ok(SqlValue::Bool(b));
    }
    if let Ok(s) = row.try_get::<String, _>(index) {
        return Ok(SqlValue::Text(s));
    }
    row.try_get::<Vec<u8>, _>(index)
        .map(SqlValue::Bytes)
        .map_err(SqlxErrorExt::into_driver_error)
}

/// Decode a row fetched through `rows_as_json`: its only column holds the
/// row as a JSON object.
pub(crate) fn decode_json_column(row: &AnyRow) -> Result<SqlRow, DriverError> {
    let text: String = row.try_get(0).map_err(SqlxErrorExt::into_driver_error)?;
    decode_json_row(&text)
}

/// Parse a JSON object into a row, keeping key order.
pub(crate) fn decode_json_row(text: &str) -> Result<SqlRow, DriverError> {
    let OrderedColumns(columns) =
        serde_json::from_str(text).map_err(|e| DriverError::wrap(DriverErrorKind::Other, e))?;
    Ok(SqlRow::new(
        columns
            .into_iter()
            .map(|(name, value)| (name, json_to_value(value)))
            .collect(),
    ))
}

fn json_to_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                SqlValue::UInt(u)
            } else {
                SqlValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => SqlValue::Text(s),
        nested @ (Value::Array(_) | Value::Object(_)) => SqlValue::Json(nested),
    }
}

/// A JSON object as its entries in document order.
struct OrderedColumns(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for OrderedColumns {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedColumnsVisitor)
    }
}

struct OrderedColumnsVisitor;

impl<'de> Visitor<'de> for OrderedColumnsVisitor {
    type Value = OrderedColumns;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut columns = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, value)) = map.next_entry::<String, Value>()? {
            columns.push((name, value));
        }
        Ok(OrderedColumns(columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_row_keeps_column_order() {
        let row = decode_json_row(
            r#"{"zeta":1,"created_at":"2024-05-01T10:00:00+00:00","alpha":null}"#,
        )
        .unwrap();
        let names: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "created_at", "alpha"]);
    }

    #[test]
    fn test_json_row_value_kinds() {
        let row = decode_json_row(
            r#"{"id":7,"big":18446744073709551615,"price":12.5,"ok":true,
                "uid":"6f1c2a9e-0000-4000-8000-000000000000","doc":{"a":[1,2]},"gone":null}"#,
        )
        .unwrap();
        assert_eq!(row.value("id"), Some(&SqlValue::Int(7)));
        assert_eq!(row.value("big"), Some(&SqlValue::UInt(u64::MAX)));
        assert_eq!(row.value("price"), Some(&SqlValue::Float(12.5)));
        assert_eq!(row.value("ok"), Some(&SqlValue::Bool(true)));
        assert_eq!(
            row.value("uid"),
            Some(&SqlValue::Text("6f1c2a9e-0000-4000-8000-000000000000".into()))
        );
        assert_eq!(
            row.value("doc"),
            Some(&SqlValue::Json(serde_json::json!({"a": [1, 2]})))
        );
        assert_eq!(row.value("gone"), Some(&SqlValue::Null));
    }

    #[test]
    fn test_json_row_rejects_non_objects() {
        let err = decode_json_row("[1,2]").unwrap_err();
        assert_eq!(err.kind(), DriverErrorKind::Other);
    }
}
