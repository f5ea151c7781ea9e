use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use crate::error::DataError;

/// A database-bindable value.
///
/// This is the closed set of values a [`Storable`](crate::Storable) projects
/// its fields into, and the set of values a driver hands back when rows are
/// read. Drivers map each variant onto their native parameter types.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integer (identifiers). Drivers reject values above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl SqlValue {
    /// Short type name, used in decode errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::UInt(_) => "uint",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::Json(_) => "json",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Bool(b) => serde_json::Value::Bool(*b),
            SqlValue::Int(i) => serde_json::Value::from(*i),
            SqlValue::UInt(u) => serde_json::Value::from(*u),
            SqlValue::Float(f) => serde_json::Value::from(*f),
            SqlValue::Text(s) => serde_json::Value::String(s.clone()),
            SqlValue::Bytes(b) => serde_json::Value::from(b.clone()),
            SqlValue::Json(v) => v.clone(),
        }
    }
}

macro_rules! impl_from_for_sql_value {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(value.into())
                }
            }
        )+
    };
}

impl_from_for_sql_value!(
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    u64 => UInt,
    f32 => Float,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
);

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::Text(value.clone())
    }
}

impl From<&[u8]> for SqlValue {
    fn from(value: &[u8]) -> Self {
        SqlValue::Bytes(value.to_vec())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

/// Conversion out of a [`SqlValue`] read back from the database.
pub trait FromSqlValue: Sized {
    /// Name reported when the conversion fails.
    const EXPECTED: &'static str;

    fn from_sql_value(value: &SqlValue) -> Option<Self>;
}

impl FromSqlValue for u64 {
    const EXPECTED: &'static str = "non-negative integer";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Int(i) => u64::try_from(*i).ok(),
            SqlValue::UInt(u) => Some(*u),
            _ => None,
        }
    }
}

impl FromSqlValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Int(i) => Some(*i),
            SqlValue::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }
}

impl FromSqlValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Float(f) => Some(*f),
            SqlValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromSqlValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Int(0) => Some(false),
            SqlValue::Int(1) => Some(true),
            _ => None,
        }
    }
}

impl FromSqlValue for String {
    const EXPECTED: &'static str = "text";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromSqlValue for Vec<u8> {
    const EXPECTED: &'static str = "bytes";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Null => Some(None),
            v => T::from_sql_value(v).map(Some),
        }
    }
}

/// Column-name to value projection of one entity.
///
/// Backed by a `BTreeMap`, so iteration is always in lexicographic column
/// order regardless of the order fields were inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlMap(BTreeMap<String, SqlValue>);

impl SqlMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    ///
    /// ```ignore
    /// SqlMap::new().with("id", self.id).with("name", &self.name)
    /// ```
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Column names, sorted.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether both maps project exactly the same column set.
    pub fn same_columns(&self, other: &SqlMap) -> bool {
        self.0.len() == other.0.len() && self.0.keys().eq(other.0.keys())
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for SqlMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One row read back from the database, columns in result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// A single-column row, as returned by `RETURNING id`.
    pub fn single(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            columns: vec![(column.into(), value.into())],
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn value_at(&self, index: usize) -> Option<&SqlValue> {
        self.columns.get(index).map(|(_, v)| v)
    }

    /// Typed access to a named column.
    pub fn get<T: FromSqlValue>(&self, column: &str) -> Result<T, DataError> {
        let value = self.value(column).ok_or_else(|| DataError::Scan {
            column: column.to_string(),
            expected: T::EXPECTED,
            found: "missing column",
        })?;
        decode(column, value)
    }

    /// Typed access to a column by position.
    pub fn get_at<T: FromSqlValue>(&self, index: usize) -> Result<T, DataError> {
        let (name, value) = self.columns.get(index).ok_or_else(|| DataError::Scan {
            column: format!("#{index}"),
            expected: T::EXPECTED,
            found: "missing column",
        })?;
        decode(name, value)
    }

    /// Deserialize the whole row into `T`, keyed by column name.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DataError> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| DataError::Decode(e.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn decode<T: FromSqlValue>(column: &str, value: &SqlValue) -> Result<T, DataError> {
    T::from_sql_value(value).ok_or_else(|| DataError::Scan {
        column: column.to_string(),
        expected: T::EXPECTED,
        found: value.type_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_sql_map_iterates_sorted() {
        let map = SqlMap::new()
            .with("name", "foo")
            .with("id", 3u64)
            .with("age", 7);
        let cols: Vec<_> = map.columns().collect();
        assert_eq!(cols, vec!["age", "id", "name"]);
    }

    #[test]
    fn test_option_maps_to_null() {
        let none: Option<i32> = None;
        assert_eq!(SqlValue::from(none), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }

    #[test]
    fn test_same_columns_ignores_values() {
        let a = SqlMap::new().with("id", 1u64).with("name", "a");
        let b = SqlMap::new().with("name", "b").with("id", 2u64);
        let c = SqlMap::new().with("id", 2u64);
        assert!(a.same_columns(&b));
        assert!(!a.same_columns(&c));
    }

    #[test]
    fn test_row_scan_rejects_negative_id() {
        let row = SqlRow::single("id", -4i64);
        let err = row.get::<u64>("id").unwrap_err();
        assert!(matches!(err, DataError::Scan { found: "int", .. }));
    }

    #[test]
    fn test_row_decode_into_struct() {
        #[derive(Deserialize)]
        struct User {
            id: u64,
            name: String,
            nickname: Option<String>,
        }

        let row = SqlRow::new(vec![
            ("id".into(), SqlValue::Int(7)),
            ("name".into(), SqlValue::Text("alice".into())),
            ("nickname".into(), SqlValue::Null),
        ]);
        let user: User = row.decode().unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.name, "alice");
        assert!(user.nickname.is_none());
    }
}
