//! Assertions for hand-written [`Storable`] implementations.
//!
//! ```ignore
//! let user = User::new("alice@example.com");
//! assert_storable(&user, "users", &["email", "id", "name"]);
//! assert_sql_map(&user, &[("email", "alice@example.com".into()), ("id", 0u64.into())]);
//! ```

use storeql_data::{SqlValue, Storable, ID_COLUMN};

/// Check an entity's table and column set.
///
/// `columns` may be given in any order. Panics when the table differs, when
/// the columns differ, when `columns()` is not sorted, or when the projection
/// has no `id` column.
#[track_caller]
pub fn assert_storable<S: Storable + ?Sized>(entity: &S, table: &str, columns: &[&str]) {
    assert_eq!(entity.table_name(), table, "table_name() mismatch");

    let declared = entity.columns();
    let mut sorted = declared.clone();
    sorted.sort();
    assert_eq!(declared, sorted, "columns() must be sorted");

    let mut expected: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    expected.sort();
    assert_eq!(declared, expected, "columns() mismatch for table {table}");

    let map = entity.sql_map();
    let projected: Vec<&str> = map.columns().collect();
    assert_eq!(
        projected, declared,
        "sql_map() keys disagree with columns() for table {table}"
    );
    assert!(
        map.contains(ID_COLUMN),
        "sql_map() of table {table} has no `{ID_COLUMN}` column"
    );
    assert_eq!(
        map.get(ID_COLUMN),
        Some(&SqlValue::from(entity.id())),
        "sql_map() `{ID_COLUMN}` disagrees with id()"
    );
}

/// Check the values an entity projects. Columns not listed are ignored.
#[track_caller]
pub fn assert_sql_map<S: Storable + ?Sized>(entity: &S, expected: &[(&str, SqlValue)]) {
    let map = entity.sql_map();
    for (column, value) in expected {
        assert_eq!(
            map.get(column),
            Some(value),
            "sql_map() value mismatch for column {column}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{EntityStub, IdOnlyStub, OtherStub};
    use storeql_data::SqlMap;

    #[test]
    fn test_fixtures_are_storable() {
        assert_storable(&EntityStub::new("a"), "entities_stub", &["name", "id"]);
        assert_storable(&IdOnlyStub { id: 3 }, "entities_stub", &["id"]);
        assert_storable(&OtherStub::default(), "others_stub", &["id", "label"]);
    }

    #[test]
    fn test_sql_map_values() {
        assert_sql_map(
            &EntityStub::persisted(7, "bob"),
            &[("id", SqlValue::UInt(7)), ("name", "bob".into())],
        );
    }

    #[test]
    #[should_panic(expected = "table_name() mismatch")]
    fn test_wrong_table_panics() {
        assert_storable(&EntityStub::new("a"), "entities", &["id", "name"]);
    }

    #[test]
    #[should_panic(expected = "columns() mismatch")]
    fn test_missing_column_panics() {
        assert_storable(&EntityStub::new("a"), "entities_stub", &["id"]);
    }

    #[test]
    #[should_panic(expected = "has no `id` column")]
    fn test_projection_without_id_panics() {
        struct NoId;

        impl Storable for NoId {
            fn id(&self) -> u64 {
                0
            }

            fn set_id(&mut self, _id: u64) {}

            fn table_name(&self) -> &str {
                "no_id"
            }

            fn sql_map(&self) -> SqlMap {
                SqlMap::new().with("name", "x")
            }
        }

        assert_storable(&NoId, "no_id", &["name"]);
    }

    #[test]
    #[should_panic(expected = "value mismatch for column name")]
    fn test_wrong_value_panics() {
        assert_sql_map(&EntityStub::new("a"), &[("name", "b".into())]);
    }
}
