use std::str::FromStr;

use crate::error::DataError;
use crate::fragment;
use crate::naming::check_identifier;
use crate::storable::Storable;

/// Write statement kinds the engine synthesizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update,
    Delete,
}

impl Action {
    /// SQL verb prefix.
    pub fn verb(self) -> &'static str {
        match self {
            Action::Insert => "INSERT INTO",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE FROM",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSERT" | "INSERT INTO" => Ok(Action::Insert),
            "UPDATE" => Ok(Action::Update),
            "DELETE" | "DELETE FROM" => Ok(Action::Delete),
            other => Err(format!("unknown statement action: {other}")),
        }
    }
}

/// Full statement template for `action` against `table`.
///
/// - INSERT: `INSERT INTO t (a,b) VALUES (:a,:b) RETURNING id`
/// - UPDATE: `UPDATE t SET a=:a, b=:b WHERE id=:id`
/// - DELETE: `DELETE FROM t WHERE id=:id`
pub fn exec_boilerplate<S: AsRef<str>>(action: Action, table: &str, columns: &[S]) -> String {
    match action {
        Action::Insert => format!(
            "{} {table} {} VALUES {} RETURNING id",
            action.verb(),
            fragment::column_list_excluding_id(columns),
            fragment::placeholder_list_excluding_id(columns),
        ),
        Action::Update => format!(
            "{} {table} SET {} WHERE id=:id",
            action.verb(),
            fragment::assignment_list_excluding_id(columns),
        ),
        Action::Delete => format!("{} {table} WHERE id=:id", action.verb()),
    }
}

/// [`exec_boilerplate`] using `storable` as the schema reference.
pub fn boilerplate_for<T: Storable + ?Sized>(action: Action, storable: &T) -> String {
    let columns = storable.columns();
    exec_boilerplate(action, storable.table_name(), columns.as_slice())
}

/// `SELECT * FROM <table> WHERE <clause>`.
pub fn select_where(table: &str, clause: &str) -> String {
    format!("SELECT * FROM {table} WHERE {clause}")
}

/// Like [`exec_boilerplate`], but rejects statements that cannot be valid.
///
/// INSERT and UPDATE need at least one column besides `id`. With
/// `check_identifiers`, the table and every column must be plain identifiers.
pub fn checked_boilerplate<S: AsRef<str>>(
    action: Action,
    table: &str,
    columns: &[S],
    check_identifiers: bool,
) -> Result<String, DataError> {
    if check_identifiers {
        check_identifier(table, "table")?;
        for column in columns {
            check_identifier(column.as_ref(), "column")?;
        }
    }
    if action != Action::Delete && !fragment::has_data_columns(columns) {
        return Err(DataError::NoColumns {
            table: table.to_string(),
        });
    }
    Ok(exec_boilerplate(action, table, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::SqlMap;

    #[derive(Default)]
    struct EntityStub {
        id: u64,
        name: String,
    }

    impl Storable for EntityStub {
        fn id(&self) -> u64 {
            self.id
        }

        fn set_id(&mut self, id: u64) {
            self.id = id;
        }

        fn table_name(&self) -> &str {
            "entities"
        }

        fn sql_map(&self) -> SqlMap {
            SqlMap::new().with("id", self.id).with("name", &self.name)
        }
    }

    #[test]
    fn test_update_boilerplate() {
        let stub = EntityStub::default();
        assert_eq!(
            boilerplate_for(Action::Update, &stub),
            "UPDATE entities SET name=:name WHERE id=:id"
        );
    }

    #[test]
    fn test_insert_boilerplate() {
        let stub = EntityStub::default();
        assert_eq!(
            boilerplate_for(Action::Insert, &stub),
            "INSERT INTO entities (name) VALUES (:name) RETURNING id"
        );
    }

    #[test]
    fn test_delete_boilerplate() {
        assert_eq!(
            exec_boilerplate::<&str>(Action::Delete, "entities", &[]),
            "DELETE FROM entities WHERE id=:id"
        );
    }

    #[test]
    fn test_multi_column_insert_is_sorted() {
        let sql = exec_boilerplate(Action::Insert, "users", &["name", "id", "email"]);
        assert_eq!(
            sql,
            "INSERT INTO users (email,name) VALUES (:email,:name) RETURNING id"
        );
    }

    #[test]
    fn test_select_where() {
        assert_eq!(
            select_where("users", "email = $1"),
            "SELECT * FROM users WHERE email = $1"
        );
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("UPDATE".parse::<Action>().unwrap(), Action::Update);
        assert_eq!("insert into".parse::<Action>().unwrap(), Action::Insert);
        assert!("MERGE".parse::<Action>().is_err());
    }

    #[test]
    fn test_checked_rejects_id_only_update() {
        let err = checked_boilerplate(Action::Update, "t", &["id"], true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoColumns);
        assert!(checked_boilerplate(Action::Delete, "t", &["id"], true).is_ok());
    }

    #[test]
    fn test_checked_rejects_bad_identifiers() {
        let err = checked_boilerplate(Action::Insert, "users; drop", &["id", "name"], true)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidIdentifier);
        let err = checked_boilerplate(Action::Insert, "users", &["id", "na-me"], true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidIdentifier);
        assert!(checked_boilerplate(Action::Insert, "users", &["id", "na-me"], false).is_ok());
    }
}
