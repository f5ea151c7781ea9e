use serde::Deserialize;
use storeql_data::{SqlMap, Storable};

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            email: email.to_string(),
        }
    }
}

impl Storable for User {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn table_name(&self) -> &str {
        "users"
    }

    fn sql_map(&self) -> SqlMap {
        SqlMap::new()
            .with("id", self.id)
            .with("name", &self.name)
            .with("email", &self.email)
    }
}

pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE
)";

#[cfg(test)]
mod tests {
    use super::*;
    use storeql_test::{assert_sql_map, assert_storable};

    #[test]
    fn test_user_is_storable() {
        let user = User::new("Alice", "alice@example.com");
        assert_storable(&user, "users", &["id", "name", "email"]);
        assert_sql_map(
            &user,
            &[
                ("id", 0u64.into()),
                ("name", "Alice".into()),
                ("email", "alice@example.com".into()),
            ],
        );
    }
}
