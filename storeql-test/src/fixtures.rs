use storeql_data::{SqlMap, Storable};

/// Two-column entity stored in `entities_stub`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStub {
    pub id: u64,
    pub name: String,
}

impl EntityStub {
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }

    pub fn persisted(id: u64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl Storable for EntityStub {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn table_name(&self) -> &str {
        "entities_stub"
    }

    fn sql_map(&self) -> SqlMap {
        SqlMap::new().with("id", self.id).with("name", &self.name)
    }
}

/// Entity of a different table, for mixed-batch checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OtherStub {
    pub id: u64,
    pub label: String,
}

impl Storable for OtherStub {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn table_name(&self) -> &str {
        "others_stub"
    }

    fn sql_map(&self) -> SqlMap {
        SqlMap::new().with("id", self.id).with("label", &self.label)
    }
}

/// Entity projecting nothing but its id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdOnlyStub {
    pub id: u64,
}

impl Storable for IdOnlyStub {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn table_name(&self) -> &str {
        "entities_stub"
    }

    fn sql_map(&self) -> SqlMap {
        SqlMap::new().with("id", self.id)
    }
}
