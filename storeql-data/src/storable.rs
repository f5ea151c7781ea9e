use crate::value::SqlMap;

/// Name of the identifier column every storable projects.
pub const ID_COLUMN: &str = "id";

/// Trait representing an entity that can be stored as one row of one table.
///
/// Implemented manually: the value projection is declared explicitly, no
/// field reflection is involved. The projection must include the `"id"`
/// column.
///
/// # Example
///
/// ```ignore
/// impl Storable for User {
///     fn id(&self) -> u64 { self.id }
///     fn set_id(&mut self, id: u64) { self.id = id; }
///     fn table_name(&self) -> &str { "users" }
///     fn sql_map(&self) -> SqlMap {
///         SqlMap::new().with("id", self.id).with("name", &self.name)
///     }
/// }
/// ```
///
/// The trait is object safe, so a batch may be a slice of
/// `Box<dyn Storable>` as long as every element targets the same table.
pub trait Storable: Send + Sync {
    /// Current identifier, `0` if the entity was never persisted.
    fn id(&self) -> u64;

    /// Assign the identifier returned by the database.
    fn set_id(&mut self, id: u64);

    /// Destination table. Must be stable for a given concrete type.
    fn table_name(&self) -> &str;

    /// Column-name to value projection, including `"id"`.
    fn sql_map(&self) -> SqlMap;

    /// Column names, sorted lexicographically.
    fn columns(&self) -> Vec<String> {
        self.sql_map().columns().map(str::to_string).collect()
    }

    fn is_persisted(&self) -> bool {
        self.id() != 0
    }
}

impl<T: Storable + ?Sized> Storable for &mut T {
    fn id(&self) -> u64 {
        (**self).id()
    }

    fn set_id(&mut self, id: u64) {
        (**self).set_id(id)
    }

    fn table_name(&self) -> &str {
        (**self).table_name()
    }

    fn sql_map(&self) -> SqlMap {
        (**self).sql_map()
    }

    fn columns(&self) -> Vec<String> {
        (**self).columns()
    }
}

impl<T: Storable + ?Sized> Storable for Box<T> {
    fn id(&self) -> u64 {
        (**self).id()
    }

    fn set_id(&mut self, id: u64) {
        (**self).set_id(id)
    }

    fn table_name(&self) -> &str {
        (**self).table_name()
    }

    fn sql_map(&self) -> SqlMap {
        (**self).sql_map()
    }

    fn columns(&self) -> Vec<String> {
        (**self).columns()
    }
}
