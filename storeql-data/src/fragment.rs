//! SQL fragment synthesis from a column set.
//!
//! Every function sorts the columns first, so the generated text depends only
//! on the set of names and never on declaration order.
//!
//! ```ignore
//! let cols = ["name", "id", "age"];
//! assert_eq!(column_list_excluding_id(&cols), "(age,name)");
//! assert_eq!(placeholder_list_excluding_id(&cols), "(:age,:name)");
//! assert_eq!(assignment_list_excluding_id(&cols), "age=:age, name=:name");
//! ```

use crate::naming::parenthesize;
use crate::storable::ID_COLUMN;

fn sorted<S: AsRef<str>>(columns: &[S], skip_id: bool) -> Vec<&str> {
    let mut cols: Vec<&str> = columns
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| !(skip_id && *c == ID_COLUMN))
        .collect();
    cols.sort_unstable();
    cols.dedup();
    cols
}

fn placeholders(cols: &[&str]) -> String {
    cols.iter()
        .map(|c| format!(":{c}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn assignments(cols: &[&str]) -> String {
    cols.iter()
        .map(|c| format!("{c}=:{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `(a,b,id)`
pub fn column_list<S: AsRef<str>>(columns: &[S]) -> String {
    parenthesize(&sorted(columns, false).join(","))
}

/// `(a,b)`, used as INSERT target.
pub fn column_list_excluding_id<S: AsRef<str>>(columns: &[S]) -> String {
    parenthesize(&sorted(columns, true).join(","))
}

/// `(:a,:b,:id)`
pub fn placeholder_list<S: AsRef<str>>(columns: &[S]) -> String {
    parenthesize(&placeholders(&sorted(columns, false)))
}

/// `(:a,:b)`, used as INSERT values.
pub fn placeholder_list_excluding_id<S: AsRef<str>>(columns: &[S]) -> String {
    parenthesize(&placeholders(&sorted(columns, true)))
}

/// `a=:a, b=:b, id=:id`
pub fn assignment_list<S: AsRef<str>>(columns: &[S]) -> String {
    assignments(&sorted(columns, false))
}

/// `a=:a, b=:b`, used as UPDATE SET clause.
pub fn assignment_list_excluding_id<S: AsRef<str>>(columns: &[S]) -> String {
    assignments(&sorted(columns, true))
}

/// Whether the set has at least one column besides `id`.
pub fn has_data_columns<S: AsRef<str>>(columns: &[S]) -> bool {
    columns.iter().any(|c| c.as_ref() != ID_COLUMN)
}
