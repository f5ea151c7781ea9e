//! Named-parameter compilation.
//!
//! Statements are written with `:name` parameters. Drivers only understand
//! positional ones, so the text is rewritten per [`Dialect`] and the parameter
//! names are kept in order for binding:
//!
//! ```ignore
//! let compiled = compile_named("UPDATE t SET a=:a WHERE id=:id", Dialect::Postgres);
//! assert_eq!(compiled.sql, "UPDATE t SET a=$1 WHERE id=$2");
//! assert_eq!(compiled.names, ["a", "id"]);
//! ```
//!
//! `::` (Postgres casts) and anything inside quotes is left alone.

use std::fmt;
use std::str::FromStr;

use storeql_data::SqlValue;

/// Placeholder flavour of the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `?` placeholders, no dialect-specific behaviour.
    #[default]
    Generic,
    Sqlite,
    MySql,
    Postgres,
}

impl Dialect {
    /// Guess the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Self {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Dialect::Postgres,
            "sqlite" => Dialect::Sqlite,
            "mysql" | "mariadb" => Dialect::MySql,
            _ => Dialect::Generic,
        }
    }

    /// Positional placeholder for the `position`-th parameter (1-based).
    pub fn placeholder(self, position: usize) -> String {
        match self {
            Dialect::Postgres => format!("${position}"),
            _ => "?".to_string(),
        }
    }

    /// Whether `INSERT ... RETURNING` is understood.
    pub fn supports_returning(self) -> bool {
        !matches!(self, Dialect::MySql)
    }

    /// Explicit cast needed for `value` to reach a typed column.
    ///
    /// JSON is sent as text; Postgres only assigns text to `json`/`jsonb`
    /// columns through a cast.
    pub fn cast_for(self, value: &SqlValue) -> Option<&'static str> {
        match (self, value) {
            (Dialect::Postgres, SqlValue::Json(_)) => Some("jsonb"),
            _ => None,
        }
    }

    /// Whether result rows are read back as JSON text (see [`rows_as_json`]).
    ///
    /// Postgres has many column types the `Any` driver cannot decode
    /// (`timestamptz`, `numeric`, `uuid`, `date`, ...); serializing the row
    /// server-side keeps every column readable.
    pub fn reads_rows_as_json(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Ok(Dialect::Generic),
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            other => Err(format!("unknown dialect: {other}")),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::Generic => "generic",
            Dialect::Sqlite => "sqlite",
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
        })
    }
}

/// A statement rewritten to positional placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledNamed {
    pub sql: String,
    /// Parameter names in placeholder order; repeats are kept.
    pub names: Vec<String>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Rewrite every `:name` in `sql` to the dialect's positional placeholder.
pub fn compile_named(sql: &str, dialect: Dialect) -> CompiledNamed {
    compile_named_with(sql, dialect, |_, _| None)
}

/// Like [`compile_named`], with `cast(occurrence, name)` choosing a type to
/// append as `::type` after the placeholder.
pub fn compile_named_with<F>(sql: &str, dialect: Dialect, mut cast: F) -> CompiledNamed
where
    F: FnMut(usize, &str) -> Option<&'static str>,
{
    let mut out = String::with_capacity(sql.len());
    let mut names = Vec::new();
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            ':' if chars.peek() == Some(&':') => {
                out.push_str("::");
                chars.next();
            }
            ':' if chars.peek().copied().is_some_and(is_ident_start) => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if !is_ident_char(n) {
                        break;
                    }
                    name.push(n);
                    chars.next();
                }
                out.push_str(&dialect.placeholder(names.len() + 1));
                if let Some(ty) = cast(names.len(), &name) {
                    out.push_str("::");
                    out.push_str(ty);
                }
                names.push(name);
            }
            _ => out.push(c),
        }
    }

    CompiledNamed { sql: out, names }
}

/// Repeat the `VALUES (...)` tuple of an INSERT `rows` times.
///
/// Returns `None` when the statement has no parenthesized VALUES tuple.
pub fn expand_values(sql: &str, rows: usize) -> Option<String> {
    let upper = sql.to_ascii_uppercase();
    let keyword = upper.find(" VALUES ")?;
    let open = keyword + " VALUES ".len();
    if sql.as_bytes().get(open) != Some(&b'(') {
        return None;
    }

    let mut depth = 0usize;
    let mut close = None;
    for (offset, byte) in sql.as_bytes()[open..].iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + offset);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = close?;

    let tuple = &sql[open..=close];
    let expanded = vec![tuple; rows.max(1)].join(", ");
    Some(format!("{}{}{}", &sql[..open], expanded, &sql[close + 1..]))
}

/// Wrap a row-returning statement so each row comes back as one JSON text
/// column, keys in column order.
///
/// A CTE rather than a subquery, so `INSERT ... RETURNING` can be wrapped too.
pub fn rows_as_json(sql: &str) -> String {
    let inner = sql.trim().trim_end_matches(';');
    format!("WITH q AS ({inner}) SELECT row_to_json(q)::text FROM q")
}

/// Drop a trailing `RETURNING ...` clause.
pub fn strip_returning(sql: &str) -> &str {
    match sql.to_ascii_uppercase().rfind(" RETURNING ") {
        Some(at) => sql[..at].trim_end(),
        None => sql,
    }
}
