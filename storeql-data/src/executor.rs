//! The database capability consumed by the batch engine.
//!
//! The engine never talks to a driver directly: it hands fully synthesized
//! named-parameter SQL and the entity projections to a [`NamedExecutor`].
//! `storeql-data-sqlx` provides the SQLx implementation; `storeql-test`
//! provides a scripted stub.

use futures_util::stream::BoxStream;
use std::future::Future;

use crate::value::{SqlMap, SqlRow, SqlValue};

/// Stream of rows produced by a named query.
///
/// Rows are yielded in the order the bind sources were submitted. The stream
/// is the cursor: dropping it releases any driver resources.
pub type RowStream<'a> = BoxStream<'a, Result<SqlRow, DriverError>>;

/// Driver-level categories callers commonly need to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    NotNullViolation,
    CheckViolation,
    /// The connection or pool could not be used.
    Connection,
    /// A named parameter referenced by the SQL is missing from a bind source,
    /// or a value could not be bound.
    Bind,
    Other,
}

/// An error reported by the database capability.
#[derive(Debug)]
pub struct DriverError {
    kind: DriverErrorKind,
    code: Option<String>,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Construct from any driver error, keeping it as the source.
    pub fn wrap(kind: DriverErrorKind, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            kind,
            code: None,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Attach the vendor error code (e.g. a Postgres SQLSTATE).
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Named-parameter execution capability.
///
/// SQL passed to the `*_named` methods references parameters as `:column`;
/// every element of `source` supplies one full set of bindings, and the
/// statement is executed once per element. Implementations must apply a
/// single call atomically (all rows or none).
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait`.
pub trait NamedExecutor: Send + Sync {
    /// Execute `sql` for every bind source and return the total number of
    /// affected rows.
    fn exec_named(
        &self,
        sql: &str,
        source: &[SqlMap],
    ) -> impl Future<Output = Result<u64, DriverError>> + Send;

    /// Execute a row-returning statement for every bind source.
    ///
    /// Returned rows must follow submission order.
    fn query_named<'a>(
        &'a self,
        sql: &'a str,
        source: &'a [SqlMap],
    ) -> impl Future<Output = Result<RowStream<'a>, DriverError>> + Send + 'a;

    /// Run a plain query with positional, driver-native placeholders.
    fn fetch_all(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> impl Future<Output = Result<Vec<SqlRow>, DriverError>> + Send;
}

impl<E: NamedExecutor + ?Sized> NamedExecutor for &E {
    fn exec_named(
        &self,
        sql: &str,
        source: &[SqlMap],
    ) -> impl Future<Output = Result<u64, DriverError>> + Send {
        (**self).exec_named(sql, source)
    }

    fn query_named<'a>(
        &'a self,
        sql: &'a str,
        source: &'a [SqlMap],
    ) -> impl Future<Output = Result<RowStream<'a>, DriverError>> + Send + 'a {
        (**self).query_named(sql, source)
    }

    fn fetch_all(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> impl Future<Output = Result<Vec<SqlRow>, DriverError>> + Send {
        (**self).fetch_all(sql, args)
    }
}
