use std::time::Duration;

use crate::executor::{DriverError, DriverErrorKind};

/// Category of a [`DataError`], stable across context wrapping.
///
/// Inspect failures through [`DataError::kind`] rather than matching on
/// the concrete variant: context labels added on the way up are transparent
/// to `kind()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No entities were supplied where at least one is required.
    EmptyBatch,
    /// Delete requested on an entity with id 0.
    NoIdentifier,
    /// Reported affected (or returned) rows disagree with the batch size.
    RowCountMismatch,
    /// A batch mixes tables or column sets.
    SchemaMismatch,
    /// The reference entity projects no columns besides `id`.
    NoColumns,
    /// A table or column name is not a plain SQL identifier.
    InvalidIdentifier,
    /// The database capability failed (exec, query, scan, cursor).
    ExecutionFailure,
    /// A round trip exceeded the configured statement timeout.
    Timeout,
}

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    EmptyBatch {
        operation: &'static str,
    },
    NoIdentifier {
        table: String,
        index: usize,
    },
    RowCountMismatch {
        expected: u64,
        actual: u64,
    },
    SchemaMismatch {
        index: usize,
        reason: String,
    },
    NoColumns {
        table: String,
    },
    InvalidIdentifier {
        kind: &'static str,
        ident: String,
    },
    /// A returned value could not be read as the requested type.
    Scan {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    /// A returned row could not be deserialized.
    Decode(String),
    Timeout(Duration),
    Database(DriverError),
    /// A lower-level failure wrapped with a static label.
    Context {
        context: &'static str,
        source: Box<DataError>,
    },
}

impl DataError {
    /// Wrap this error with a short static label.
    pub fn context(self, context: &'static str) -> Self {
        DataError::Context {
            context,
            source: Box::new(self),
        }
    }

    /// The innermost error, with every context label peeled off.
    pub fn root(&self) -> &DataError {
        let mut current = self;
        while let DataError::Context { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::EmptyBatch { .. } => ErrorKind::EmptyBatch,
            DataError::NoIdentifier { .. } => ErrorKind::NoIdentifier,
            DataError::RowCountMismatch { .. } => ErrorKind::RowCountMismatch,
            DataError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            DataError::NoColumns { .. } => ErrorKind::NoColumns,
            DataError::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            DataError::Scan { .. } | DataError::Decode(_) | DataError::Database(_) => {
                ErrorKind::ExecutionFailure
            }
            DataError::Timeout(_) => ErrorKind::Timeout,
            DataError::Context { source, .. } => source.kind(),
        }
    }

    /// The driver error at the root, if the failure came from the database.
    pub fn driver(&self) -> Option<&DriverError> {
        match self.root() {
            DataError::Database(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the root cause is a driver error of the given category.
    ///
    /// ```ignore
    /// if err.is_driver(DriverErrorKind::UniqueViolation) { /* conflict */ }
    /// ```
    pub fn is_driver(&self, kind: DriverErrorKind) -> bool {
        self.driver().is_some_and(|e| e.kind() == kind)
    }

    /// Context labels from outermost to innermost.
    pub fn trail(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        let mut current = self;
        while let DataError::Context { context, source } = current {
            labels.push(*context);
            current = source;
        }
        labels
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::EmptyBatch { operation } => {
                write!(f, "no storable entities given to {operation}")
            }
            DataError::NoIdentifier { table, index } => {
                write!(f, "storable entity #{index} for '{table}' has no id")
            }
            DataError::RowCountMismatch { expected, actual } => write!(
                f,
                "the affected rows quantity ({actual}) does not match the given storables ({expected})"
            ),
            DataError::SchemaMismatch { index, reason } => {
                write!(f, "storable entity #{index} does not match the batch schema: {reason}")
            }
            DataError::NoColumns { table } => {
                write!(f, "storable entity for '{table}' has no columns besides id")
            }
            DataError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            DataError::Scan {
                column,
                expected,
                found,
            } => write!(f, "cannot scan column '{column}': expected {expected}, found {found}"),
            DataError::Decode(msg) => write!(f, "row decode error: {msg}"),
            DataError::Timeout(d) => write!(f, "statement timed out after {}ms", d.as_millis()),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::Context { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err),
            DataError::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<DriverError> for DataError {
    fn from(err: DriverError) -> Self {
        DataError::Database(err)
    }
}

/// Attach a context label to the error side of a result.
pub trait ResultExt<T> {
    fn context(self, context: &'static str) -> Result<T, DataError>;
}

impl<T, E: Into<DataError>> ResultExt<T> for Result<T, E> {
    fn context(self, context: &'static str) -> Result<T, DataError> {
        self.map_err(|e| e.into().context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_sees_through_context() {
        let err = DataError::RowCountMismatch {
            expected: 2,
            actual: 1,
        }
        .context("named exec")
        .context("update into db");
        assert_eq!(err.kind(), ErrorKind::RowCountMismatch);
        assert_eq!(err.trail(), vec!["update into db", "named exec"]);
    }

    #[test]
    fn test_display_renders_trail() {
        let err = DataError::from(DriverError::new(DriverErrorKind::Other, "boom"))
            .context("named exec");
        assert_eq!(err.to_string(), "named exec: Database error: boom");
    }

    #[test]
    fn test_is_driver_classifies_root_cause() {
        let result: Result<(), DriverError> =
            Err(DriverError::new(DriverErrorKind::UniqueViolation, "duplicate key"));
        let err = result.context("named query").unwrap_err();
        assert!(err.is_driver(DriverErrorKind::UniqueViolation));
        assert!(!err.is_driver(DriverErrorKind::ForeignKeyViolation));
        assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
    }

    #[test]
    fn test_source_chain_reaches_driver() {
        use std::error::Error;

        let err = DataError::from(DriverError::new(DriverErrorKind::Other, "boom"))
            .context("rows affected");
        let inner = err.source().unwrap();
        assert!(inner.to_string().contains("boom"));
        assert!(inner.source().is_some());
    }
}
