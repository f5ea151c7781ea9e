use sqlx::error::ErrorKind as SqlxErrorKind;
use storeql_data::{DataError, DriverError, DriverErrorKind};

/// Extension trait for converting `sqlx::Error` into the data layer's errors.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error>` for
/// `DriverError` in this crate. Use `.into_driver_error()` (or
/// `.into_data_error()` outside the executor seam) instead.
pub trait SqlxErrorExt {
    fn into_driver_error(self) -> DriverError;

    fn into_data_error(self) -> DataError
    where
        Self: Sized,
    {
        DataError::Database(self.into_driver_error())
    }
}

impl SqlxErrorExt for sqlx::Error {
    fn into_driver_error(self) -> DriverError {
        let (kind, code) = match &self {
            sqlx::Error::Database(db) => {
                let kind = match db.kind() {
                    SqlxErrorKind::UniqueViolation => DriverErrorKind::UniqueViolation,
                    SqlxErrorKind::ForeignKeyViolation => DriverErrorKind::ForeignKeyViolation,
                    SqlxErrorKind::NotNullViolation => DriverErrorKind::NotNullViolation,
                    SqlxErrorKind::CheckViolation => DriverErrorKind::CheckViolation,
                    _ => DriverErrorKind::Other,
                };
                (kind, db.code().map(|c| c.into_owned()))
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => (DriverErrorKind::Connection, None),
            sqlx::Error::Encode(_)
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::ColumnNotFound(_) => (DriverErrorKind::Bind, None),
            _ => (DriverErrorKind::Other, None),
        };

        let err = DriverError::wrap(kind, self);
        match code {
            Some(code) => err.with_code(code),
            None => err,
        }
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;
