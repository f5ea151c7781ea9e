//! Caller-owned transactions.
//!
//! [`Tx`] lets several engine calls share one transaction, e.g. to make both
//! halves of an upsert commit together:
//!
//! ```ignore
//! let tx = executor.begin().await?;
//! BatchWriter::new(&tx).upsert(&mut users).await?;
//! tx.commit().await?;
//! ```
//!
//! Dropping a `Tx` without committing rolls it back.

use futures_util::stream::{self, StreamExt};
use sqlx::any::Any;
use sqlx::AnyPool;
use sqlx::Transaction;
use tokio::sync::Mutex;

use storeql_data::executor::{DriverError, NamedExecutor, RowStream};
use storeql_data::{SqlMap, SqlRow, SqlValue};

use crate::error::SqlxErrorExt;
use crate::executor::Runner;
use crate::named::Dialect;

/// A SQLx transaction usable as a [`NamedExecutor`].
///
/// The engine only hands out `&self`, so the transaction sits behind an async
/// mutex; calls through one `Tx` are serialized.
pub struct Tx<'c> {
    inner: Mutex<Transaction<'c, Any>>,
    runner: Runner,
}

impl Tx<'static> {
    /// Begin a transaction on `pool`.
    pub async fn begin(pool: &AnyPool, dialect: Dialect) -> Result<Self, DriverError> {
        let tx = pool.begin().await.map_err(SqlxErrorExt::into_driver_error)?;
        Ok(Tx::new(tx, Runner::new(dialect)))
    }
}

impl<'c> Tx<'c> {
    pub(crate) fn new(tx: Transaction<'c, Any>, runner: Runner) -> Self {
        Self {
            inner: Mutex::new(tx),
            runner,
        }
    }

    /// Wrap a transaction begun elsewhere.
    pub fn from_transaction(tx: Transaction<'c, Any>, dialect: Dialect) -> Self {
        Tx::new(tx, Runner::new(dialect))
    }

    pub fn dialect(&self) -> Dialect {
        self.runner.dialect
    }

    pub async fn commit(self) -> Result<(), DriverError> {
        self.inner
            .into_inner()
            .commit()
            .await
            .map_err(SqlxErrorExt::into_driver_error)
    }

    pub async fn rollback(self) -> Result<(), DriverError> {
        self.inner
            .into_inner()
            .rollback()
            .await
            .map_err(SqlxErrorExt::into_driver_error)
    }

    /// Unwraps the `Tx` into the inner `Transaction`.
    pub fn into_inner(self) -> Transaction<'c, Any> {
        self.inner.into_inner()
    }
}

impl NamedExecutor for Tx<'_> {
    async fn exec_named(&self, sql: &str, source: &[SqlMap]) -> Result<u64, DriverError> {
        let mut tx = self.inner.lock().await;
        self.runner.exec(&mut **tx, sql, source).await
    }

    async fn query_named<'a>(
        &'a self,
        sql: &'a str,
        source: &'a [SqlMap],
    ) -> Result<RowStream<'a>, DriverError> {
        let mut tx = self.inner.lock().await;
        let rows = self.runner.query(&mut **tx, sql, source).await?;
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    async fn fetch_all(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<SqlRow>, DriverError> {
        let mut tx = self.inner.lock().await;
        self.runner.fetch(&mut **tx, sql, args).await
    }
}
