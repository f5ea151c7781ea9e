use futures_util::StreamExt;
use std::future::Future;
use tracing::{debug, warn};

use crate::error::{DataError, ResultExt};
use crate::executor::{DriverError, NamedExecutor};
use crate::naming::check_identifier;
use crate::options::WriteOptions;
use crate::statement::{checked_boilerplate, select_where, Action};
use crate::storable::{Storable, ID_COLUMN};
use crate::value::{SqlMap, SqlRow, SqlValue};

/// Batched insert / update / upsert / delete over any [`Storable`].
///
/// The first element of every batch is the schema reference: its table name
/// and column set are used to synthesize the statement for the whole batch.
/// With [`WriteOptions::validate_schema`] (the default) the other elements
/// are checked against it before the database is touched.
///
/// The writer holds no mutable state of its own; share it freely as long as
/// the executor is safe to share (a pool handle is).
///
/// # Example
///
/// ```ignore
/// let writer = BatchWriter::new(SqlxExecutor::new(pool));
/// let mut users = vec![User::new("alice"), User::new("bob")];
/// writer.insert(&mut users).await?;
/// assert!(users.iter().all(|u| u.id() != 0));
/// ```
#[derive(Debug, Clone)]
pub struct BatchWriter<E> {
    executor: E,
    options: WriteOptions,
}

impl<E: NamedExecutor> BatchWriter<E> {
    pub fn new(executor: E) -> Self {
        Self::with_options(executor, WriteOptions::default())
    }

    pub fn with_options(executor: E, options: WriteOptions) -> Self {
        Self { executor, options }
    }

    /// Get the underlying executor reference.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Insert every entity and assign the identifiers returned by the
    /// database, by position.
    ///
    /// Fails with `EmptyBatch` on an empty slice. Identifiers already
    /// assigned when a later row fails are left in place.
    pub async fn insert<S: Storable>(&self, batch: &mut [S]) -> Result<(), DataError> {
        let (sql, sources) = self.prepare(Action::Insert, "insert", batch)?;
        let expected = batch.len();
        debug!(table = batch[0].table_name(), rows = expected, "inserting batch");

        let mut rows = self
            .round_trip(self.executor.query_named(&sql, &sources))
            .await
            .context("named query")?;

        let mut assigned = 0usize;
        while let Some(row) = self.deadline(rows.next()).await.context("cursor err")? {
            let row = row.context("cursor err")?;
            let id = scan_id(&row).context("id scan")?;
            let Some(entity) = batch.get_mut(assigned) else {
                warn!(expected, "database returned more ids than rows inserted");
                return Err(DataError::RowCountMismatch {
                    expected: expected as u64,
                    actual: assigned as u64 + 1,
                });
            };
            entity.set_id(id);
            assigned += 1;
        }

        if assigned != expected {
            warn!(expected, returned = assigned, "database returned fewer ids than rows inserted");
            return Err(DataError::RowCountMismatch {
                expected: expected as u64,
                actual: assigned as u64,
            });
        }
        Ok(())
    }

    /// Update every entity by id.
    ///
    /// An empty batch is a no-op. The database must report exactly one
    /// affected row per entity, otherwise the call fails with
    /// `RowCountMismatch` even though the statement itself succeeded.
    pub async fn update<S: Storable>(&self, batch: &[S]) -> Result<(), DataError> {
        if batch.is_empty() {
            return Ok(());
        }
        let (sql, sources) = self.prepare(Action::Update, "update", batch)?;
        debug!(table = batch[0].table_name(), rows = batch.len(), "updating batch");

        let affected = self
            .round_trip(self.executor.exec_named(&sql, &sources))
            .await
            .context("named exec")?;

        let expected = batch.len() as u64;
        if affected != expected {
            warn!(expected, affected, "update affected row count mismatch");
            return Err(DataError::RowCountMismatch {
                expected,
                actual: affected,
            });
        }
        Ok(())
    }

    /// Delete every entity's row by id and return the affected row count.
    ///
    /// Fails with `EmptyBatch` on an empty slice and with `NoIdentifier` if
    /// any entity was never persisted; both checks happen before the
    /// database is touched. The affected row count is not verified.
    pub async fn delete<S: Storable>(&self, batch: &[S]) -> Result<u64, DataError> {
        if let Some(index) = batch.iter().position(|s| !s.is_persisted()) {
            return Err(DataError::NoIdentifier {
                table: batch[index].table_name().to_string(),
                index,
            });
        }
        let (sql, sources) = self.prepare(Action::Delete, "delete", batch)?;
        debug!(table = batch[0].table_name(), rows = batch.len(), "deleting batch");

        self.round_trip(self.executor.exec_named(&sql, &sources))
            .await
            .context("named exec")
    }

    /// Delete a single entity. Same policy as [`delete`](Self::delete): an
    /// unpersisted entity fails with `NoIdentifier`.
    pub async fn delete_one<S: Storable>(&self, entity: &S) -> Result<u64, DataError> {
        self.delete(std::slice::from_ref(entity)).await
    }

    /// Update the persisted entities, then insert the others.
    ///
    /// Entities with id 0 are inserted, the rest updated; relative order is
    /// kept inside each group. The two halves are separate round trips: if
    /// the insert fails, the update stays applied. Run the writer over a
    /// transactional executor when both halves must commit together.
    pub async fn upsert<S: Storable>(&self, batch: &mut [S]) -> Result<(), DataError> {
        if batch.is_empty() {
            return Err(DataError::EmptyBatch { operation: "upsert" });
        }
        let (mut inserts, updates): (Vec<&mut S>, Vec<&mut S>) =
            batch.iter_mut().partition(|s| !s.is_persisted());
        debug!(inserts = inserts.len(), updates = updates.len(), "upserting batch");

        self.update(updates.as_slice()).await.context("update into db")?;
        if !inserts.is_empty() {
            self.insert(inserts.as_mut_slice()).await.context("insert into db")?;
        }
        Ok(())
    }

    /// First row of `SELECT * FROM <table> WHERE <clause>`.
    ///
    /// `reference` only supplies the table name. `clause` uses the driver's
    /// native positional placeholders (`$1` or `?`).
    pub async fn find_where<S: Storable + ?Sized>(
        &self,
        reference: &S,
        clause: &str,
        args: &[SqlValue],
    ) -> Result<Option<SqlRow>, DataError> {
        Ok(self
            .find_many_where(reference, clause, args)
            .await?
            .into_iter()
            .next())
    }

    /// All rows of `SELECT * FROM <table> WHERE <clause>`.
    pub async fn find_many_where<S: Storable + ?Sized>(
        &self,
        reference: &S,
        clause: &str,
        args: &[SqlValue],
    ) -> Result<Vec<SqlRow>, DataError> {
        let table = reference.table_name();
        if self.options.validate_identifiers {
            check_identifier(table, "table")?;
        }
        let sql = select_where(table, clause);
        self.round_trip(self.executor.fetch_all(&sql, args))
            .await
            .context("query")
    }

    /// Project the batch and synthesize the statement from its first element.
    fn prepare<S: Storable>(
        &self,
        action: Action,
        operation: &'static str,
        batch: &[S],
    ) -> Result<(String, Vec<SqlMap>), DataError> {
        let Some(reference) = batch.first() else {
            return Err(DataError::EmptyBatch { operation });
        };
        let sources: Vec<SqlMap> = batch.iter().map(Storable::sql_map).collect();
        if self.options.validate_schema {
            check_schema(batch, &sources)?;
        }
        let sql = {
            let columns: Vec<&str> = sources[0].columns().collect();
            checked_boilerplate(
                action,
                reference.table_name(),
                &columns,
                self.options.validate_identifiers,
            )?
        };
        Ok((sql, sources))
    }

    /// Await `fut`, bounded by the configured statement timeout.
    async fn deadline<F: Future>(&self, fut: F) -> Result<F::Output, DataError> {
        match self.options.statement_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                warn!(timeout_ms = limit.as_millis() as u64, "statement timed out");
                DataError::Timeout(limit)
            }),
            None => Ok(fut.await),
        }
    }

    async fn round_trip<T, F>(&self, fut: F) -> Result<T, DataError>
    where
        F: Future<Output = Result<T, DriverError>>,
    {
        Ok(self.deadline(fut).await??)
    }
}

fn check_schema<S: Storable>(batch: &[S], sources: &[SqlMap]) -> Result<(), DataError> {
    let table = batch[0].table_name();
    let reference = &sources[0];
    if !reference.contains(ID_COLUMN) {
        return Err(DataError::SchemaMismatch {
            index: 0,
            reason: format!("projection for '{table}' has no '{ID_COLUMN}' column"),
        });
    }
    for (index, (entity, source)) in batch.iter().zip(sources).enumerate().skip(1) {
        if entity.table_name() != table {
            return Err(DataError::SchemaMismatch {
                index,
                reason: format!("table '{}' differs from '{table}'", entity.table_name()),
            });
        }
        if !source.same_columns(reference) {
            return Err(DataError::SchemaMismatch {
                index,
                reason: format!("column set differs from the first '{table}' entity"),
            });
        }
    }
    Ok(())
}

fn scan_id(row: &SqlRow) -> Result<u64, DataError> {
    let id: u64 = row.get_at(0)?;
    if id == 0 {
        return Err(DataError::Scan {
            column: ID_COLUMN.to_string(),
            expected: "non-zero id",
            found: "zero",
        });
    }
    Ok(id)
}
