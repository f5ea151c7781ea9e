use futures_util::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use storeql_data::executor::{DriverError, DriverErrorKind, NamedExecutor, RowStream};
use storeql_data::{SqlMap, SqlRow, SqlValue};

/// Which executor method a call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Exec,
    Query,
    Fetch,
}

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub sql: String,
    /// Named bind sources (`Exec` / `Query`).
    pub source: Vec<SqlMap>,
    /// Positional arguments (`Fetch`).
    pub args: Vec<SqlValue>,
}

enum Reply {
    Affected(u64),
    Rows(Vec<Result<SqlRow, DriverError>>),
    Error(DriverError),
}

struct Expectation {
    kind: CallKind,
    sql: String,
    delay: Option<Duration>,
    /// `(row index, delay)`: hold a cursor back before yielding that row.
    stalls: Vec<(usize, Duration)>,
    reply: Reply,
}

/// Scripted stand-in for a database.
///
/// Expectations are consumed in order; each call must match the kind and
/// contain the expected SQL fragment, otherwise it fails with a driver error
/// describing the mismatch.
///
/// ```ignore
/// let db = MockExecutor::new();
/// db.expect_query("INSERT INTO entities_stub").returning_ids([10, 20]);
/// db.expect_exec("UPDATE entities_stub").rows_affected(1);
///
/// let writer = BatchWriter::new(&db);
/// writer.insert(&mut batch).await?;
/// db.assert_done();
/// ```
#[derive(Default)]
pub struct MockExecutor {
    expectations: Mutex<VecDeque<Expectation>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect an `exec_named` call whose SQL contains `sql`.
    pub fn expect_exec(&self, sql: &str) -> ExpectationBuilder<'_> {
        ExpectationBuilder::new(self, CallKind::Exec, sql)
    }

    /// Expect a `query_named` call whose SQL contains `sql`.
    pub fn expect_query(&self, sql: &str) -> ExpectationBuilder<'_> {
        ExpectationBuilder::new(self, CallKind::Query, sql)
    }

    /// Expect a `fetch_all` call whose SQL contains `sql`.
    pub fn expect_fetch(&self, sql: &str) -> ExpectationBuilder<'_> {
        ExpectationBuilder::new(self, CallKind::Fetch, sql)
    }

    /// Every call seen so far, matched or not.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Number of expectations not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.expectations).len()
    }

    /// Panic if any expectation was not consumed.
    pub fn assert_done(&self) {
        let pending: Vec<String> = lock(&self.expectations)
            .iter()
            .map(|e| format!("{:?} `{}`", e.kind, e.sql))
            .collect();
        assert!(pending.is_empty(), "unmet expectations: {pending:?}");
    }

    fn push(&self, expectation: Expectation) {
        lock(&self.expectations).push_back(expectation);
    }

    fn take(
        &self,
        kind: CallKind,
        sql: &str,
        source: &[SqlMap],
        args: &[SqlValue],
    ) -> Result<Expectation, DriverError> {
        lock(&self.calls).push(RecordedCall {
            kind,
            sql: sql.to_string(),
            source: source.to_vec(),
            args: args.to_vec(),
        });

        let mut queue = lock(&self.expectations);
        match queue.front() {
            Some(next) if next.kind == kind && sql.contains(&next.sql) => {}
            Some(next) => {
                return Err(DriverError::new(
                    DriverErrorKind::Other,
                    format!(
                        "unexpected {kind:?} call `{sql}`, next expectation is {:?} `{}`",
                        next.kind, next.sql
                    ),
                ))
            }
            None => {
                return Err(DriverError::new(
                    DriverErrorKind::Other,
                    format!("unexpected {kind:?} call `{sql}`, no expectations left"),
                ))
            }
        }
        queue.pop_front().ok_or_else(|| {
            DriverError::new(DriverErrorKind::Other, "expectation queue drained concurrently")
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn wrong_reply(kind: CallKind) -> DriverError {
    DriverError::new(
        DriverErrorKind::Other,
        format!("expectation for {kind:?} call has an incompatible reply"),
    )
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

impl NamedExecutor for MockExecutor {
    async fn exec_named(&self, sql: &str, source: &[SqlMap]) -> Result<u64, DriverError> {
        let expectation = self.take(CallKind::Exec, sql, source, &[])?;
        pause(expectation.delay).await;
        match expectation.reply {
            Reply::Affected(n) => Ok(n),
            Reply::Error(err) => Err(err),
            Reply::Rows(_) => Err(wrong_reply(CallKind::Exec)),
        }
    }

    async fn query_named<'a>(
        &'a self,
        sql: &'a str,
        source: &'a [SqlMap],
    ) -> Result<RowStream<'a>, DriverError> {
        let expectation = self.take(CallKind::Query, sql, source, &[])?;
        pause(expectation.delay).await;
        let stalls = expectation.stalls;
        match expectation.reply {
            Reply::Rows(rows) => Ok(stream::iter(rows.into_iter().enumerate())
                .then(move |(index, row)| {
                    let stall = stalls
                        .iter()
                        .find(|(at, _)| *at == index)
                        .map(|(_, delay)| *delay);
                    async move {
                        pause(stall).await;
                        row
                    }
                })
                .boxed()),
            Reply::Error(err) => Err(err),
            Reply::Affected(_) => Err(wrong_reply(CallKind::Query)),
        }
    }

    async fn fetch_all(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<SqlRow>, DriverError> {
        let expectation = self.take(CallKind::Fetch, sql, &[], args)?;
        pause(expectation.delay).await;
        match expectation.reply {
            Reply::Rows(rows) => rows.into_iter().collect(),
            Reply::Error(err) => Err(err),
            Reply::Affected(_) => Err(wrong_reply(CallKind::Fetch)),
        }
    }
}

/// Configures the reply of one expectation; finish with one of the
/// terminal methods.
pub struct ExpectationBuilder<'m> {
    mock: &'m MockExecutor,
    kind: CallKind,
    sql: String,
    delay: Option<Duration>,
    stalls: Vec<(usize, Duration)>,
}

impl<'m> ExpectationBuilder<'m> {
    fn new(mock: &'m MockExecutor, kind: CallKind, sql: &str) -> Self {
        Self {
            mock,
            kind,
            sql: sql.to_string(),
            delay: None,
            stalls: Vec::new(),
        }
    }

    /// Hold the reply back for `delay` (drives timeout tests).
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Hold a query's cursor back for `delay` before it yields row `index`
    /// (0-based). Earlier rows are delivered immediately.
    pub fn stall_before_row(mut self, index: usize, delay: Duration) -> Self {
        self.stalls.push((index, delay));
        self
    }

    /// Reply to an exec with an affected row count.
    pub fn rows_affected(self, n: u64) {
        self.finish(Reply::Affected(n));
    }

    /// Reply to a query with one `id` row per value, in order.
    pub fn returning_ids(self, ids: impl IntoIterator<Item = i64>) {
        let rows = ids
            .into_iter()
            .map(|id| Ok(SqlRow::single("id", id)))
            .collect();
        self.finish(Reply::Rows(rows));
    }

    /// Reply with the given rows.
    pub fn returning_rows(self, rows: Vec<SqlRow>) {
        self.finish(Reply::Rows(rows.into_iter().map(Ok).collect()));
    }

    /// Reply with a cursor that may fail part-way through.
    pub fn returning_cursor(self, rows: Vec<Result<SqlRow, DriverError>>) {
        self.finish(Reply::Rows(rows));
    }

    /// Fail the call itself.
    pub fn failing(self, err: DriverError) {
        self.finish(Reply::Error(err));
    }

    fn finish(self, reply: Reply) {
        self.mock.push(Expectation {
            kind: self.kind,
            sql: self.sql,
            delay: self.delay,
            stalls: self.stalls,
            reply,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expectations_consumed_in_order() {
        let db = MockExecutor::new();
        db.expect_exec("UPDATE t").rows_affected(2);
        db.expect_query("INSERT INTO t").returning_ids([5]);

        assert_eq!(db.exec_named("UPDATE t SET a=:a", &[]).await.unwrap(), 2);
        let rows: Vec<_> = db
            .query_named("INSERT INTO t (a)", &[])
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(rows.len(), 1);
        db.assert_done();
        assert_eq!(db.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unexpected_call_is_an_error_and_recorded() {
        let db = MockExecutor::new();
        db.expect_exec("DELETE FROM t").rows_affected(1);

        let err = db.exec_named("UPDATE t SET a=:a", &[]).await.unwrap_err();
        assert!(err.message().contains("unexpected"));
        assert_eq!(db.remaining(), 1);
        assert_eq!(db.calls()[0].sql, "UPDATE t SET a=:a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_stalls_before_the_given_row() {
        let db = MockExecutor::new();
        db.expect_query("INSERT INTO t")
            .stall_before_row(1, Duration::from_secs(5))
            .returning_ids([1, 2]);

        let mut rows = db.query_named("INSERT INTO t (a)", &[]).await.unwrap();
        let limit = Duration::from_millis(10);

        let first = tokio::time::timeout(limit, rows.next()).await.unwrap();
        assert_eq!(first.unwrap().unwrap(), SqlRow::single("id", 1i64));
        assert!(tokio::time::timeout(limit, rows.next()).await.is_err());

        let second = rows.next().await.unwrap().unwrap();
        assert_eq!(second, SqlRow::single("id", 2i64));
        assert!(rows.next().await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_records_positional_args() {
        let db = MockExecutor::new();
        db.expect_fetch("SELECT * FROM t")
            .returning_rows(vec![SqlRow::single("id", 1i64)]);

        let rows = db
            .fetch_all("SELECT * FROM t WHERE id = $1", &[SqlValue::Int(1)])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(db.calls()[0].args, vec![SqlValue::Int(1)]);
    }
}
