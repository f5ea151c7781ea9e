use std::borrow::Cow;

use futures_util::stream::{self, StreamExt};
use sqlx::any::{Any, AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{AnyConnection, AnyPool};
use tracing::{debug, info};

use storeql_data::executor::{DriverError, DriverErrorKind, NamedExecutor, RowStream};
use storeql_data::{SqlMap, SqlRow, SqlValue, ID_COLUMN};

use crate::config::{DatabaseConfig, InsertStrategy};
use crate::decode::{decode_any_row, decode_json_column};
use crate::error::SqlxErrorExt;
use crate::named::{
    compile_named, compile_named_with, expand_values, rows_as_json, strip_returning,
    CompiledNamed, Dialect,
};
use crate::tx::Tx;

type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Pool-backed executor over the SQLx `Any` driver.
///
/// Every batch runs in its own transaction: a failing row rolls the whole
/// batch back. Use [`begin`](Self::begin) to get a [`Tx`] when several
/// batches must commit together.
///
/// ```ignore
/// let executor = SqlxExecutor::connect(&config.section()?).await?;
/// let writer = BatchWriter::new(&executor);
/// writer.upsert(&mut users).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SqlxExecutor {
    pool: AnyPool,
    runner: Runner,
}

impl SqlxExecutor {
    pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
        Self {
            pool,
            runner: Runner::new(dialect),
        }
    }

    /// Install the compiled-in drivers and open a pool.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DriverError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(SqlxErrorExt::into_driver_error)?;
        info!(
            dialect = %config.dialect,
            max_connections = config.max_connections,
            "database pool ready"
        );
        Ok(Self::new(pool, config.dialect).with_insert_strategy(config.insert_strategy))
    }

    pub fn with_insert_strategy(mut self, strategy: InsertStrategy) -> Self {
        self.runner.insert_strategy = strategy;
        self
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.runner.dialect
    }

    /// Begin a transaction sharing this executor's dialect and strategy.
    pub async fn begin(&self) -> Result<Tx<'static>, DriverError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(SqlxErrorExt::into_driver_error)?;
        Ok(Tx::new(tx, self.runner))
    }
}

impl NamedExecutor for SqlxExecutor {
    async fn exec_named(&self, sql: &str, source: &[SqlMap]) -> Result<u64, DriverError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(SqlxErrorExt::into_driver_error)?;
        let affected = self.runner.exec(&mut *tx, sql, source).await?;
        tx.commit().await.map_err(SqlxErrorExt::into_driver_error)?;
        Ok(affected)
    }

    async fn query_named<'a>(
        &'a self,
        sql: &'a str,
        source: &'a [SqlMap],
    ) -> Result<RowStream<'a>, DriverError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(SqlxErrorExt::into_driver_error)?;
        let rows = self.runner.query(&mut *tx, sql, source).await?;
        tx.commit().await.map_err(SqlxErrorExt::into_driver_error)?;
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    async fn fetch_all(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<SqlRow>, DriverError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(SqlxErrorExt::into_driver_error)?;
        self.runner.fetch(&mut *conn, sql, args).await
    }
}

/// Statement execution on a single connection, shared by the pool executor
/// and [`Tx`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Runner {
    pub(crate) dialect: Dialect,
    pub(crate) insert_strategy: InsertStrategy,
}

impl Runner {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            insert_strategy: InsertStrategy::default(),
        }
    }

    /// Compile `sql` for one bind source, casting values that need it.
    fn compile(&self, sql: &str, map: &SqlMap) -> CompiledNamed {
        let dialect = self.dialect;
        compile_named_with(sql, dialect, |_, name| {
            map.get(name).and_then(|value| dialect.cast_for(value))
        })
    }

    /// The statement actually sent for a row-returning query.
    fn reading<'s>(&self, sql: &'s str) -> Cow<'s, str> {
        if self.dialect.reads_rows_as_json() {
            Cow::Owned(rows_as_json(sql))
        } else {
            Cow::Borrowed(sql)
        }
    }

    fn decode(&self, row: &AnyRow) -> Result<SqlRow, DriverError> {
        if self.dialect.reads_rows_as_json() {
            decode_json_column(row)
        } else {
            decode_any_row(row)
        }
    }

    pub(crate) async fn exec(
        &self,
        conn: &mut AnyConnection,
        sql: &str,
        source: &[SqlMap],
    ) -> Result<u64, DriverError> {
        debug!(sql, rows = source.len(), "exec named");

        // An empty source still runs the statement once, with no bind values.
        let empty = [SqlMap::new()];
        let source = if source.is_empty() { &empty[..] } else { source };

        let mut affected = 0;
        for map in source {
            let compiled = self.compile(sql, map);
            let query = bind_named(sqlx::query(&compiled.sql), &compiled.names, map)?;
            affected += query
                .execute(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_driver_error)?
                .rows_affected();
        }
        Ok(affected)
    }

    pub(crate) async fn query(
        &self,
        conn: &mut AnyConnection,
        sql: &str,
        source: &[SqlMap],
    ) -> Result<Vec<SqlRow>, DriverError> {
        let stripped = strip_returning(sql);
        if !self.dialect.supports_returning() && stripped.len() != sql.len() {
            return self.insert_with_last_id(conn, stripped, source).await;
        }
        if self.insert_strategy == InsertStrategy::MultiRow && source.len() > 1 {
            if let Some(expanded) = expand_values(sql, source.len()) {
                let per_row = compile_named(sql, self.dialect).names.len();
                return self.query_multi_row(conn, &expanded, per_row, source).await;
            }
        }

        debug!(sql, rows = source.len(), "query named");

        let empty = [SqlMap::new()];
        let source = if source.is_empty() { &empty[..] } else { source };

        let mut rows = Vec::with_capacity(source.len());
        for map in source {
            let compiled = self.compile(sql, map);
            let statement = self.reading(&compiled.sql);
            let query = bind_named(sqlx::query(&statement), &compiled.names, map)?;
            let fetched = query
                .fetch_all(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_driver_error)?;
            for row in &fetched {
                rows.push(self.decode(row)?);
            }
        }
        Ok(rows)
    }

    /// One statement for the whole batch; `per_row` is the parameter count
    /// of a single VALUES tuple.
    async fn query_multi_row(
        &self,
        conn: &mut AnyConnection,
        expanded: &str,
        per_row: usize,
        source: &[SqlMap],
    ) -> Result<Vec<SqlRow>, DriverError> {
        let dialect = self.dialect;
        let compiled = compile_named_with(expanded, dialect, |index, name| {
            let map = source.get(index.checked_div(per_row)?)?;
            map.get(name).and_then(|value| dialect.cast_for(value))
        });
        if per_row * source.len() != compiled.names.len() {
            return Err(DriverError::new(
                DriverErrorKind::Bind,
                "named parameters outside the VALUES tuple are not supported for multi-row inserts",
            ));
        }
        debug!(sql = %compiled.sql, rows = source.len(), "multi-row query");

        let statement = self.reading(&compiled.sql);
        let mut query = sqlx::query(&statement);
        for (index, name) in compiled.names.iter().enumerate() {
            query = bind_one(query, name, &source[index / per_row])?;
        }
        let fetched = query
            .fetch_all(&mut *conn)
            .await
            .map_err(SqlxErrorExt::into_driver_error)?;
        fetched.iter().map(|row| self.decode(row)).collect()
    }

    /// INSERT without RETURNING: one statement per row, ids read back from
    /// the driver's last insert id.
    async fn insert_with_last_id(
        &self,
        conn: &mut AnyConnection,
        sql: &str,
        source: &[SqlMap],
    ) -> Result<Vec<SqlRow>, DriverError> {
        debug!(sql, rows = source.len(), "insert reading last insert id");

        let mut rows = Vec::with_capacity(source.len());
        for map in source {
            let compiled = self.compile(sql, map);
            let query = bind_named(sqlx::query(&compiled.sql), &compiled.names, map)?;
            let result = query
                .execute(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_driver_error)?;
            let id = result.last_insert_id().ok_or_else(|| {
                DriverError::new(DriverErrorKind::Other, "driver reported no last insert id")
            })?;
            rows.push(SqlRow::single(ID_COLUMN, id));
        }
        Ok(rows)
    }

    pub(crate) async fn fetch(
        &self,
        conn: &mut AnyConnection,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<Vec<SqlRow>, DriverError> {
        debug!(sql, args = args.len(), "fetch");
        let statement = self.reading(sql);
        let mut query = sqlx::query(&statement);
        for value in args {
            query = bind_value(query, value)?;
        }
        let fetched = query
            .fetch_all(&mut *conn)
            .await
            .map_err(SqlxErrorExt::into_driver_error)?;
        fetched.iter().map(|row| self.decode(row)).collect()
    }
}

fn bind_named<'q>(
    mut query: AnyQuery<'q>,
    names: &[String],
    map: &SqlMap,
) -> Result<AnyQuery<'q>, DriverError> {
    for name in names {
        query = bind_one(query, name, map)?;
    }
    Ok(query)
}

fn bind_one<'q>(query: AnyQuery<'q>, name: &str, map: &SqlMap) -> Result<AnyQuery<'q>, DriverError> {
    let value = map.get(name).ok_or_else(|| {
        DriverError::new(
            DriverErrorKind::Bind,
            format!("no value for named parameter :{name}"),
        )
    })?;
    bind_value(query, value)
}

fn bind_value<'q>(query: AnyQuery<'q>, value: &SqlValue) -> Result<AnyQuery<'q>, DriverError> {
    Ok(match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::UInt(u) => {
            let i = i64::try_from(*u).map_err(|_| {
                DriverError::new(
                    DriverErrorKind::Bind,
                    format!("unsigned value {u} does not fit a signed 64-bit column"),
                )
            })?;
            query.bind(i)
        }
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Bytes(b) => query.bind(b.clone()),
        // Sent as text; `Dialect::cast_for` adds the cast where a column needs it.
        SqlValue::Json(v) => query.bind(v.to_string()),
    })
}
