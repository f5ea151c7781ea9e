//! # storeql-data-sqlx — SQLx backend for the storeql batch engine
//!
//! This crate provides the [SQLx](https://github.com/launchbadge/sqlx)
//! implementation of the executor capability declared in [`storeql-data`].
//! It compiles `:name` parameters to the target's positional placeholders,
//! runs batches over the `Any` driver, and maps driver errors into
//! `DriverErrorKind`s.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlxExecutor`] | Pool-backed executor, one transaction per batch |
//! | [`Tx`] | Caller-owned transaction usable as an executor |
//! | [`DatabaseConfig`] | `storeql.database` config section |
//! | [`InsertStrategy`] | Per-row or multi-row `VALUES` inserts |
//! | [`Dialect`] | Placeholder flavour (`$n` or `?`) and per-database quirks |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DriverError` (`.into_driver_error()`) |
//!
//! # Feature flags
//!
//! Enable the drivers you need:
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! # Quick start
//!
//! ```toml
//! [dependencies]
//! storeql-data-sqlx = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! ```ignore
//! use storeql_data::{BatchWriter, StoreConfig};
//! use storeql_data_sqlx::{DatabaseConfig, SqlxExecutor};
//!
//! let config = StoreConfig::load("dev")?;
//! let executor = SqlxExecutor::connect(&config.section::<DatabaseConfig>()?).await?;
//! let writer = BatchWriter::with_options(&executor, config.section()?);
//!
//! writer.insert(&mut users).await?;
//! ```
//!
//! # Postgres
//!
//! JSON values are bound as text with a `::jsonb` cast. Rows are read back as
//! `row_to_json` text, so columns the `Any` driver has no mapping for
//! (`timestamptz`, `numeric`, `uuid`, `date`) still decode, as text.
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DriverError` can't be
//! implemented here. Use the [`SqlxErrorExt`] trait instead:
//!
//! ```ignore
//! use storeql_data_sqlx::SqlxErrorExt;
//!
//! sqlx::query("CREATE TABLE ...")
//!     .execute(executor.pool())
//!     .await
//!     .map_err(|e| e.into_data_error())?;
//! ```

pub mod config;
mod decode;
pub mod error;
pub mod executor;
pub mod named;
pub mod tx;

pub use config::{DatabaseConfig, InsertStrategy};
pub use error::{SqlxErrorExt, SqlxResult};
pub use executor::SqlxExecutor;
pub use named::{compile_named, compile_named_with, CompiledNamed, Dialect};
pub use tx::Tx;

/// Re-exports of the most commonly used types from both `storeql-data` and this crate.
pub mod prelude {
    pub use crate::{DatabaseConfig, Dialect, InsertStrategy, SqlxErrorExt, SqlxExecutor, Tx};
    pub use storeql_data::prelude::*;
}
