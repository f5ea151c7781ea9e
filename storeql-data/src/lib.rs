//! # storeql-data — entity-to-SQL mapping and batched writes
//!
//! Implement [`Storable`] for an application type, hand a slice of them to a
//! [`BatchWriter`], and the writer synthesizes named-parameter SQL from the
//! first entity, runs it through a [`NamedExecutor`] and writes identifiers
//! and row counts back onto the entities.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`storable`] | The entity contract |
//! | [`value`] | Bindable values, projections and returned rows |
//! | [`fragment`] | Column, placeholder and assignment lists |
//! | [`statement`] | Full INSERT / UPDATE / DELETE / SELECT templates |
//! | [`executor`] | The database capability consumed by the writer |
//! | [`batch`] | The batch write engine |
//! | [`config`] | Layered YAML + env configuration |
//!
//! The driver lives in `storeql-data-sqlx`.

pub mod batch;
pub mod config;
pub mod error;
pub mod executor;
pub mod fragment;
pub mod naming;
pub mod options;
pub mod statement;
pub mod storable;
pub mod value;

pub use batch::BatchWriter;
pub use config::{ConfigError, ConfigProperties, StoreConfig};
pub use error::{DataError, ErrorKind, ResultExt};
pub use executor::{DriverError, DriverErrorKind, NamedExecutor, RowStream};
pub use options::WriteOptions;
pub use statement::Action;
pub use storable::{Storable, ID_COLUMN};
pub use value::{FromSqlValue, SqlMap, SqlRow, SqlValue};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        BatchWriter, DataError, ErrorKind, NamedExecutor, SqlMap, SqlValue, Storable,
        WriteOptions,
    };
}
