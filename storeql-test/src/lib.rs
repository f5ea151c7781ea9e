//! Test utilities for storeql.
//!
//! - [`MockExecutor`]: a scripted [`NamedExecutor`](storeql_data::NamedExecutor)
//!   that answers calls from a queue of expectations and records what it saw.
//! - [`fixtures`]: small `Storable` types shared by the test suites.
//! - [`assert_storable`] / [`assert_sql_map`]: checks for hand-written
//!   `Storable` implementations.
//! - [`init_tracing`]: route `tracing` output through the test harness.

pub mod fixtures;
mod mock;
mod storable;

pub use mock::{CallKind, ExpectationBuilder, MockExecutor, RecordedCall};
pub use storable::{assert_sql_map, assert_storable};

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber writing through the test harness.
///
/// Respects `RUST_LOG`; defaults to debug output for the storeql crates.
/// Safe to call from every test: only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storeql_data=debug,storeql_data_sqlx=debug")),
        )
        .with_test_writer()
        .try_init();
}
