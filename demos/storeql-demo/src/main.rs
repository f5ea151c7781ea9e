use std::path::Path;

use storeql_data::config::ConfigValue;
use storeql_data::{BatchWriter, DriverErrorKind, StoreConfig, WriteOptions};
use storeql_data_sqlx::{DatabaseConfig, SqlxErrorExt, SqlxExecutor};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod models;

use models::{User, SCHEMA};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storeql_data=debug")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // The demo runs from the workspace root as well as from its own directory.
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut config = StoreConfig::load_from(dir, "dev").unwrap_or_else(|_| StoreConfig::empty());
    if !config.contains_key("storeql.database.url") {
        config.set(
            "storeql.database.url",
            ConfigValue::String("sqlite::memory:".into()),
        );
        config.set("storeql.database.max_connections", ConfigValue::Integer(1));
    }

    let database: DatabaseConfig = config.section()?;
    let options: WriteOptions = config.section()?;
    let executor = SqlxExecutor::connect(&database).await?;
    sqlx::query(SCHEMA)
        .execute(executor.pool())
        .await
        .map_err(|e| e.into_data_error())?;

    let writer = BatchWriter::with_options(&executor, options);

    let mut users = vec![
        User::new("alice", "alice@example.com"),
        User::new("bob", "bob@example.com"),
    ];
    writer.insert(&mut users).await?;
    info!(ids = ?users.iter().map(|u| u.id).collect::<Vec<_>>(), "inserted users");

    users[1].email = "robert@example.com".into();
    users.push(User::new("carol", "carol@example.com"));
    writer.upsert(&mut users).await?;
    info!(carol = users[2].id, "upserted users");

    let mut clash = vec![User::new("mallory", "alice@example.com")];
    if let Err(err) = writer.insert(&mut clash).await {
        if err.is_driver(DriverErrorKind::UniqueViolation) {
            warn!(error = %err, "duplicate email rejected");
        } else {
            return Err(err.into());
        }
    }

    if let Some(row) = writer
        .find_where(&users[0], "email = ?", &["robert@example.com".into()])
        .await?
    {
        let bob: User = row.decode()?;
        info!(?bob, "found by email");
    }

    let deleted = writer.delete(&users[..1]).await?;
    info!(deleted, "deleted alice");

    let remaining = writer.find_many_where(&users[0], "1 = 1", &[]).await?;
    info!(remaining = remaining.len(), "done");
    Ok(())
}
