use std::str::FromStr;

use storeql_data::config::{ConfigError, ConfigProperties, ConfigValue, FromConfigValue, StoreConfig};

use crate::named::Dialect;

/// How a batched INSERT reaches the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertStrategy {
    /// One statement per row, in submission order, inside one transaction.
    /// Returned ids always line up with the batch.
    #[default]
    PerRow,
    /// A single statement with one `VALUES` tuple per row. Relies on the
    /// database returning ids in tuple order.
    MultiRow,
}

impl FromStr for InsertStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_row" => Ok(InsertStrategy::PerRow),
            "multi_row" => Ok(InsertStrategy::MultiRow),
            other => Err(format!("unknown insert strategy: {other}")),
        }
    }
}

fn parse_string<T: FromStr<Err = String>>(value: &ConfigValue, key: &str) -> Result<T, ConfigError> {
    String::from_config_value(value, key)?
        .parse()
        .map_err(|reason| ConfigError::Invalid {
            key: key.to_string(),
            reason,
        })
}

impl FromConfigValue for InsertStrategy {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        parse_string(value, key)
    }
}

impl FromConfigValue for Dialect {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        parse_string(value, key)
    }
}

/// Connection settings, loaded from the `storeql.database` section:
///
/// ```yaml
/// storeql:
///   database:
///     url: "postgres://app@localhost/app"
///     max_connections: 10
///     insert_strategy: per_row
/// ```
///
/// `dialect` is optional and derived from the URL scheme when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub dialect: Dialect,
    pub insert_strategy: InsertStrategy,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            dialect: Dialect::from_url(&url),
            url,
            max_connections: 5,
            insert_strategy: InsertStrategy::default(),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn insert_strategy(mut self, strategy: InsertStrategy) -> Self {
        self.insert_strategy = strategy;
        self
    }
}

impl ConfigProperties for DatabaseConfig {
    fn prefix() -> &'static str {
        "storeql.database"
    }

    fn from_config(config: &StoreConfig) -> Result<Self, ConfigError> {
        let url: String = config.get(&StoreConfig::key_in::<Self>("url"))?;
        let defaults = DatabaseConfig::new(url);

        let max_key = StoreConfig::key_in::<Self>("max_connections");
        let max_connections = config
            .get_opt::<u32>(&max_key)?
            .unwrap_or(defaults.max_connections);
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: max_key,
                reason: "pool needs at least one connection".into(),
            });
        }

        Ok(Self {
            max_connections,
            dialect: config
                .get_opt(&StoreConfig::key_in::<Self>("dialect"))?
                .unwrap_or(defaults.dialect),
            insert_strategy: config
                .get_opt(&StoreConfig::key_in::<Self>("insert_strategy"))?
                .unwrap_or(defaults.insert_strategy),
            url: defaults.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_is_required() {
        assert!(matches!(
            StoreConfig::empty().section::<DatabaseConfig>(),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_dialect_derived_from_url() {
        let config = StoreConfig::from_yaml_str(
            "storeql:\n  database:\n    url: \"postgres://localhost/app\"\n",
            "test",
        )
        .unwrap();
        let db: DatabaseConfig = config.section().unwrap();
        assert_eq!(db.dialect, Dialect::Postgres);
        assert_eq!(db.max_connections, 5);
        assert_eq!(db.insert_strategy, InsertStrategy::PerRow);
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_yaml_str(
            "storeql:\n  database:\n    url: \"sqlite::memory:\"\n    max_connections: 1\n    dialect: generic\n    insert_strategy: multi-row\n",
            "test",
        )
        .unwrap();
        let db: DatabaseConfig = config.section().unwrap();
        assert_eq!(db.max_connections, 1);
        assert_eq!(db.dialect, Dialect::Generic);
        assert_eq!(db.insert_strategy, InsertStrategy::MultiRow);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let config = StoreConfig::from_yaml_str(
            "storeql:\n  database:\n    url: \"sqlite::memory:\"\n    insert_strategy: bulk\n",
            "test",
        )
        .unwrap();
        assert!(matches!(
            config.section::<DatabaseConfig>(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_zero_connections_rejected() {
        let config = StoreConfig::from_yaml_str(
            "storeql:\n  database:\n    url: \"sqlite::memory:\"\n    max_connections: 0\n",
            "test",
        )
        .unwrap();
        assert!(config.section::<DatabaseConfig>().is_err());
    }
}
