use std::time::Duration;

use crate::config::{ConfigError, ConfigProperties, StoreConfig};

/// Behaviour switches for [`BatchWriter`](crate::BatchWriter).
///
/// Loaded from the `storeql.write` config section:
///
/// ```yaml
/// storeql:
///   write:
///     validate_schema: true
///     validate_identifiers: true
///     statement_timeout: 5s
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Check every batch element against the first one (table and column
    /// set) before any round trip.
    pub validate_schema: bool,
    /// Reject table and column names that are not plain SQL identifiers.
    pub validate_identifiers: bool,
    /// Upper bound for each database round trip. `None` waits forever.
    pub statement_timeout: Option<Duration>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            validate_schema: true,
            validate_identifiers: true,
            statement_timeout: None,
        }
    }
}

impl WriteOptions {
    pub fn validate_schema(mut self, enabled: bool) -> Self {
        self.validate_schema = enabled;
        self
    }

    pub fn validate_identifiers(mut self, enabled: bool) -> Self {
        self.validate_identifiers = enabled;
        self
    }

    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }
}

impl ConfigProperties for WriteOptions {
    fn prefix() -> &'static str {
        "storeql.write"
    }

    fn from_config(config: &StoreConfig) -> Result<Self, ConfigError> {
        let defaults = WriteOptions::default();
        let timeout_key = StoreConfig::key_in::<Self>("statement_timeout");
        let statement_timeout: Option<Duration> = config.get_opt::<Option<Duration>>(&timeout_key)?.flatten();
        if statement_timeout.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::Invalid {
                key: timeout_key,
                reason: "timeout must be greater than zero".into(),
            });
        }
        Ok(Self {
            validate_schema: config
                .get_opt(&StoreConfig::key_in::<Self>("validate_schema"))?
                .unwrap_or(defaults.validate_schema),
            validate_identifiers: config
                .get_opt(&StoreConfig::key_in::<Self>("validate_identifiers"))?
                .unwrap_or(defaults.validate_identifiers),
            statement_timeout,
        })
    }
}
