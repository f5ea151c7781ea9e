//! Layered configuration: YAML files, `.env` files, then environment variables.

mod loader;
pub mod typed;
pub mod value;

use std::collections::HashMap;
use std::path::Path;

pub use typed::ConfigProperties;
pub use value::{ConfigValue, FromConfigValue};

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
    /// A value was well-typed but not acceptable.
    Invalid { key: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid { key, reason } => {
                write!(f, "Invalid config value for '{key}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// storeql configuration.
///
/// Resolution order (lowest to highest priority):
/// 1. `storeql.yaml`
/// 2. `storeql-{profile}.yaml`
/// 3. `.env` and `.env.{profile}` (loaded into the process environment,
///    never overwriting variables that are already set)
/// 4. `STOREQL__*` environment variables (`STOREQL__WRITE__VALIDATE_SCHEMA`
///    overrides `storeql.write.validate_schema`)
///
/// The profile is `STOREQL_PROFILE` if set, otherwise the argument.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl StoreConfig {
    /// Load from the current working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile)
    }

    /// Load with `dir` as the location of the YAML and `.env` files.
    pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let profile = std::env::var("STOREQL_PROFILE").unwrap_or_else(|_| profile.to_string());
        let mut values = HashMap::new();

        let base = dir.join("storeql.yaml");
        if loader::merge_yaml_file(&base, &mut values)? {
            tracing::debug!(path = %base.display(), "loaded config file");
        }
        let overlay = dir.join(format!("storeql-{profile}.yaml"));
        if loader::merge_yaml_file(&overlay, &mut values)? {
            tracing::debug!(path = %overlay.display(), "loaded profile config file");
        }

        for env_file in [dir.join(".env"), dir.join(format!(".env.{profile}"))] {
            load_env_file(&env_file);
        }

        for (var, val) in std::env::vars() {
            if let Some(key) = loader::env_key(&var) {
                values.insert(key, ConfigValue::String(val));
            }
        }

        Ok(StoreConfig { values, profile })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::merge_yaml_str(yaml, &mut values)?;
        Ok(StoreConfig {
            values,
            profile: profile.to_string(),
        })
    }

    /// Create an empty config; every typed section falls back to defaults.
    pub fn empty() -> Self {
        StoreConfig {
            values: HashMap::new(),
            profile: "test".to_string(),
        }
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Get a typed value for the given dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the key does not exist, or
    /// `ConfigError::TypeMismatch` if the value cannot be converted.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Like [`get`](Self::get), but a missing key yields `None` instead of an
    /// error. Type mismatches are still reported.
    pub fn get_opt<V: FromConfigValue>(&self, key: &str) -> Result<Option<V>, ConfigError> {
        match self.values.get(key) {
            Some(value) => V::from_config_value(value, key).map(Some),
            None => Ok(None),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The active profile name.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Build a typed section.
    pub fn section<C: ConfigProperties>(&self) -> Result<C, ConfigError> {
        C::from_config(self)
    }

    /// `prefix.key`, for section implementations.
    pub fn key_in<C: ConfigProperties>(key: &str) -> String {
        format!("{}.{key}", C::prefix())
    }
}

fn load_env_file(path: &Path) {
    match dotenvy::from_path(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "loaded env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable env file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_get_typed_values() {
        let config = StoreConfig::from_yaml_str(
            "storeql:\n  database:\n    max_connections: 4\n    url: postgres://localhost/app\n",
            "dev",
        )
        .unwrap();
        assert_eq!(config.get::<u32>("storeql.database.max_connections").unwrap(), 4);
        assert_eq!(
            config.get::<String>("storeql.database.url").unwrap(),
            "postgres://localhost/app"
        );
        assert!(matches!(
            config.get::<String>("storeql.missing"),
            Err(ConfigError::NotFound(_))
        ));
        assert_eq!(config.get_opt::<u32>("storeql.missing").unwrap(), None);
    }

    #[test]
    #[serial]
    fn test_load_layers_profile_and_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("storeql.yaml"),
            "storeql:\n  write:\n    validate_schema: true\n    statement_timeout: 100\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("storeql-prod.yaml"),
            "storeql:\n  write:\n    statement_timeout: 2s\n",
        )
        .unwrap();
        std::env::set_var("STOREQL__WRITE__VALIDATE_SCHEMA", "false");

        let config = StoreConfig::load_from(dir.path(), "prod").unwrap();
        std::env::remove_var("STOREQL__WRITE__VALIDATE_SCHEMA");

        assert_eq!(config.profile(), "prod");
        assert!(!config.get::<bool>("storeql.write.validate_schema").unwrap());
        assert_eq!(
            config
                .get::<std::time::Duration>("storeql.write.statement_timeout")
                .unwrap(),
            std::time::Duration::from_secs(2)
        );
    }
}
