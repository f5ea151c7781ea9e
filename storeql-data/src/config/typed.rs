use super::{ConfigError, StoreConfig};

/// Trait for strongly-typed configuration sections.
///
/// ```ignore
/// impl ConfigProperties for WriteOptions {
///     fn prefix() -> &'static str { "storeql.write" }
///     fn from_config(config: &StoreConfig) -> Result<Self, ConfigError> { ... }
/// }
///
/// let options: WriteOptions = config.section()?;
/// ```
pub trait ConfigProperties: Sized {
    /// Key prefix of the section, e.g. `"storeql.database"`.
    fn prefix() -> &'static str;

    /// Build the section, falling back to defaults for absent keys.
    fn from_config(config: &StoreConfig) -> Result<Self, ConfigError>;
}
