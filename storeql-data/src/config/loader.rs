use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

/// Read a YAML file, if it exists, and merge its flattened keys into `values`.
pub(crate) fn merge_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<bool, ConfigError> {
    if !path.exists() {
        return Ok(false);
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    merge_yaml_str(&content, values)?;
    Ok(true)
}

/// Parse a YAML document and merge its flattened keys into `values`.
pub(crate) fn merge_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten("", &yaml, values);
    Ok(())
}

/// Flatten nested mappings into dot-separated keys (`storeql.write.validate_schema`).
fn flatten(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, ConfigValue>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let segment = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => format!("{other:?}"),
                };
                let key = if prefix.is_empty() {
                    segment
                } else {
                    format!("{prefix}.{segment}")
                };
                flatten(&key, v, out);
            }
        }
        leaf if !prefix.is_empty() => {
            out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
        }
        _ => {}
    }
}

/// Map an environment variable name onto a config key.
///
/// Only variables starting with `STOREQL__` are considered; `__` separates
/// segments and single underscores are kept, so
/// `STOREQL__DATABASE__MAX_CONNECTIONS` becomes `storeql.database.max_connections`.
pub(crate) fn env_key(var: &str) -> Option<String> {
    let rest = var.strip_prefix("STOREQL__")?;
    if rest.is_empty() {
        return None;
    }
    let segments: Vec<String> = rest.split("__").map(str::to_lowercase).collect();
    if segments.iter().any(String::is_empty) {
        return None;
    }
    Some(format!("storeql.{}", segments.join(".")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_nested_mapping() {
        let mut values = HashMap::new();
        merge_yaml_str(
            "storeql:\n  write:\n    validate_schema: false\n  database:\n    url: \"sqlite::memory:\"\n",
            &mut values,
        )
        .unwrap();
        assert!(matches!(
            values.get("storeql.write.validate_schema"),
            Some(ConfigValue::Bool(false))
        ));
        assert!(matches!(
            values.get("storeql.database.url"),
            Some(ConfigValue::String(s)) if s == "sqlite::memory:"
        ));
    }

    #[test]
    fn test_env_key_mapping() {
        assert_eq!(
            env_key("STOREQL__DATABASE__MAX_CONNECTIONS").as_deref(),
            Some("storeql.database.max_connections")
        );
        assert_eq!(env_key("STOREQL__"), None);
        assert_eq!(env_key("STOREQL__A____B"), None);
        assert_eq!(env_key("PATH"), None);
    }
}
