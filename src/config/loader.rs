//! Configuration file loading and merging
//!
//! Files are parsed by extension (JSON, TOML, anything else is treated as
//! YAML) and deep-merged left to right into one tree: mappings merge
//! recursively, sequences and scalars replace.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use super::Configuration;
use crate::common::{Error, Result};

/// Load and merge config files into a single configuration tree.
///
/// Sources are merged in the order given, so later files win on
/// conflicting scalar/sequence values.
pub fn load<P: AsRef<Path>>(sources: &[P]) -> Result<Configuration> {
    let mut config = Configuration::new();
    for source in sources {
        let value = load_file(source.as_ref())?;
        debug!("Merging config from {}", source.as_ref().display());
        merge(config.root_mut(), value);
    }
    Ok(config)
}

/// Parse a single config file into a mapping value
pub fn load_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let parse_err = |e: String| Error::ConfigParse {
        path: path.display().to_string(),
        error: e,
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let value: Value = match extension.as_deref() {
        Some("json") => serde_json::from_str(&text).map_err(|e| parse_err(e.to_string()))?,
        Some("toml") => {
            let parsed: toml::Value = toml::from_str(&text).map_err(|e| parse_err(e.to_string()))?;
            serde_json::to_value(parsed)?
        }
        // YAML is the default config format
        _ => serde_yaml::from_str(&text).map_err(|e| parse_err(e.to_string()))?,
    };

    if !value.is_object() {
        return Err(Error::ConfigNotMapping(path.display().to_string()));
    }
    Ok(value)
}

/// Deep-merge `incoming` into `base`: mappings merge key by key,
/// everything else replaces the existing value.
pub fn merge(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, value) in incoming_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, incoming) => *base = incoming,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_merge_nested_mappings() {
        let mut base = json!({"settings": {"check-interval": 1.0, "verbose": false}});
        merge(
            &mut base,
            json!({"settings": {"verbose": true}, "provisioning": "local"}),
        );

        assert_eq!(base["settings"]["check-interval"], json!(1.0));
        assert_eq!(base["settings"]["verbose"], json!(true));
        assert_eq!(base["provisioning"], json!("local"));
    }

    #[test]
    fn test_merge_sequence_replaces() {
        let mut base = json!({"execution": [{"scenario": "a"}, {"scenario": "b"}]});
        merge(&mut base, json!({"execution": [{"scenario": "c"}]}));
        assert_eq!(base["execution"], json!([{"scenario": "c"}]));
    }

    #[test]
    fn test_load_formats_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = write_temp(&dir, "base.yml", "provisioning: local\nsettings:\n  check-interval: 2.5\n");
        let json_file = write_temp(&dir, "patch.json", r#"{"settings": {"check-interval": 0.1}}"#);
        let toml_file = write_temp(&dir, "extra.toml", "[modules]\nmock = \"builtin\"\n");

        let config = load(&[yaml, json_file, toml_file]).unwrap();
        assert_eq!(config.get_str("provisioning"), Some("local"));
        assert_eq!(config.get_f64("settings.check-interval"), Some(0.1));
        assert_eq!(config.get_str("modules.mock"), Some("builtin"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(&[std::path::Path::new("/nonexistent/config.yml")]).unwrap_err();
        assert!(matches!(err, Error::ConfigLoad { .. }));
    }

    #[test]
    fn test_load_rejects_non_mapping_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "list.yml", "- just\n- a\n- list\n");
        let err = load(&[path]).unwrap_err();
        assert!(matches!(err, Error::ConfigNotMapping(_)));
    }
}
