//! Configuration tree handling
//!
//! The configuration is a single JSON-like tree merged from config files
//! and patched by command-line overrides. `serde_json::Value` (with
//! insertion-order-preserving maps) is the node type: every node is a
//! mapping, a sequence, or a scalar, which is exactly the shape the
//! override applier needs for conflict detection.

pub mod loader;
pub mod overrides;

use serde_json::Value;

pub use overrides::apply_overrides;

/// The merged configuration tree for one invocation.
///
/// The root is always a mapping. Built once by the loader, patched by
/// overrides, read-only for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    root: Value,
}

impl Configuration {
    /// Create an empty configuration (root is an empty mapping)
    pub fn new() -> Self {
        Self {
            root: Value::Object(serde_json::Map::new()),
        }
    }

    /// Wrap an existing mapping value
    pub fn from_value(root: Value) -> Self {
        debug_assert!(root.is_object());
        Self { root }
    }

    /// The tree root
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Mutable tree root, used by the loader and the override applier
    pub fn root_mut(&mut self) -> &mut Value {
        &mut self.root
    }

    /// Look up a node by dotted path (keys and sequence indices)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut node = &self.root;
        for segment in path.split('.') {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Look up a string value by dotted path
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Look up a numeric value by dotted path
    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_dotted_path() {
        let config = Configuration::from_value(json!({
            "settings": {"check-interval": 0.5},
            "execution": [{"scenario": "smoke"}],
        }));

        assert_eq!(config.get_f64("settings.check-interval"), Some(0.5));
        assert_eq!(config.get_str("execution.0.scenario"), Some("smoke"));
        assert!(config.get("settings.missing").is_none());
        assert!(config.get("execution.5").is_none());
    }
}
