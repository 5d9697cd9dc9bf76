//! Command-line configuration overrides
//!
//! An override is a `path=value` instruction: the path is split on dots
//! into mapping keys and sequence indices (`-1` appends), the value goes
//! through a fixed coercion ladder, and the tree is mutated in place.
//! Shape mismatches between the path and the existing tree are collected
//! across the whole batch and reported as one consolidated error; a
//! conflicting override never leaves a partial mutation behind, because
//! the full path is validated against the tree before anything is written.

use std::fmt;

use serde_json::{Map, Number, Value};
use tracing::debug;

use super::Configuration;
use crate::common::{Error, Result};

/// Reserved sequence index meaning "append a new trailing element"
const APPEND: i64 = -1;

/// One path segment of an override
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(i64),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{key}"),
            Segment::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// A parsed `path=value` override, immutable once built
#[derive(Debug, Clone)]
struct Override {
    path_text: String,
    segments: Vec<Segment>,
    value: Value,
}

impl Override {
    fn parse(text: &str) -> Result<Self> {
        let (path_text, raw_value) = text
            .split_once('=')
            .ok_or_else(|| Error::override_parse(text, "expected PATH=VALUE"))?;
        if path_text.is_empty() {
            return Err(Error::override_parse(text, "empty path"));
        }

        let mut segments = Vec::new();
        for part in path_text.split('.') {
            if part.is_empty() {
                return Err(Error::override_parse(text, "empty path segment"));
            }
            // Anything that parses as a base-10 integer addresses a sequence
            match part.parse::<i64>() {
                Ok(idx) => segments.push(Segment::Index(idx)),
                Err(_) => segments.push(Segment::Key(part.to_string())),
            }
        }

        Ok(Self {
            path_text: path_text.to_string(),
            segments,
            value: coerce(raw_value),
        })
    }
}

/// Coerce a raw override value into a tree node.
///
/// Checked in order: boolean literals, null, quoted reserved literals
/// (the escape hatch for storing the word itself as a string), integer,
/// float, and finally the raw text verbatim. Quotes around anything that
/// is not a reserved literal are kept as part of the string.
fn coerce(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Some(inner) = quoted_reserved_literal(raw) {
        return Value::String(inner.to_string());
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = raw.parse::<f64>() {
        // NaN and infinities have no JSON representation
        if let Some(number) = Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    Value::String(raw.to_string())
}

/// A reserved literal wrapped in a matching pair of quotes, e.g. `"true"`
/// or `'null'`. Returns the inner text with the quotes stripped.
fn quoted_reserved_literal(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let quote = bytes[0];
    if (quote != b'"' && quote != b'\'') || bytes[bytes.len() - 1] != quote {
        return None;
    }
    let inner = &raw[1..raw.len() - 1];
    ["true", "false", "null"]
        .iter()
        .any(|lit| inner.eq_ignore_ascii_case(lit))
        .then_some(inner)
}

/// Apply overrides to the configuration tree, strictly in order.
///
/// Each override mutates the tree before the next one is parsed, so later
/// overrides observe earlier ones' effects (including containers they
/// auto-created). Shape conflicts are collected across the whole batch and
/// returned as one `OverrideConflict`; malformed overrides abort
/// immediately with `OverrideParse`.
pub fn apply_overrides(overrides: &[String], config: &mut Configuration) -> Result<()> {
    let mut conflicts = Vec::new();

    for text in overrides {
        let parsed = Override::parse(text)?;
        debug!("Applying override: {text}");

        // Dry validation pass first: a conflicting override must not
        // leave any partial mutation (auto-created containers included).
        match validate(config.root(), &parsed.segments) {
            Ok(()) => commit(config.root_mut(), &parsed.segments, parsed.value)?,
            Err(reason) => conflicts.push(format!("{}: {}", parsed.path_text, reason)),
        }
    }

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(Error::OverrideConflict { conflicts })
    }
}

/// Walk the existing tree along the path without mutating, reporting the
/// first shape conflict as a human-readable reason.
fn validate(node: &Value, segments: &[Segment]) -> std::result::Result<(), String> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };

    match (node, segment) {
        (Value::Object(map), Segment::Key(key)) => match map.get(key) {
            Some(child) if !rest.is_empty() => validate(child, rest),
            // Absent key: the remainder will be auto-created mappings
            _ => validate_auto_created(rest),
        },
        (Value::Object(_), Segment::Index(idx)) => {
            Err(format!("mapping addressed with sequence index {idx}"))
        }
        (Value::Array(items), Segment::Index(idx)) => {
            if *idx == APPEND {
                validate_auto_created(rest)
            } else if *idx < 0 || *idx as usize >= items.len() {
                Err(format!(
                    "sequence index {} out of range (length {})",
                    idx,
                    items.len()
                ))
            } else if rest.is_empty() {
                Ok(())
            } else {
                validate(&items[*idx as usize], rest)
            }
        }
        (Value::Array(_), Segment::Key(key)) => {
            Err(format!("sequence addressed with mapping key '{key}'"))
        }
        (_, segment) => Err(format!(
            "scalar addressed as container at segment '{segment}'"
        )),
    }
}

/// Segments past the point where the tree ends are auto-created as empty
/// mappings, so any sequence index among them is a shape conflict.
fn validate_auto_created(rest: &[Segment]) -> std::result::Result<(), String> {
    for segment in rest {
        if let Segment::Index(idx) = segment {
            return Err(format!(
                "auto-created mapping addressed with sequence index {idx}"
            ));
        }
    }
    Ok(())
}

/// Write the value at the path, creating intermediate mappings as needed.
/// Must only run after `validate` accepted the same path.
fn commit(node: &mut Value, segments: &[Segment], value: Value) -> Result<()> {
    let unexpected =
        || Error::Internal("override commit hit a shape the validation pass missed".to_string());

    match segments {
        [] => {
            *node = value;
            Ok(())
        }
        [Segment::Key(key), rest @ ..] => {
            let Value::Object(map) = node else {
                return Err(unexpected());
            };
            if rest.is_empty() {
                map.insert(key.clone(), value);
                Ok(())
            } else {
                let child = map
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                commit(child, rest, value)
            }
        }
        [Segment::Index(idx), rest @ ..] => {
            let Value::Array(items) = node else {
                return Err(unexpected());
            };
            if *idx == APPEND {
                if rest.is_empty() {
                    items.push(value);
                    Ok(())
                } else {
                    items.push(Value::Object(Map::new()));
                    let child = items.last_mut().ok_or_else(unexpected)?;
                    commit(child, rest, value)
                }
            } else {
                let child = items.get_mut(*idx as usize).ok_or_else(unexpected)?;
                if rest.is_empty() {
                    *child = value;
                    Ok(())
                } else {
                    commit(child, rest, value)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(overrides: &[&str], initial: Value) -> Result<Configuration> {
        let mut config = Configuration::from_value(initial);
        let overrides: Vec<String> = overrides.iter().map(|s| s.to_string()).collect();
        apply_overrides(&overrides, &mut config).map(|_| config)
    }

    #[test]
    fn test_coercion_ladder() {
        assert_eq!(coerce("11"), json!(11));
        assert_eq!(coerce("-3"), json!(-3));
        assert_eq!(coerce("3.14"), json!(3.14));
        assert_eq!(coerce("true"), json!(true));
        assert_eq!(coerce("FALSE"), json!(false));
        assert_eq!(coerce("null"), Value::Null);
        assert_eq!(coerce("plain text value"), json!("plain text value"));
    }

    #[test]
    fn test_quoted_reserved_literals_become_strings() {
        assert_eq!(coerce("\"true\""), json!("true"));
        assert_eq!(coerce("'null'"), json!("null"));
        assert_eq!(coerce("\"False\""), json!("False"));
        // Quotes around anything else stay part of the string
        assert_eq!(coerce("\"hello\""), json!("\"hello\""));
        assert_eq!(coerce("'true\""), json!("'true\""));
    }

    #[test]
    fn test_non_finite_floats_stay_strings() {
        assert_eq!(coerce("nan"), json!("nan"));
        assert_eq!(coerce("inf"), json!("inf"));
    }

    #[test]
    fn test_auto_vivification() {
        let config = apply(&["settings.env.region=eu-west-1"], json!({})).unwrap();
        assert_eq!(config.get_str("settings.env.region"), Some("eu-west-1"));
    }

    #[test]
    fn test_last_write_wins() {
        let config = apply(
            &["settings.level=1", "settings.level=2"],
            json!({}),
        )
        .unwrap();
        assert_eq!(config.get("settings.level"), Some(&json!(2)));
    }

    #[test]
    fn test_append_marker() {
        let config = apply(
            &["test.subkey5.-1=value", "execution.-1.option=value"],
            json!({"test": {"subkey5": ["first"]}, "execution": []}),
        )
        .unwrap();
        assert_eq!(config.get_str("test.subkey5.1"), Some("value"));
        assert_eq!(config.get_str("execution.0.option"), Some("value"));
    }

    #[test]
    fn test_index_replaces_element() {
        let config = apply(
            &["test.subkey.0=value"],
            json!({"test": {"subkey": ["old", "kept"]}}),
        )
        .unwrap();
        assert_eq!(config.get_str("test.subkey.0"), Some("value"));
        assert_eq!(config.get_str("test.subkey.1"), Some("kept"));
    }

    #[test]
    fn test_later_override_sees_earlier_container() {
        let config = apply(
            &["modules.mock.class=builtin", "modules.mock.enabled=true"],
            json!({}),
        )
        .unwrap();
        assert_eq!(config.get_str("modules.mock.class"), Some("builtin"));
        assert_eq!(config.get("modules.mock.enabled"), Some(&json!(true)));
    }

    #[test]
    fn test_mapping_addressed_as_sequence_conflicts() {
        let err = apply(
            &["test.subkey2.0.sskey=value"],
            json!({"test": {"subkey2": {"sskey": 1}}}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::OverrideConflict { .. }));
    }

    #[test]
    fn test_scalar_addressed_as_container_conflicts() {
        let err = apply(&["test.subkey.0=value"], json!({"test": {"subkey": "scalar"}}))
            .unwrap_err();
        assert!(matches!(err, Error::OverrideConflict { .. }));
    }

    #[test]
    fn test_sequence_addressed_with_key_conflicts() {
        let err = apply(&["execution.option=value"], json!({"execution": []})).unwrap_err();
        assert!(matches!(err, Error::OverrideConflict { .. }));
    }

    #[test]
    fn test_index_out_of_range_conflicts() {
        for path in ["items.3=x", "items.-2=x"] {
            let err = apply(&[path], json!({"items": ["a", "b"]})).unwrap_err();
            assert!(matches!(err, Error::OverrideConflict { .. }));
        }
    }

    #[test]
    fn test_conflicts_collected_across_batch() {
        let initial = json!({"test": {"subkey2": {"sskey": 1}, "subkey": "scalar"}});
        let err = apply(
            &["test.subkey2.0.sskey=value", "test.subkey.0=value"],
            initial,
        )
        .unwrap_err();

        let Error::OverrideConflict { conflicts } = err else {
            panic!("expected conflict error");
        };
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts[0].starts_with("test.subkey2.0.sskey"));
        assert!(conflicts[1].starts_with("test.subkey.0"));
    }

    #[test]
    fn test_conflicting_override_leaves_no_partial_mutation() {
        let initial = json!({"test": {"subkey2": {"sskey": 1}}});
        let mut config = Configuration::from_value(initial.clone());
        let overrides = vec!["test.subkey2.0.sskey=value".to_string()];

        apply_overrides(&overrides, &mut config).unwrap_err();
        assert_eq!(config.root(), &initial);
    }

    #[test]
    fn test_malformed_override_aborts() {
        for text in ["no-equals-sign", "=value", "a..b=value"] {
            let err = apply(&[text], json!({})).unwrap_err();
            assert!(matches!(err, Error::OverrideParse { .. }), "{text}");
        }
    }

    #[test]
    fn test_value_may_contain_equals() {
        let config = apply(&["settings.expr=a=b=c"], json!({})).unwrap();
        assert_eq!(config.get_str("settings.expr"), Some("a=b=c"));
    }
}
