//! Reading and merging layered YAML documents.
//!
//! Metadata documents are looked up in up to three directories, in order of
//! increasing precedence: package defaults, the installed package, and the
//! local project. Documents merge key-wise at the top level; settings merge
//! deeply so a local file can override a single nested column name.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::error::{MetadataError, Result};

/// Reads a YAML file; an empty file yields an empty mapping.
pub fn read_yaml(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|e| MetadataError::io(path, e))?;
    parse_yaml(&text, path)
}

pub(crate) fn parse_yaml(text: &str, path: &Path) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Mapping(Mapping::new()));
    }
    let value: Value = serde_yaml::from_str(text).map_err(|e| MetadataError::yaml(path, e))?;
    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Overlays `overlay` onto `base`, replacing whole top-level entries.
pub fn merge_top_level(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        base.insert(key, value);
    }
}

/// Overlays `overlay` onto `base`, merging nested mappings key by key.
///
/// Non-mapping values in `overlay` replace what is in `base`.
pub fn merge_deep(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_deep(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Mapping(base)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn top_level_merge_replaces_entries() {
        let Value::Mapping(mut base) = yaml("{a: {x: 1, y: 2}, b: 1}") else {
            unreachable!()
        };
        let Value::Mapping(overlay) = yaml("{a: {x: 5}}") else {
            unreachable!()
        };
        merge_top_level(&mut base, overlay);
        assert_eq!(Value::Mapping(base), yaml("{a: {x: 5}, b: 1}"));
    }

    #[test]
    fn deep_merge_keeps_sibling_keys() {
        let merged = merge_deep(
            yaml("{columns: {year: Year, id: ID}, years: '1363-1400'}"),
            yaml("{columns: {id: HHID}}"),
        );
        assert_eq!(
            merged,
            yaml("{columns: {year: Year, id: HHID}, years: '1363-1400'}")
        );
    }

    #[test]
    fn empty_text_is_an_empty_mapping() {
        let value = parse_yaml("  \n", Path::new("empty.yaml")).unwrap();
        assert_eq!(value, Value::Mapping(Mapping::new()));
    }
}
