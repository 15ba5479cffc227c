//! Chained label mappings for household attributes.
//!
//! An attribute may declare derived labels:
//!
//! ```yaml
//! Province:
//!   code: {position: {start: 1, end: 3}}
//!   name: {0: Markazi, 1: Gilan}
//!   mappings:
//!     region: {origin: name, mapping: province_regions}
//!     zone: {origin: region, mapping: region_zones}
//! ```
//!
//! `zone` is decoded by looking the code up in `name`, then passing the label
//! through `province_regions` and finally `region_zones`.

use std::collections::{HashMap, HashSet};

use serde_yaml::{Mapping, Value};

use hbs_model::scalar_key;

use crate::error::{DecodeError, Result};

const MAPPINGS_KEY: &str = "mappings";
const ORIGIN_KEY: &str = "origin";
const MAPPING_KEY: &str = "mapping";

/// The hops needed to derive a label from a terminal label table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelChain {
    /// Label whose table maps raw codes.
    pub terminal: String,
    /// Mapping document names, outermost first.
    pub hops: Vec<String>,
}

impl LabelChain {
    /// Follows the `mappings` declarations of `attribute` starting at `label`.
    pub fn resolve(attribute: &Mapping, label: &str) -> Result<Self> {
        let declarations = attribute.get(MAPPINGS_KEY).and_then(Value::as_mapping);

        let mut visited: HashSet<String> = HashSet::from([label.to_string()]);
        let mut current = label.to_string();
        let mut hops = Vec::new();
        while let Some(declaration) = declarations.and_then(|d| d.get(current.as_str())) {
            let origin = required(declaration, ORIGIN_KEY, &current)?;
            let mapping = required(declaration, MAPPING_KEY, &current)?;
            hops.push(mapping);
            if !visited.insert(origin.clone()) {
                return Err(DecodeError::config(format!(
                    "label mapping cycle: '{origin}' is reached again from '{current}'"
                )));
            }
            current = origin;
        }
        Ok(Self {
            terminal: current,
            hops,
        })
    }

    pub fn is_direct(&self) -> bool {
        self.hops.is_empty()
    }
}

fn required(declaration: &Value, key: &str, label: &str) -> Result<String> {
    declaration
        .get(key)
        .and_then(scalar_key)
        .ok_or_else(|| DecodeError::config(format!("mapping of label '{label}' has no '{key}'")))
}

/// A label lookup table read from a metadata mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    entries: HashMap<String, String>,
}

impl LabelTable {
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Mapping(map) = value else {
            return Err(DecodeError::config(format!(
                "expected a label mapping, found {value:?}"
            )));
        };
        let entries = map
            .iter()
            .filter_map(|(key, label)| Some((scalar_key(key)?, scalar_key(label)?)))
            .collect();
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

/// Applies `hops` (outermost first) to a terminal label, innermost first.
pub fn apply_hops(terminal_label: Option<&str>, hops: &[LabelTable]) -> Option<String> {
    let mut label = terminal_label?;
    for hop in hops.iter().rev() {
        label = hop.get(label)?;
    }
    Some(label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn direct_label_has_no_hops() {
        let chain = LabelChain::resolve(&attribute("name: {1: a}"), "name").unwrap();
        assert_eq!(chain.terminal, "name");
        assert!(chain.is_direct());
    }

    #[test]
    fn chain_is_followed_to_terminal() {
        let attr = attribute(
            "
mappings:
  c: {origin: b, mapping: b_to_c}
  b: {origin: a, mapping: a_to_b}
",
        );
        let chain = LabelChain::resolve(&attr, "c").unwrap();
        assert_eq!(chain.terminal, "a");
        assert_eq!(chain.hops, ["b_to_c", "a_to_b"]);
    }

    #[test]
    fn cycle_is_configuration_error() {
        let attr = attribute(
            "
mappings:
  a: {origin: b, mapping: m1}
  b: {origin: a, mapping: m2}
",
        );
        let err = LabelChain::resolve(&attr, "a").unwrap_err();
        assert!(matches!(err, DecodeError::Configuration { .. }));
    }

    #[test]
    fn hops_compose_like_manual_lookup() {
        let a_to_b = LabelTable::from_value(&serde_yaml::from_str("{x: y}").unwrap()).unwrap();
        let b_to_c = LabelTable::from_value(&serde_yaml::from_str("{y: z}").unwrap()).unwrap();
        let hops = [b_to_c.clone(), a_to_b.clone()];

        let manual = a_to_b.get("x").and_then(|b| b_to_c.get(b)).map(str::to_string);
        assert_eq!(apply_hops(Some("x"), &hops), manual);
        assert_eq!(apply_hops(Some("unknown"), &hops), None);
    }
}
