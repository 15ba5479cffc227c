//! Year-versioned metadata resolution.
//!
//! A metadata value may vary across survey years in three ways:
//!
//! 1. **Simple versioned**: a mapping keyed only by four-digit years.
//!
//!    ```yaml
//!    1363: {ID_Length: 9}
//!    1383: {ID_Length: 10}
//!    ```
//!
//! 2. **Keyword versioned**: shared keys plus a `versions` mapping whose
//!    selected entry overrides the shared keys.
//!
//!    ```yaml
//!    file_code: household
//!    versions:
//!      1380: {file_code: hh_1380}
//!    ```
//!
//! 3. **Categorized**: shared keys plus a `categories` mapping of named
//!    variants, each of which may itself be versioned. Only expanded when
//!    [`ResolveOptions::categorize`] is set.
//!
//! The selected version is the one with the greatest year not after the
//! target year. Resolution recurses into nested mappings and sequences, so a
//! single call resolves a whole document for one year.

use serde_yaml::{Mapping, Value};

use hbs_model::{Year, value_to_i64};

pub const VERSIONS_KEY: &str = "versions";
pub const CATEGORIES_KEY: &str = "categories";
/// Key under which a categorized variant carries its identifier.
pub const VARIANT_ID_KEY: &str = "item_key";
/// Key added to resolved mappings when [`ResolveOptions::add_year`] is set.
pub const YEAR_KEY: &str = "year";

const MIN_VERSION_YEAR: i64 = 1000;
const MAX_VERSION_YEAR: i64 = 9999;

/// Options for [`resolve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Expand `categories` mappings into sequences of resolved variants.
    pub categorize: bool,
    /// Record the target year under `year` in the resolved top-level mapping.
    pub add_year: bool,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categorized() -> Self {
        Self {
            categorize: true,
            add_year: false,
        }
    }

    pub fn with_year(mut self) -> Self {
        self.add_year = true;
        self
    }
}

/// Resolves `value` for `year`.
///
/// Returns `None` when the value is simple versioned and has no version at or
/// before `year`. Whether that is fatal is up to the caller.
pub fn resolve(value: &Value, year: Year, options: ResolveOptions) -> Option<Value> {
    let resolved = resolve_value(value, year, options)?;
    if !options.add_year {
        return Some(resolved);
    }
    Some(match resolved {
        Value::Mapping(mut map) => {
            if !map.contains_key(YEAR_KEY) {
                map.insert(Value::from(YEAR_KEY), Value::from(year));
            }
            Value::Mapping(map)
        }
        other => other,
    })
}

/// Returns the version years declared by a simple or keyword versioned value.
pub fn version_years(value: &Value) -> Vec<Year> {
    let Value::Mapping(map) = value else {
        return Vec::new();
    };
    let versions = match map.get(VERSIONS_KEY) {
        Some(Value::Mapping(versions)) if is_simple_versioned(versions) => versions,
        _ if is_simple_versioned(map) => map,
        _ => return Vec::new(),
    };
    let mut years: Vec<Year> = versions.keys().filter_map(version_year).collect();
    years.sort_unstable();
    years
}

fn resolve_value(value: &Value, year: Year, options: ResolveOptions) -> Option<Value> {
    match value {
        Value::Mapping(map) => resolve_mapping(map, year, options),
        Value::Sequence(items) => Some(Value::Sequence(
            items
                .iter()
                .map(|item| resolve_value(item, year, options).unwrap_or(Value::Null))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

fn resolve_mapping(map: &Mapping, year: Year, options: ResolveOptions) -> Option<Value> {
    if options.categorize && map.contains_key(CATEGORIES_KEY) {
        return Some(resolve_categories(map, year, options));
    }

    if is_simple_versioned(map) {
        let selected = select_version(map, year)?;
        return resolve_value(selected, year, options);
    }

    if let Some(Value::Mapping(versions)) = map.get(VERSIONS_KEY)
        && is_simple_versioned(versions)
    {
        let mut merged = without_key(map, VERSIONS_KEY);
        match select_version(versions, year) {
            None if merged.is_empty() => return None,
            Some(Value::Mapping(overrides)) => {
                for (key, value) in overrides {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => return resolve_value(other, year, options),
        }
        return resolve_mapping(&merged, year, options);
    }

    Some(Value::Mapping(resolve_entries(map, year, options)))
}

fn resolve_entries(map: &Mapping, year: Year, options: ResolveOptions) -> Mapping {
    map.iter()
        .map(|(key, value)| {
            let resolved = resolve_value(value, year, options).unwrap_or(Value::Null);
            (key.clone(), resolved)
        })
        .collect()
}

fn resolve_categories(map: &Mapping, year: Year, options: ResolveOptions) -> Value {
    let shared = match resolve_mapping(&without_key(map, CATEGORIES_KEY), year, options) {
        Some(Value::Mapping(shared)) => shared,
        _ => Mapping::new(),
    };

    let variants: Vec<(Value, &Value)> = match map.get(CATEGORIES_KEY) {
        Some(Value::Mapping(categories)) => categories
            .iter()
            .map(|(id, variant)| (id.clone(), variant))
            .collect(),
        Some(Value::Sequence(categories)) => categories
            .iter()
            .enumerate()
            .map(|(idx, variant)| (Value::from(idx as i64), variant))
            .collect(),
        _ => Vec::new(),
    };

    let mut resolved = Vec::with_capacity(variants.len());
    for (id, variant) in variants {
        match resolve_value(variant, year, options) {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(fields)) if fields.is_empty() => {}
            Some(Value::Mapping(fields)) => {
                let own_id = fields.contains_key(VARIANT_ID_KEY);
                let mut merged = shared.clone();
                for (key, value) in fields {
                    merged.insert(key, value);
                }
                if !own_id {
                    merged.insert(Value::from(VARIANT_ID_KEY), id);
                }
                resolved.push(Value::Mapping(merged));
            }
            Some(other) => resolved.push(other),
        }
    }
    Value::Sequence(resolved)
}

fn without_key(map: &Mapping, excluded: &str) -> Mapping {
    map.iter()
        .filter(|(key, _)| key.as_str() != Some(excluded))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn version_year(key: &Value) -> Option<Year> {
    value_to_i64(key).filter(|year| (MIN_VERSION_YEAR..=MAX_VERSION_YEAR).contains(year))
}

/// A mapping is simple versioned when every key is a four-digit year.
fn is_simple_versioned(map: &Mapping) -> bool {
    !map.is_empty() && map.keys().all(|key| version_year(key).is_some())
}

fn select_version(versions: &Mapping, year: Year) -> Option<&Value> {
    versions
        .iter()
        .filter_map(|(key, value)| version_year(key).map(|version| (version, value)))
        .filter(|(version, _)| *version <= year)
        .max_by_key(|(version, _)| *version)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(
            resolve(&Value::from("household"), 1390, ResolveOptions::new()),
            Some(Value::from("household"))
        );
    }

    #[test]
    fn small_integer_keys_are_not_versions() {
        let labels = yaml("{1: Urban, 2: Rural}");
        assert_eq!(resolve(&labels, 1390, ResolveOptions::new()), Some(labels));
    }

    #[test]
    fn add_year_marks_top_level_mapping() {
        let doc = yaml("{1363: {ID_Length: 9}}");
        let resolved = resolve(&doc, 1370, ResolveOptions::new().with_year()).unwrap();
        assert_eq!(resolved, yaml("{ID_Length: 9, year: 1370}"));
    }

    #[test]
    fn version_years_are_sorted() {
        let doc = yaml("{shared: 1, versions: {1380: {}, 1363: {}}}");
        assert_eq!(version_years(&doc), vec![1363, 1380]);
        assert!(version_years(&yaml("{a: 1}")).is_empty());
    }

    #[test]
    fn null_version_removes_nothing_from_shared_keys() {
        let doc = yaml("{shared: 1, versions: {1363: {key: a}, 1380: null}}");
        assert_eq!(
            resolve(&doc, 1385, ResolveOptions::new()),
            Some(yaml("{shared: 1}"))
        );
    }
}
