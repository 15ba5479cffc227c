//! Long-form classification tables.
//!
//! A classification document lists its items (possibly categorized and
//! versioned). For every requested year the items are resolved and turned
//! into one [`ClassificationRow`] per item and hierarchy level.

use std::collections::BTreeMap;

use serde_yaml::Value;

use hbs_metadata::{MetadataContext, ResolveOptions, resolve};
use hbs_model::{ClassificationType, IntervalOptions, IntervalSet, Year, scalar_key, value_to_i64};

use crate::error::{DecodeError, Result};

const ITEMS_KEY: &str = "items";
const CODE_KEY: &str = "code";
const LEVEL_KEY: &str = "level";
const DEFAULT_LEVEL: i64 = 1;

/// One classification item at one hierarchy level for one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRow {
    pub year: Year,
    pub code_range: IntervalSet,
    pub level: i64,
    /// Aspect name → label, e.g. `item_key → bread`.
    pub labels: BTreeMap<String, String>,
}

impl ClassificationRow {
    pub fn label(&self, aspect: &str) -> Option<&str> {
        self.labels.get(aspect).map(String::as_str)
    }
}

/// Builds the classification table of `kind`/`name` for `years`.
pub fn build_classification_table(
    context: &MetadataContext,
    kind: ClassificationType,
    name: &str,
    years: &[Year],
) -> Result<Vec<ClassificationRow>> {
    let versioned = context.classification(kind, name)?;
    let (first_year, end_year) = context.defaults().year_bounds();
    let code_options = IntervalOptions::new()
        .with_bounds(first_year, end_year)
        .with_keyword(CODE_KEY);

    let mut rows = Vec::new();
    for &year in years {
        let resolved = resolve(versioned, year, ResolveOptions::categorized()).ok_or_else(|| {
            DecodeError::config(format!("{kind} classification '{name}' is not defined for year {year}"))
        })?;
        let annual = annual_rows(&resolved, year, &code_options).map_err(|err| match err {
            DecodeError::Configuration { message } => DecodeError::config(format!(
                "{kind} classification '{name}' ({year}): {message}"
            )),
            other => other,
        })?;
        tracing::debug!(%kind, name, year, rows = annual.len(), "built classification rows");
        rows.extend(annual);
    }
    Ok(rows)
}

fn annual_rows(
    resolved: &Value,
    year: Year,
    code_options: &IntervalOptions,
) -> Result<Vec<ClassificationRow>> {
    let items = resolved
        .get(ITEMS_KEY)
        .and_then(Value::as_sequence)
        .ok_or_else(|| DecodeError::config("expected an 'items' list"))?;

    let mut rows = Vec::new();
    for item in items {
        let Value::Mapping(fields) = item else {
            return Err(DecodeError::config(format!("item {item:?} is not a mapping")));
        };
        let code = fields
            .get(CODE_KEY)
            .ok_or_else(|| DecodeError::config(format!("item {item:?} has no code")))?;
        let code_range = IntervalSet::parse(code, code_options)?;

        let labels: BTreeMap<String, String> = fields
            .iter()
            .filter_map(|(key, value)| {
                let key = scalar_key(key)?;
                if key == CODE_KEY || key == LEVEL_KEY {
                    return None;
                }
                scalar_key(value).map(|label| (key, label))
            })
            .collect();

        for level in levels(fields.get(LEVEL_KEY))? {
            rows.push(ClassificationRow {
                year,
                code_range: code_range.clone(),
                level,
                labels: labels.clone(),
            });
        }
    }
    Ok(rows)
}

fn levels(value: Option<&Value>) -> Result<Vec<i64>> {
    let invalid = |value: &Value| DecodeError::config(format!("invalid level {value:?}"));
    match value {
        None | Some(Value::Null) => Ok(vec![DEFAULT_LEVEL]),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| value_to_i64(item).ok_or_else(|| invalid(item)))
            .collect(),
        Some(other) => value_to_i64(other).map(|level| vec![level]).ok_or_else(|| invalid(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn options() -> IntervalOptions {
        IntervalOptions::new().with_bounds(1363, 1403).with_keyword(CODE_KEY)
    }

    #[test]
    fn multi_level_items_explode() {
        let resolved = yaml(
            "
items:
  - {item_key: bread, code: 11111, level: [1, 2], name: Bread}
  - {item_key: cereals, code: '11110-11119', level: 1}
",
        );
        let rows = annual_rows(&resolved, 1390, &options()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].level, 1);
        assert_eq!(rows[1].level, 2);
        assert_eq!(rows[1].label("name"), Some("Bread"));
        assert!(rows[2].code_range.contains(11119));
        assert!(!rows[2].labels.contains_key("code"));
    }

    #[test]
    fn keyword_code_ignores_year_tag() {
        let resolved = yaml("items: [{item_key: a, code: {code: 5, year: 1390}}]");
        let rows = annual_rows(&resolved, 1390, &options()).unwrap();
        assert_eq!(rows[0].code_range, IntervalSet::from_range(5, 6));
        assert_eq!(rows[0].level, 1);
    }

    #[test]
    fn missing_items_is_configuration_error() {
        let err = annual_rows(&yaml("{name: x}"), 1390, &options()).unwrap_err();
        assert!(matches!(err, DecodeError::Configuration { .. }));
    }
}
