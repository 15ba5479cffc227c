//! Decoding classification codes into labelled columns.
//!
//! The mapper matches the distinct `(year, code)` pairs of a table against
//! the classification items valid in each year, checks that no code is
//! claimed twice at one level, pivots the matches into one column per
//! `(aspect, level)` and joins them back onto the table.

use std::collections::{BTreeMap, HashMap};

use polars::prelude::DataFrame;
use serde::Deserialize;
use serde_yaml::Value;

use hbs_metadata::MetadataContext;
use hbs_model::{ClassificationType, Code, Year};

use crate::classification::{ClassificationRow, build_classification_table};
use crate::error::{DecodeError, Result};
use crate::frame::{attach_string_columns, distinct, integer_column};
use crate::index::IntervalIndex;
use crate::mapping::MappingTable;

pub const DEFAULT_CLASSIFICATION: &str = "original";
pub const DEFAULT_ASPECT: &str = "item_key";
pub const DEFAULT_LEVEL: i64 = 1;

const DEFAULTS_KEY: &str = "defaults";
const AMBIGUITY_SAMPLE: usize = 10;

/// Caller choices for a classification decode. Anything left empty falls
/// back to the classification's `defaults` entry, then to library defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationOptions {
    pub kind: ClassificationType,
    pub name: String,
    pub code_column: Option<String>,
    pub year_column: Option<String>,
    pub aspects: Vec<String>,
    pub levels: Vec<i64>,
    pub column_names: Vec<String>,
    pub missing_value_replacements: BTreeMap<String, String>,
}

impl ClassificationOptions {
    pub fn new(kind: ClassificationType) -> Self {
        Self {
            kind,
            name: DEFAULT_CLASSIFICATION.to_string(),
            code_column: None,
            year_column: None,
            aspects: Vec::new(),
            levels: Vec::new(),
            column_names: Vec::new(),
            missing_value_replacements: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_code_column(mut self, column: impl Into<String>) -> Self {
        self.code_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_year_column(mut self, column: impl Into<String>) -> Self {
        self.year_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_aspects<I, S>(mut self, aspects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aspects = aspects.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = i64>) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_names = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_missing_value(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.missing_value_replacements
            .insert(column.into(), value.into());
        self
    }
}

/// `defaults` entry of a classification document.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DocumentDefaults {
    #[serde(deserialize_with = "one_or_many")]
    aspects: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    levels: Vec<i64>,
    #[serde(deserialize_with = "one_or_many")]
    column_names: Vec<String>,
    missing_value_replacements: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Fully resolved classification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationSettings {
    pub kind: ClassificationType,
    pub name: String,
    pub code_column: String,
    pub year_column: String,
    pub aspects: Vec<String>,
    pub levels: Vec<i64>,
    /// One name per `(aspect, level)` in aspect-major order.
    pub column_names: Vec<String>,
    pub missing_value_replacements: BTreeMap<String, String>,
}

impl ClassificationSettings {
    pub fn resolve(options: ClassificationOptions, context: &MetadataContext) -> Result<Self> {
        let defaults = context.defaults();
        let document = context.classification(options.kind, &options.name)?;
        let document_defaults = read_document_defaults(document, &options.name)?;

        let code_column = match options.code_column {
            Some(column) => column,
            None => defaults
                .code_column(options.kind)
                .map(str::to_string)
                .ok_or_else(|| {
                    DecodeError::config(format!(
                        "no default code column for {} classifications",
                        options.kind
                    ))
                })?,
        };
        let year_column = options
            .year_column
            .unwrap_or_else(|| defaults.columns.year.clone());

        let aspects = first_non_empty(options.aspects, document_defaults.aspects)
            .unwrap_or_else(|| vec![DEFAULT_ASPECT.to_string()]);
        let levels = first_non_empty(options.levels, document_defaults.levels)
            .unwrap_or_else(|| vec![DEFAULT_LEVEL]);
        let column_names = first_non_empty(options.column_names, document_defaults.column_names)
            .unwrap_or_default();
        let column_names = resolve_column_names(&aspects, &levels, column_names)?;

        let mut missing_value_replacements = document_defaults.missing_value_replacements;
        missing_value_replacements.extend(options.missing_value_replacements);
        for column in missing_value_replacements.keys() {
            if !column_names.contains(column) {
                tracing::debug!(column = %column, "missing-value replacement targets no output column");
            }
        }

        Ok(Self {
            kind: options.kind,
            name: options.name,
            code_column,
            year_column,
            aspects,
            levels,
            column_names,
            missing_value_replacements,
        })
    }

    /// `(aspect, level)` pairs in output column order.
    pub fn aspect_levels(&self) -> impl Iterator<Item = (&str, i64)> {
        self.aspects.iter().flat_map(|aspect| {
            self.levels
                .iter()
                .map(move |level| (aspect.as_str(), *level))
        })
    }
}

fn read_document_defaults(document: &Value, name: &str) -> Result<DocumentDefaults> {
    match document.get(DEFAULTS_KEY) {
        None | Some(Value::Null) => Ok(DocumentDefaults::default()),
        Some(value) => serde_yaml::from_value(value.clone()).map_err(|err| {
            DecodeError::config(format!("invalid defaults for classification '{name}': {err}"))
        }),
    }
}

fn first_non_empty<T>(given: Vec<T>, fallback: Vec<T>) -> Option<Vec<T>> {
    if !given.is_empty() {
        Some(given)
    } else if !fallback.is_empty() {
        Some(fallback)
    } else {
        None
    }
}

fn resolve_column_names(
    aspects: &[String],
    levels: &[i64],
    names: Vec<String>,
) -> Result<Vec<String>> {
    let products = aspects.len() * levels.len();
    let with_levels = |prefixes: &[String]| -> Vec<String> {
        prefixes
            .iter()
            .flat_map(|prefix| levels.iter().map(move |level| format!("{prefix}_{level}")))
            .collect()
    };
    if names.is_empty() {
        Ok(with_levels(aspects))
    } else if names.len() == products {
        Ok(names)
    } else if names.len() == aspects.len() {
        Ok(with_levels(&names))
    } else {
        Err(DecodeError::config(format!(
            "{} column names given for {} aspect(s) and {} level(s)",
            names.len(),
            aspects.len(),
            levels.len()
        )))
    }
}

/// Decodes classification codes of a table.
#[derive(Debug, Clone)]
pub struct CodeMapper<'a> {
    context: &'a MetadataContext,
    settings: ClassificationSettings,
}

impl<'a> CodeMapper<'a> {
    pub fn new(context: &'a MetadataContext, settings: ClassificationSettings) -> Self {
        Self { context, settings }
    }

    pub fn settings(&self) -> &ClassificationSettings {
        &self.settings
    }

    /// Distinct `(year, code)` pairs of `table`, rows with a null year or
    /// code skipped.
    pub fn year_code_pairs(&self, table: &DataFrame) -> Result<Vec<(Year, Code)>> {
        let years = integer_column(table, &self.settings.year_column)?;
        let codes = integer_column(table, &self.settings.code_column)?;
        Ok(distinct(
            years
                .into_iter()
                .zip(codes)
                .map(|(year, code)| year.zip(code)),
        ))
    }

    pub fn classification_table(&self, years: &[Year]) -> Result<Vec<ClassificationRow>> {
        build_classification_table(
            self.context,
            self.settings.kind,
            &self.settings.name,
            years,
        )
    }

    /// Builds the mapping for the `(year, code)` pairs present in `table`.
    pub fn create_mapping_table(&self, table: &DataFrame) -> Result<MappingTable> {
        let pairs = self.year_code_pairs(table)?;
        self.mapping_for_pairs(&pairs)
    }

    pub fn mapping_for_pairs(&self, pairs: &[(Year, Code)]) -> Result<MappingTable> {
        let years = distinct(pairs.iter().map(|(year, _)| Some(*year)));
        let rows = self.classification_table(&years)?;

        let mut by_year: HashMap<Year, Vec<usize>> = HashMap::new();
        for (idx, row) in rows.iter().enumerate() {
            by_year.entry(row.year).or_default().push(idx);
        }
        let indexes: HashMap<Year, IntervalIndex> = by_year
            .iter()
            .map(|(year, members)| {
                let index = IntervalIndex::build(
                    members.iter().map(|&idx| (idx, &rows[idx].code_range)),
                );
                (*year, index)
            })
            .collect();

        let mut matches: Vec<Match> = Vec::new();
        let mut unmatched = 0usize;
        for &(year, code) in pairs {
            let hits = indexes.get(&year).map_or(&[][..], |index| index.lookup(code));
            if hits.is_empty() {
                unmatched += 1;
            }
            matches.extend(hits.iter().map(|&row| Match {
                year,
                code,
                level: rows[row].level,
                row,
            }));
        }
        if unmatched > 0 {
            tracing::warn!(
                classification = %self.settings.name,
                unmatched,
                "codes without a classification item"
            );
        }

        check_unique(&matches, &rows)?;
        let table = self.pivot(&matches, &rows);
        tracing::info!(
            classification = %self.settings.name,
            pairs = pairs.len(),
            matched = table.len(),
            "built mapping table"
        );
        Ok(table)
    }

    fn pivot(&self, matches: &[Match], rows: &[ClassificationRow]) -> MappingTable {
        let positions: HashMap<(&str, i64), usize> = self
            .settings
            .aspect_levels()
            .enumerate()
            .map(|(position, key)| (key, position))
            .collect();

        let mut table = MappingTable::new(self.settings.column_names.clone());
        for m in matches {
            let row = &rows[m.row];
            let values = table.row_mut((m.year, m.code));
            for aspect in &self.settings.aspects {
                if let Some(&position) = positions.get(&(aspect.as_str(), m.level)) {
                    values[position] = row.label(aspect).map(str::to_string);
                }
            }
        }
        table
    }

    /// Returns `table` with the decoded columns added, row count and order
    /// unchanged.
    pub fn add_classification(&self, table: &DataFrame) -> Result<DataFrame> {
        let mapping = self.create_mapping_table(table)?;
        let years = integer_column(table, &self.settings.year_column)?;
        let codes = integer_column(table, &self.settings.code_column)?;

        let mut columns = mapping.lookup_columns(&years, &codes);
        for (name, column) in &mut columns {
            if let Some(fill) = self.settings.missing_value_replacements.get(name.as_str()) {
                for value in column.iter_mut().filter(|value| value.is_none()) {
                    *value = Some(fill.clone());
                }
            }
        }

        let mut output = table.clone();
        attach_string_columns(&mut output, columns)?;
        Ok(output)
    }
}

#[derive(Debug, Clone, Copy)]
struct Match {
    year: Year,
    code: Code,
    level: i64,
    row: usize,
}

fn check_unique(matches: &[Match], rows: &[ClassificationRow]) -> Result<()> {
    let mut counts: HashMap<(Year, Code, i64), usize> = HashMap::new();
    for m in matches {
        *counts.entry((m.year, m.code, m.level)).or_default() += 1;
    }
    let mut duplicated: Vec<&Match> = matches
        .iter()
        .filter(|m| counts[&(m.year, m.code, m.level)] > 1)
        .collect();
    if duplicated.is_empty() {
        return Ok(());
    }

    let count = duplicated.len();
    duplicated.sort_by_key(|m| (m.code, m.level, m.year));
    let sample = duplicated
        .iter()
        .take(AMBIGUITY_SAMPLE)
        .map(|m| {
            let labels = rows[m.row]
                .labels
                .iter()
                .map(|(aspect, label)| format!("{aspect}={label}"))
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "year={} code={} level={} range=[{}] {labels}",
                m.year, m.code, m.level, rows[m.row].code_range
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    Err(DecodeError::ClassificationAmbiguity { count, sample })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_default_to_aspect_level_products() {
        let aspects = vec!["item_key".to_string(), "name".to_string()];
        let names = resolve_column_names(&aspects, &[1, 2], Vec::new()).unwrap();
        assert_eq!(names, ["item_key_1", "item_key_2", "name_1", "name_2"]);
    }

    #[test]
    fn one_name_per_aspect_gets_level_suffix() {
        let aspects = vec!["item_key".to_string()];
        let names = resolve_column_names(&aspects, &[1, 3], vec!["Group".to_string()]).unwrap();
        assert_eq!(names, ["Group_1", "Group_3"]);
    }

    #[test]
    fn one_name_per_product_is_kept() {
        let aspects = vec!["item_key".to_string()];
        let names = resolve_column_names(&aspects, &[1], vec!["Commodity".to_string()]).unwrap();
        assert_eq!(names, ["Commodity"]);
    }

    #[test]
    fn mismatched_column_names_are_rejected() {
        let aspects = vec!["a".to_string(), "b".to_string()];
        let err = resolve_column_names(&aspects, &[1, 2], vec!["x".to_string(); 3]).unwrap_err();
        assert!(matches!(err, DecodeError::Configuration { .. }));
    }

    #[test]
    fn document_defaults_accept_scalars() {
        let document: Value =
            serde_yaml::from_str("defaults: {aspects: name, levels: [1, 2]}\nitems: []").unwrap();
        let defaults = read_document_defaults(&document, "x").unwrap();
        assert_eq!(defaults.aspects, ["name"]);
        assert_eq!(defaults.levels, [1, 2]);
    }

    #[test]
    fn malformed_missing_values_are_rejected() {
        let document: Value =
            serde_yaml::from_str("defaults: {missing_value_replacements: [a, b]}").unwrap();
        assert!(matches!(
            read_document_defaults(&document, "x"),
            Err(DecodeError::Configuration { .. })
        ));
    }
}
