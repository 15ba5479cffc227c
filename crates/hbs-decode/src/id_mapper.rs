//! Decoding household attributes from packed IDs.
//!
//! A household ID is a fixed-width decimal number. For every survey year
//! `id_information` gives the width (`ID_Length`) and, per attribute, where
//! its code lives: a digit span of the ID or an external table. Label tables
//! of the attribute then turn codes into labels.

use std::collections::HashMap;

use polars::prelude::DataFrame;
use serde_yaml::{Mapping, Value};

use hbs_metadata::{ID_INFORMATION, MetadataContext, ResolveOptions, resolve};
use hbs_model::{Code, IntervalOptions, IntervalSet, Year, scalar_key, value_to_i64};

use crate::chain::{LabelChain, LabelTable, apply_hops};
use crate::error::{DecodeError, Result};
use crate::external::{TableSource, external_codes};
use crate::frame::{attach_string_columns, distinct, integer_column};
use crate::mapping::MappingTable;

pub const DEFAULT_ASPECT: &str = "name";
/// Aspect yielding the raw extracted code instead of a label.
pub const CODE_ASPECT: &str = "code";

const ID_LENGTH_KEY: &str = "ID_Length";
const CODE_KEY: &str = "code";
const POSITION_KEY: &str = "position";
const EXTERNAL_FILE_KEY: &str = "external_file";
const LIMITS_KEY: &str = "limits";
const START_KEY: &str = "start";
const END_KEY: &str = "end";
const YEAR_KEYWORD: &str = "year";
/// Widest ID whose powers of ten fit in an `i64`.
const MAX_ID_LENGTH: i64 = 18;

/// Extracts digits `start..end` (counted from the left) of an ID that is
/// `length` digits wide.
pub fn digit_field(id: Code, length: i64, start: i64, end: i64) -> Result<Code> {
    validate_position(length, start, end)?;
    let upper = 10i64.pow((length - start) as u32);
    let lower = 10i64.pow((length - end) as u32);
    Ok(id.rem_euclid(upper).div_euclid(lower))
}

fn validate_position(length: i64, start: i64, end: i64) -> Result<()> {
    if !(0..=MAX_ID_LENGTH).contains(&length) {
        return Err(DecodeError::config(format!(
            "ID length {length} is outside 0..={MAX_ID_LENGTH}"
        )));
    }
    if !(0 <= start && start <= end && end <= length) {
        return Err(DecodeError::config(format!(
            "digit position {start}..{end} does not fit an ID of length {length}"
        )));
    }
    Ok(())
}

/// Caller choices for an attribute decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdDecoderOptions {
    pub name: String,
    pub aspects: Vec<String>,
    pub column_names: Vec<String>,
    pub id_column: Option<String>,
    pub year_column: Option<String>,
}

impl IdDecoderOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aspects: Vec::new(),
            column_names: Vec::new(),
            id_column: None,
            year_column: None,
        }
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
    pub fn with_column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_names = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_year_column(mut self, column: impl Into<String>) -> Self {
        self.year_column = Some(column.into());
        self
    }
}

/// Fully resolved attribute decoding settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdDecoderSettings {
    pub name: String,
    pub aspects: Vec<String>,
    /// One output column per aspect.
    pub column_names: Vec<String>,
    pub id_column: String,
    pub year_column: String,
}

impl IdDecoderSettings {
    pub fn resolve(options: IdDecoderOptions, context: &MetadataContext) -> Self {
        let defaults = context.defaults();
        let aspects = if options.aspects.is_empty() {
            vec![DEFAULT_ASPECT.to_string()]
        } else {
            options.aspects
        };
        let column_names = if options.column_names.len() == aspects.len() {
            options.column_names
        } else if aspects.len() == 1 {
            vec![options.name.clone()]
        } else {
            aspects
                .iter()
                .map(|aspect| format!("{}_{aspect}", options.name))
                .collect()
        };
        Self {
            id_column: options
                .id_column
                .unwrap_or_else(|| defaults.columns.id.clone()),
            year_column: options
                .year_column
                .unwrap_or_else(|| defaults.columns.year.clone()),
            name: options.name,
            aspects,
            column_names,
        }
    }
}

/// Where an attribute's code comes from in one year.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CodeSource {
    Digits { length: i64, start: i64, end: i64 },
    External(HashMap<Code, Code>),
}

/// Decoding rules of one attribute for one year.
#[derive(Debug, Clone)]
struct YearDecoder {
    year: Year,
    source: CodeSource,
    /// Per aspect: the terminal label table and the hops after it.
    aspects: Vec<Option<(LabelTable, Vec<LabelTable>)>>,
}

impl YearDecoder {
    fn codes(&self, field: &str, ids: &[Code]) -> Result<Vec<Code>> {
        match &self.source {
            CodeSource::Digits { length, start, end } => ids
                .iter()
                .map(|&id| digit_field(id, *length, *start, *end))
                .collect(),
            CodeSource::External(mapping) => {
                let missing: Vec<Code> = ids
                    .iter()
                    .copied()
                    .filter(|id| !mapping.contains_key(id))
                    .collect();
                if !missing.is_empty() {
                    return Err(DecodeError::MissingCodeMapping {
                        field: field.to_string(),
                        year: self.year,
                        ids: missing,
                    });
                }
                Ok(ids.iter().map(|id| mapping[id]).collect())
            }
        }
    }

    fn label(&self, aspect: usize, code: Code) -> Option<String> {
        match &self.aspects[aspect] {
            None => Some(code.to_string()),
            Some((terminal, hops)) => apply_hops(terminal.get(&code.to_string()), hops),
        }
    }
}

/// Decodes one household attribute of a table.
pub struct IdMapper<'a> {
    context: &'a MetadataContext,
    tables: Option<&'a dyn TableSource>,
    settings: IdDecoderSettings,
}

impl<'a> IdMapper<'a> {
    pub fn new(context: &'a MetadataContext, settings: IdDecoderSettings) -> Self {
        Self {
            context,
            tables: None,
            settings,
        }
    }

    /// Source for attributes whose codes live in external tables.
    #[must_use]
    pub fn with_tables(mut self, tables: &'a dyn TableSource) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn settings(&self) -> &IdDecoderSettings {
        &self.settings
    }

    /// Decodes every distinct `(year, id)` of `table`.
    pub fn construct_mapping_table(&self, table: &DataFrame) -> Result<MappingTable> {
        let years = integer_column(table, &self.settings.year_column)?;
        let ids = integer_column(table, &self.settings.id_column)?;
        let pairs = distinct(years.iter().zip(&ids).map(|(year, id)| year.zip(*id)));

        let mut by_year: Vec<(Year, Vec<Code>)> = Vec::new();
        let mut positions: HashMap<Year, usize> = HashMap::new();
        for (year, id) in pairs {
            let slot = *positions.entry(year).or_insert_with(|| {
                by_year.push((year, Vec::new()));
                by_year.len() - 1
            });
            by_year[slot].1.push(id);
        }

        let mut mapping = MappingTable::new(self.settings.column_names.clone());
        for (year, ids) in by_year {
            let decoder = self.year_decoder(year)?;
            let codes = decoder.codes(&self.settings.name, &ids)?;
            for (id, code) in ids.into_iter().zip(codes) {
                let row = mapping.row_mut((year, id));
                for (aspect, value) in row.iter_mut().enumerate() {
                    *value = decoder.label(aspect, code);
                }
            }
            tracing::debug!(attribute = %self.settings.name, year, "decoded year partition");
        }
        tracing::info!(
            attribute = %self.settings.name,
            ids = mapping.len(),
            "built attribute mapping"
        );
        Ok(mapping)
    }

    /// Returns `table` with the decoded attribute columns added.
    pub fn add_attribute(&self, table: &DataFrame) -> Result<DataFrame> {
        let mapping = self.construct_mapping_table(table)?;
        let years = integer_column(table, &self.settings.year_column)?;
        let ids = integer_column(table, &self.settings.id_column)?;
        let mut output = table.clone();
        attach_string_columns(&mut output, mapping.lookup_columns(&years, &ids))?;
        Ok(output)
    }

    fn year_decoder(&self, year: Year) -> Result<YearDecoder> {
        let field = self.settings.name.as_str();
        let information = self.context.id_information()?;
        let resolved = resolve(information, year, ResolveOptions::new().with_year())
            .ok_or_else(|| DecodeError::config(format!("no ID information for year {year}")))?;

        let attribute = resolved
            .get(field)
            .and_then(Value::as_mapping)
            .ok_or_else(|| {
                DecodeError::config(format!("attribute '{field}' is not defined for year {year}"))
            })?;

        self.check_limits(attribute, year)?;
        let source = self.code_source(&resolved, attribute, year)?;

        let mut aspects = Vec::with_capacity(self.settings.aspects.len());
        for aspect in &self.settings.aspects {
            if aspect == CODE_ASPECT {
                aspects.push(None);
                continue;
            }
            let chain = LabelChain::resolve(attribute, aspect)?;
            let terminal = attribute.get(chain.terminal.as_str()).ok_or_else(|| {
                DecodeError::config(format!(
                    "attribute '{field}' has no label table '{}' in year {year}",
                    chain.terminal
                ))
            })?;
            let terminal = LabelTable::from_value(terminal)?;
            let hops = chain
                .hops
                .iter()
                .map(|name| self.hop_table(name, year))
                .collect::<Result<Vec<_>>>()?;
            aspects.push(Some((terminal, hops)));
        }

        Ok(YearDecoder {
            year,
            source,
            aspects,
        })
    }

    fn check_limits(&self, attribute: &Mapping, year: Year) -> Result<()> {
        let Some(limits) = attribute.get(LIMITS_KEY) else {
            return Ok(());
        };
        let (first, end) = self.context.defaults().year_bounds();
        let options = IntervalOptions::new()
            .with_bounds(first, end)
            .with_keyword(YEAR_KEYWORD);
        let limits = IntervalSet::parse(limits, &options)?;
        if limits.contains(year) {
            return Ok(());
        }
        Err(DecodeError::FieldLimit {
            field: self.settings.name.clone(),
            year,
            limits,
        })
    }

    fn code_source(&self, resolved: &Value, attribute: &Mapping, year: Year) -> Result<CodeSource> {
        let field = self.settings.name.as_str();
        let code = attribute.get(CODE_KEY).ok_or_else(|| {
            DecodeError::config(format!("attribute '{field}' has no code definition"))
        })?;

        if let Some(position) = code.get(POSITION_KEY).filter(|p| !p.is_null()) {
            let length = resolved
                .get(ID_LENGTH_KEY)
                .and_then(value_to_i64)
                .ok_or_else(|| DecodeError::config(format!("no {ID_LENGTH_KEY} for year {year}")))?;
            let bound = |key: &str| {
                position.get(key).and_then(value_to_i64).ok_or_else(|| {
                    DecodeError::config(format!("position of '{field}' has no integer '{key}'"))
                })
            };
            let (start, end) = (bound(START_KEY)?, bound(END_KEY)?);
            validate_position(length, start, end)?;
            return Ok(CodeSource::Digits { length, start, end });
        }

        if let Some(name) = code.get(EXTERNAL_FILE_KEY).and_then(scalar_key) {
            let tables = self.tables.ok_or_else(|| {
                DecodeError::config(format!(
                    "attribute '{field}' needs external table '{name}' but no table source is set"
                ))
            })?;
            let table = tables.get_table(&name)?;
            let mapping = external_codes(
                &table,
                &name,
                year,
                &self.settings.year_column,
                &self.settings.id_column,
            )?;
            return Ok(CodeSource::External(mapping));
        }

        Err(DecodeError::config(format!(
            "code position of '{field}' is not available"
        )))
    }

    fn hop_table(&self, document: &str, year: Year) -> Result<LabelTable> {
        let versioned = self
            .context
            .id_information()?
            .get(document)
            .ok_or_else(|| {
                DecodeError::config(format!("{ID_INFORMATION} has no mapping '{document}'"))
            })?;
        let resolved = resolve(versioned, year, ResolveOptions::new()).ok_or_else(|| {
            DecodeError::config(format!("mapping '{document}' is not defined for year {year}"))
        })?;
        LabelTable::from_value(&resolved)
    }
}
