//! External tables referenced by metadata.
//!
//! Some household attributes are not encoded in the ID itself but listed in
//! separate tables (one row per year and household). Fetching and caching
//! those tables is the caller's business; decoders only need a
//! [`TableSource`].

use std::collections::HashMap;

use polars::prelude::DataFrame;

use hbs_model::{Code, Year};

use crate::error::{DecodeError, Result};
use crate::frame::integer_column;

/// Looks up external tables by name.
pub trait TableSource {
    fn get_table(&self, name: &str) -> Result<DataFrame>;
}

/// A [`TableSource`] backed by frames held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTables {
    tables: HashMap<String, DataFrame>,
}

impl InMemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: DataFrame) {
        self.tables.insert(name.into(), table);
    }

    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, table: DataFrame) -> Self {
        self.insert(name, table);
        self
    }
}

impl TableSource for InMemoryTables {
    fn get_table(&self, name: &str) -> Result<DataFrame> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| DecodeError::TableNotFound {
                name: name.to_string(),
            })
    }
}

/// Reads the id → code map for one year from an external table.
///
/// The table carries the year and id columns plus the code in the first
/// remaining column.
pub(crate) fn external_codes(
    table: &DataFrame,
    name: &str,
    year: Year,
    year_column: &str,
    id_column: &str,
) -> Result<HashMap<Code, Code>> {
    let value_column = table
        .get_column_names()
        .into_iter()
        .map(|column| column.as_str())
        .find(|column| *column != year_column && *column != id_column)
        .map(str::to_string)
        .ok_or_else(|| {
            DecodeError::config(format!("external table '{name}' has no value column"))
        })?;

    let years = integer_column(table, year_column)?;
    let ids = integer_column(table, id_column)?;
    let codes = integer_column(table, &value_column)?;

    let mut mapping = HashMap::new();
    for ((row_year, id), code) in years.into_iter().zip(ids).zip(codes) {
        if row_year != Some(year) {
            continue;
        }
        if let (Some(id), Some(code)) = (id, code) {
            mapping.insert(id, code);
        }
    }
    tracing::debug!(table = name, year, rows = mapping.len(), "loaded external codes");
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;

    use super::*;

    #[test]
    fn reads_codes_for_one_year() {
        let table = df! {
            "Year" => [1390i64, 1390, 1391],
            "ID" => [100i64, 200, 100],
            "Province" => [7i64, 8, 9],
        }
        .unwrap();

        let codes = external_codes(&table, "province", 1390, "Year", "ID").unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes.get(&100), Some(&7));
        assert_eq!(codes.get(&200), Some(&8));
    }

    #[test]
    fn unknown_table_is_an_error() {
        let tables = InMemoryTables::new();
        assert!(matches!(
            tables.get_table("missing"),
            Err(DecodeError::TableNotFound { .. })
        ));
    }
}
