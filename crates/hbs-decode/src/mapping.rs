use std::collections::HashMap;

use polars::prelude::{Column, DataFrame};

use hbs_model::{Code, Year};

use crate::error::Result;
use crate::frame::attach_string_columns;

/// Decoded labels keyed by `(year, key)`, where the key is a classification
/// code or a household ID. Keys keep their insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    columns: Vec<String>,
    keys: Vec<(Year, Code)>,
    rows: HashMap<(Year, Code), Vec<Option<String>>>,
}

impl MappingTable {
    pub(crate) fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            keys: Vec::new(),
            rows: HashMap::new(),
        }
    }

    /// Mutable row for `key`, created empty on first access.
    pub(crate) fn row_mut(&mut self, key: (Year, Code)) -> &mut Vec<Option<String>> {
        let width = self.columns.len();
        let keys = &mut self.keys;
        self.rows.entry(key).or_insert_with(|| {
            keys.push(key);
            vec![None; width]
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, year: Year, key: Code) -> Option<&[Option<String>]> {
        self.rows.get(&(year, key)).map(Vec::as_slice)
    }

    pub fn keys(&self) -> &[(Year, Code)] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Label columns aligned with the given `(year, key)` rows; rows with a
    /// null part or no entry get nulls.
    pub fn lookup_columns(
        &self,
        years: &[Option<Year>],
        keys: &[Option<Code>],
    ) -> Vec<(String, Vec<Option<String>>)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values = years
                    .iter()
                    .zip(keys)
                    .map(|(year, key)| {
                        let (year, key) = year.zip(*key)?;
                        self.get(year, key).and_then(|row| row[idx].clone())
                    })
                    .collect();
                (name.clone(), values)
            })
            .collect()
    }

    /// Renders the table with the two key columns first.
    pub fn to_dataframe(&self, year_column: &str, key_column: &str) -> Result<DataFrame> {
        let mut df = DataFrame::new(vec![
            Column::new(
                year_column.into(),
                self.keys.iter().map(|(year, _)| *year).collect::<Vec<_>>(),
            ),
            Column::new(
                key_column.into(),
                self.keys.iter().map(|(_, key)| *key).collect::<Vec<_>>(),
            ),
        ])?;
        let years: Vec<Option<Year>> = self.keys.iter().map(|(year, _)| Some(*year)).collect();
        let keys: Vec<Option<Code>> = self.keys.iter().map(|(_, key)| Some(*key)).collect();
        attach_string_columns(&mut df, self.lookup_columns(&years, &keys))?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_keep_insertion_order() {
        let mut table = MappingTable::new(vec!["name".to_string()]);
        table.row_mut((1390, 5))[0] = Some("five".to_string());
        table.row_mut((1389, 7))[0] = Some("seven".to_string());
        table.row_mut((1390, 5))[0] = Some("FIVE".to_string());

        assert_eq!(table.keys(), &[(1390, 5), (1389, 7)]);
        assert_eq!(table.get(1390, 5), Some(&[Some("FIVE".to_string())][..]));

        let df = table.to_dataframe("Year", "Code").unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(
            df.column("name").unwrap().str().unwrap().get(1),
            Some("seven")
        );
    }

    #[test]
    fn lookup_nulls_unknown_and_null_keys() {
        let mut table = MappingTable::new(vec!["name".to_string()]);
        table.row_mut((1390, 5))[0] = Some("five".to_string());

        let columns = table.lookup_columns(&[Some(1390), Some(1390), None], &[Some(5), Some(6), Some(5)]);
        assert_eq!(
            columns[0].1,
            vec![Some("five".to_string()), None, None]
        );
    }
}
