//! CSV input and output for the command line.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;

use hbs_decode::{DecodeError, TableSource};

/// Suffix appended to the file stem of decoded outputs.
pub const OUTPUT_SUFFIX: &str = "decoded";

/// Reads a CSV file with a header row.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let reader = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("failed to open {}", path.display()))?;
    reader
        .finish()
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Writes `df` as CSV to `path`, replacing an existing file.
pub fn write_table(path: &Path, df: &mut DataFrame) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Output path next to `input`: `households.csv` becomes `households.decoded.csv`.
pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}.{OUTPUT_SUFFIX}.csv"))
}

/// External tables stored as `<name>.csv` files in one directory.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    root: PathBuf,
}

impl CsvDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.csv"))
    }
}

impl TableSource for CsvDirectory {
    fn get_table(&self, name: &str) -> hbs_decode::Result<DataFrame> {
        let path = self.table_path(name);
        if !path.is_file() {
            return Err(DecodeError::TableNotFound {
                name: name.to_string(),
            });
        }
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path))?
            .finish()?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_sits_next_to_input() {
        assert_eq!(
            output_path(Path::new("/data/1390/households.csv")),
            PathBuf::from("/data/1390/households.decoded.csv")
        );
    }
}
