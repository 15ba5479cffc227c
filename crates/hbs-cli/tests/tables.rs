use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tempfile::TempDir;

use hbs_cli::batch::run_batch;
use hbs_cli::tables::{CsvDirectory, output_path, read_table, write_table};
use hbs_decode::{DecodeError, IdDecoderOptions, IdDecoderSettings, IdMapper, TableSource};
use hbs_metadata::{MetadataContext, MetadataPaths};

const ID_INFORMATION: &str = "
ID_Length: 6
Urban_Rural:
  code: {position: {start: 0, end: 1}}
  name: {1: Urban, 2: Rural}
County:
  code: {external_file: county_codes}
  name: {5: North County, 6: South County}
";

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn metadata(dir: &TempDir) -> MetadataContext {
    let base = dir.path().join("metadata");
    fs::create_dir_all(&base).expect("metadata dir");
    write(&base, "id_information.yaml", ID_INFORMATION);
    MetadataContext::load(MetadataPaths::new(base)).expect("load metadata")
}

fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .expect("column")
        .str()
        .expect("str")
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

#[test]
fn decoded_table_is_written_next_to_input() {
    let dir = TempDir::new().expect("tempdir");
    let context = metadata(&dir);
    let input = write(
        dir.path(),
        "households.csv",
        "Year,ID,Expenditure\n1390,123456,10\n1390,223456,20\n",
    );

    let table = read_table(&input).expect("read");
    let settings = IdDecoderSettings::resolve(IdDecoderOptions::new("Urban_Rural"), &context);
    let mut decoded = IdMapper::new(&context, settings)
        .add_attribute(&table)
        .expect("decode");
    let output = output_path(&input);
    write_table(&output, &mut decoded).expect("write");

    let written = read_table(&output).expect("read back");
    assert_eq!(output.file_name().and_then(|n| n.to_str()), Some("households.decoded.csv"));
    assert_eq!(written.height(), 2);
    assert_eq!(
        strings(&written, "Urban_Rural"),
        vec![Some("Urban".to_string()), Some("Rural".to_string())]
    );
}

#[test]
fn csv_directory_serves_external_code_tables() {
    let dir = TempDir::new().expect("tempdir");
    let context = metadata(&dir);
    let external = dir.path().join("external");
    fs::create_dir_all(&external).expect("external dir");
    write(&external, "county_codes.csv", "Year,ID,County\n1390,123456,6\n");

    let tables = CsvDirectory::new(&external);
    let table = df! {
        "Year" => [1390i64],
        "ID" => [123_456i64],
    }
    .expect("df");
    let settings = IdDecoderSettings::resolve(IdDecoderOptions::new("County"), &context);
    let decoded = IdMapper::new(&context, settings)
        .with_tables(&tables)
        .add_attribute(&table)
        .expect("decode");

    assert_eq!(strings(&decoded, "County"), vec![Some("South County".to_string())]);
    assert!(matches!(
        tables.get_table("missing"),
        Err(DecodeError::TableNotFound { ref name }) if name == "missing"
    ));
}

#[test]
fn batch_reports_unreadable_inputs_without_stopping() {
    let dir = TempDir::new().expect("tempdir");
    let good = write(dir.path(), "good.csv", "Year,ID\n1390,123456\n");
    let missing = dir.path().join("missing.csv");

    let report = run_batch(vec![good.clone(), missing.clone()], NonZeroUsize::new(2), |path| {
        read_table(path).map(|df| df.height())
    });

    assert_eq!(report.successes().collect::<Vec<_>>(), [(&good, &1)]);
    let failures: Vec<&PathBuf> = report.failures().map(|(path, _)| path).collect();
    assert_eq!(failures, [&missing]);
}
