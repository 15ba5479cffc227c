use polars::prelude::*;
use serde_yaml::Value;

use hbs_decode::{DecodeError, IdDecoderOptions, IdDecoderSettings, IdMapper, InMemoryTables};
use hbs_metadata::{Defaults, MetadataContext};

const ID_INFORMATION: &str = "
ID_Length: {1363: 6, 1390: 7}
Urban_Rural:
  code: {position: {start: 0, end: 1}}
  name: {1: Urban, 2: Rural}
Province:
  code: {position: {start: 1, end: 3}}
  name: {0: Markazi, 1: Gilan, 23: Tehran}
  mappings:
    region: {origin: name, mapping: province_regions}
    zone: {origin: region, mapping: region_zones}
Region_Type:
  code: {position: {start: 0, end: 1}}
  name: {1: A, 2: B}
  limits: 1380-
County:
  code: {external_file: county_codes}
  name: {5: North County, 6: South County}
Looping:
  code: {position: {start: 0, end: 1}}
  mappings:
    a: {origin: b, mapping: province_regions}
    b: {origin: a, mapping: province_regions}
province_regions:
  Markazi: Center
  Gilan: North
  Tehran: Center
region_zones:
  1363: {Center: Z1, North: Z2}
";

fn context() -> MetadataContext {
    let defaults = Defaults::builtin().expect("defaults");
    let information: Value = serde_yaml::from_str(ID_INFORMATION).expect("yaml");
    MetadataContext::from_documents(defaults, [("id_information".to_string(), information)])
}

fn table() -> DataFrame {
    df! {
        "Year" => [1390i64, 1363, 1390, 1363],
        "ID" => [2_011_234i64, 123_456, 2_011_234, 200_099],
        "Expenditure" => [1i64, 2, 3, 4],
    }
    .expect("df")
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

fn s(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn decode(context: &MetadataContext, options: IdDecoderOptions) -> Result<DataFrame, DecodeError> {
    let settings = IdDecoderSettings::resolve(options, context);
    IdMapper::new(context, settings).add_attribute(&table())
}

#[test]
fn digit_positions_follow_the_year_width() {
    let context = context();
    let decoded = decode(&context, IdDecoderOptions::new("Urban_Rural")).expect("decode");

    assert_eq!(decoded.height(), 4);
    assert_eq!(
        strings(&decoded, "Urban_Rural"),
        vec![s("Rural"), s("Urban"), s("Rural"), s("Rural")]
    );
}

#[test]
fn several_aspects_get_suffixed_columns() {
    let context = context();
    let options = IdDecoderOptions::new("Province").with_aspects(["code", "name", "region"]);
    let decoded = decode(&context, options).expect("decode");

    assert_eq!(
        strings(&decoded, "Province_code"),
        vec![s("1"), s("23"), s("1"), s("0")]
    );
    assert_eq!(
        strings(&decoded, "Province_name"),
        vec![s("Gilan"), s("Tehran"), s("Gilan"), s("Markazi")]
    );
    assert_eq!(
        strings(&decoded, "Province_region"),
        vec![s("North"), s("Center"), s("North"), s("Center")]
    );
}

#[test]
fn chained_mapping_equals_manual_composition() {
    let context = context();
    let options = IdDecoderOptions::new("Province")
        .with_aspects(["region", "zone"])
        .with_column_names(["Region", "Zone"]);
    let decoded = decode(&context, options).expect("decode");

    let manual: Vec<Option<String>> = strings(&decoded, "Region")
        .into_iter()
        .map(|region| match region.as_deref() {
            Some("Center") => s("Z1"),
            Some("North") => s("Z2"),
            _ => None,
        })
        .collect();
    assert_eq!(strings(&decoded, "Zone"), manual);
}

#[test]
fn mapping_cycle_is_configuration_error() {
    let context = context();
    let options = IdDecoderOptions::new("Looping").with_aspects(["a"]);
    assert!(matches!(
        decode(&context, options),
        Err(DecodeError::Configuration { .. })
    ));
}

#[test]
fn year_outside_limits_names_field_and_year() {
    let context = context();
    let err = decode(&context, IdDecoderOptions::new("Region_Type")).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"attribute 'Region_Type' is not available for year 1363 (available: 1380-1402)"
    );
}

#[test]
fn external_codes_are_looked_up_per_year() {
    let context = context();
    let tables = InMemoryTables::new().with_table(
        "county_codes",
        df! {
            "Year" => [1390i64, 1363, 1363],
            "ID" => [2_011_234i64, 123_456, 200_099],
            "County" => [6i64, 5, 6],
        }
        .expect("df"),
    );
    let settings = IdDecoderSettings::resolve(IdDecoderOptions::new("County"), &context);
    let decoded = IdMapper::new(&context, settings)
        .with_tables(&tables)
        .add_attribute(&table())
        .expect("decode");

    assert_eq!(
        strings(&decoded, "County"),
        vec![s("South County"), s("North County"), s("South County"), s("South County")]
    );
}

#[test]
fn unmapped_external_id_is_fatal() {
    let context = context();
    let tables = InMemoryTables::new().with_table(
        "county_codes",
        df! {
            "Year" => [1363i64],
            "ID" => [123_456i64],
            "County" => [5i64],
        }
        .expect("df"),
    );
    let settings = IdDecoderSettings::resolve(IdDecoderOptions::new("County"), &context);
    let err = IdMapper::new(&context, settings)
        .with_tables(&tables)
        .add_attribute(&table())
        .unwrap_err();
    assert!(matches!(
        err,
        DecodeError::MissingCodeMapping { ref field, ids: _, year } if field == "County" && (year == 1390 || year == 1363)
    ));
}

#[test]
fn mapping_table_holds_distinct_year_id_pairs() {
    let context = context();
    let settings = IdDecoderSettings::resolve(IdDecoderOptions::new("Urban_Rural"), &context);
    let mapping = IdMapper::new(&context, settings)
        .construct_mapping_table(&table())
        .expect("mapping");
    assert_eq!(mapping.len(), 3);
    assert_eq!(mapping.keys()[0], (1390, 2_011_234));
}
