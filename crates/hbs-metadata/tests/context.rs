use std::fs;
use std::path::Path;

use serde_yaml::Value;

use hbs_metadata::{MetadataContext, MetadataError, MetadataPaths, ResolveOptions};
use hbs_model::ClassificationType;

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).expect("write metadata");
}

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).expect("yaml")
}

#[test]
fn layers_merge_with_local_precedence() {
    let base = tempfile::tempdir().expect("base dir");
    let local = tempfile::tempdir().expect("local dir");

    write(
        base.path(),
        "id_information.yaml",
        "Urban_Rural: {1363: {code: {position: {start: 0, end: 1}}}}\nProvince: base\n",
    );
    write(local.path(), "id_information.yaml", "Province: local\n");

    let context = MetadataContext::load(MetadataPaths::new(base.path()).with_local(local.path()))
        .expect("load context");

    let document = context.id_information().expect("document");
    assert_eq!(document["Province"], Value::from("local"));
    assert!(document.get("Urban_Rural").is_some());
}

#[test]
fn settings_merge_deeply_across_layers() {
    let base = tempfile::tempdir().expect("base dir");
    let package = tempfile::tempdir().expect("package dir");
    write(package.path(), "settings.yaml", "columns:\n  id: HHID\nyears: [1390, 1391]\n");

    let context =
        MetadataContext::load(MetadataPaths::new(base.path()).with_package(package.path()))
            .expect("load context");

    let defaults = context.defaults();
    assert_eq!(defaults.columns.id, "HHID");
    assert_eq!(defaults.columns.year, "Year");
    assert_eq!(defaults.years, vec![1390, 1391]);
}

#[test]
fn commodity_placeholders_see_lower_layers() {
    let base = tempfile::tempdir().expect("base dir");
    let local = tempfile::tempdir().expect("local dir");
    write(
        base.path(),
        "commodities.yaml",
        "original:\n  items: {bread: {code: 11111}, rice: {code: 11112}}\n",
    );
    write(
        local.path(),
        "commodities.yaml",
        "staples:\n  items: {{ original }}\n",
    );

    let context = MetadataContext::load(MetadataPaths::new(base.path()).with_local(local.path()))
        .expect("load context");

    let staples = context
        .classification(ClassificationType::Commodity, "staples")
        .expect("staples");
    assert_eq!(staples["items"]["rice"]["code"], Value::from(11112));
}

#[test]
fn reload_document_picks_up_changes() {
    let base = tempfile::tempdir().expect("base dir");
    write(base.path(), "industries.yaml", "isic: {items: []}\n");

    let mut context = MetadataContext::load(MetadataPaths::new(base.path())).expect("load");
    assert!(
        context
            .classification(ClassificationType::Industry, "local")
            .is_err()
    );

    write(base.path(), "industries.yaml", "local: {items: []}\n");
    context.reload_document("industries").expect("reload");
    assert!(
        context
            .classification(ClassificationType::Industry, "local")
            .is_ok()
    );
}

#[test]
fn resolve_walks_nested_keys() {
    let defaults = hbs_metadata::Defaults::builtin().expect("defaults");
    let context = MetadataContext::from_documents(
        defaults,
        [(
            "id_information".to_string(),
            yaml("{Province: {versions: {1363: {ID_Length: 9}}, code: x}}"),
        )],
    );

    let resolved = context
        .resolve(
            "id_information",
            &["Province"],
            1370,
            ResolveOptions::new().with_year(),
        )
        .expect("resolve");
    assert_eq!(resolved, Some(yaml("{code: x, ID_Length: 9, year: 1370}")));

    let err = context
        .resolve("id_information", &["Missing"], 1370, ResolveOptions::new())
        .unwrap_err();
    assert!(matches!(err, MetadataError::MissingKey { .. }));
}

#[test]
fn non_mapping_document_is_rejected() {
    let base = tempfile::tempdir().expect("base dir");
    write(base.path(), "occupations.yaml", "- a\n- b\n");

    let err = MetadataContext::load(MetadataPaths::new(base.path())).unwrap_err();
    assert!(matches!(err, MetadataError::NotAMapping { .. }));
}

#[test]
fn version_years_follow_nested_keys() {
    let defaults = hbs_metadata::Defaults::builtin().expect("defaults");
    let context = MetadataContext::from_documents(
        defaults,
        [(
            "id_information".to_string(),
            yaml("{ID_Length: {1380: 10, 1363: 9}, Province: {code: x}}"),
        )],
    );

    assert_eq!(
        context.version_years("id_information", &["ID_Length"]).expect("years"),
        vec![1363, 1380]
    );
    assert!(
        context
            .version_years("id_information", &["Province"])
            .expect("years")
            .is_empty()
    );
}

#[test]
fn malformed_commodity_layer_names_its_file() {
    let base = tempfile::tempdir().expect("base dir");
    write(base.path(), "commodities.yaml", "food: [1, 2\nstaples: {{ food }}\n");

    let err = MetadataContext::load(MetadataPaths::new(base.path())).unwrap_err();
    assert!(
        matches!(err, MetadataError::Yaml { ref path, .. } if path.ends_with("commodities.yaml"))
    );
}
