use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use polars::prelude::DataFrame;
use tracing::{info, info_span};

use hbs_cli::batch::{BatchReport, run_batch};
use hbs_cli::tables::{CsvDirectory, output_path, read_table, write_table};
use hbs_decode::{
    ClassificationOptions, ClassificationSettings, CodeMapper, IdDecoderOptions,
    IdDecoderSettings, IdMapper, Target, infer_target,
};
use hbs_metadata::{MetadataContext, MetadataPaths, ResolveOptions, parse_years};
use hbs_model::Year;

use crate::cli::{AttributeArgs, ClassifyArgs, MetadataArgs, ResolveArgs, YearsArgs};

/// One decoded input file.
#[derive(Debug)]
pub struct FileSummary {
    pub output: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
}

pub type DecodeReport = BatchReport<PathBuf, FileSummary, anyhow::Error>;

pub fn load_context(args: &MetadataArgs) -> Result<MetadataContext> {
    let mut paths = match &args.metadata_dir {
        Some(dir) => MetadataPaths::new(dir),
        None => MetadataPaths::from_env(),
    };
    if let Some(dir) = &args.package_dir {
        paths = paths.with_package(dir);
    }
    if let Some(dir) = &args.local_dir {
        paths = paths.with_local(dir);
    }
    MetadataContext::load(paths).context("load metadata")
}

pub fn run_resolve(context: &MetadataContext, args: &ResolveArgs) -> Result<()> {
    let options = if args.categorize {
        ResolveOptions::categorized()
    } else {
        ResolveOptions::new()
    };
    let keys: Vec<&str> = args.keys.iter().map(String::as_str).collect();
    let Some(value) = context.resolve(&args.document, &keys, args.year, options)? else {
        let versions = context.version_years(&args.document, &keys)?;
        bail!(
            "'{}' has no value for year {} (versions: {})",
            std::iter::once(args.document.as_str())
                .chain(keys.iter().copied())
                .collect::<Vec<_>>()
                .join("."),
            args.year,
            render_years(&versions)
        );
    };
    print!("{}", serde_yaml::to_string(&value).context("render yaml")?);
    Ok(())
}

fn render_years(years: &[Year]) -> String {
    years.iter().map(Year::to_string).collect::<Vec<_>>().join(" ")
}

pub fn run_years(context: &MetadataContext, args: &YearsArgs) -> Result<()> {
    let years = parse_years(&args.spec, &context.defaults().years)?;
    println!("{}", render_years(&years));
    Ok(())
}

pub fn run_classify(context: &MetadataContext, args: &ClassifyArgs) -> Result<DecodeReport> {
    let report = run_batch(args.inputs.clone(), args.jobs, |input| {
        let span = info_span!("classify", input = %input.display());
        let _guard = span.enter();
        decode_file(input, |table| classify_table(context, args, table))
    });
    Ok(report)
}

pub fn run_attribute(context: &MetadataContext, args: &AttributeArgs) -> Result<DecodeReport> {
    let tables = args.external_dir.as_ref().map(CsvDirectory::new);
    let report = run_batch(args.inputs.clone(), args.jobs, |input| {
        let span = info_span!("attribute", input = %input.display(), name = %args.name);
        let _guard = span.enter();
        decode_file(input, |table| {
            let options = IdDecoderOptions::new(&args.name)
                .with_aspects(args.aspects.iter().cloned())
                .with_column_names(args.column_names.iter().cloned());
            let settings = IdDecoderSettings::resolve(options, context);
            let columns = settings.column_names.clone();
            let mut mapper = IdMapper::new(context, settings);
            if let Some(tables) = &tables {
                mapper = mapper.with_tables(tables);
            }
            Ok((mapper.add_attribute(table)?, columns))
        })
    });
    Ok(report)
}

fn classify_table(
    context: &MetadataContext,
    args: &ClassifyArgs,
    table: &DataFrame,
) -> Result<(DataFrame, Vec<String>)> {
    let target = resolve_target(context, args, table)?;
    let mut options = ClassificationOptions::new(target.kind)
        .with_code_column(&target.column)
        .with_aspects(args.aspects.iter().cloned())
        .with_levels(args.levels.iter().copied())
        .with_column_names(args.column_names.iter().cloned());
    if let Some(name) = &args.name {
        options = options.with_name(name);
    }
    for (column, value) in &args.missing {
        options = options.with_missing_value(column, value);
    }
    let settings = ClassificationSettings::resolve(options, context)?;
    let columns = settings.column_names.clone();
    let decoded = CodeMapper::new(context, settings).add_classification(table)?;
    Ok((decoded, columns))
}

/// Uses `--target` when given, otherwise the only keyword-matching column.
fn resolve_target(
    context: &MetadataContext,
    args: &ClassifyArgs,
    table: &DataFrame,
) -> Result<Target> {
    let defaults = context.defaults();
    match (&args.target, args.kind) {
        (Some(column), Some(kind)) => Ok(Target {
            column: column.clone(),
            kind,
        }),
        (Some(column), None) => {
            let selected = table
                .select([column.as_str()])
                .with_context(|| format!("target column '{column}'"))?;
            infer_target(&selected, defaults, None)
                .with_context(|| format!("cannot tell the classification type of '{column}'; pass --type"))
        }
        (None, kind) => Ok(infer_target(table, defaults, kind)?),
    }
}

fn decode_file<F>(input: &Path, decode: F) -> Result<FileSummary>
where
    F: FnOnce(&DataFrame) -> Result<(DataFrame, Vec<String>)>,
{
    let table = read_table(input)?;
    let (mut decoded, columns) = decode(&table)?;
    if decoded.height() != table.height() {
        bail!(
            "decoded table has {} rows, input has {}",
            decoded.height(),
            table.height()
        );
    }
    let output = output_path(input);
    write_table(&output, &mut decoded)?;
    info!(rows = decoded.height(), output = %output.display(), "wrote decoded table");
    Ok(FileSummary {
        output,
        rows: decoded.height(),
        columns,
    })
}
