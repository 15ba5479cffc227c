//! CLI argument definitions for the `hbs` tool.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use hbs_model::{ClassificationType, Year};

#[derive(Parser)]
#[command(
    name = "hbs",
    version,
    about = "Household budget survey metadata and decoding",
    long_about = "Resolve year-versioned survey metadata and decode survey tables.\n\n\
                  Classification codes (commodities, industries, occupations) and \n\
                  household IDs are turned into labelled columns written next to \n\
                  each input file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub metadata: MetadataArgs,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

/// Metadata directories, lowest precedence first.
#[derive(Args)]
pub struct MetadataArgs {
    /// Base metadata directory (default: $HBS_METADATA_DIR or ./metadata).
    #[arg(long = "metadata-dir", value_name = "DIR", global = true)]
    pub metadata_dir: Option<PathBuf>,

    /// Installed package metadata overriding the base directory.
    #[arg(long = "package-dir", value_name = "DIR", global = true)]
    pub package_dir: Option<PathBuf>,

    /// Project-local metadata overriding everything else.
    #[arg(long = "local-dir", value_name = "DIR", global = true)]
    pub local_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print a metadata document (or a nested entry) resolved for one year.
    Resolve(ResolveArgs),

    /// Add classification label columns to survey tables.
    Classify(ClassifyArgs),

    /// Add household attribute columns decoded from IDs.
    Attribute(AttributeArgs),

    /// Expand a year selection such as `all`, `last` or `1390-1395`.
    Years(YearsArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Metadata document name, e.g. `commodities` or `id_information`.
    #[arg(value_name = "DOCUMENT")]
    pub document: String,

    /// Nested keys inside the document.
    #[arg(value_name = "KEY")]
    pub keys: Vec<String>,

    #[arg(long = "year", value_name = "YEAR")]
    pub year: Year,

    /// Flatten `items.categories` into a list of items.
    #[arg(long = "categorize")]
    pub categorize: bool,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// CSV files to decode.
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Column holding the codes (inferred from keywords when omitted).
    #[arg(long = "target", value_name = "COLUMN")]
    pub target: Option<String>,

    #[arg(long = "type", value_name = "TYPE", value_parser = parse_classification_type)]
    pub kind: Option<ClassificationType>,

    /// Classification name within the metadata document.
    #[arg(long = "name", value_name = "NAME")]
    pub name: Option<String>,

    #[arg(long = "aspect", value_name = "ASPECT")]
    pub aspects: Vec<String>,

    #[arg(long = "level", value_name = "LEVEL")]
    pub levels: Vec<i64>,

    /// Output column names, one per aspect/level or one per aspect.
    #[arg(long = "column", value_name = "NAME")]
    pub column_names: Vec<String>,

    /// Fill undecoded rows, as COLUMN=VALUE.
    #[arg(long = "missing", value_name = "COLUMN=VALUE", value_parser = parse_assignment)]
    pub missing: Vec<(String, String)>,

    /// Maximum number of files decoded in parallel.
    #[arg(long = "jobs", short = 'j', value_name = "N")]
    pub jobs: Option<NonZeroUsize>,
}

#[derive(Args)]
pub struct AttributeArgs {
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Attribute name in `id_information`, e.g. `Urban_Rural` or `Province`.
    #[arg(long = "name", value_name = "ATTRIBUTE")]
    pub name: String,

    #[arg(long = "aspect", value_name = "ASPECT")]
    pub aspects: Vec<String>,

    #[arg(long = "column", value_name = "NAME")]
    pub column_names: Vec<String>,

    /// Directory holding external code tables as `<name>.csv`.
    #[arg(long = "external-dir", value_name = "DIR")]
    pub external_dir: Option<PathBuf>,

    /// Maximum number of files decoded in parallel.
    #[arg(long = "jobs", short = 'j', value_name = "N")]
    pub jobs: Option<NonZeroUsize>,
}

#[derive(Args)]
pub struct YearsArgs {
    /// `all`, `last`, a year, a comma list or an inclusive range.
    #[arg(value_name = "SPEC")]
    pub spec: String,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_classification_type(value: &str) -> Result<ClassificationType, String> {
    value.parse().map_err(|err: hbs_model::ModelError| err.to_string())
}

fn parse_assignment(value: &str) -> Result<(String, String), String> {
    let (column, fill) = value
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, found '{value}'"))?;
    if column.trim().is_empty() {
        return Err(format!("missing column name in '{value}'"));
    }
    Ok((column.trim().to_string(), fill.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn classify_collects_repeated_options() {
        let cli = Cli::try_parse_from([
            "hbs", "classify", "a.csv", "b.csv", "--type", "industries", "--level", "1",
            "--level", "2", "--missing", "Group=other", "-j", "2",
        ])
        .unwrap();
        let Command::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.kind, Some(ClassificationType::Industry));
        assert_eq!(args.levels, [1, 2]);
        assert_eq!(args.missing, [("Group".to_string(), "other".to_string())]);
        assert_eq!(args.jobs.map(NonZeroUsize::get), Some(2));
    }

    #[test]
    fn assignment_needs_a_column() {
        assert!(parse_assignment("=x").is_err());
        assert!(parse_assignment("novalue").is_err());
        assert_eq!(parse_assignment("A=").unwrap(), ("A".to_string(), String::new()));
    }
}
