//! Error types for decoding.

use polars::prelude::PolarsError;
use thiserror::Error;

use hbs_metadata::MetadataError;
use hbs_model::{Code, IntervalError, IntervalSet, ModelError, Year};

/// Errors raised while decoding classification codes or household IDs.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Metadata or settings have an unusable shape.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// More than one classification item matched the same code at one level.
    #[error("classification is not valid: {count} ambiguous matches\n{sample}")]
    ClassificationAmbiguity { count: usize, sample: String },

    /// An attribute was decoded for a year outside its declared limits.
    #[error("attribute '{field}' is not available for year {year} (available: {limits})")]
    FieldLimit {
        field: String,
        year: Year,
        limits: IntervalSet,
    },

    /// An external code table left some household IDs without a code.
    #[error(
        "external code table for '{field}' has no code for {} id(s) in year {year}: {}",
        ids.len(),
        preview(ids)
    )]
    MissingCodeMapping {
        field: String,
        year: Year,
        ids: Vec<Code>,
    },

    /// The target column was not given and could not be inferred.
    #[error("target column not specified; candidates: [{}]", candidates.join(", "))]
    TargetDisambiguation { candidates: Vec<String> },

    #[error("column '{column}' not found in table")]
    ColumnNotFound { column: String },

    #[error("external table '{name}' is not available")]
    TableNotFound { name: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Interval(#[from] IntervalError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl DecodeError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

fn preview(ids: &[Code]) -> String {
    const SHOWN: usize = 5;
    let mut text = ids
        .iter()
        .take(SHOWN)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if ids.len() > SHOWN {
        text.push_str(", ...");
    }
    text
}

pub type Result<T> = std::result::Result<T, DecodeError>;
