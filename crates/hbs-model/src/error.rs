use thiserror::Error;

/// Errors raised while parsing interval specifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("invalid range expression '{text}'")]
    InvalidRange { text: String },

    #[error("interval bounds out of order: start {start} is after end {end}")]
    InvertedBounds { start: i64, end: i64 },

    #[error("interval bound overflows: {value}")]
    Overflow { value: i64 },

    #[error("unsupported interval specification: {message}")]
    Unsupported { message: String },
}

/// Errors raised by model-level conversions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown classification type '{0}' (expected commodity, industry or occupation)")]
    UnknownClassificationType(String),
}
