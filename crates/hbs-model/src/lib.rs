#![deny(unsafe_code)]

//! Shared data model for household budget survey decoding.
//!
//! - **classification**: the closed set of classification kinds
//! - **interval**: integer range sets used for code and year matching
//! - **scalar**: helpers for reading scalar metadata values

pub mod classification;
pub mod error;
pub mod interval;
pub mod scalar;

pub use classification::ClassificationType;
pub use error::{IntervalError, ModelError};
pub use interval::{Interval, IntervalOptions, IntervalSet};
pub use scalar::{scalar_key, value_to_i64};

/// Survey year in the local calendar (e.g. 1398).
pub type Year = i64;

/// Raw numeric code or packed identifier as found in survey tables.
pub type Code = i64;
