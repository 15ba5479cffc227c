#![deny(unsafe_code)]

//! Decoding survey tables with year-versioned metadata.
//!
//! Two decoders are provided:
//!
//! - [`CodeMapper`] maps classification codes (commodities, industries,
//!   occupations) to labelled columns, one per `(aspect, level)`.
//! - [`IdMapper`] extracts household attributes from packed IDs by digit
//!   position or external tables and labels them, following chained
//!   mappings.
//!
//! Both add string columns to a copy of the input table and keep its row
//! count and order.

pub mod chain;
pub mod classification;
pub mod code_mapper;
pub mod error;
pub mod external;
pub mod frame;
pub mod id_mapper;
pub mod index;
pub mod mapping;
pub mod target;

pub use chain::{LabelChain, LabelTable};
pub use classification::{ClassificationRow, build_classification_table};
pub use code_mapper::{ClassificationOptions, ClassificationSettings, CodeMapper};
pub use error::{DecodeError, Result};
pub use external::{InMemoryTables, TableSource};
pub use id_mapper::{IdDecoderOptions, IdDecoderSettings, IdMapper, digit_field};
pub use index::IntervalIndex;
pub use mapping::MappingTable;
pub use target::{Target, infer_target};
