#![deny(unsafe_code)]

//! Survey metadata: layered loading, library defaults and year-versioned
//! resolution.
//!
//! # Modules
//!
//! - [`versioned`] resolves year-varying values for a target year
//! - [`context`] holds loaded documents and defaults for a session
//! - [`layers`] reads and merges YAML from the metadata directories
//! - [`placeholder`] substitutes `{{ name }}` references in documents
//! - [`years`] parses user year selections

pub mod context;
pub mod defaults;
pub mod error;
pub mod layers;
pub mod placeholder;
pub mod versioned;
pub mod years;

pub use context::{ID_INFORMATION, METADATA_DIR_ENV_VAR, MetadataContext, MetadataPaths};
pub use defaults::{DefaultColumns, Defaults, SETTINGS_FILE};
pub use error::{MetadataError, Result};
pub use placeholder::interpolate;
pub use versioned::{ResolveOptions, resolve, version_years};
pub use years::parse_years;
