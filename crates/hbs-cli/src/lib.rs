//! Library side of the `hbs` command line tool.

#![allow(missing_docs)]

pub mod batch;
pub mod logging;
pub mod tables;
