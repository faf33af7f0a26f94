//! # rge-core
//!
//! Shared foundation of the RG-E ntuple engine: the error type, the value
//! types exchanged between bank sources and the reconstruction pipeline, and
//! the [`RowSource`] / [`OutputSink`] traits at the persistence boundary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{OutputSink, RowSource};
pub use types::{
    BankRows, Column, EventRows, FieldDef, FieldValue, OUTPUT_FIELD_NAMES, OUTPUT_RECORD_LEN,
    OutputRecord, PrimitiveType,
};

/// Workspace version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
