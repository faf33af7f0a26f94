//! # rge-bank
//!
//! Detector banks for the RG-E ntuple engine.
//!
//! A [`BankRegistry`] holds the schema of every bank known to a run. Each
//! [`BankContainer`] binds to one schema and is refilled once per event from
//! a [`rge_core::RowSource`]. Two sources ship here: [`MemoryEventSource`]
//! for programmatic events and [`ParquetEventSource`] for event files with
//! one `BANK::VAR` list column per field.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod container;
pub mod event_parquet;
pub mod memory;
pub mod schema;

pub use container::BankContainer;
pub use event_parquet::{ParquetEventSource, write_event_parquet};
pub use memory::{MemoryEventSource, bank_rows};
pub use schema::{
    ADDRESS_SEPARATOR, BankRegistry, BankSchema, FMT_TRACKS, REC_CALORIMETER, REC_CHERENKOV,
    REC_PARTICLE, REC_SCINTILLATOR, REC_TRACK,
};
