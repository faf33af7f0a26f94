//! Core traits for the RG-E ntuple engine
//!
//! The reconstruction pipeline only talks to its input and output through
//! these traits, so the persistence format (Parquet, in-memory, ...) stays
//! outside the core.

use crate::Result;
use crate::types::{EventRows, FieldDef, OutputRecord};

/// Per-event source of detector bank rows.
pub trait RowSource {
    /// Ordered field definitions of one bank, or `None` if the source does
    /// not carry that bank at all.
    fn schema(&self, bank: &str) -> Option<&[FieldDef]>;

    /// Total number of events available.
    fn n_events(&self) -> u64;

    /// Read the next event into `rows`, replacing its previous contents.
    ///
    /// Returns `false` once the source is exhausted.
    fn read_event(&mut self, rows: &mut EventRows) -> Result<bool>;
}

/// Destination for accepted-particle records.
pub trait OutputSink {
    /// Append one record. Records arrive in event order.
    fn append(&mut self, record: &OutputRecord) -> Result<()>;

    /// Flush buffered records. Called once after the last event.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
