//! Error types for the RG-E ntuple engine
//!
//! Only run-level failures live here. Per-row conditions (missing index
//! match, failed cuts, absent timing) are ordinary values, never errors.

use thiserror::Error;

/// RG-E engine error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Columnar storage (Arrow / Parquet) error
    #[error("storage error: {0}")]
    Storage(String),

    /// A bank container was requested for a schema that is not registered.
    #[error("unknown bank schema `{0}`. Check the registered bank ids")]
    UnknownSchema(String),

    /// The row source disagrees with the registered schema.
    #[error("schema mismatch for bank `{bank}`: {reason}")]
    SchemaMismatch {
        /// Bank id.
        bank: String,
        /// What disagreed.
        reason: String,
    },

    /// Field name not present in a bank schema.
    #[error("field `{field}` not found in bank `{bank}`")]
    FieldNotFound {
        /// Bank id.
        bank: String,
        /// Requested field.
        field: String,
    },

    /// Row access past the end of a filled bank.
    #[error("row {row} out of range for bank `{bank}` ({rows} rows)")]
    IndexOutOfRange {
        /// Bank id.
        bank: String,
        /// Requested row.
        row: usize,
        /// Rows in the current event.
        rows: usize,
    },

    /// A field value cannot be represented in the requested type.
    #[error("field `{field}` of bank `{bank}` cannot be read as {requested} without loss")]
    LossyConversion {
        /// Bank id.
        bank: String,
        /// Field name.
        field: String,
        /// Requested numeric type.
        requested: &'static str,
    },

    /// Calorimeter layer id outside the known detector constants.
    #[error("invalid layer {0} in the calorimeter bank. Check bank integrity")]
    InvalidCalorimeterLayer(i32),

    /// Cherenkov detector id outside the known detector constants.
    #[error("invalid detector id {0} in the cherenkov bank. Check bank integrity")]
    InvalidDetectorId(i32),

    /// Sector id outside 1..=6.
    #[error("invalid sector {0} in the track bank. Check bank integrity")]
    InvalidSector(i32),

    /// PID code without a hypothesis in the PID table.
    #[error("unsupported PID {0}. Check that every hypothesis is in the PID table")]
    UnsupportedPid(i32),

    /// FMT requirement active but the input has no tracking-layer bank.
    #[error("FMT::Tracks bank not found in input. No FMT analysis is available for this file")]
    MissingTrackingBank,

    /// Invalid run configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Invalid calibration input.
    #[error("invalid calibration: {0}")]
    Calibration(String),

    /// Run number has no entry in the beam energy table.
    #[error("no beam energy available for run {0}. Pass it explicitly")]
    UnknownBeamEnergy(u32),

    /// Input file name does not follow the `<text><run_no>.<ext>` convention.
    #[error("couldn't extract run number from `{0}`")]
    BadFilename(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
