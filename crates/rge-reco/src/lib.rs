//! # rge-reco
//!
//! Particle reconstruction for RG-E ntuples.
//!
//! For every event the [`EventPipeline`] refills the bank containers, builds
//! one [`Particle`] per track with [`ParticleBuilder`], sums detector
//! responses with [`DetectorAggregator`], identifies particles with
//! [`PidClassifier`], and emits one [`rge_core::OutputRecord`] per accepted
//! particle once the event's trigger electron has been found.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod banks;
pub mod calibration;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod kinematics;
pub mod metadata;
pub mod particle;
pub mod pid;
pub mod pipeline;
pub mod record;
pub mod sink;

pub use banks::EventBanks;
pub use calibration::{Calorimeter, SamplingFractionCurve, SamplingFractionTable, SectorCalibration};
pub use classifier::{Classification, ClassifierInput, GeometricCut, PidClassifier};
pub use config::{RunConfig, TrackingLayerRequirement};
pub use detector::{CalorimeterEnergy, DetectorAggregator, DetectorResponse, Photoelectrons};
pub use metadata::RunMetadata;
pub use particle::{Particle, ParticleBuilder};
pub use pid::{PidHypothesis, PidTable};
pub use pipeline::{EventOutcome, EventPipeline, Progress, RunCounters};
pub use sink::{ParquetNtupleWriter, RecordCollector, read_ntuples};
