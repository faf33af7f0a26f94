//! Run metadata and file naming conventions.

use std::path::{Path, PathBuf};

use rge_core::{Error, Result};

use crate::config::TrackingLayerRequirement;

/// Known beam energies (GeV) by run number.
const BEAM_ENERGIES: &[(u32, f64)] = &[(11983, 10.3894), (12016, 10.3894), (12439, 2.1864)];

/// Identity of the run being processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunMetadata {
    /// Run number.
    pub run_no: u32,
    /// Beam energy in GeV.
    pub beam_energy: f64,
}

impl RunMetadata {
    /// Metadata for `run_no` with an explicit beam energy.
    pub fn new(run_no: u32, beam_energy: f64) -> Self {
        Self { run_no, beam_energy }
    }

    /// Metadata from an input file named `<text><run_no>.<ext>`.
    ///
    /// `beam_energy` overrides the run table; without it an unknown run is an
    /// error.
    pub fn from_input_path(path: &Path, beam_energy: Option<f64>) -> Result<Self> {
        let run_no = run_number_from_path(path)?;
        let beam_energy = match beam_energy {
            Some(e) if e.is_finite() && e > 0.0 => e,
            Some(e) => return Err(Error::Config(format!("beam energy must be > 0, got {e}"))),
            None => beam_energy_for_run(run_no)?,
        };
        Ok(Self { run_no, beam_energy })
    }

    /// `true` for simulated runs.
    pub fn is_simulation(&self) -> bool {
        is_simulation(self.run_no)
    }
}

/// Trailing digits of the file stem: `dir/run_012016.parquet` gives 12016.
pub fn run_number_from_path(path: &Path) -> Result<u32> {
    let bad = || Error::BadFilename(path.display().to_string());
    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(bad)?;
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return Err(bad());
    }
    stem[stem.len() - digits..].parse().map_err(|_| bad())
}

/// Beam energy of a known run.
pub fn beam_energy_for_run(run_no: u32) -> Result<f64> {
    BEAM_ENERGIES
        .iter()
        .find(|(run, _)| *run == run_no)
        .map(|&(_, e)| e)
        .ok_or(Error::UnknownBeamEnergy(run_no))
}

/// Simulation runs are numbered 999000..=999999.
pub fn is_simulation(run_no: u32) -> bool {
    run_no / 1000 == 999
}

/// Ntuple file name: `ntuples_dc_<run>.parquet` without the FMT requirement,
/// `ntuples_fmt<n>_<run>.parquet` with it.
pub fn output_file_name(run_no: u32, tracking_layers: TrackingLayerRequirement) -> String {
    match tracking_layers {
        TrackingLayerRequirement::Off => format!("ntuples_dc_{run_no:06}.parquet"),
        TrackingLayerRequirement::AtLeast(n) => format!("ntuples_fmt{n}_{run_no:06}.parquet"),
    }
}

/// Sampling-fraction file name: per run for data, shared for simulation.
pub fn calibration_file_name(run_no: u32) -> String {
    if is_simulation(run_no) {
        "sf_params_mc.json".to_string()
    } else {
        format!("sf_params_{run_no:06}.json")
    }
}

/// Sampling-fraction file path under `data_dir`.
pub fn calibration_path(data_dir: &Path, run_no: u32) -> PathBuf {
    data_dir.join(calibration_file_name(run_no))
}
