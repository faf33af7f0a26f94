//! Final particle identification and the FMT geometric acceptance cut.

use rge_core::Result;

use crate::calibration::{Calorimeter, SamplingFractionTable};
use crate::detector::{CalorimeterEnergy, Photoelectrons};
use crate::particle::Particle;
use crate::pid::{ELECTRON_PID, PidTable};

/// Everything the identification decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassifierInput {
    /// PID code from the event builder.
    pub pid: i32,
    /// Measured charge.
    pub charge: i32,
    /// `REC::Particle` status word.
    pub status: i32,
    /// Calorimeter energies.
    pub energy: CalorimeterEnergy,
    /// Cherenkov photoelectrons.
    pub nphe: Photoelectrons,
    /// Drift-chamber sector.
    pub sector: i32,
    /// Momentum magnitude in GeV.
    pub p: f64,
    /// Track chi2/NDF.
    pub chi2ndf: f64,
    /// No trigger electron has been found in this event yet.
    pub trigger_open: bool,
}

impl ClassifierInput {
    /// Input for `particle` with detector data `energy` and `nphe`.
    pub fn new(
        particle: &Particle,
        energy: CalorimeterEnergy,
        nphe: Photoelectrons,
        trigger_open: bool,
    ) -> Self {
        Self {
            pid: particle.pid,
            charge: particle.charge,
            status: particle.status,
            energy,
            nphe,
            sector: particle.sector,
            p: particle.p(),
            chi2ndf: particle.chi2ndf(),
            trigger_open,
        }
    }
}

/// Identity assigned to a particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Final PID code.
    pub pid: i32,
    /// Final charge.
    pub charge: i32,
    /// Mass in GeV.
    pub mass: f64,
    /// This particle is the event's trigger electron.
    pub is_trigger: bool,
}

impl Classification {
    /// Copy the identity onto `particle`.
    pub fn apply(&self, particle: &mut Particle) {
        particle.pid = self.pid;
        particle.charge = self.charge;
        particle.mass = self.mass;
        particle.is_trigger = self.is_trigger;
    }
}

/// Pure identification function over a PID table and a calibration.
#[derive(Debug, Clone, Copy)]
pub struct PidClassifier<'a> {
    table: &'a PidTable,
    calibration: &'a SamplingFractionTable,
    chi2ndf_cut: f64,
    nsigma: f64,
}

impl<'a> PidClassifier<'a> {
    /// Default chi2/NDF cut of the electron hypothesis.
    pub const DEFAULT_CHI2NDF_CUT: f64 = 15.0;
    /// Default sampling-fraction window, in sigmas.
    pub const DEFAULT_NSIGMA: f64 = 3.5;

    /// Classifier with the default cuts.
    pub fn new(table: &'a PidTable, calibration: &'a SamplingFractionTable) -> Self {
        Self {
            table,
            calibration,
            chi2ndf_cut: Self::DEFAULT_CHI2NDF_CUT,
            nsigma: Self::DEFAULT_NSIGMA,
        }
    }

    /// Override the chi2/NDF cut.
    pub fn with_chi2ndf_cut(mut self, cut: f64) -> Self {
        self.chi2ndf_cut = cut;
        self
    }

    /// Override the sampling-fraction window.
    pub fn with_nsigma(mut self, nsigma: f64) -> Self {
        self.nsigma = nsigma;
        self
    }

    /// Electron hypothesis: trigger-bit particle reconstructed as an electron,
    /// with PCAL energy, a good track, and a sampling fraction inside the
    /// sector's all-calorimeter window.
    ///
    /// The sector is only looked at once the cheaper conditions hold.
    pub fn is_electron(&self, input: &ClassifierInput) -> Result<bool> {
        if input.pid != ELECTRON_PID
            || input.status >= 0
            || input.energy.pcal <= 0.0
            || !(input.chi2ndf < self.chi2ndf_cut)
        {
            return Ok(false);
        }
        let curve = self.calibration.curve(input.sector, Calorimeter::All)?;
        let sf = input.energy.total() / input.p;
        Ok(curve.contains(input.p, sf, self.nsigma))
    }

    /// Assign identity. The first electron seen while the trigger slot is
    /// open becomes the trigger; everything else takes its hypothesis from
    /// the PID table.
    pub fn classify(&self, input: &ClassifierInput) -> Result<Classification> {
        if self.is_electron(input)? {
            let h = self.table.get(ELECTRON_PID)?;
            return Ok(Classification {
                pid: ELECTRON_PID,
                charge: h.charge.unwrap_or(input.charge),
                mass: h.mass,
                is_trigger: input.trigger_open,
            });
        }
        let h = self.table.get(input.pid)?;
        Ok(Classification {
            pid: input.pid,
            charge: h.charge.unwrap_or(input.charge),
            mass: h.mass,
            is_trigger: false,
        })
    }
}

/// Acceptance of the forward micromegas tracker, as a polar-angle window
/// that depends on the vertex z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricCut {
    /// Inner radius of the active area, cm.
    pub r_min: f64,
    /// Outer radius of the active area, cm.
    pub r_max: f64,
    /// z of the first layer, cm.
    pub z0: f64,
    /// Radian to degree factor used by the window formula.
    pub angle: f64,
}

impl Default for GeometricCut {
    fn default() -> Self {
        Self { r_min: 4.2575, r_max: 18.48, z0: 26.1197, angle: 57.29 }
    }
}

impl GeometricCut {
    /// `(theta_min, theta_max)` in radians for a vertex at `vz`.
    pub fn theta_window(&self, vz: f64) -> (f64, f64) {
        let dz = self.z0 - vz;
        let min = (self.angle * (self.r_min / dz).atan()).to_radians();
        let max = (self.angle * (self.r_max / dz).atan()).to_radians();
        (min, max)
    }

    /// `true` if the particle's polar angle lies inside the window.
    pub fn accepts(&self, particle: &Particle) -> bool {
        let (min, max) = self.theta_window(particle.vz);
        let theta = particle.theta();
        min <= theta && theta <= max
    }
}
