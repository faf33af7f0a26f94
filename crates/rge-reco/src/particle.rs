//! Per-track particle candidates.

use std::collections::BTreeSet;

use rge_core::Result;

use crate::banks::EventBanks;
use crate::config::TrackingLayerRequirement;

/// One track's particle candidate for the current event.
///
/// `pid`, `charge` and `mass` start out as measured in `REC::Particle` and
/// are overwritten by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    /// Row in `REC::Particle` this track points to.
    pub pindex: u32,
    /// Row in `REC::Track`.
    pub track_row: usize,
    /// PID code.
    pub pid: i32,
    /// Charge in units of e.
    pub charge: i32,
    /// Mass in GeV.
    pub mass: f64,
    /// `REC::Particle` status word.
    pub status: i32,
    /// Drift-chamber sector (1..=6 when valid).
    pub sector: i32,
    /// Momentum x, GeV.
    pub px: f64,
    /// Momentum y, GeV.
    pub py: f64,
    /// Momentum z, GeV.
    pub pz: f64,
    /// Vertex x, cm.
    pub vx: f64,
    /// Vertex y, cm.
    pub vy: f64,
    /// Vertex z, cm.
    pub vz: f64,
    /// Velocity over c.
    pub beta: f64,
    /// Track fit chi2.
    pub chi2: f64,
    /// Track fit degrees of freedom.
    pub ndf: f64,
    /// Passed every matching requirement.
    pub is_valid: bool,
    /// The event's trigger electron.
    pub is_trigger: bool,
    /// Enough confirmed FMT layers were hit.
    pub fmt_confirmed: bool,
}

impl Particle {
    fn invalid(track_row: usize, pindex: u32) -> Self {
        Self { track_row, pindex, ..Self::default() }
    }

    /// Momentum vector.
    pub fn momentum(&self) -> [f64; 3] {
        [self.px, self.py, self.pz]
    }

    /// Momentum magnitude.
    pub fn p(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Polar angle.
    pub fn theta(&self) -> f64 {
        (self.px * self.px + self.py * self.py).sqrt().atan2(self.pz)
    }

    /// Azimuthal angle.
    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    /// Energy under the current mass hypothesis.
    pub fn energy(&self) -> f64 {
        (self.p().powi(2) + self.mass * self.mass).sqrt()
    }

    /// chi2 per degree of freedom; infinite when `ndf` is zero.
    pub fn chi2ndf(&self) -> f64 {
        if self.ndf == 0.0 { f64::INFINITY } else { self.chi2 / self.ndf }
    }
}

/// Joins a track row with its particle and FMT rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticleBuilder {
    requirement: TrackingLayerRequirement,
}

impl ParticleBuilder {
    /// Builder applying `requirement` to every track.
    pub fn new(requirement: TrackingLayerRequirement) -> Self {
        Self { requirement }
    }

    /// Build the candidate for `track_row`.
    ///
    /// A track whose particle index does not resolve, or that misses the FMT
    /// layer requirement, gives an invalid candidate rather than an error.
    pub fn build(&self, banks: &EventBanks, track_row: usize) -> Result<Particle> {
        let track = &banks.track;
        let Some(pindex) = track.value("pindex", track_row)?.to_u32() else {
            return Ok(Particle::invalid(track_row, 0));
        };
        let part = &banks.particle;
        let row = pindex as usize;
        if row >= part.n_rows() {
            tracing::trace!(track_row, pindex, "track points past the particle bank");
            return Ok(Particle::invalid(track_row, pindex));
        }

        let mut particle = Particle {
            pindex,
            track_row,
            pid: part.get_int("pid", row)?,
            charge: part.get_int("charge", row)?,
            mass: 0.0,
            status: part.get_int("status", row)?,
            sector: track.get_int("sector", track_row)?,
            px: part.get_double("px", row)?,
            py: part.get_double("py", row)?,
            pz: part.get_double("pz", row)?,
            vx: part.get_double("vx", row)?,
            vy: part.get_double("vy", row)?,
            vz: part.get_double("vz", row)?,
            beta: part.get_double("beta", row)?,
            chi2: track.get_double("chi2", track_row)?,
            ndf: track.get_double("NDF", track_row)?,
            is_valid: true,
            is_trigger: false,
            fmt_confirmed: false,
        };

        if let TrackingLayerRequirement::AtLeast(min_layers) = self.requirement {
            let layers = confirmed_fmt_layers(banks, pindex)?;
            particle.fmt_confirmed = layers >= min_layers as usize;
            particle.is_valid = particle.fmt_confirmed;
        }
        Ok(particle)
    }
}

/// Distinct FMT layers with a confirmed hit for `pindex`.
fn confirmed_fmt_layers(banks: &EventBanks, pindex: u32) -> Result<usize> {
    let fmt = &banks.fmt;
    let mut layers = BTreeSet::new();
    for row in fmt.rows_matching("pindex", pindex)? {
        if fmt.get_int("status", row)? == 0 {
            layers.insert(fmt.get_int("layer", row)?);
        }
    }
    Ok(layers.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rge_bank::{BankRegistry, FMT_TRACKS, REC_PARTICLE, REC_TRACK, bank_rows};
    use rge_core::EventRows;

    fn banks_for(ev: &EventRows, read_fmt: bool) -> EventBanks {
        let reg = BankRegistry::clas12();
        let mut banks = EventBanks::new(&reg).unwrap();
        banks.fill(ev, read_fmt).unwrap();
        banks
    }

    fn event(fmt: &[&[(&str, f64)]]) -> EventRows {
        let reg = BankRegistry::clas12();
        EventRows::new()
            .with_bank(
                REC_PARTICLE,
                bank_rows(
                    &reg.get(REC_PARTICLE).unwrap(),
                    &[
                        &[("pid", 211.0), ("charge", 1.0), ("px", 0.3), ("pz", 2.0)],
                        &[("pid", 11.0), ("charge", -1.0), ("px", 0.4), ("py", 0.3), ("pz", 4.0), ("vz", -3.0)],
                    ],
                ).unwrap(),
            )
            .with_bank(
                REC_TRACK,
                bank_rows(
                    &reg.get(REC_TRACK).unwrap(),
                    &[
                        &[("pindex", 1.0), ("sector", 2.0), ("chi2", 30.0), ("NDF", 10.0)],
                        &[("pindex", 5.0), ("sector", 1.0)],
                    ],
                ).unwrap(),
            )
            .with_bank(FMT_TRACKS, bank_rows(&reg.get(FMT_TRACKS).unwrap(), fmt).unwrap())
    }

    #[test]
    fn test_build_copies_particle_row() {
        let banks = banks_for(&event(&[]), false);
        let p = ParticleBuilder::default().build(&banks, 0).unwrap();
        assert!(p.is_valid);
        assert_eq!(p.pindex, 1);
        assert_eq!(p.pid, 11);
        assert_eq!(p.charge, -1);
        assert_eq!(p.sector, 2);
        assert_relative_eq!(p.p(), (0.16f64 + 0.09 + 16.0).sqrt(), epsilon = 1e-6);
        assert_relative_eq!(p.vz, -3.0);
        assert_relative_eq!(p.chi2ndf(), 3.0, epsilon = 1e-6);
        assert!(!p.fmt_confirmed);
    }

    #[test]
    fn test_unmatched_pindex_is_invalid() {
        let banks = banks_for(&event(&[]), false);
        let p = ParticleBuilder::default().build(&banks, 1).unwrap();
        assert!(!p.is_valid);
        assert_eq!(p.pindex, 5);
    }

    #[test]
    fn test_fmt_requirement() {
        // Two confirmed layers for pindex 1, plus an unconfirmed third one.
        let fmt: &[&[(&str, f64)]] = &[
            &[("pindex", 1.0), ("layer", 1.0)],
            &[("pindex", 1.0), ("layer", 1.0)],
            &[("pindex", 1.0), ("layer", 2.0)],
            &[("pindex", 1.0), ("layer", 3.0), ("status", 1.0)],
            &[("pindex", 0.0), ("layer", 3.0)],
        ];
        let banks = banks_for(&event(fmt), true);

        let two = ParticleBuilder::new(TrackingLayerRequirement::AtLeast(2));
        let p = two.build(&banks, 0).unwrap();
        assert!(p.is_valid && p.fmt_confirmed);

        let three = ParticleBuilder::new(TrackingLayerRequirement::AtLeast(3));
        let p = three.build(&banks, 0).unwrap();
        assert!(!p.is_valid && !p.fmt_confirmed);
    }

    #[test]
    fn test_chi2ndf_zero_ndf() {
        let p = Particle { chi2: 3.0, ndf: 0.0, ..Particle::default() };
        assert!(p.chi2ndf().is_infinite());
    }
}
