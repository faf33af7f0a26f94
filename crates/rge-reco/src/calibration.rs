//! Sampling-fraction calibration.
//!
//! The sampling fraction `E_deposited / p` of an electron follows a
//! per-sector, per-calorimeter curve. Mean and width are both parametrised as
//! `f(p) = c0 * (c1 + c2/p + c3/p²)`.
//!
//! # JSON layout
//!
//! ```json
//! { "sectors": [
//!     { "pcal": { "mean": [c0, c1, c2, c3], "sigma": [c0, c1, c2, c3] },
//!       "ecin": { ... }, "ecou": { ... }, "all": { ... } },
//!     ... six entries, sector 1 first ...
//! ] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use rge_core::{Error, Result};

/// Number of CLAS12 sectors.
pub const N_SECTORS: usize = 6;

/// Calorimeter selector for [`SamplingFractionTable::curve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calorimeter {
    /// Preshower calorimeter.
    Pcal,
    /// EC inner layer.
    Ecin,
    /// EC outer layer.
    Ecou,
    /// The three layers summed.
    All,
}

/// Mean and width of one sampling-fraction curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingFractionCurve {
    /// Mean coefficients.
    pub mean: [f64; 4],
    /// Width coefficients.
    pub sigma: [f64; 4],
}

fn eval(c: &[f64; 4], p: f64) -> f64 {
    c[0] * (c[1] + c[2] / p + c[3] / (p * p))
}

impl SamplingFractionCurve {
    /// Expected sampling fraction at momentum `p`.
    pub fn mean_at(&self, p: f64) -> f64 {
        eval(&self.mean, p)
    }

    /// Width at momentum `p`.
    pub fn sigma_at(&self, p: f64) -> f64 {
        eval(&self.sigma, p)
    }

    /// `[mean - nσ·sigma, mean + nσ·sigma]` at momentum `p`.
    pub fn window(&self, p: f64, nsigma: f64) -> (f64, f64) {
        let mean = self.mean_at(p);
        let half = nsigma * self.sigma_at(p).abs();
        (mean - half, mean + half)
    }

    /// `true` if `sf` lies inside [`SamplingFractionCurve::window`]. A
    /// non-finite `sf` or window never does.
    pub fn contains(&self, p: f64, sf: f64, nsigma: f64) -> bool {
        let (lo, hi) = self.window(p, nsigma);
        lo <= sf && sf <= hi
    }

    fn is_finite(&self) -> bool {
        self.mean.iter().chain(&self.sigma).all(|c| c.is_finite())
    }
}

/// Curves for one sector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectorCalibration {
    /// PCAL alone.
    pub pcal: SamplingFractionCurve,
    /// EC inner alone.
    pub ecin: SamplingFractionCurve,
    /// EC outer alone.
    pub ecou: SamplingFractionCurve,
    /// Sum of the three; used by the electron cut.
    pub all: SamplingFractionCurve,
}

impl SectorCalibration {
    /// Curve for one calorimeter.
    pub fn curve(&self, cal: Calorimeter) -> &SamplingFractionCurve {
        match cal {
            Calorimeter::Pcal => &self.pcal,
            Calorimeter::Ecin => &self.ecin,
            Calorimeter::Ecou => &self.ecou,
            Calorimeter::All => &self.all,
        }
    }
}

/// Sampling-fraction curves for every sector. Loaded once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingFractionTable {
    /// Sector 1 first.
    pub sectors: Vec<SectorCalibration>,
}

impl SamplingFractionTable {
    /// Same curves for every sector.
    pub fn uniform(sector: SectorCalibration) -> Self {
        Self { sectors: vec![sector; N_SECTORS] }
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(s)?;
        table.validate()?;
        Ok(table)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let table: Self = serde_json::from_slice(&bytes)?;
        table.validate()?;
        tracing::debug!(path = %path.display(), "loaded sampling fraction calibration");
        Ok(table)
    }

    /// Pretty JSON, as read by [`SamplingFractionTable::from_json_str`].
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Exactly six sectors, every coefficient finite.
    pub fn validate(&self) -> Result<()> {
        if self.sectors.len() != N_SECTORS {
            return Err(Error::Calibration(format!(
                "expected {N_SECTORS} sectors, found {}",
                self.sectors.len()
            )));
        }
        for (i, s) in self.sectors.iter().enumerate() {
            let curves = [("pcal", &s.pcal), ("ecin", &s.ecin), ("ecou", &s.ecou), ("all", &s.all)];
            for (name, curve) in curves {
                if !curve.is_finite() {
                    return Err(Error::Calibration(format!(
                        "sector {} {name} curve has a non-finite coefficient",
                        i + 1
                    )));
                }
            }
        }
        Ok(())
    }

    /// Curves of sector `sector` (1..=6).
    pub fn sector(&self, sector: i32) -> Result<&SectorCalibration> {
        usize::try_from(sector)
            .ok()
            .filter(|s| (1..=N_SECTORS).contains(s))
            .and_then(|s| self.sectors.get(s - 1))
            .ok_or(Error::InvalidSector(sector))
    }

    /// One curve of one sector.
    pub fn curve(&self, sector: i32, cal: Calorimeter) -> Result<&SamplingFractionCurve> {
        Ok(self.sector(sector)?.curve(cal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat(mean: f64, sigma: f64) -> SamplingFractionCurve {
        SamplingFractionCurve { mean: [mean, 1.0, 0.0, 0.0], sigma: [sigma, 1.0, 0.0, 0.0] }
    }

    fn table() -> SamplingFractionTable {
        let c = flat(0.25, 0.02);
        SamplingFractionTable::uniform(SectorCalibration { pcal: c, ecin: c, ecou: c, all: c })
    }

    #[test]
    fn test_curve_evaluation() {
        let c = SamplingFractionCurve { mean: [0.5, 0.5, 0.2, 0.1], sigma: [0.1, 0.1, 0.0, 0.4] };
        assert_relative_eq!(c.mean_at(2.0), 0.5 * (0.5 + 0.1 + 0.025));
        assert_relative_eq!(c.sigma_at(2.0), 0.1 * (0.1 + 0.1));
    }

    #[test]
    fn test_window() {
        let c = flat(0.25, 0.02);
        let (lo, hi) = c.window(3.0, 3.5);
        assert_relative_eq!(lo, 0.18, epsilon = 1e-12);
        assert_relative_eq!(hi, 0.32, epsilon = 1e-12);
        assert!(c.contains(3.0, 0.30, 3.5));
        assert!(!c.contains(3.0, 0.33, 3.5));
        assert!(!c.contains(3.0, f64::NAN, 3.5));
    }

    #[test]
    fn test_sector_bounds() {
        let t = table();
        assert!(t.sector(1).is_ok());
        assert!(t.sector(6).is_ok());
        assert!(matches!(t.sector(0), Err(Error::InvalidSector(0))));
        assert!(matches!(t.sector(7), Err(Error::InvalidSector(7))));
        assert!(matches!(t.curve(-1, Calorimeter::All), Err(Error::InvalidSector(-1))));
    }

    #[test]
    fn test_json_roundtrip_and_validation() {
        let t = table();
        let json = t.to_json_string().unwrap();
        assert_eq!(SamplingFractionTable::from_json_str(&json).unwrap(), t);

        let mut short = t.clone();
        short.sectors.pop();
        let json = serde_json::to_string(&short).unwrap();
        assert!(matches!(SamplingFractionTable::from_json_str(&json), Err(Error::Calibration(_))));

        assert!(matches!(SamplingFractionTable::from_json_str("{\"sectors\": 3}"), Err(Error::Json(_))));
    }
}
