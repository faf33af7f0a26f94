//! Per-particle detector aggregation: calorimeter energy, Cherenkov
//! photoelectrons, and time of flight.

use rge_bank::{BankContainer, REC_CALORIMETER, REC_SCINTILLATOR};
use rge_core::{Error, Result};

use crate::banks::EventBanks;

/// Pre-shower calorimeter layer.
pub const PCAL_LAYER: i32 = 1;
/// Inner electromagnetic calorimeter layer.
pub const ECIN_LAYER: i32 = 4;
/// Outer electromagnetic calorimeter layer.
pub const ECOU_LAYER: i32 = 7;

/// High-threshold Cherenkov counter.
pub const HTCC_ID: i32 = 15;
/// Low-threshold Cherenkov counter.
pub const LTCC_ID: i32 = 16;

/// Forward time-of-flight detector.
pub const FTOF_ID: i32 = 12;
/// FTOF panel 1A.
pub const FTOF1A_LAYER: i32 = 1;
/// FTOF panel 1B.
pub const FTOF1B_LAYER: i32 = 2;
/// FTOF panel 2.
pub const FTOF2_LAYER: i32 = 3;

/// Energy deposited per calorimeter layer, in GeV.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalorimeterEnergy {
    /// PCAL deposit, GeV.
    pub pcal: f64,
    /// EC inner deposit, GeV.
    pub ecin: f64,
    /// EC outer deposit, GeV.
    pub ecou: f64,
}

impl CalorimeterEnergy {
    /// Sum over the three layers.
    pub fn total(&self) -> f64 {
        self.pcal + self.ecin + self.ecou
    }
}

/// Photoelectrons per Cherenkov counter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Photoelectrons {
    /// High-threshold Cherenkov.
    pub htcc: f64,
    /// Low-threshold Cherenkov.
    pub ltcc: f64,
}

/// One level of the timing precedence list: rows of `bank` whose optional
/// `detector` and `layer` match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TofLevel {
    /// Short label for logs.
    pub name: &'static str,
    /// Bank searched at this level.
    pub bank: &'static str,
    /// Required `detector` id, if any.
    pub detector: Option<i32>,
    /// Required `layer`.
    pub layer: i32,
}

impl TofLevel {
    fn matches(&self, bank: &BankContainer, row: usize) -> Result<bool> {
        if let Some(detector) = self.detector {
            if bank.get_int("detector", row)? != detector {
                return Ok(false);
            }
        }
        Ok(bank.get_int("layer", row)? == self.layer)
    }
}

/// Timing detectors, most precise first.
pub const TOF_PRECEDENCE: [TofLevel; 6] = [
    TofLevel { name: "FTOF1B", bank: REC_SCINTILLATOR, detector: Some(FTOF_ID), layer: FTOF1B_LAYER },
    TofLevel { name: "FTOF1A", bank: REC_SCINTILLATOR, detector: Some(FTOF_ID), layer: FTOF1A_LAYER },
    TofLevel { name: "FTOF2", bank: REC_SCINTILLATOR, detector: Some(FTOF_ID), layer: FTOF2_LAYER },
    TofLevel { name: "PCAL", bank: REC_CALORIMETER, detector: None, layer: PCAL_LAYER },
    TofLevel { name: "ECIN", bank: REC_CALORIMETER, detector: None, layer: ECIN_LAYER },
    TofLevel { name: "ECOU", bank: REC_CALORIMETER, detector: None, layer: ECOU_LAYER },
];

/// Everything the detectors say about one particle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectorResponse {
    /// Calorimeter energies.
    pub energy: CalorimeterEnergy,
    /// Cherenkov photoelectrons.
    pub nphe: Photoelectrons,
    /// Best available time, `None` if no timing detector saw the particle.
    pub tof: Option<f64>,
}

/// Read-only view over the current event's detector banks.
#[derive(Debug, Clone, Copy)]
pub struct DetectorAggregator<'a> {
    banks: &'a EventBanks,
}

impl<'a> DetectorAggregator<'a> {
    /// Aggregate over `banks`.
    pub fn new(banks: &'a EventBanks) -> Self {
        Self { banks }
    }

    /// Sum calorimeter energy for `pindex` per layer.
    ///
    /// Any row of this particle on a layer other than PCAL, ECIN or ECOU is
    /// an [`Error::InvalidCalorimeterLayer`].
    pub fn energy(&self, pindex: u32) -> Result<CalorimeterEnergy> {
        let cal = &self.banks.calorimeter;
        let mut energy = CalorimeterEnergy::default();
        for row in cal.rows_matching("pindex", pindex)? {
            let e = cal.get_double("energy", row)?;
            match cal.get_int("layer", row)? {
                PCAL_LAYER => energy.pcal += e,
                ECIN_LAYER => energy.ecin += e,
                ECOU_LAYER => energy.ecou += e,
                layer => return Err(Error::InvalidCalorimeterLayer(layer)),
            }
        }
        Ok(energy)
    }

    /// Sum photoelectrons for `pindex` per counter.
    pub fn photoelectrons(&self, pindex: u32) -> Result<Photoelectrons> {
        let chkv = &self.banks.cherenkov;
        let mut nphe = Photoelectrons::default();
        for row in chkv.rows_matching("pindex", pindex)? {
            let n = chkv.get_double("nphe", row)?;
            match chkv.get_int("detector", row)? {
                HTCC_ID => nphe.htcc += n,
                LTCC_ID => nphe.ltcc += n,
                id => return Err(Error::InvalidDetectorId(id)),
            }
        }
        Ok(nphe)
    }

    /// Time from the most precise detector that saw `pindex`.
    ///
    /// Within a level the first matching row wins; times are never averaged.
    /// Rows matching no level are ignored.
    pub fn time_of_flight(&self, pindex: u32) -> Result<Option<f64>> {
        for level in &TOF_PRECEDENCE {
            let Some(bank) = self.banks.get(level.bank) else {
                continue;
            };
            for row in bank.rows_matching("pindex", pindex)? {
                if level.matches(bank, row)? {
                    let time = bank.get_double("time", row)?;
                    tracing::trace!(pindex, level = level.name, time, "tof selected");
                    return Ok(Some(time));
                }
            }
        }
        Ok(None)
    }

    /// Energy, photoelectrons and timing together, in that order.
    pub fn aggregate(&self, pindex: u32) -> Result<DetectorResponse> {
        Ok(DetectorResponse {
            energy: self.energy(pindex)?,
            nphe: self.photoelectrons(pindex)?,
            tof: self.time_of_flight(pindex)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rge_bank::{BankRegistry, REC_CHERENKOV, bank_rows};
    use rge_core::EventRows;

    fn banks(cal: &[&[(&str, f64)]], sci: &[&[(&str, f64)]], chkv: &[&[(&str, f64)]]) -> EventBanks {
        let reg = BankRegistry::clas12();
        let ev = EventRows::new()
            .with_bank(REC_CALORIMETER, bank_rows(&reg.get(REC_CALORIMETER).unwrap(), cal).unwrap())
            .with_bank(REC_SCINTILLATOR, bank_rows(&reg.get(REC_SCINTILLATOR).unwrap(), sci).unwrap())
            .with_bank(REC_CHERENKOV, bank_rows(&reg.get(REC_CHERENKOV).unwrap(), chkv).unwrap());
        let mut banks = EventBanks::new(&reg).unwrap();
        banks.fill(&ev, false).unwrap();
        banks
    }

    #[test]
    fn test_energy_buckets() {
        let b = banks(
            &[
                &[("pindex", 0.0), ("layer", 1.0), ("energy", 0.20)],
                &[("pindex", 0.0), ("layer", 4.0), ("energy", 0.05)],
                &[("pindex", 1.0), ("layer", 1.0), ("energy", 0.10)],
            ],
            &[],
            &[],
        );
        let agg = DetectorAggregator::new(&b);
        let e = agg.energy(0).unwrap();
        assert_relative_eq!(e.pcal, 0.20, epsilon = 1e-6);
        assert_relative_eq!(e.ecin, 0.05, epsilon = 1e-6);
        assert_eq!(e.ecou, 0.0);
        assert_relative_eq!(e.total(), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_energy_is_order_independent() {
        let rows: [&[(&str, f64)]; 4] = [
            &[("pindex", 2.0), ("layer", 7.0), ("energy", 0.5)],
            &[("pindex", 2.0), ("layer", 1.0), ("energy", 0.25)],
            &[("pindex", 2.0), ("layer", 7.0), ("energy", 0.125)],
            &[("pindex", 2.0), ("layer", 4.0), ("energy", 1.0)],
        ];
        let mut reversed = rows;
        reversed.reverse();
        let a = banks(&rows, &[], &[]);
        let b = banks(&reversed, &[], &[]);
        let ea = DetectorAggregator::new(&a).energy(2).unwrap();
        let eb = DetectorAggregator::new(&b).energy(2).unwrap();
        assert_eq!(ea, eb);
        assert_eq!(ea.ecou, 0.625);
    }

    #[test]
    fn test_invalid_layer_is_fatal() {
        let b = banks(&[&[("pindex", 3.0), ("layer", 9.0), ("energy", 0.1)]], &[], &[]);
        let agg = DetectorAggregator::new(&b);
        assert!(matches!(agg.energy(3), Err(Error::InvalidCalorimeterLayer(9))));
        // Other particles are unaffected.
        assert!(agg.energy(0).is_ok());
    }

    #[test]
    fn test_photoelectrons() {
        let b = banks(
            &[],
            &[],
            &[
                &[("pindex", 0.0), ("detector", 15.0), ("nphe", 7.5)],
                &[("pindex", 0.0), ("detector", 16.0), ("nphe", 2.0)],
                &[("pindex", 0.0), ("detector", 15.0), ("nphe", 1.5)],
            ],
        );
        let agg = DetectorAggregator::new(&b);
        let n = agg.photoelectrons(0).unwrap();
        assert_eq!(n, Photoelectrons { htcc: 9.0, ltcc: 2.0 });

        let bad = banks(&[], &[], &[&[("pindex", 0.0), ("detector", 3.0)]]);
        assert!(matches!(
            DetectorAggregator::new(&bad).photoelectrons(0),
            Err(Error::InvalidDetectorId(3))
        ));
    }

    #[test]
    fn test_tof_prefers_best_level() {
        // FTOF1A and FTOF2 hits: 1A wins regardless of row order.
        let b = banks(
            &[&[("pindex", 0.0), ("layer", 1.0), ("time", 30.0)]],
            &[
                &[("pindex", 0.0), ("detector", 12.0), ("layer", 3.0), ("time", 21.0)],
                &[("pindex", 0.0), ("detector", 12.0), ("layer", 1.0), ("time", 20.0)],
                &[("pindex", 0.0), ("detector", 12.0), ("layer", 1.0), ("time", 19.0)],
            ],
            &[],
        );
        assert_eq!(DetectorAggregator::new(&b).time_of_flight(0).unwrap(), Some(20.0));
    }

    #[test]
    fn test_tof_falls_back_to_calorimeter() {
        let b = banks(
            &[
                &[("pindex", 0.0), ("layer", 7.0), ("time", 32.0)],
                &[("pindex", 0.0), ("layer", 4.0), ("time", 31.0)],
            ],
            // Non-FTOF scintillator hits are not timing candidates.
            &[&[("pindex", 0.0), ("detector", 4.0), ("layer", 2.0), ("time", 10.0)]],
            &[],
        );
        assert_eq!(DetectorAggregator::new(&b).time_of_flight(0).unwrap(), Some(31.0));
    }

    #[test]
    fn test_tof_ignores_unknown_calorimeter_layer() {
        let b = banks(&[&[("pindex", 0.0), ("layer", 9.0), ("time", 30.0)]], &[], &[]);
        let agg = DetectorAggregator::new(&b);
        assert_eq!(agg.time_of_flight(0).unwrap(), None);
        assert_eq!(agg.time_of_flight(1).unwrap(), None);
    }

    #[test]
    fn test_aggregate() {
        let b = banks(
            &[&[("pindex", 1.0), ("layer", 1.0), ("energy", 0.3), ("time", 25.0)]],
            &[&[("pindex", 1.0), ("detector", 12.0), ("layer", 2.0), ("time", 24.0)]],
            &[&[("pindex", 1.0), ("detector", 16.0), ("nphe", 4.0)]],
        );
        let r = DetectorAggregator::new(&b).aggregate(1).unwrap();
        assert_eq!(r.tof, Some(24.0));
        assert_eq!(r.nphe.ltcc, 4.0);
        assert_relative_eq!(r.energy.pcal, 0.3, epsilon = 1e-6);
    }
}
