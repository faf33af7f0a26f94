//! Particle hypotheses keyed by PDG code.

use std::collections::BTreeMap;
use std::fmt;

use rge_core::{Error, Result};

/// PID code of the electron.
pub const ELECTRON_PID: i32 = 11;
/// PID code of the positive pion.
pub const PION_PLUS_PID: i32 = 211;
/// PID code of the negative pion.
pub const PION_MINUS_PID: i32 = -211;
/// PID code used by the reconstruction for unidentified particles.
pub const UNIDENTIFIED_PID: i32 = 0;

/// Charge, mass and name of one PID code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidHypothesis {
    /// Charge in units of e. `None` keeps the measured charge.
    pub charge: Option<i32>,
    /// Mass in GeV.
    pub mass: f64,
    /// Human-readable name.
    pub name: &'static str,
}

/// Fixed PID hypothesis table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PidTable {
    entries: BTreeMap<i32, PidHypothesis>,
}

impl PidTable {
    /// Hypotheses known to the CLAS12 event builder.
    pub fn clas12() -> Self {
        const E: f64 = 0.000511;
        const MU: f64 = 0.105658;
        const PI: f64 = 0.139570;
        const K: f64 = 0.493677;
        const P: f64 = 0.938272;
        const N: f64 = 0.939565;

        let rows: [(i32, Option<i32>, f64, &'static str); 22] = [
            (-2212, Some(-1), P, "antiproton"),
            (-2112, Some(0), N, "antineutron"),
            (-321, Some(-1), K, "negative kaon"),
            (-211, Some(-1), PI, "negative pion"),
            (-13, Some(1), MU, "antimuon"),
            (-11, Some(1), E, "positron"),
            (0, None, 0.0, "unidentified"),
            (11, Some(-1), E, "electron"),
            (13, Some(-1), MU, "muon"),
            (22, Some(0), 0.0, "photon"),
            (45, Some(1), 1.875, "deuteron"),
            (111, Some(0), 0.134977, "neutral pion"),
            (130, Some(0), 0.497614, "neutral kaon long"),
            (211, Some(1), PI, "positive pion"),
            (221, Some(0), 0.547853, "eta"),
            (223, Some(0), 0.782650, "omega"),
            (310, Some(0), 0.497614, "neutral kaon short"),
            (311, Some(0), 0.497614, "neutral kaon"),
            (321, Some(1), K, "positive kaon"),
            (2112, Some(0), N, "neutron"),
            (2212, Some(1), P, "proton"),
            (3122, Some(0), 1.115683, "lambda"),
        ];
        let entries = rows
            .into_iter()
            .map(|(pid, charge, mass, name)| (pid, PidHypothesis { charge, mass, name }))
            .collect();
        Self { entries }
    }

    /// Add or replace one hypothesis.
    pub fn insert(&mut self, pid: i32, hypothesis: PidHypothesis) {
        self.entries.insert(pid, hypothesis);
    }

    /// Hypothesis for `pid`, or [`Error::UnsupportedPid`].
    pub fn get(&self, pid: i32) -> Result<&PidHypothesis> {
        self.entries.get(&pid).ok_or(Error::UnsupportedPid(pid))
    }

    /// `true` if `pid` has a hypothesis.
    pub fn contains(&self, pid: i32) -> bool {
        self.entries.contains_key(&pid)
    }

    /// Number of hypotheses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Codes with a fixed charge equal to `charge`, ascending.
    pub fn pids_by_charge(&self, charge: i32) -> Vec<i32> {
        self.entries.iter().filter(|(_, h)| h.charge == Some(charge)).map(|(&pid, _)| pid).collect()
    }

    /// Iterate over `(pid, hypothesis)` in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &PidHypothesis)> {
        self.entries.iter().map(|(&pid, h)| (pid, h))
    }
}

impl fmt::Display for PidTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>6}  {:<20} {:>6}  {:>9}", "pid", "name", "charge", "mass")?;
        for (pid, h) in self.iter() {
            let charge = h.charge.map_or_else(|| "meas.".to_string(), |q| q.to_string());
            writeln!(f, "{pid:>6}  {:<20} {charge:>6}  {:>9.6}", h.name, h.mass)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let t = PidTable::clas12();
        let pip = t.get(PION_PLUS_PID).unwrap();
        assert_eq!(pip.charge, Some(1));
        assert_eq!(pip.mass, 0.139570);
        assert_eq!(t.get(45).unwrap().name, "deuteron");
        assert_eq!(t.get(UNIDENTIFIED_PID).unwrap().charge, None);
        assert!(matches!(t.get(9999), Err(Error::UnsupportedPid(9999))));
    }

    #[test]
    fn test_pids_by_charge() {
        let t = PidTable::clas12();
        assert_eq!(t.pids_by_charge(-1), vec![-2212, -321, -211, 11, 13]);
        assert_eq!(t.pids_by_charge(1), vec![-13, -11, 45, 211, 321, 2212]);
        assert!(!t.pids_by_charge(0).contains(&UNIDENTIFIED_PID));
    }

    #[test]
    fn test_tables_compare_by_value() {
        let mut t = PidTable::clas12();
        assert_eq!(t, PidTable::clas12());
        t.insert(1000010030, PidHypothesis { charge: Some(1), mass: 2.808921, name: "triton" });
        assert_ne!(t, PidTable::clas12());
        assert!(t.contains(1000010030));
    }

    #[test]
    fn test_listing() {
        let listing = PidTable::clas12().to_string();
        assert_eq!(listing.lines().count(), PidTable::clas12().len() + 1);
        assert!(listing.contains("positive pion"));
    }
}
