//! Assembly of one [`OutputRecord`].

use rge_core::OutputRecord;

use crate::detector::DetectorResponse;
use crate::kinematics::{dis, sidis};
use crate::metadata::RunMetadata;
use crate::particle::Particle;

/// The event's trigger electron, as needed by every record of the event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerRef {
    /// The trigger particle.
    pub particle: Particle,
    /// Its time of flight.
    pub tof: Option<f64>,
}

/// `tof - reference`, or `+inf` if either is unknown.
pub fn delta_tof(tof: Option<f64>, reference: Option<f64>) -> f64 {
    match (tof, reference) {
        (Some(t), Some(r)) => t - r,
        _ => f64::INFINITY,
    }
}

/// Record for `particle` in event `event_no`.
///
/// DIS variables always come from the trigger; SIDIS variables are left at
/// zero when `particle` is the trigger itself.
pub fn build_record(
    run: &RunMetadata,
    event_no: u64,
    particle: &Particle,
    response: &DetectorResponse,
    trigger: &TriggerRef,
) -> OutputRecord {
    let electron = trigger.particle.momentum();
    let d = dis(run.beam_energy, electron);
    let mut record = OutputRecord {
        run_no: f64::from(run.run_no),
        event_no: event_no as f64,
        beam_energy: run.beam_energy,
        pid: f64::from(particle.pid),
        charge: f64::from(particle.charge),
        status: f64::from(particle.status),
        mass: particle.mass,
        vx: particle.vx,
        vy: particle.vy,
        vz: particle.vz,
        px: particle.px,
        py: particle.py,
        pz: particle.pz,
        p: particle.p(),
        theta: particle.theta(),
        phi: particle.phi(),
        beta: particle.beta,
        chi2: particle.chi2,
        ndf: particle.ndf,
        e_pcal: response.energy.pcal,
        e_ecin: response.energy.ecin,
        e_ecou: response.energy.ecou,
        e_total: response.energy.total(),
        dtof: delta_tof(response.tof, trigger.tof),
        nphe_ltcc: response.nphe.ltcc,
        nphe_htcc: response.nphe.htcc,
        q2: d.q2,
        nu: d.nu,
        x_bjorken: d.x_bjorken,
        y_bjorken: d.y_bjorken,
        w2: d.w2,
        ..OutputRecord::default()
    };
    if !particle.is_trigger {
        let s = sidis(run.beam_energy, electron, particle.momentum(), particle.mass);
        record.zh = s.zh;
        record.pt2 = s.pt2;
        record.pl2 = s.pl2;
        record.phi_pq = s.phi_pq;
        record.theta_pq = s.theta_pq;
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{CalorimeterEnergy, Photoelectrons};
    use approx::assert_relative_eq;

    fn trigger() -> TriggerRef {
        let particle = Particle {
            pid: 11,
            charge: -1,
            mass: 0.000511,
            status: -2010,
            px: 0.6,
            py: 0.1,
            pz: 4.2,
            is_valid: true,
            is_trigger: true,
            ..Particle::default()
        };
        TriggerRef { particle, tof: Some(25.0) }
    }

    #[test]
    fn test_trigger_record() {
        let run = RunMetadata::new(12016, 10.3894);
        let t = trigger();
        let response = DetectorResponse {
            energy: CalorimeterEnergy { pcal: 0.7, ecin: 0.3, ecou: 0.05 },
            nphe: Photoelectrons { htcc: 11.0, ltcc: 0.0 },
            tof: t.tof,
        };
        let r = build_record(&run, 42, &t.particle, &response, &t);
        assert_eq!(r.run_no, 12016.0);
        assert_eq!(r.event_no, 42.0);
        assert_eq!(r.pid, 11.0);
        assert_eq!(r.dtof, 0.0);
        assert_relative_eq!(r.e_total, 1.05, epsilon = 1e-12);
        assert_eq!(r.nphe_htcc, 11.0);
        assert!(r.q2 > 0.0);
        assert_eq!((r.zh, r.pt2, r.pl2, r.phi_pq, r.theta_pq), (0.0, 0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_hadron_record() {
        let run = RunMetadata::new(12016, 10.3894);
        let t = trigger();
        let pip = Particle {
            pid: 211,
            charge: 1,
            mass: 0.139570,
            px: -0.3,
            py: 0.2,
            pz: 2.0,
            is_valid: true,
            ..Particle::default()
        };
        let response = DetectorResponse { tof: Some(27.5), ..DetectorResponse::default() };
        let r = build_record(&run, 7, &pip, &response, &t);
        let trig = build_record(&run, 7, &t.particle, &DetectorResponse::default(), &t);

        assert_relative_eq!(r.dtof, 2.5);
        assert_eq!((r.q2, r.nu, r.w2), (trig.q2, trig.nu, trig.w2));
        assert!(r.zh > 0.0 && r.zh < 1.0);
        assert_relative_eq!(r.pt2 + r.pl2, pip.p().powi(2), epsilon = 1e-12);
    }

    #[test]
    fn test_missing_timing_gives_infinite_dtof() {
        assert!(delta_tof(None, Some(1.0)).is_infinite());
        assert!(delta_tof(Some(1.0), None).is_infinite());
        assert_eq!(delta_tof(Some(3.0), Some(1.0)), 2.0);
    }
}
