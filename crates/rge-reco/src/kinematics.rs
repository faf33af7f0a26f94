//! DIS and SIDIS kinematics for a fixed-target electron beam along +z.

use std::f64::consts::PI;

/// Nucleon (proton) mass in GeV, used as the target mass.
pub const NUCLEON_MASS: f64 = 0.938272;
/// Electron mass in GeV.
pub const ELECTRON_MASS: f64 = 0.000511;

/// Inclusive variables of the scattered electron.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisKinematics {
    /// Photon virtuality Q², GeV².
    pub q2: f64,
    /// Energy transfer, GeV.
    pub nu: f64,
    /// Bjorken x.
    pub x_bjorken: f64,
    /// Energy fraction of the photon.
    pub y_bjorken: f64,
    /// Invariant mass squared of the hadronic final state, GeV².
    pub w2: f64,
}

/// Semi-inclusive variables of a hadron relative to the virtual photon.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SidisKinematics {
    /// Energy fraction `E_h / nu`.
    pub zh: f64,
    /// Momentum squared transverse to the photon, GeV².
    pub pt2: f64,
    /// Momentum squared along the photon, GeV².
    pub pl2: f64,
    /// Azimuth around the photon, relative to the lepton plane.
    pub phi_pq: f64,
    /// Angle between hadron and photon.
    pub theta_pq: f64,
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Angle between two vectors, in [0, π].
pub fn angle_between(a: [f64; 3], b: [f64; 3]) -> f64 {
    let c = dot(a, b) / (norm(a) * norm(b));
    c.clamp(-1.0, 1.0).acos()
}

/// Rotate `v` about the z axis by `th`.
pub fn rotate_z(v: [f64; 3], th: f64) -> [f64; 3] {
    let (s, c) = th.sin_cos();
    [v[0] * c - v[1] * s, v[0] * s + v[1] * c, v[2]]
}

/// Rotate `v` about the y axis by `th`.
pub fn rotate_y(v: [f64; 3], th: f64) -> [f64; 3] {
    let (s, c) = th.sin_cos();
    [v[0] * c + v[2] * s, v[1], -v[0] * s + v[2] * c]
}

/// Momentum transfer `k - k'` for a beam of energy `beam_energy`.
pub fn virtual_photon(beam_energy: f64, electron: [f64; 3]) -> [f64; 3] {
    [-electron[0], -electron[1], beam_energy - electron[2]]
}

/// Inclusive kinematics from the scattered electron momentum.
pub fn dis(beam_energy: f64, electron: [f64; 3]) -> DisKinematics {
    let p = norm(electron);
    let e_prime = (p * p + ELECTRON_MASS * ELECTRON_MASS).sqrt();
    let theta = (electron[0].hypot(electron[1])).atan2(electron[2]);
    let q2 = 4.0 * beam_energy * e_prime * (theta / 2.0).sin().powi(2);
    let nu = beam_energy - e_prime;
    DisKinematics {
        q2,
        nu,
        x_bjorken: q2 / (2.0 * NUCLEON_MASS * nu),
        y_bjorken: nu / beam_energy,
        w2: NUCLEON_MASS * NUCLEON_MASS + 2.0 * NUCLEON_MASS * nu - q2,
    }
}

/// Hadron kinematics in the frame where the virtual photon points along +z
/// and `phi_pq` is measured from the lepton scattering plane, in (-π, π].
pub fn sidis(
    beam_energy: f64,
    electron: [f64; 3],
    hadron: [f64; 3],
    hadron_mass: f64,
) -> SidisKinematics {
    let nu = dis(beam_energy, electron).nu;
    let q = virtual_photon(beam_energy, electron);
    let ph = norm(hadron);
    let e_h = (ph * ph + hadron_mass * hadron_mass).sqrt();

    let theta_pq = angle_between(q, hadron);
    let (s, c) = theta_pq.sin_cos();

    let phi_q = q[1].atan2(q[0]);
    let theta_q = q[0].hypot(q[1]).atan2(q[2]);
    let h_rot = rotate_y(rotate_z(hadron, -phi_q), -theta_q);
    let e_rot = rotate_y(rotate_z(electron, -phi_q), -theta_q);
    let mut phi_pq = h_rot[1].atan2(h_rot[0]) - e_rot[1].atan2(e_rot[0]);
    if phi_pq > PI {
        phi_pq -= 2.0 * PI;
    } else if phi_pq <= -PI {
        phi_pq += 2.0 * PI;
    }

    SidisKinematics {
        zh: e_h / nu,
        pt2: ph * ph * s * s,
        pl2: ph * ph * c * c,
        phi_pq,
        theta_pq,
    }
}
