//! Run configuration.

use rge_core::{Error, Result};

/// Minimum number of confirmed FMT layers a track must have hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingLayerRequirement {
    /// Tracked by the drift chambers only; FMT bank is not read.
    #[default]
    Off,
    /// At least this many distinct confirmed FMT layers.
    AtLeast(u32),
}

impl TrackingLayerRequirement {
    /// Smallest layer count accepted by [`TrackingLayerRequirement::from_layers`].
    pub const MIN_LAYERS: u32 = 2;
    /// Number of FMT layers in the detector.
    pub const MAX_LAYERS: u32 = 3;

    /// `0` turns the requirement off; `2` and `3` are the only other valid
    /// values.
    pub fn from_layers(n: u32) -> Result<Self> {
        match n {
            0 => Ok(Self::Off),
            n if (Self::MIN_LAYERS..=Self::MAX_LAYERS).contains(&n) => Ok(Self::AtLeast(n)),
            n => Err(Error::Config(format!(
                "FMT layer requirement must be 0, {} or {}, got {n}",
                Self::MIN_LAYERS,
                Self::MAX_LAYERS
            ))),
        }
    }

    /// `true` unless [`TrackingLayerRequirement::Off`].
    pub fn is_active(self) -> bool {
        matches!(self, Self::AtLeast(_))
    }

    /// Required layer count, `0` when off.
    pub fn layers(self) -> u32 {
        match self {
            Self::Off => 0,
            Self::AtLeast(n) => n,
        }
    }
}

/// Knobs of one `make-ntuples` run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// FMT layer requirement.
    pub tracking_layers: TrackingLayerRequirement,
    /// Event limit (`None` = every event in the input).
    pub max_events: Option<u64>,
    /// Apply the FMT geometric acceptance cut.
    pub geometric_cut: bool,
    /// Per-event debug logging.
    pub debug: bool,
    /// Upper bound on track chi2/NDF for the electron hypothesis.
    pub chi2ndf_cut: f64,
    /// Width of the sampling-fraction window, in sigmas.
    pub sf_nsigma: f64,
    /// Progress callback cadence, in events.
    pub progress_every: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tracking_layers: TrackingLayerRequirement::Off,
            max_events: None,
            geometric_cut: false,
            debug: false,
            chi2ndf_cut: 15.0,
            sf_nsigma: 3.5,
            progress_every: 10_000,
        }
    }
}

impl RunConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the FMT layer requirement.
    pub fn tracking_layers(mut self, req: TrackingLayerRequirement) -> Self {
        self.tracking_layers = req;
        self
    }

    /// Limit the number of events.
    pub fn max_events(mut self, n: u64) -> Self {
        self.max_events = Some(n);
        self
    }

    /// Toggle the geometric acceptance cut.
    pub fn geometric_cut(mut self, on: bool) -> Self {
        self.geometric_cut = on;
        self
    }

    /// Toggle debug logging.
    pub fn debug(mut self, on: bool) -> Self {
        self.debug = on;
        self
    }

    /// Set the chi2/NDF cut.
    pub fn chi2ndf_cut(mut self, cut: f64) -> Self {
        self.chi2ndf_cut = cut;
        self
    }

    /// Set the sampling-fraction window width.
    pub fn sf_nsigma(mut self, nsigma: f64) -> Self {
        self.sf_nsigma = nsigma;
        self
    }

    /// Set the progress cadence.
    pub fn progress_every(mut self, n: u64) -> Self {
        self.progress_every = n;
        self
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if let TrackingLayerRequirement::AtLeast(n) = self.tracking_layers {
            TrackingLayerRequirement::from_layers(n)?;
        }
        if self.max_events == Some(0) {
            return Err(Error::Config("event limit must be positive".into()));
        }
        if !(self.chi2ndf_cut.is_finite() && self.chi2ndf_cut > 0.0) {
            return Err(Error::Config(format!("chi2/NDF cut must be > 0, got {}", self.chi2ndf_cut)));
        }
        if !(self.sf_nsigma.is_finite() && self.sf_nsigma > 0.0) {
            return Err(Error::Config(format!(
                "sampling fraction window must be > 0 sigma, got {}",
                self.sf_nsigma
            )));
        }
        if self.progress_every == 0 {
            return Err(Error::Config("progress cadence must be positive".into()));
        }
        Ok(())
    }

    /// Events to process out of `available`: the limit, clamped.
    pub fn events_to_process(&self, available: u64) -> u64 {
        self.max_events.map_or(available, |n| n.min(available))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_layers() {
        assert_eq!(TrackingLayerRequirement::from_layers(0).unwrap(), TrackingLayerRequirement::Off);
        assert_eq!(
            TrackingLayerRequirement::from_layers(3).unwrap(),
            TrackingLayerRequirement::AtLeast(3)
        );
        assert!(TrackingLayerRequirement::from_layers(1).is_err());
        assert!(TrackingLayerRequirement::from_layers(4).is_err());
        assert_eq!(TrackingLayerRequirement::from_layers(2).unwrap().layers(), 2);
        assert_eq!(TrackingLayerRequirement::Off.layers(), 0);
    }

    #[test]
    fn test_validate() {
        assert!(RunConfig::new().validate().is_ok());
        assert!(RunConfig::new().max_events(0).validate().is_err());
        assert!(RunConfig::new().chi2ndf_cut(f64::NAN).validate().is_err());
        assert!(RunConfig::new().sf_nsigma(-1.0).validate().is_err());
        assert!(
            RunConfig::new()
                .tracking_layers(TrackingLayerRequirement::AtLeast(7))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_events_to_process_clamps() {
        assert_eq!(RunConfig::new().events_to_process(50), 50);
        assert_eq!(RunConfig::new().max_events(10).events_to_process(50), 10);
        assert_eq!(RunConfig::new().max_events(100).events_to_process(50), 50);
    }
}
