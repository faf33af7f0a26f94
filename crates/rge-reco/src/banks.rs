//! The six bank containers refilled for every event.

use rge_bank::{
    BankContainer, BankRegistry, FMT_TRACKS, REC_CALORIMETER, REC_CHERENKOV, REC_PARTICLE,
    REC_SCINTILLATOR, REC_TRACK,
};
use rge_core::{Error, EventRows, Result, RowSource};

/// Current-event view of every bank the reconstruction reads.
#[derive(Debug, Clone)]
pub struct EventBanks {
    /// `REC::Particle`.
    pub particle: BankContainer,
    /// `REC::Track`.
    pub track: BankContainer,
    /// `REC::Calorimeter`.
    pub calorimeter: BankContainer,
    /// `REC::Cherenkov`.
    pub cherenkov: BankContainer,
    /// `REC::Scintillator`.
    pub scintillator: BankContainer,
    /// `FMT::Tracks`; only filled when the FMT requirement is active.
    pub fmt: BankContainer,
}

impl EventBanks {
    /// Bind one container per bank.
    pub fn new(registry: &BankRegistry) -> Result<Self> {
        Ok(Self {
            particle: BankContainer::init(registry, REC_PARTICLE)?,
            track: BankContainer::init(registry, REC_TRACK)?,
            calorimeter: BankContainer::init(registry, REC_CALORIMETER)?,
            cherenkov: BankContainer::init(registry, REC_CHERENKOV)?,
            scintillator: BankContainer::init(registry, REC_SCINTILLATOR)?,
            fmt: BankContainer::init(registry, FMT_TRACKS)?,
        })
    }

    /// Container for a bank id.
    pub fn get(&self, bank: &str) -> Option<&BankContainer> {
        match bank {
            REC_PARTICLE => Some(&self.particle),
            REC_TRACK => Some(&self.track),
            REC_CALORIMETER => Some(&self.calorimeter),
            REC_CHERENKOV => Some(&self.cherenkov),
            REC_SCINTILLATOR => Some(&self.scintillator),
            FMT_TRACKS => Some(&self.fmt),
            _ => None,
        }
    }

    fn all(&self) -> [&BankContainer; 6] {
        [&self.particle, &self.track, &self.calorimeter, &self.cherenkov, &self.scintillator, &self.fmt]
    }

    /// Refill every container from one event.
    pub fn fill(&mut self, event: &EventRows, read_fmt: bool) -> Result<()> {
        self.particle.fill_from_event(event)?;
        self.track.fill_from_event(event)?;
        self.calorimeter.fill_from_event(event)?;
        self.cherenkov.fill_from_event(event)?;
        self.scintillator.fill_from_event(event)?;
        if read_fmt {
            self.fmt.fill_from_event(event)?;
        } else {
            self.fmt.clear();
        }
        Ok(())
    }

    /// Check a source's declared banks against the registered schemas before
    /// the first event.
    ///
    /// Banks the source does not carry read as empty, except `FMT::Tracks`
    /// when `fmt_required` is set.
    pub fn check_source(&self, source: &dyn RowSource, fmt_required: bool) -> Result<()> {
        for container in self.all() {
            match source.schema(container.name()) {
                Some(fields) => container.schema().check_fields(fields)?,
                None if container.name() == FMT_TRACKS => {
                    if fmt_required {
                        return Err(Error::MissingTrackingBank);
                    }
                }
                None => {
                    tracing::warn!(bank = container.name(), "bank missing from input, reading as empty");
                }
            }
        }
        Ok(())
    }
}
