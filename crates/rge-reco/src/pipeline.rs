//! Per-event orchestration: trigger search, trigger emission and processing
//! of the remaining tracks.

use serde::Serialize;

use rge_bank::BankRegistry;
use rge_core::{EventRows, OutputSink, Result, RowSource};

use crate::banks::EventBanks;
use crate::calibration::SamplingFractionTable;
use crate::classifier::{ClassifierInput, GeometricCut, PidClassifier};
use crate::config::RunConfig;
use crate::detector::{DetectorAggregator, DetectorResponse};
use crate::metadata::RunMetadata;
use crate::particle::{Particle, ParticleBuilder};
use crate::pid::{PION_MINUS_PID, PION_PLUS_PID, PidTable};
use crate::record::{TriggerRef, build_record};

/// Cumulative counters of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunCounters {
    /// Events read from the source.
    pub events_read: u64,
    /// Events skipped for an empty particle or track bank.
    pub events_skipped: u64,
    /// Events with a trigger electron ("e- found").
    pub triggers: u64,
    /// Positive pions emitted ("pi+ found").
    pub pions_plus: u64,
    /// Negative pions emitted ("pi- found").
    pub pions_minus: u64,
    /// Records handed to the sink.
    pub records: u64,
}

/// Snapshot passed to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Events processed so far.
    pub processed: u64,
    /// Events this run will process.
    pub total: u64,
    /// Counters at this point.
    pub counters: RunCounters,
}

impl Progress {
    /// Completion in percent.
    pub fn percent(&self) -> f64 {
        if self.total == 0 { 100.0 } else { 100.0 * self.processed as f64 / self.total as f64 }
    }
}

/// What happened to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Particle or track bank empty.
    Skipped,
    /// No track qualified as trigger electron; nothing emitted.
    NoTrigger,
    /// Trigger found; `records` records emitted including the trigger's.
    Accepted {
        /// Records emitted for this event.
        records: usize,
    },
}

struct Candidate {
    particle: Particle,
    response: DetectorResponse,
}

/// The per-event reconstruction engine of one run.
pub struct EventPipeline<'a> {
    config: RunConfig,
    run: RunMetadata,
    banks: EventBanks,
    builder: ParticleBuilder,
    classifier: PidClassifier<'a>,
    cut: Option<GeometricCut>,
    counters: RunCounters,
}

impl<'a> EventPipeline<'a> {
    /// Validate `config` and bind bank containers from `registry`.
    pub fn new(
        registry: &BankRegistry,
        config: RunConfig,
        run: RunMetadata,
        table: &'a PidTable,
        calibration: &'a SamplingFractionTable,
    ) -> Result<Self> {
        config.validate()?;
        calibration.validate()?;
        let classifier = PidClassifier::new(table, calibration)
            .with_chi2ndf_cut(config.chi2ndf_cut)
            .with_nsigma(config.sf_nsigma);
        Ok(Self {
            banks: EventBanks::new(registry)?,
            builder: ParticleBuilder::new(config.tracking_layers),
            classifier,
            cut: config.geometric_cut.then(GeometricCut::default),
            counters: RunCounters::default(),
            run,
            config,
        })
    }

    /// Counters so far.
    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// Run metadata.
    pub fn run_metadata(&self) -> &RunMetadata {
        &self.run
    }

    /// Check that `source` carries what this run needs.
    pub fn check_source(&self, source: &dyn RowSource) -> Result<()> {
        self.banks.check_source(source, self.config.tracking_layers.is_active())
    }

    /// Process every event of `source` (up to the configured limit) into
    /// `sink`, then finish the sink.
    ///
    /// `progress` is called every `progress_every` events and once at the
    /// end.
    pub fn run<S, K, F>(&mut self, source: &mut S, sink: &mut K, mut progress: F) -> Result<RunCounters>
    where
        S: RowSource,
        K: OutputSink,
        F: FnMut(&Progress),
    {
        self.check_source(&*source)?;
        let total = self.config.events_to_process(source.n_events());
        tracing::info!(run = self.run.run_no, events = total, "processing events");

        let mut rows = EventRows::new();
        let mut processed = 0u64;
        while processed < total {
            if !source.read_event(&mut rows)? {
                tracing::warn!(processed, expected = total, "event source ended early");
                break;
            }
            self.process_event(processed, &rows, sink)?;
            processed += 1;
            if processed % self.config.progress_every == 0 {
                progress(&Progress { processed, total, counters: self.counters });
            }
        }
        if processed % self.config.progress_every != 0 || processed == 0 {
            progress(&Progress { processed, total, counters: self.counters });
        }

        sink.finish()?;
        let c = self.counters;
        tracing::info!(
            events = c.events_read,
            triggers = c.triggers,
            pions_plus = c.pions_plus,
            pions_minus = c.pions_minus,
            records = c.records,
            "run finished"
        );
        Ok(c)
    }

    /// Process one event and emit its records.
    pub fn process_event<K: OutputSink>(
        &mut self,
        event_no: u64,
        event: &EventRows,
        sink: &mut K,
    ) -> Result<EventOutcome> {
        self.counters.events_read += 1;
        self.banks.fill(event, self.config.tracking_layers.is_active())?;
        if self.banks.particle.is_empty() || self.banks.track.is_empty() {
            self.counters.events_skipped += 1;
            return Ok(EventOutcome::Skipped);
        }

        let n_tracks = self.banks.track.n_rows();
        let mut trigger = None;
        for row in 0..n_tracks {
            if let Some(c) = self.evaluate(row, true)? {
                if c.particle.is_trigger {
                    trigger = Some(c);
                    break;
                }
            }
        }
        let Some(trigger) = trigger else {
            if self.config.debug {
                tracing::debug!(event = event_no, tracks = n_tracks, "no trigger electron");
            }
            return Ok(EventOutcome::NoTrigger);
        };

        self.counters.triggers += 1;
        let tref = TriggerRef { particle: trigger.particle, tof: trigger.response.tof };
        sink.append(&build_record(&self.run, event_no, &trigger.particle, &trigger.response, &tref))?;
        let mut emitted = 1;

        for row in (0..n_tracks).filter(|&r| r != trigger.particle.track_row) {
            let Some(c) = self.evaluate(row, false)? else {
                continue;
            };
            sink.append(&build_record(&self.run, event_no, &c.particle, &c.response, &tref))?;
            emitted += 1;
            match c.particle.pid {
                PION_PLUS_PID => self.counters.pions_plus += 1,
                PION_MINUS_PID => self.counters.pions_minus += 1,
                _ => {}
            }
        }
        self.counters.records += emitted as u64;

        if self.config.debug {
            tracing::debug!(
                event = event_no,
                trigger_row = trigger.particle.track_row,
                records = emitted,
                "event accepted"
            );
        }
        Ok(EventOutcome::Accepted { records: emitted })
    }

    /// Build, cut, aggregate and classify one track. `None` for tracks that
    /// are silently skipped.
    fn evaluate(&self, track_row: usize, trigger_open: bool) -> Result<Option<Candidate>> {
        let mut particle = self.builder.build(&self.banks, track_row)?;
        if !particle.is_valid {
            return Ok(None);
        }
        if let Some(cut) = &self.cut {
            if !cut.accepts(&particle) {
                return Ok(None);
            }
        }
        let response = DetectorAggregator::new(&self.banks).aggregate(particle.pindex)?;
        let input = ClassifierInput::new(&particle, response.energy, response.nphe, trigger_open);
        self.classifier.classify(&input)?.apply(&mut particle);
        Ok(Some(Candidate { particle, response }))
    }
}
