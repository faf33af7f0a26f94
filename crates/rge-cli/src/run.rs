//! `rge make-ntuples` and `rge pids`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use rge_bank::{BankRegistry, ParquetEventSource};
use rge_core::RowSource;
use rge_reco::metadata::{calibration_path, output_file_name};
use rge_reco::{
    EventPipeline, ParquetNtupleWriter, PidTable, Progress, RunConfig, RunMetadata,
    SamplingFractionTable, TrackingLayerRequirement,
};

/// Arguments of `rge make-ntuples`.
pub struct MakeNtuplesArgs {
    pub input: PathBuf,
    pub fmt_layers: u32,
    pub geometric_cut: bool,
    pub events: Option<u64>,
    pub work_dir: PathBuf,
    pub data_dir: PathBuf,
    pub beam_energy: Option<f64>,
    pub debug: bool,
    pub summary: Option<PathBuf>,
}

fn load_calibration(data_dir: &Path, run: &RunMetadata) -> Result<SamplingFractionTable> {
    let path = calibration_path(data_dir, run.run_no);
    if !path.exists() {
        anyhow::bail!(
            "no sampling fraction data found for run {} (expected {})",
            run.run_no,
            path.display()
        );
    }
    SamplingFractionTable::from_path(&path)
        .with_context(|| format!("failed to load sampling fraction file {}", path.display()))
}

pub fn cmd_make_ntuples(args: &MakeNtuplesArgs) -> Result<()> {
    let run = RunMetadata::from_input_path(&args.input, args.beam_energy)?;
    let tracking_layers = TrackingLayerRequirement::from_layers(args.fmt_layers)?;
    let mut config = RunConfig::new()
        .tracking_layers(tracking_layers)
        .geometric_cut(args.geometric_cut)
        .debug(args.debug);
    if let Some(n) = args.events {
        config = config.max_events(n);
    }

    let calibration = load_calibration(&args.data_dir, &run)?;
    let table = PidTable::clas12();
    let registry = BankRegistry::clas12();

    let mut source = ParquetEventSource::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;

    std::fs::create_dir_all(&args.work_dir)
        .with_context(|| format!("failed to create {}", args.work_dir.display()))?;
    let out_path = args.work_dir.join(output_file_name(run.run_no, tracking_layers));

    let total = config.events_to_process(source.n_events());
    let mut pipeline = EventPipeline::new(&registry, config, run, &table, &calibration)?;
    println!("Processing {total} events from {}.", args.input.display());

    let mut sink = ParquetNtupleWriter::create(&out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    let counters = pipeline.run(&mut source, &mut sink, |p: &Progress| {
        tracing::info!(
            processed = p.processed,
            total = p.total,
            percent = p.percent(),
            triggers = p.counters.triggers,
            "progress"
        );
    })?;

    println!("e-  found: {}", counters.triggers);
    println!("pi+ found: {}", counters.pions_plus);
    println!("pi- found: {}", counters.pions_minus);
    println!();
    println!("Wrote {} records to {}", counters.records, out_path.display());

    if let Some(path) = &args.summary {
        let meta = pipeline.run_metadata();
        let json = serde_json::json!({
            "run_no": meta.run_no,
            "beam_energy": meta.beam_energy,
            "fmt_layers": tracking_layers.layers(),
            "output": out_path.display().to_string(),
            "counters": counters,
        });
        std::fs::write(path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

pub fn cmd_pids(charge: Option<i32>) -> Result<()> {
    let table = PidTable::clas12();
    match charge {
        Some(q) => {
            for pid in table.pids_by_charge(q) {
                let h = table.get(pid)?;
                println!("{pid:>6}  {}", h.name);
            }
        }
        None => print!("{table}"),
    }
    Ok(())
}
