//! RG-E ntuple maker CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod run;

#[derive(Parser)]
#[command(name = "rge")]
#[command(about = "CLAS12 RG-E - classified-particle ntuples from reconstructed event banks")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate SIDIS ntuples from a Parquet event file
    MakeNtuples {
        /// Input event file. Expected name: `<text><run_no>.parquet`
        input: PathBuf,

        /// Confirmed FMT layers a track must have hit: 0 (DC only), 2 or 3.
        /// Requires an `FMT::Tracks` bank when not 0.
        #[arg(short = 'f', long, default_value = "0")]
        fmt_layers: u32,

        /// Apply the FMT geometric acceptance cut
        #[arg(short = 'c', long)]
        geometric_cut: bool,

        /// Number of events to process (default: all)
        #[arg(short = 'n', long)]
        events: Option<u64>,

        /// Directory for the output ntuple file
        #[arg(short = 'w', long, default_value = "root_io")]
        work_dir: PathBuf,

        /// Directory holding the sampling fraction files
        #[arg(short = 'd', long, default_value = "data")]
        data_dir: PathBuf,

        /// Beam energy in GeV. Required for runs missing from the run table.
        #[arg(long)]
        beam_energy: Option<f64>,

        /// Per-event debug logging
        #[arg(short = 'D', long)]
        debug: bool,

        /// Also write the run counters as pretty JSON
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// List the supported PID hypotheses
    Pids {
        /// Only print the codes with this charge
        #[arg(long, allow_hyphen_values = true)]
        charge: Option<i32>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match &cli.command {
        Commands::MakeNtuples { debug: true, .. } => cli.log_level.max(tracing::Level::DEBUG),
        _ => cli.log_level,
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    match cli.command {
        Commands::MakeNtuples {
            input,
            fmt_layers,
            geometric_cut,
            events,
            work_dir,
            data_dir,
            beam_energy,
            debug,
            summary,
        } => run::cmd_make_ntuples(&run::MakeNtuplesArgs {
            input,
            fmt_layers,
            geometric_cut,
            events,
            work_dir,
            data_dir,
            beam_energy,
            debug,
            summary,
        }),
        Commands::Pids { charge } => run::cmd_pids(charge),
        Commands::Version => {
            println!("rge {}", rge_core::VERSION);
            Ok(())
        }
    }
}
