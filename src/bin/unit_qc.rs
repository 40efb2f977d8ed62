use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use spikeqc::{
    io::{load_unit, write_report},
    InclusionStrategy, QcConfig, QcRequest, QualityController,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "unit_qc", about = "Quality control and drift detection for one sorted unit")]
struct Args {
    /// Unit safetensors file (spike_times, waveforms, wave_time, trial_starts, trial_stops)
    #[arg(long)]
    input: PathBuf,

    /// Report safetensors output path
    #[arg(long)]
    output: PathBuf,

    /// First included trial (manual inclusion, needs --last-trial)
    #[arg(long)]
    first_trial: Option<usize>,

    /// One past the last included trial
    #[arg(long)]
    last_trial: Option<usize>,

    /// Include every trial, skip the drift scan
    #[arg(long, conflicts_with_all = ["first_trial", "last_trial"])]
    full_session: bool,

    /// Keep the unit regardless of the quality gate
    #[arg(long, conflicts_with = "exclude")]
    include: bool,

    /// Drop the unit regardless of the quality gate
    #[arg(long)]
    exclude: bool,

    /// Largest tolerated max/min binned rate ratio (default: 2.0)
    #[arg(long, default_value_t = 2.0)]
    max_drift_ratio: f64,

    /// Minimum bin length in seconds (default: 120)
    #[arg(long, default_value_t = 120.0)]
    min_bin_len: f64,

    /// Minimum SNR (default: 1.0)
    #[arg(long, default_value_t = 1.0)]
    min_snr: f64,

    /// Minimum number of trials (default: 20)
    #[arg(long, default_value_t = 20)]
    min_n_trials: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let strategy = match (args.full_session, args.first_trial, args.last_trial) {
        (true, _, _) => InclusionStrategy::FullSession,
        (false, Some(_), None) | (false, None, Some(_)) => {
            bail!("--first-trial and --last-trial must be given together")
        }
        (false, first, last) => InclusionStrategy::from_bounds(first, last),
    };
    let include = match (args.include, args.exclude) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };

    let mut unit = load_unit(&args.input)?;
    println!("Loaded {}: {} spikes, {} trials, {} periods",
        unit.name, unit.spikes().len(), unit.trials().len(), unit.periods().len());

    let cfg = QcConfig {
        max_drift_ratio: args.max_drift_ratio,
        min_bin_len: args.min_bin_len,
        min_snr: args.min_snr,
        min_n_trials: args.min_n_trials,
        ..QcConfig::default()
    };

    let Some(outcome) = QualityController::new(cfg).run(&mut unit, QcRequest { strategy, include }) else {
        bail!("unit {} has no spikes or no trials", unit.name);
    };

    let m = &outcome.metrics;
    println!("{}: SNR {:.2}, rate {:.2} sp/s, ISI {:.2} %, {}/{} trials, {}",
        m.unit_type.map_or("unclassified", |t| t.as_str()),
        m.snr, m.mean_rate, m.isi_violation,
        m.n_trials_included, m.n_trials_total,
        if m.excluded { "excluded" } else { "included" });

    write_report(&outcome, &args.output)?;
    println!("Written → {}", args.output.display());

    Ok(())
}
