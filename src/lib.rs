//! # spikeqc: quality control and drift detection for sorted spike units
//!
//! `spikeqc` decides, for every unit coming out of a spike sorter, which
//! part of the recording it can be trusted over and whether it should be
//! kept at all.  The statistics follow the literature on sorting quality
//! (Hill et al. 2011) and are plain functions over in-memory arrays; only
//! the controller touches unit state.
//!
//! ## Pipeline overview
//!
//! ```text
//! Unit { spike times, waveforms [N, S], trial starts/stops, periods }
//!   │
//!   ├─ waveform::waveform_stats   declip + spline fit → duration, amplitude
//!   ├─ binning::TimeBins          ≥ 120 s bins over the session
//!   ├─ drift::DriftDetector       longest stable-rate window (most trials)
//!   │    or InclusionStrategy::Manual { first_trial, last_trial }
//!   ├─ Unit::update_included_trials
//!   ├─ waveform::snr, isi::isi_stats, mean rate   (included spikes only)
//!   ├─ classify::classify_unit    single unit / multi unit
//!   ├─ task                       baseline rate, task relatedness
//!   └─ gate                       five criteria, or a curator override
//!        │
//!        └─→ QualityMetrics (also stored on the unit)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use spikeqc::{run_quality_control, is_unit_rejected, QcConfig};
//!
//! let mut unit = spikeqc::io::load_unit("unit.safetensors".as_ref()).unwrap();
//! let cfg = QcConfig::default();
//!
//! // Automatic drift search, no manual curation.
//! let qm = run_quality_control(&mut unit, None, None, None, &cfg);
//! println!("SNR {:.2}, {} of {} trials", qm.snr, qm.n_trials_included, qm.n_trials_total);
//! assert_eq!(is_unit_rejected(&unit), qm.excluded);
//! ```

pub mod binning;
pub mod classify;
pub mod config;
pub mod controller;
pub mod direction;
pub mod drift;
pub mod error;
pub mod gate;
pub mod inclusion;
pub mod io;
pub mod isi;
pub mod rate;
pub mod stability;
pub mod task;
pub mod unit;
pub mod waveform;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use binning::{session_bounds, TimeBins};
pub use classify::classify_unit;
pub use config::{QcConfig, RateKernel, SignificanceTest};
pub use controller::{QcOutcome, QcRequest, QcTrace, QualityController};
pub use direction::{deg_diff, DirSelectivity, DirectionRates};
pub use drift::{DriftDetector, StablePeriod};
pub use error::QcError;
pub use gate::GateResult;
pub use inclusion::{Inclusion, InclusionStrategy, TrialInclusionResolver};
pub use isi::{isi_stats, IsiStats};
pub use rate::{PeriodRates, RateMatrix};
pub use stability::{cross_task_stability, rate_trend, RateTrend, TaskStability, TaskSummary};
pub use task::{baseline_rate, test_task_relatedness};
pub use unit::{QualityMetrics, SpikeRecord, TrialPeriod, TrialRecord, Unit, UnitType};
pub use waveform::{snr, waveform_stats, WaveformStats};

/// Run **quality control** on one unit.
///
/// This is the main entry point.  With both `first_trial` and `last_trial`
/// given, the included period spans trials `first_trial..last_trial`;
/// otherwise it is found by the drift scan.  `include` overrides the quality
/// gate.
///
/// The unit's trial inclusion, metrics and exclusion flag are updated.  A
/// unit without spikes or trials is left as is and gets empty metrics
/// (excluded, all statistics `NaN`).
///
/// # Examples
///
/// ```
/// use ndarray::{Array1, Array2};
/// use spikeqc::{run_quality_control, QcConfig, Unit};
///
/// let mut unit = Unit::new(
///     "empty",
///     vec![],
///     Array2::zeros((0, 4)),
///     Array1::zeros(4),
///     vec![],
///     vec![],
/// ).unwrap();
/// let qm = run_quality_control(&mut unit, None, None, None, &QcConfig::default());
/// assert!(qm.excluded && qm.snr.is_nan());
/// ```
pub fn run_quality_control(
    unit: &mut Unit,
    include: Option<bool>,
    first_trial: Option<usize>,
    last_trial: Option<usize>,
    cfg: &QcConfig,
) -> QualityMetrics {
    let request = QcRequest {
        strategy: InclusionStrategy::from_bounds(first_trial, last_trial),
        include,
    };
    QualityController::new(cfg.clone())
        .run(unit, request)
        .map(|o| o.metrics)
        .unwrap_or_default()
}

/// Whether the unit is excluded from analysis.
///
/// Units without data, and units not yet accepted by a QC pass, are
/// rejected.
pub fn is_unit_rejected(unit: &Unit) -> bool {
    unit.is_empty() || unit.is_excluded()
}

/// Run QC on many units in parallel (automatic strategy, no overrides).
pub fn run_quality_control_batch(units: &mut [Unit], cfg: &QcConfig) -> Vec<QualityMetrics> {
    QualityController::new(cfg.clone()).run_batch(units)
}
