//! Unit exclusion decision.
//!
//! Five independent criteria, all of which must pass for a unit to be kept:
//!
//! | criterion     | passes when                         |
//! |---------------|-------------------------------------|
//! | SNR           | `snr > min_snr`                     |
//! | firing rate   | `mean_rate > min_rate`              |
//! | ISI violation | `isi_violation < max_isi_violation` |
//! | total trials  | `n_trials_total > min_n_trials`     |
//! | included ratio| `100·inc/total > min_inc_trials_ratio` |
//!
//! Comparisons with `NaN` are false, so an undefined metric fails its
//! criterion.
use crate::config::QcConfig;
use crate::unit::QualityMetrics;

/// Outcome of every exclusion criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateResult {
    pub snr: bool,
    pub firing_rate: bool,
    pub isi_violation: bool,
    pub n_trials: bool,
    pub inc_trials_ratio: bool,
}

impl GateResult {
    pub fn passed(&self) -> bool {
        self.snr && self.firing_rate && self.isi_violation && self.n_trials && self.inc_trials_ratio
    }

    /// Names of the failed criteria.
    pub fn failures(&self) -> Vec<&'static str> {
        [
            (self.snr, "SNR"),
            (self.firing_rate, "FR"),
            (self.isi_violation, "ISI"),
            (self.n_trials, "NTotalTrs"),
            (self.inc_trials_ratio, "IncTrsRatio"),
        ]
        .into_iter()
        .filter_map(|(ok, name)| (!ok).then_some(name))
        .collect()
    }
}

/// Evaluate every criterion on `qm`.
pub fn evaluate(qm: &QualityMetrics, cfg: &QcConfig) -> GateResult {
    GateResult {
        snr: qm.snr > cfg.min_snr,
        firing_rate: qm.mean_rate > cfg.min_rate,
        isi_violation: qm.isi_violation < cfg.max_isi_violation,
        n_trials: qm.n_trials_total > cfg.min_n_trials,
        inc_trials_ratio: qm.inc_trials_ratio() > cfg.min_inc_trials_ratio,
    }
}

/// Final exclusion flag.  An explicit `include` overrides the criteria.
pub fn is_excluded(qm: &QualityMetrics, include: Option<bool>, cfg: &QcConfig) -> bool {
    match include {
        Some(include) => !include,
        None => !evaluate(qm, cfg).passed(),
    }
}
