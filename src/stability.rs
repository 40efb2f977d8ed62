//! Stability of a unit across tasks and over the recording.
//!
//! A unit recorded in two tasks counts as the same, stable neuron when its
//! baseline rate changed little and, if the stimulus was shown at the same
//! locations in both tasks, its preferred direction changed little too.
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::config::QcConfig;
use crate::direction::{deg_diff, pref_dir_max, DirectionRates};
use crate::rate::PeriodRates;
use crate::task::baseline_rate;
use crate::unit::Unit;

/// What is compared between tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSummary {
    pub base_rate: f64,
    /// Direction of the highest mean rate (degrees).
    pub pref_dir: f64,
    /// Distinct stimulus locations, sorted by `(x, y)`.
    pub stim_locs: Vec<(f64, f64)>,
}

impl TaskSummary {
    /// Summarise `unit` over its included trials.
    ///
    /// `stim_period` names the period whose rates give the direction
    /// tuning; `trial_dirs` and `stim_locs` hold one entry per trial.
    /// Returns `None` for a unit without data or one excluded by QC.
    pub fn collect(
        unit: &Unit,
        stim_period: &str,
        trial_dirs: &[f64],
        stim_locs: &[(f64, f64)],
        cfg: &QcConfig,
    ) -> Option<Self> {
        if unit.is_empty() || unit.is_excluded() {
            return None;
        }
        let trials = unit.inc_trials();
        let base_rate = baseline_rate(unit, &trials, cfg);

        let pref_dir = match unit.period_mean_rates(stim_period, &trials) {
            Some(rates) => {
                let dirs: Vec<f64> = trials
                    .iter()
                    .map(|&i| trial_dirs.get(i).copied().unwrap_or(f64::NAN))
                    .collect();
                pref_dir_max(&DirectionRates::from_trials(&dirs, &rates)).0
            }
            None => f64::NAN,
        };

        let mut locs: Vec<(f64, f64)> = trials
            .iter()
            .filter_map(|&i| stim_locs.get(i).copied())
            .filter(|(x, y)| !x.is_nan() && !y.is_nan())
            .collect();
        locs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        locs.dedup();
        if locs.len() > 1 {
            tracing::warn!(
                unit = unit.name.as_str(),
                n_locations = locs.len(),
                "more than one stimulus location in task"
            );
        }

        Some(Self { base_rate, pref_dir, stim_locs: locs })
    }
}

/// Per-criterion outcome of a cross-task comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStability {
    pub same_base_rate: bool,
    pub same_pref_dir: bool,
    pub same_location: bool,
}

impl TaskStability {
    /// Stable iff the baseline rate held and either the preferred direction
    /// held or the stimulus moved.
    pub fn is_stable(&self) -> bool {
        self.same_base_rate && (self.same_pref_dir || !self.same_location)
    }
}

/// Compare two task summaries of the same unit.
pub fn cross_task_stability(a: &TaskSummary, b: &TaskSummary, cfg: &QcConfig) -> TaskStability {
    TaskStability {
        same_base_rate: (a.base_rate - b.base_rate).abs() < cfg.max_baseline_rate_diff,
        same_pref_dir: deg_diff(a.pref_dir, b.pref_dir) < cfg.max_pd_diff,
        same_location: !a.stim_locs.is_empty() && a.stim_locs == b.stim_locs,
    }
}

/// Linear trend of a rate over the recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTrend {
    /// Least-squares slope (sp/s per hour).
    pub slope_per_hour: f64,
    pub intercept: f64,
    /// Two-sided p-value of a non-zero slope.
    pub p_value: f64,
}

/// Regress `rates` on `times` (s).  `NaN` with fewer than three points or
/// no spread in time.
pub fn rate_trend(times: &[f64], rates: &[f64]) -> RateTrend {
    let nan = RateTrend { slope_per_hour: f64::NAN, intercept: f64::NAN, p_value: f64::NAN };
    let pts: Vec<(f64, f64)> = times
        .iter()
        .zip(rates)
        .filter(|(t, r)| !t.is_nan() && !r.is_nan())
        .map(|(&t, &r)| (t, r))
        .collect();
    let n = pts.len();
    if n < 3 {
        return nan;
    }
    let nf = n as f64;
    let mx = pts.iter().map(|p| p.0).sum::<f64>() / nf;
    let my = pts.iter().map(|p| p.1).sum::<f64>() / nf;
    let sxx: f64 = pts.iter().map(|p| (p.0 - mx).powi(2)).sum();
    let sxy: f64 = pts.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
    if !(sxx > 0.0) {
        return nan;
    }
    let slope = sxy / sxx;
    let intercept = my - slope * mx;

    let ssr: f64 = pts.iter().map(|p| (p.1 - intercept - slope * p.0).powi(2)).sum();
    let se = (ssr / (nf - 2.0) / sxx).sqrt();
    let p_value = if se > 0.0 {
        StudentsT::new(0.0, 1.0, nf - 2.0)
            .map(|dist| 2.0 * (1.0 - dist.cdf((slope / se).abs())))
            .unwrap_or(f64::NAN)
    } else if slope != 0.0 {
        0.0
    } else {
        1.0
    };

    RateTrend { slope_per_hour: slope * 3600.0, intercept, p_value }
}
