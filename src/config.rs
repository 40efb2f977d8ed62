//! Quality-control configuration.
//!
//! [`QcConfig`] holds every threshold and recording constant used by the
//! quality-control pass.  All fields have defaults matching the literature
//! values the metrics were calibrated against; override any of them per call
//! with struct-update syntax.  Times are in **seconds** throughout.

/// Kernel used to estimate time-resolved firing rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateKernel {
    /// Gaussian kernel with standard deviation `sigma` (s).
    Gaussian { sigma: f64 },
    /// Boxcar kernel with total `width` (s).
    Rectangular { width: f64 },
}

impl RateKernel {
    /// Standard deviation of the kernel in seconds.
    ///
    /// A rectangular kernel of width `w` has `σ = w / (2√3)`.
    pub fn sigma(&self) -> f64 {
        match *self {
            RateKernel::Gaussian { sigma } => sigma,
            RateKernel::Rectangular { width } => width / 2.0 / 3.0_f64.sqrt(),
        }
    }

    /// Rectangular kernel with the same standard deviation as a Gaussian of `sigma`.
    pub fn rect_from_sigma(sigma: f64) -> Self {
        RateKernel::Rectangular { width: 2.0 * 3.0_f64.sqrt() * sigma }
    }
}

/// Paired test run at every time sample when testing task relatedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignificanceTest {
    /// Wilcoxon signed-rank test (normal approximation, tie corrected).
    Wilcoxon,
    /// Paired Student t-test.
    PairedT,
}

/// Configuration for one quality-control pass.
///
/// ```
/// use spikeqc::QcConfig;
///
/// let cfg = QcConfig {
///     max_drift_ratio: 1.5,   // stricter stationarity
///     min_n_trials:    40,
///     ..QcConfig::default()
/// };
/// assert_eq!(cfg.min_bin_len, 120.0);
/// ```
#[derive(Debug, Clone)]
pub struct QcConfig {
    // ── Recording constants ────────────────────────────────────────────────

    /// Inter-spike interval below which a pair of spikes is a refractory
    /// violation.
    ///
    /// Default: `0.001` s (1 ms).
    pub isi_threshold: f64,

    /// Width of the post-spike dead period during which the acquisition
    /// system cannot register another spike.
    ///
    /// Default: `0.000675` s (0.675 ms).
    pub censored_period: f64,

    /// Sample index at which spikes are aligned (threshold crossing).
    ///
    /// The waveform spline is resampled from two samples before this index.
    ///
    /// Default: `9`.
    pub wf_t_start: usize,

    /// Resampling step of the fitted waveform, in the units of the waveform
    /// time axis.
    ///
    /// Default: `1.0`.
    pub wf_fit_step: f64,

    /// Lower end of the recording gain range.
    ///
    /// Default: `-2048.0`.
    pub vmin: f64,

    /// Upper end of the recording gain range.
    ///
    /// Default: `2047.0`.
    pub vmax: f64,

    // ── Stationarity ───────────────────────────────────────────────────────

    /// Minimum length of a time bin for binned firing-rate statistics.
    ///
    /// Default: `120.0` s.
    pub min_bin_len: f64,

    /// Largest tolerated ratio between the extreme rates of a stable period
    /// (2.0 = 200 %).
    ///
    /// Default: `2.0`.
    pub max_drift_ratio: f64,

    // ── Unit classification ────────────────────────────────────────────────

    /// Minimum true-spike percentage of a single unit.
    ///
    /// Default: `90.0` %.
    pub single_unit_min_true_spikes: f64,

    /// Minimum SNR of a single unit.
    ///
    /// Default: `2.0`.
    pub single_unit_min_snr: f64,

    // ── Unit exclusion ─────────────────────────────────────────────────────

    /// SNR must exceed this value.  Default: `1.0`.
    pub min_snr: f64,

    /// Mean firing rate (sp/s) must exceed this value.  Default: `1.0`.
    pub min_rate: f64,

    /// ISI violation percentage must stay below this value.  Default: `1.0` %.
    pub max_isi_violation: f64,

    /// Total number of trials must exceed this value.  Default: `20`.
    pub min_n_trials: usize,

    /// Percentage of included trials must exceed this value.  Default: `50.0` %.
    pub min_inc_trials_ratio: f64,

    // ── Task relatedness ───────────────────────────────────────────────────

    /// Trial periods tested against baseline.
    ///
    /// Default: `S1`, `early delay`, `late delay`, `S2`, `post-S2`.
    pub task_periods: Vec<String>,

    /// Name of the baseline period.  Default: `"baseline"`.
    pub baseline_period: String,

    /// p-value threshold of the per-sample test.  Default: `0.05`.
    pub significance: f64,

    /// Test run at each time sample.  Default: [`SignificanceTest::Wilcoxon`].
    pub significance_test: SignificanceTest,

    /// Shortest run of significant samples counted as task related.
    ///
    /// Default: `0.050` s.
    pub min_task_related_dur: f64,

    /// Kernel for time-resolved rates.  Default: Gaussian, σ = 20 ms.
    pub rate_kernel: RateKernel,

    /// Sampling step of time-resolved rates.  Default: `0.010` s.
    pub kernel_step: f64,

    // ── Cross-task stability ───────────────────────────────────────────────

    /// Largest preferred-direction change (degrees) between stable tasks.
    ///
    /// Default: `45.0`.
    pub max_pd_diff: f64,

    /// Largest baseline-rate change (sp/s) between stable tasks.
    ///
    /// Default: `10.0`.
    pub max_baseline_rate_diff: f64,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            isi_threshold: 0.001,
            censored_period: 0.000_675,
            wf_t_start: 9,
            wf_fit_step: 1.0,
            vmin: -2048.0,
            vmax: 2047.0,
            min_bin_len: 120.0,
            max_drift_ratio: 2.0,
            single_unit_min_true_spikes: 90.0,
            single_unit_min_snr: 2.0,
            min_snr: 1.0,
            min_rate: 1.0,
            max_isi_violation: 1.0,
            min_n_trials: 20,
            min_inc_trials_ratio: 50.0,
            task_periods: ["S1", "early delay", "late delay", "S2", "post-S2"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            baseline_period: "baseline".into(),
            significance: 0.05,
            significance_test: SignificanceTest::Wilcoxon,
            min_task_related_dur: 0.050,
            rate_kernel: RateKernel::Gaussian { sigma: 0.020 },
            kernel_step: 0.010,
            max_pd_diff: 45.0,
            max_baseline_rate_diff: 10.0,
        }
    }
}

impl QcConfig {
    /// Minimum number of consecutive significant rate samples that make a
    /// task-related period, `ceil(min_task_related_dur / kernel_step)`.
    ///
    /// ```
    /// use spikeqc::QcConfig;
    /// assert_eq!(QcConfig::default().min_task_related_samples(), 5);
    /// ```
    pub fn min_task_related_samples(&self) -> usize {
        ((self.min_task_related_dur / self.kernel_step) - 1e-9).ceil().max(1.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_kernel_has_matching_sigma() {
        let k = RateKernel::rect_from_sigma(0.02);
        approx::assert_abs_diff_eq!(k.sigma(), 0.02, epsilon = 1e-12);
    }

    #[test]
    fn defaults_match_literature_values() {
        let cfg = QcConfig::default();
        assert_eq!(cfg.max_drift_ratio, 2.0);
        assert_eq!(cfg.min_n_trials, 20);
        assert_eq!(cfg.task_periods.len(), 5);
        assert!(cfg.censored_period < cfg.isi_threshold);
    }
}
