//! Inter-spike-interval violations and the true-spike estimate.
//!
//! Violations are ISIs strictly shorter than the refractory threshold.  The
//! percentage of spikes originating from the sorted neuron follows Hill et al.
//! (2011), *Quality metrics to accompany spike sorting of extracellular
//! signals*:
//!
//! ```text
//! det         = 1/4 − r·T / (2·(t_max − t_min)·N²)
//! true_spikes = 100·(1/2 + √det)          (NaN when det < 0)
//! ```
//!
//! with `r` violations, `N` spikes spanning `T` seconds, refractory threshold
//! `t_max` and censored period `t_min`.

/// `(true_spike_percent, isi_violation_percent)` of a spike train.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsiStats {
    pub true_spikes: f64,
    pub violation: f64,
}

/// Consecutive differences of `spike_times`.
pub fn isi(spike_times: &[f64]) -> Vec<f64> {
    spike_times.windows(2).map(|w| w[1] - w[0]).collect()
}

/// ISI statistics of `spike_times` (s, sorted).
///
/// * no spikes  → `(NaN, NaN)`
/// * one spike  → `(100, 0)`
pub fn isi_stats(spike_times: &[f64], isi_threshold: f64, censored_period: f64) -> IsiStats {
    match spike_times.len() {
        0 => {
            return IsiStats { true_spikes: f64::NAN, violation: f64::NAN };
        }
        1 => {
            return IsiStats { true_spikes: 100.0, violation: 0.0 };
        }
        _ => {}
    }
    debug_assert!(spike_times.windows(2).all(|w| w[1] >= w[0]), "spike times not sorted");

    let isis = isi(spike_times);
    let n_vr = isis.iter().filter(|&&d| d < isi_threshold).count();
    let violation = 100.0 * n_vr as f64 / isis.len() as f64;

    let n = spike_times.len() as f64;
    let t = spike_times[spike_times.len() - 1] - spike_times[0];
    let t_dif = isi_threshold - censored_period;
    let det = 0.25 - (n_vr as f64 * t) / (2.0 * t_dif * n * n);
    let true_spikes = if det >= 0.0 { 100.0 * (0.5 + det.sqrt()) } else { f64::NAN };

    IsiStats { true_spikes, violation }
}
