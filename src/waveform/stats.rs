//! Per-spike waveform duration and amplitude.
//!
//! For each spike:
//!   1. drop clipped samples (equal to the global minimum or maximum voltage)
//!   2. fit an interpolating cubic spline through the remaining samples
//!   3. resample it every `wf_fit_step` from two samples before the
//!      alignment index up to the last valid sample
//!   4. take the first local minimum (global minimum if none), then the first
//!      local maximum at or after it (global maximum of the tail if none)
//!
//! `duration = t(max) − t(min)`, `amplitude = v(max) − v(min)`, both `NaN`
//! unless the minimum strictly precedes the maximum.
use ndarray::{ArrayView1, ArrayView2};

use crate::waveform::spline::CubicSpline;

/// Waveform statistics of a set of spikes.
#[derive(Debug, Clone, Default)]
pub struct WaveformStats {
    pub duration: Vec<f64>,
    pub amplitude: Vec<f64>,
    pub n_valid: Vec<usize>,
    /// More than one sample sits at the global minimum or maximum voltage.
    pub truncated: bool,
    /// Global minimum voltage (`NaN` without spikes).
    pub min_v: f64,
    /// Global maximum voltage (`NaN` without spikes).
    pub max_v: f64,
}

impl WaveformStats {
    /// NaN-skipping mean duration; `NaN` when no spike has a duration.
    pub fn mean_duration(&self) -> f64 {
        nan_mean(self.duration.iter().copied())
    }

    /// NaN-skipping mean amplitude.
    pub fn mean_amplitude(&self) -> f64 {
        nan_mean(self.amplitude.iter().copied())
    }
}

/// Compute duration, amplitude and valid-sample count of every waveform.
///
/// `waveforms`: `[N, S]`, `wave_time`: `[S]`.  `t_start` is the alignment
/// sample index and `step` the resampling step on the `wave_time` axis.
pub fn waveform_stats(
    waveforms: ArrayView2<f64>,
    wave_time: ArrayView1<f64>,
    t_start: usize,
    step: f64,
) -> WaveformStats {
    if waveforms.is_empty() {
        return WaveformStats {
            min_v: f64::NAN,
            max_v: f64::NAN,
            ..WaveformStats::default()
        };
    }

    let min_v = waveforms.iter().copied().fold(f64::INFINITY, f64::min);
    let max_v = waveforms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let n_at_min = waveforms.iter().filter(|&&v| v == min_v).count();
    let n_at_max = waveforms.iter().filter(|&&v| v == max_v).count();
    let truncated = n_at_min > 1 || n_at_max > 1;

    let x: Vec<f64> = wave_time.to_vec();
    let fit_start = x[t_start.saturating_sub(2).min(x.len() - 1)];

    let n = waveforms.nrows();
    let mut out = WaveformStats {
        duration: Vec::with_capacity(n),
        amplitude: Vec::with_capacity(n),
        n_valid: Vec::with_capacity(n),
        truncated,
        min_v,
        max_v,
    };

    for row in waveforms.rows() {
        let (xv, yv): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(row.iter())
            .filter(|(_, &v)| v != min_v && v != max_v)
            .map(|(&t, &v)| (t, v))
            .unzip();

        let (dur, amp) = spike_shape(&xv, &yv, fit_start, step);
        out.duration.push(dur);
        out.amplitude.push(amp);
        out.n_valid.push(xv.len());
    }
    out
}

/// Duration and amplitude of one declipped waveform.
fn spike_shape(xv: &[f64], yv: &[f64], fit_start: f64, step: f64) -> (f64, f64) {
    let Some(spline) = CubicSpline::fit(xv, yv) else {
        return (f64::NAN, f64::NAN);
    };
    let Some(&x_end) = xv.last() else {
        return (f64::NAN, f64::NAN);
    };

    let xfit: Vec<f64> = arange(fit_start, x_end, step);
    if xfit.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let yfit = spline.eval_many(&xfit);

    let imin = local_minima(&yfit).first().copied().unwrap_or_else(|| argmin(&yfit));
    let tail = &yfit[imin..];
    let imax = imin + local_maxima(tail).first().copied().unwrap_or_else(|| argmax(tail));

    if imin < imax {
        (xfit[imax] - xfit[imin], yfit[imax] - yfit[imin])
    } else {
        (f64::NAN, f64::NAN)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// `[start, stop)` in increments of `step` (numpy `arange`).
pub(crate) fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || !(stop > start) {
        return vec![];
    }
    let n = ((stop - start) / step).ceil() as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Indices of strict interior local minima.
pub(crate) fn local_minima(y: &[f64]) -> Vec<usize> {
    (1..y.len().saturating_sub(1))
        .filter(|&i| y[i] < y[i - 1] && y[i] < y[i + 1])
        .collect()
}

/// Indices of strict interior local maxima.
pub(crate) fn local_maxima(y: &[f64]) -> Vec<usize> {
    (1..y.len().saturating_sub(1))
        .filter(|&i| y[i] > y[i - 1] && y[i] > y[i + 1])
        .collect()
}

/// Index of the first smallest value.
fn argmin(y: &[f64]) -> usize {
    y.iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(bi, bv), (i, &v)| if v < bv { (i, v) } else { (bi, bv) })
        .0
}

/// Index of the first largest value.
fn argmax(y: &[f64]) -> usize {
    y.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
        .0
}

pub(crate) fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}
