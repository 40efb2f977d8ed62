//! Firing-rate estimation.
//!
//! - Spike-count rates: `count / duration` per trial window.
//! - Kernel rates: spikes are histogrammed every `step` seconds and convolved
//!   with a unit-area Gaussian or rectangular kernel (FFT convolution,
//!   zero-phase), giving a time-resolved rate in sp/s.
//!
//! The histogram is padded by the kernel half-width on each side, using the
//! spikes actually recorded there, so rates near the window edges are not
//! biased towards zero.
use ndarray::{Array1, Array2};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::config::RateKernel;
use crate::unit::Unit;

/// Time-resolved rates of several trials over one period.
#[derive(Debug, Clone)]
pub struct RateMatrix {
    /// `[S]` sample times relative to the period start (s).
    pub times: Array1<f64>,
    /// `[trials, S]` rates (sp/s).
    pub rates: Array2<f64>,
}

/// Access to per-trial firing rates of a unit.
pub trait PeriodRates {
    /// Spike-count rate of each requested trial during `period`.
    fn period_mean_rates(&self, period: &str, trials: &[usize]) -> Option<Vec<f64>>;

    /// Kernel rates of each requested trial during `period`, truncated to the
    /// shortest trial window.
    fn period_rate_matrix(
        &self,
        period: &str,
        trials: &[usize],
        kernel: RateKernel,
        step: f64,
    ) -> Option<RateMatrix>;
}

impl PeriodRates for Unit {
    fn period_mean_rates(&self, period: &str, trials: &[usize]) -> Option<Vec<f64>> {
        let prd = self.period(period)?;
        let times = &self.spikes().times;
        Some(
            trials
                .iter()
                .map(|&i| count_rate(times, prd.starts[i], prd.stops[i]))
                .collect(),
        )
    }

    fn period_rate_matrix(
        &self,
        period: &str,
        trials: &[usize],
        kernel: RateKernel,
        step: f64,
    ) -> Option<RateMatrix> {
        let prd = self.period(period)?;
        let times = &self.spikes().times;
        let min_dur = trials
            .iter()
            .map(|&i| prd.stops[i] - prd.starts[i])
            .fold(f64::INFINITY, f64::min);
        if !min_dur.is_finite() || min_dur <= 0.0 {
            return None;
        }
        let n_samples = ((min_dur / step) + 1e-9).floor() as usize;
        if n_samples == 0 {
            return None;
        }

        let h = kernel_weights(kernel, step);
        let mut rates = Array2::<f64>::zeros((trials.len(), n_samples));
        for (row, &i) in trials.iter().enumerate() {
            let r = kernel_rate(times, prd.starts[i], n_samples, step, &h);
            rates.row_mut(row).assign(&ndarray::ArrayView1::from(&r));
        }
        let t = Array1::from_iter((0..n_samples).map(|k| k as f64 * step));
        Some(RateMatrix { times: t, rates })
    }
}

/// Spike count in `[t1, t2)` divided by `t2 - t1`; `NaN` for an empty window.
pub fn count_rate(spike_times: &[f64], t1: f64, t2: f64) -> f64 {
    if !(t2 > t1) {
        return f64::NAN;
    }
    count_in(spike_times, t1, t2) as f64 / (t2 - t1)
}

/// Number of spikes in `[t1, t2)` of a sorted spike train.
pub fn count_in(spike_times: &[f64], t1: f64, t2: f64) -> usize {
    let lo = spike_times.partition_point(|&t| t < t1);
    let hi = spike_times.partition_point(|&t| t < t2);
    hi.saturating_sub(lo)
}

/// Kernel sampled every `step` seconds, normalised to unit area (1/s).
///
/// Gaussian kernels span ±3σ, rectangular kernels their full width.  The
/// length is always odd.
pub fn kernel_weights(kernel: RateKernel, step: f64) -> Vec<f64> {
    let mut h: Vec<f64> = match kernel {
        RateKernel::Gaussian { sigma } => {
            let half = ((3.0 * sigma / step).ceil() as usize).max(1);
            (0..2 * half + 1)
                .map(|i| {
                    let t = (i as f64 - half as f64) * step;
                    (-0.5 * (t / sigma).powi(2)).exp()
                })
                .collect()
        }
        RateKernel::Rectangular { width } => {
            let half = (0.5 * width / step + 1e-9).floor() as usize;
            vec![1.0; 2 * half + 1]
        }
    };
    let area: f64 = h.iter().sum::<f64>() * step;
    h.iter_mut().for_each(|v| *v /= area);
    h
}

/// Kernel rate of `n_samples` samples starting at `t0`.
pub fn kernel_rate(spike_times: &[f64], t0: f64, n_samples: usize, step: f64, h: &[f64]) -> Vec<f64> {
    let pad = (h.len() - 1) / 2;
    let n_ext = n_samples + 2 * pad;
    let origin = t0 - pad as f64 * step;

    // Histogram over the padded grid; sample k covers [origin + k·step, +step).
    let mut counts = vec![0.0_f64; n_ext];
    let lo = spike_times.partition_point(|&t| t < origin);
    let end = origin + n_ext as f64 * step;
    for &t in spike_times[lo..].iter().take_while(|&&t| t < end) {
        let k = ((t - origin) / step).floor() as usize;
        if k < n_ext {
            counts[k] += 1.0;
        }
    }

    let smoothed = convolve_same(&counts, h);
    smoothed[pad..pad + n_samples].to_vec()
}

/// Zero-phase linear convolution of `x` with odd-length `h`, same length as
/// `x`, computed in one FFT block.
pub fn convolve_same(x: &[f64], h: &[f64]) -> Vec<f64> {
    let n_x = x.len();
    let n_h = h.len();
    if n_x == 0 || n_h == 0 {
        return vec![0.0; n_x];
    }
    let shift = (n_h - 1) / 2;
    let n_fft = (n_x + n_h - 1).next_power_of_two();

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft_fwd = planner.plan_fft_forward(n_fft);
    let fft_inv = planner.plan_fft_inverse(n_fft);

    let to_buf = |v: &[f64]| -> Vec<Complex<f64>> {
        v.iter()
            .map(|&re| Complex { re, im: 0.0 })
            .chain(std::iter::repeat(Complex::default()))
            .take(n_fft)
            .collect()
    };
    let mut xb = to_buf(x);
    let mut hb = to_buf(h);
    fft_fwd.process(&mut xb);
    fft_fwd.process(&mut hb);
    for (a, &b) in xb.iter_mut().zip(hb.iter()) {
        *a *= b;
    }
    fft_inv.process(&mut xb);

    let inv_scale = 1.0 / n_fft as f64;
    xb[shift..shift + n_x].iter().map(|c| c.re * inv_scale).collect()
}
