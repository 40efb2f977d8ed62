//! Waveform signal-to-noise ratio.
//!
//! `SNR = std(mean waveform) / std(waveforms − mean waveform)`
//!
//! The signal spread is the sample standard deviation (`ddof = 1`) across the
//! samples of the mean waveform; the noise spread is the population standard
//! deviation (`ddof = 0`) of all residual samples of all spikes pooled.
use ndarray::{ArrayView2, Axis};

/// SNR of a `[N, S]` waveform set.
///
/// `NaN` with fewer than two spikes, fewer than two samples, or zero noise.
pub fn snr(waveforms: ArrayView2<f64>) -> f64 {
    if waveforms.nrows() < 2 || waveforms.ncols() < 2 {
        return f64::NAN;
    }
    let Some(mean_wf) = waveforms.mean_axis(Axis(0)) else {
        return f64::NAN;
    };
    let residual = &waveforms - &mean_wf;

    let signal = mean_wf.std(1.0);
    let noise = residual.std(0.0);
    if noise > 0.0 { signal / noise } else { f64::NAN }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn single_spike_is_nan() {
        let wfs = Array2::from_elem((1, 16), 3.0);
        assert!(snr(wfs.view()).is_nan());
    }

    #[test]
    fn identical_spikes_have_no_noise() {
        let wfs = Array2::from_shape_fn((4, 16), |(_, s)| (s as f64).sin());
        assert!(snr(wfs.view()).is_nan());
    }

    #[test]
    fn noisier_spikes_have_lower_snr() {
        let shape = |s: usize| 100.0 * (s as f64 / 3.0).sin();
        let jitter = |i: usize, s: usize| ((i * 31 + s * 17) % 13) as f64 - 6.0;
        let clean = Array2::from_shape_fn((20, 32), |(i, s)| shape(s) + jitter(i, s));
        let noisy = Array2::from_shape_fn((20, 32), |(i, s)| shape(s) + 8.0 * jitter(i, s));
        let a = snr(clean.view());
        let b = snr(noisy.view());
        assert!(a.is_finite() && b.is_finite());
        assert!(a > b && b >= 0.0, "clean={a} noisy={b}");
    }
}
