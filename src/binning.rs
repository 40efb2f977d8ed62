//! Session time binning for stationarity analysis.
//!
//! The session runs from the earliest spike or trial start to the latest
//! spike or trial stop.  It is cut into `max(1, floor(duration / min_bin_len))`
//! equal, contiguous bins.  Bins are half-open `[t1, t2)`, except the last,
//! which also holds a spike falling exactly on the session stop.
use std::ops::Range;

use ndarray::{s, ArrayView2};

/// Start and stop of the recording: `(min(spikes, trial starts),
/// max(spikes, trial stops))`.
///
/// Either sequence may be empty; with both empty the bounds are `(NaN, NaN)`.
pub fn session_bounds(spike_times: &[f64], tr_starts: &[f64], tr_stops: &[f64]) -> (f64, f64) {
    let t_start = spike_times
        .iter()
        .chain(tr_starts)
        .copied()
        .fold(f64::INFINITY, f64::min);
    let t_stop = spike_times
        .iter()
        .chain(tr_stops)
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if t_start.is_finite() && t_stop.is_finite() {
        (t_start, t_stop)
    } else {
        (f64::NAN, f64::NAN)
    }
}

/// Contiguous time bins covering one session.
#[derive(Debug, Clone)]
pub struct TimeBins {
    /// `n + 1` bin edges.
    pub edges: Vec<f64>,
    /// Spike index range of each bin (spike times are sorted).
    pub spike_ranges: Vec<Range<usize>>,
}

impl TimeBins {
    /// Bin a session given its spikes and trials.
    pub fn new(spike_times: &[f64], tr_starts: &[f64], tr_stops: &[f64], min_bin_len: f64) -> Self {
        let (t_start, t_stop) = session_bounds(spike_times, tr_starts, tr_stops);
        Self::from_bounds(spike_times, t_start, t_stop, min_bin_len)
    }

    /// Bin `[t_start, t_stop]` directly.
    pub fn from_bounds(spike_times: &[f64], t_start: f64, t_stop: f64, min_bin_len: f64) -> Self {
        let n_bins = n_bins(t_stop - t_start, min_bin_len);
        let edges: Vec<f64> = (0..=n_bins)
            .map(|i| t_start + (t_stop - t_start) * i as f64 / n_bins as f64)
            .collect();

        let spike_ranges = (0..n_bins)
            .map(|i| {
                let lo = spike_times.partition_point(|&t| t < edges[i]);
                let hi = if i + 1 == n_bins {
                    spike_times.partition_point(|&t| t <= edges[i + 1])
                } else {
                    spike_times.partition_point(|&t| t < edges[i + 1])
                };
                lo..hi.max(lo)
            })
            .collect();

        Self { edges, spike_ranges }
    }

    pub fn len(&self) -> usize {
        self.spike_ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spike_ranges.is_empty()
    }

    /// `(t1, t2)` of bin `i`.
    pub fn bin(&self, i: usize) -> (f64, f64) {
        (self.edges[i], self.edges[i + 1])
    }

    /// All bins as `(t1, t2)` pairs.
    pub fn bins(&self) -> Vec<(f64, f64)> {
        (0..self.len()).map(|i| self.bin(i)).collect()
    }

    /// Bin midpoints.
    pub fn midpoints(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Spike count of each bin.
    pub fn counts(&self) -> Vec<usize> {
        self.spike_ranges.iter().map(|r| r.len()).collect()
    }

    /// Firing rate (sp/s) of each bin; `NaN` for a zero-width bin.
    pub fn rates(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| {
                let (t1, t2) = self.bin(i);
                let width = t2 - t1;
                if width > 0.0 { self.spike_ranges[i].len() as f64 / width } else { f64::NAN }
            })
            .collect()
    }

    /// Spike times falling in bin `i`.
    pub fn spike_times<'a>(&self, i: usize, spike_times: &'a [f64]) -> &'a [f64] {
        &spike_times[self.spike_ranges[i].clone()]
    }

    /// Waveform rows of the spikes falling in bin `i`.
    pub fn waveforms<'a>(&self, i: usize, waveforms: ArrayView2<'a, f64>) -> ArrayView2<'a, f64> {
        let r = self.spike_ranges[i].clone();
        waveforms.slice_move(s![r, ..])
    }
}

/// `max(1, floor(duration / min_bin_len))`.
pub fn n_bins(duration: f64, min_bin_len: f64) -> usize {
    let n = (duration / min_bin_len).floor();
    if n.is_finite() && n >= 1.0 { n as usize } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn bin_count_follows_min_length() {
        assert_eq!(n_bins(1199.0, 120.0), 9);
        assert_eq!(n_bins(1200.0, 120.0), 10);
        assert_eq!(n_bins(30.0, 120.0), 1);
        assert_eq!(n_bins(0.0, 120.0), 1);
    }

    #[test]
    fn bounds_take_trials_into_account() {
        let (a, b) = session_bounds(&[5.0, 7.0], &[2.0, 6.0], &[3.0, 9.0]);
        assert_eq!((a, b), (2.0, 9.0));
    }

    #[test]
    fn spikes_are_binned_half_open() {
        let spikes = [0.0, 119.9, 120.0, 200.0, 240.0];
        let bins = TimeBins::from_bounds(&spikes, 0.0, 240.0, 120.0);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins.counts(), vec![2, 3]);
        assert_eq!(bins.spike_times(1, &spikes), &[120.0, 200.0, 240.0]);
        assert_eq!(bins.midpoints(), vec![60.0, 180.0]);
    }

    #[test]
    fn waveform_rows_follow_bins() {
        let spikes = [10.0, 20.0, 130.0];
        let wfs = Array2::from_shape_fn((3, 4), |(i, _)| i as f64);
        let bins = TimeBins::from_bounds(&spikes, 0.0, 240.0, 120.0);
        let w1 = bins.waveforms(1, wfs.view());
        assert_eq!(w1.nrows(), 1);
        assert_eq!(w1[[0, 0]], 2.0);
    }
}
