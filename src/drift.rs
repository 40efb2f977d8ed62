//! Longest stable firing-rate period of a session.
//!
//! Starting from every bin `i`, the period is extended bin by bin while a
//! running `(min, max)` rate envelope stays bounded:
//!
//! ```text
//! stop before bin j  if  max > ratio·rate[j]  or  rate[j] > ratio·min
//! ```
//!
//! which catches slow drift (the envelope widens gradually) as well as
//! sudden jumps or drops.  Each candidate period is scored by the number of
//! trials it covers, counted from trial start times, and the best one wins.
//! Ties go to the earliest start bin.
//!
//! The scan is `O(n²)` in the bin count, which is small (session length /
//! 120 s).  It is pure and can be rerun freely.
use crate::binning::TimeBins;

/// One candidate stable period, starting at `bin_start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StablePeriod {
    pub bin_start: usize,
    /// Last bin of the period (inclusive).
    pub bin_end: usize,
    pub t_start: f64,
    pub t_end: f64,
    /// Trials starting before `t_start`.
    pub trial_start: usize,
    /// Trials starting before `t_end`; the period covers
    /// `trial_start..trial_end`.
    pub trial_end: usize,
}

impl StablePeriod {
    pub fn n_bins(&self) -> usize {
        self.bin_end - self.bin_start + 1
    }

    pub fn n_trials(&self) -> usize {
        self.trial_end - self.trial_start
    }

    pub fn duration(&self) -> f64 {
        self.t_end - self.t_start
    }
}

/// Greedy stable-window search over binned firing rates.
#[derive(Debug, Clone, Copy)]
pub struct DriftDetector {
    /// Largest tolerated max/min rate ratio within a period.
    pub max_drift_ratio: f64,
}

impl DriftDetector {
    /// Ratios below 1 would reject every bin and are raised to 1.
    pub fn new(max_drift_ratio: f64) -> Self {
        if max_drift_ratio < 1.0 {
            tracing::warn!(max_drift_ratio, "drift ratio below 1, using 1");
        }
        Self { max_drift_ratio: max_drift_ratio.max(1.0) }
    }

    /// Last bin of the stable run starting at every bin.
    ///
    /// A run always keeps its start bin.
    pub fn run_ends(&self, rates: &[f64]) -> Vec<usize> {
        let ratio = self.max_drift_ratio;
        (0..rates.len())
            .map(|i| {
                let (mut vmin, mut vmax) = (rates[i], rates[i]);
                let mut end = rates.len() - 1;
                for (j, &v) in rates.iter().enumerate().skip(i) {
                    vmin = vmin.min(v);
                    vmax = vmax.max(v);
                    if vmax > ratio * v || v > ratio * vmin {
                        end = j.saturating_sub(1).max(i);
                        break;
                    }
                }
                end
            })
            .collect()
    }

    /// Every candidate period, one per start bin.
    pub fn periods(&self, bins: &TimeBins, rates: &[f64], tr_starts: &[f64]) -> Vec<StablePeriod> {
        assert_eq!(bins.len(), rates.len(), "one rate per bin required");
        let n_before = |t: f64| tr_starts.iter().filter(|&&s| s < t).count();
        let n_tr_bin_start: Vec<usize> = (0..bins.len()).map(|i| n_before(bins.bin(i).0)).collect();
        let n_tr_bin_end: Vec<usize> = (0..bins.len()).map(|i| n_before(bins.bin(i).1)).collect();

        self.run_ends(rates)
            .into_iter()
            .enumerate()
            .map(|(i, end)| StablePeriod {
                bin_start: i,
                bin_end: end,
                t_start: bins.bin(i).0,
                t_end: bins.bin(end).1,
                trial_start: n_tr_bin_start[i],
                trial_end: n_tr_bin_end[end].max(n_tr_bin_start[i]),
            })
            .collect()
    }

    /// The candidate period covering most trials (first one on ties).
    ///
    /// `None` only when there are no bins.
    pub fn detect(&self, bins: &TimeBins, rates: &[f64], tr_starts: &[f64]) -> Option<StablePeriod> {
        let periods = self.periods(bins, rates, tr_starts);
        let best = periods
            .iter()
            .enumerate()
            .fold(None::<(usize, usize)>, |best, (i, p)| match best {
                Some((_, n)) if n >= p.n_trials() => best,
                _ => Some((i, p.n_trials())),
            })?;
        let window = periods[best.0];
        tracing::debug!(
            bin_start = window.bin_start,
            bin_end = window.bin_end,
            trial_start = window.trial_start,
            trial_end = window.trial_end,
            "stable period selected"
        );
        Some(window)
    }
}
