//! Included trials and spikes of a unit.
//!
//! Both ways of choosing the included period end in the same place: a time
//! window `[t1, t2)` and a trial range `[first, last)`, turned into masks by
//! [`Inclusion::from_window`].
//!
//! - [`InclusionStrategy::Automatic`]: the [`DriftDetector`]'s longest
//!   stable period.
//! - [`InclusionStrategy::Manual`]: trial bounds set by a curator.  The
//!   window runs from the first included trial's start (session start when
//!   `first == 0`) to the start of the first trial after the range (session
//!   stop when `last == n_trials`).
//! - [`InclusionStrategy::FullSession`]: no rejection, equivalent to
//!   `Manual { first: 0, last: n_trials }`.
//!
//! A spike exactly at the session stop counts as inside a window that ends
//! at the session stop.
use crate::binning::TimeBins;
use crate::drift::DriftDetector;

/// How the included period is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InclusionStrategy {
    #[default]
    Automatic,
    Manual { first_trial: usize, last_trial: usize },
    FullSession,
}

impl InclusionStrategy {
    /// `Manual` when both bounds are given, `Automatic` otherwise.
    pub fn from_bounds(first_trial: Option<usize>, last_trial: Option<usize>) -> Self {
        match (first_trial, last_trial) {
            (Some(first_trial), Some(last_trial)) => Self::Manual { first_trial, last_trial },
            _ => Self::Automatic,
        }
    }
}

/// Included time window, trial range and the masks derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct Inclusion {
    pub t1: f64,
    pub t2: f64,
    /// First included trial.
    pub first_trial: usize,
    /// One past the last included trial.
    pub last_trial: usize,
    pub bins: Vec<bool>,
    pub trials: Vec<bool>,
    pub spikes: Vec<bool>,
}

impl Inclusion {
    /// Masks for window `[t1, t2)` and trial range `[first, last)`.
    ///
    /// `bins` is the included-bin mask, computed by the caller.  A window
    /// with `t1 == t2` holds no spikes, even at the session stop.
    #[allow(clippy::too_many_arguments)]
    pub fn from_window(
        t1: f64,
        t2: f64,
        first_trial: usize,
        last_trial: usize,
        session_stop: f64,
        n_trials: usize,
        spike_times: &[f64],
        bins: Vec<bool>,
    ) -> Self {
        debug_assert!(first_trial <= last_trial && last_trial <= n_trials);
        let closes_session = t2 > t1 && t2 >= session_stop;
        let trials = (0..n_trials).map(|i| i >= first_trial && i < last_trial).collect();
        let spikes = spike_times
            .iter()
            .map(|&t| t >= t1 && (t < t2 || (closes_session && t == t2)))
            .collect();
        Self { t1, t2, first_trial, last_trial, bins, trials, spikes }
    }

    pub fn n_trials(&self) -> usize {
        self.last_trial - self.first_trial
    }

    pub fn n_spikes(&self) -> usize {
        self.spikes.iter().filter(|&&b| b).count()
    }

    /// Spike times inside the window.
    pub fn spike_times(&self, spike_times: &[f64]) -> Vec<f64> {
        spike_times
            .iter()
            .zip(&self.spikes)
            .filter_map(|(&t, &inc)| inc.then_some(t))
            .collect()
    }

    /// Indices of included spikes.
    pub fn spike_indices(&self) -> Vec<usize> {
        self.spikes.iter().enumerate().filter_map(|(i, &b)| b.then_some(i)).collect()
    }
}

/// Turns an [`InclusionStrategy`] into an [`Inclusion`] for one session.
#[derive(Debug, Clone, Copy)]
pub struct TrialInclusionResolver {
    pub detector: DriftDetector,
}

impl TrialInclusionResolver {
    pub fn new(max_drift_ratio: f64) -> Self {
        Self { detector: DriftDetector::new(max_drift_ratio) }
    }

    /// Resolve `strategy` over binned session data.
    ///
    /// `rates` are the per-bin firing rates of `bins`.
    pub fn resolve(
        &self,
        strategy: InclusionStrategy,
        bins: &TimeBins,
        rates: &[f64],
        spike_times: &[f64],
        tr_starts: &[f64],
    ) -> Inclusion {
        let n_trials = tr_starts.len();
        match strategy {
            InclusionStrategy::Automatic => match self.detector.detect(bins, rates, tr_starts) {
                Some(p) => {
                    let bin_mask = (0..bins.len())
                        .map(|i| i >= p.bin_start && i <= p.bin_end)
                        .collect();
                    Inclusion::from_window(
                        p.t_start,
                        p.t_end,
                        p.trial_start,
                        p.trial_end,
                        session_stop(bins),
                        n_trials,
                        spike_times,
                        bin_mask,
                    )
                }
                None => self.manual(0, n_trials, bins, spike_times, tr_starts),
            },
            InclusionStrategy::Manual { first_trial, last_trial } => {
                self.manual(first_trial, last_trial, bins, spike_times, tr_starts)
            }
            InclusionStrategy::FullSession => self.manual(0, n_trials, bins, spike_times, tr_starts),
        }
    }

    /// Window spanned by trials `[first, last)`.
    fn manual(
        &self,
        first: usize,
        last: usize,
        bins: &TimeBins,
        spike_times: &[f64],
        tr_starts: &[f64],
    ) -> Inclusion {
        let n_trials = tr_starts.len();
        let last_c = last.min(n_trials);
        let first_c = first.min(last_c);
        if (first_c, last_c) != (first, last) {
            tracing::warn!(first, last, n_trials, "manual trial bounds out of range, clamped");
        }

        let t_start = bins.edges.first().copied().unwrap_or(f64::NAN);
        let t_stop = session_stop(bins);
        let t2 = if last_c == n_trials { t_stop } else { tr_starts[last_c] };
        // No trials selected: collapse the window onto its end.
        let t1 = match first_c {
            f if f == last_c => t2,
            0 => t_start,
            f => tr_starts[f],
        };

        let bin_mask = bins
            .midpoints()
            .iter()
            .map(|&m| t2 > t1 && m >= t1 && m <= t2)
            .collect();
        Inclusion::from_window(t1, t2, first_c, last_c, t_stop, n_trials, spike_times, bin_mask)
    }
}

fn session_stop(bins: &TimeBins) -> f64 {
    bins.edges.last().copied().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let spikes: Vec<f64> = (0..=400).map(|i| i as f64).collect();
        let starts: Vec<f64> = (0..40).map(|i| i as f64 * 10.0).collect();
        let stops: Vec<f64> = starts.iter().map(|s| s + 8.0).collect();
        (spikes, starts, stops)
    }

    #[test]
    fn manual_bounds_follow_trial_starts() {
        let (spikes, starts, stops) = session();
        let bins = TimeBins::new(&spikes, &starts, &stops, 100.0);
        let r = TrialInclusionResolver::new(2.0);
        let inc = r.resolve(
            InclusionStrategy::Manual { first_trial: 5, last_trial: 15 },
            &bins,
            &bins.rates(),
            &spikes,
            &starts,
        );
        assert_eq!((inc.t1, inc.t2), (50.0, 150.0));
        assert_eq!(inc.n_trials(), 10);
        assert!(inc.trials[5] && inc.trials[14] && !inc.trials[15]);
        // Spikes 50..149 inclusive.
        assert_eq!(inc.n_spikes(), 100);
        assert!(!inc.spikes[150]);
    }

    #[test]
    fn full_session_includes_everything() {
        let (spikes, starts, stops) = session();
        let bins = TimeBins::new(&spikes, &starts, &stops, 100.0);
        let r = TrialInclusionResolver::new(2.0);
        let inc = r.resolve(InclusionStrategy::FullSession, &bins, &bins.rates(), &spikes, &starts);
        assert!(inc.trials.iter().all(|&b| b));
        assert!(inc.spikes.iter().all(|&b| b), "spike at session stop must be included");
        assert!(inc.bins.iter().all(|&b| b));
    }

    #[test]
    fn out_of_range_bounds_are_clamped() {
        let (spikes, starts, stops) = session();
        let bins = TimeBins::new(&spikes, &starts, &stops, 100.0);
        let r = TrialInclusionResolver::new(2.0);
        let inc = r.resolve(
            InclusionStrategy::Manual { first_trial: 30, last_trial: 99 },
            &bins,
            &bins.rates(),
            &spikes,
            &starts,
        );
        assert_eq!((inc.first_trial, inc.last_trial), (30, 40));
        assert_eq!(inc.t2, 400.0);
    }

    #[test]
    fn zero_trial_range_at_session_end_is_empty() {
        let (spikes, starts, stops) = session();
        let bins = TimeBins::new(&spikes, &starts, &stops, 100.0);
        let r = TrialInclusionResolver::new(2.0);
        let inc = r.resolve(
            InclusionStrategy::Manual { first_trial: 40, last_trial: 40 },
            &bins,
            &bins.rates(),
            &spikes,
            &starts,
        );
        assert_eq!((inc.first_trial, inc.last_trial), (40, 40));
        assert_eq!((inc.t1, inc.t2), (400.0, 400.0));
        assert_eq!(inc.n_trials(), 0);
        // The spike at exactly 400 s is not let in through the session stop.
        assert_eq!(inc.n_spikes(), 0);
        assert!(inc.bins.iter().all(|&b| !b));
    }

    #[test]
    fn bounds_past_the_end_include_nothing() {
        let (spikes, starts, stops) = session();
        let bins = TimeBins::new(&spikes, &starts, &stops, 100.0);
        let r = TrialInclusionResolver::new(2.0);
        let inc = r.resolve(
            InclusionStrategy::Manual { first_trial: 50, last_trial: 90 },
            &bins,
            &bins.rates(),
            &spikes,
            &starts,
        );
        assert_eq!((inc.first_trial, inc.last_trial), (40, 40));
        assert!(inc.trials.iter().all(|&b| !b));
        assert_eq!(inc.n_spikes(), 0);
    }

    #[test]
    fn empty_range_inside_the_session() {
        let (spikes, starts, stops) = session();
        let bins = TimeBins::new(&spikes, &starts, &stops, 100.0);
        let r = TrialInclusionResolver::new(2.0);
        let inc = r.resolve(
            InclusionStrategy::Manual { first_trial: 12, last_trial: 12 },
            &bins,
            &bins.rates(),
            &spikes,
            &starts,
        );
        assert_eq!((inc.t1, inc.t2), (120.0, 120.0));
        assert_eq!(inc.n_spikes(), 0);
    }

    #[test]
    fn strategy_from_optional_bounds() {
        assert_eq!(InclusionStrategy::from_bounds(Some(1), None), InclusionStrategy::Automatic);
        assert_eq!(
            InclusionStrategy::from_bounds(Some(1), Some(4)),
            InclusionStrategy::Manual { first_trial: 1, last_trial: 4 }
        );
    }
}
