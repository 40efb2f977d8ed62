//! Errors raised when building units from raw arrays.
//!
//! The statistics themselves never fail: undefined values are `NaN`.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QcError {
    #[error("{n_times} spike times but {n_waveforms} waveform rows")]
    SpikeCountMismatch { n_times: usize, n_waveforms: usize },

    #[error("waveform time axis has {n_axis} samples but waveforms have {n_cols}")]
    WaveTimeMismatch { n_axis: usize, n_cols: usize },

    #[error("{n_starts} trial starts but {n_stops} trial stops")]
    TrialCountMismatch { n_starts: usize, n_stops: usize },

    #[error("period '{name}' covers {n_period} trials, unit has {n_trials}")]
    PeriodTrialMismatch { name: String, n_period: usize, n_trials: usize },

    #[error("trial {index} stops before it starts ({start} > {stop})")]
    InvertedTrial { index: usize, start: f64, stop: f64 },

    #[error("spike times are not sorted (index {index})")]
    UnsortedSpikes { index: usize },
}
