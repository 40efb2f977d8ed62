//! Spike waveform shape and quality.
//!
//! - [`spline`]: interpolating cubic spline used to declip and resample
//!   waveforms.
//! - [`stats`]: per-spike duration, amplitude and truncation detection.
//! - [`snr`]: waveform signal-to-noise ratio.

pub mod snr;
pub mod spline;
pub mod stats;

pub use snr::snr;
pub use spline::CubicSpline;
pub use stats::{waveform_stats, WaveformStats};
