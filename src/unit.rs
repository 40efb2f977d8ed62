//! Unit data container: spike record, trial record, trial periods and the
//! per-unit quality state produced by a QC pass.
//!
//! Raw arrays (`SpikeRecord`, `TrialRecord`, `TrialPeriod`) are immutable
//! once the unit is built.  The only mutable state is [`UnitState`], changed
//! through two explicit transitions: [`Unit::update_included_trials`] and
//! [`Unit::store_quality`].
use ndarray::{Array1, Array2};

use crate::error::QcError;

// ── Raw inputs ────────────────────────────────────────────────────────────────

/// Spike timestamps and the aligned waveform of every spike.
#[derive(Debug, Clone)]
pub struct SpikeRecord {
    /// Session-relative spike times (s), non-decreasing.
    pub times: Vec<f64>,
    /// `[N, S]` waveform voltages, one row per spike.
    pub waveforms: Array2<f64>,
    /// `[S]` sample-time axis shared by all waveforms.
    pub wave_time: Array1<f64>,
}

impl SpikeRecord {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Start and stop time of every trial.
#[derive(Debug, Clone, Default)]
pub struct TrialRecord {
    pub starts: Vec<f64>,
    pub stops: Vec<f64>,
}

impl TrialRecord {
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// A named within-trial period (e.g. `"baseline"`, `"S1"`), given as absolute
/// start and stop times for every trial of the unit.
#[derive(Debug, Clone)]
pub struct TrialPeriod {
    pub name: String,
    pub starts: Vec<f64>,
    pub stops: Vec<f64>,
}

// ── QC outputs ────────────────────────────────────────────────────────────────

/// Categorical unit label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitType {
    SingleUnit,
    MultiUnit,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::SingleUnit => "single unit",
            UnitType::MultiUnit => "multi unit",
        }
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary quality metrics of one unit.
///
/// Produced whole by one QC pass.  Undefined statistics are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityMetrics {
    /// Waveform signal-to-noise ratio of included spikes.
    pub snr: f64,
    /// Mean waveform duration of included spikes (waveform time units).
    pub mean_wf_duration: f64,
    /// Mean waveform amplitude of included spikes.
    pub mean_wf_amplitude: f64,
    /// Mean firing rate over the included window (sp/s).
    pub mean_rate: f64,
    /// ISI violation ratio (%).
    pub isi_violation: f64,
    /// Estimated percentage of spikes from a single neuron.
    pub true_spikes: f64,
    /// `None` until classified.
    pub unit_type: Option<UnitType>,
    /// Mean baseline-period rate over included trials (sp/s).
    pub baseline_rate: f64,
    pub task_related: bool,
    pub n_trials_total: usize,
    pub n_trials_included: usize,
    pub n_trials_excluded: usize,
    /// Final exclusion decision.
    pub excluded: bool,
}

impl QualityMetrics {
    /// Unset metrics.  An unevaluated unit counts as excluded.
    pub fn empty() -> Self {
        Self {
            snr: f64::NAN,
            mean_wf_duration: f64::NAN,
            mean_wf_amplitude: f64::NAN,
            mean_rate: f64::NAN,
            isi_violation: f64::NAN,
            true_spikes: f64::NAN,
            unit_type: None,
            baseline_rate: f64::NAN,
            task_related: false,
            n_trials_total: 0,
            n_trials_included: 0,
            n_trials_excluded: 0,
            excluded: true,
        }
    }

    /// Percentage of trials included, `NaN` without trials.
    pub fn inc_trials_ratio(&self) -> f64 {
        if self.n_trials_total == 0 {
            return f64::NAN;
        }
        100.0 * self.n_trials_included as f64 / self.n_trials_total as f64
    }
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self::empty()
    }
}

/// Per-spike waveform shape descriptors and unit-level voltage range.
#[derive(Debug, Clone, Default)]
pub struct SpikeShapes {
    pub duration: Vec<f64>,
    pub amplitude: Vec<f64>,
    pub n_valid: Vec<usize>,
    /// More than one sample hit the recorded minimum or maximum voltage.
    pub truncated: bool,
    /// `min(observed minimum, recording vmin)`.
    pub min_v: f64,
    /// `max(observed maximum, recording vmax)`.
    pub max_v: f64,
}

/// Mutable quality state carried by a unit.
#[derive(Debug, Clone)]
pub struct UnitState {
    pub trial_included: Vec<bool>,
    pub spike_included: Vec<bool>,
    pub metrics: QualityMetrics,
    pub shapes: Option<SpikeShapes>,
    pub excluded: bool,
}

// ── Unit ──────────────────────────────────────────────────────────────────────

/// One sorted unit of one recording session.
#[derive(Debug, Clone)]
pub struct Unit {
    pub name: String,
    spikes: SpikeRecord,
    trials: TrialRecord,
    periods: Vec<TrialPeriod>,
    state: UnitState,
}

impl Unit {
    /// Build a unit, validating array lengths and ordering.
    ///
    /// All trials and spikes start out included.  The unit counts as
    /// excluded until a QC pass has accepted it.
    pub fn new(
        name: impl Into<String>,
        spike_times: Vec<f64>,
        waveforms: Array2<f64>,
        wave_time: Array1<f64>,
        trial_starts: Vec<f64>,
        trial_stops: Vec<f64>,
    ) -> Result<Self, QcError> {
        if spike_times.len() != waveforms.nrows() {
            return Err(QcError::SpikeCountMismatch {
                n_times: spike_times.len(),
                n_waveforms: waveforms.nrows(),
            });
        }
        if wave_time.len() != waveforms.ncols() {
            return Err(QcError::WaveTimeMismatch {
                n_axis: wave_time.len(),
                n_cols: waveforms.ncols(),
            });
        }
        if trial_starts.len() != trial_stops.len() {
            return Err(QcError::TrialCountMismatch {
                n_starts: trial_starts.len(),
                n_stops: trial_stops.len(),
            });
        }
        if let Some(index) = spike_times.windows(2).position(|w| w[1] < w[0]) {
            return Err(QcError::UnsortedSpikes { index: index + 1 });
        }
        for (index, (&start, &stop)) in trial_starts.iter().zip(&trial_stops).enumerate() {
            if start > stop {
                return Err(QcError::InvertedTrial { index, start, stop });
            }
        }

        let n_spk = spike_times.len();
        let n_tr = trial_starts.len();
        Ok(Self {
            name: name.into(),
            spikes: SpikeRecord { times: spike_times, waveforms, wave_time },
            trials: TrialRecord { starts: trial_starts, stops: trial_stops },
            periods: Vec::new(),
            state: UnitState {
                trial_included: vec![true; n_tr],
                spike_included: vec![true; n_spk],
                metrics: QualityMetrics::empty(),
                shapes: None,
                excluded: true,
            },
        })
    }

    /// Attach a trial period (one start/stop pair per trial).
    pub fn with_period(mut self, period: TrialPeriod) -> Result<Self, QcError> {
        if period.starts.len() != self.trials.len() || period.stops.len() != self.trials.len() {
            return Err(QcError::PeriodTrialMismatch {
                name: period.name,
                n_period: period.starts.len().min(period.stops.len()),
                n_trials: self.trials.len(),
            });
        }
        self.periods.retain(|p| p.name != period.name);
        self.periods.push(period);
        Ok(self)
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    pub fn spikes(&self) -> &SpikeRecord {
        &self.spikes
    }

    pub fn trials(&self) -> &TrialRecord {
        &self.trials
    }

    pub fn periods(&self) -> &[TrialPeriod] {
        &self.periods
    }

    pub fn period(&self, name: &str) -> Option<&TrialPeriod> {
        self.periods.iter().find(|p| p.name == name)
    }

    pub fn state(&self) -> &UnitState {
        &self.state
    }

    pub fn metrics(&self) -> &QualityMetrics {
        &self.state.metrics
    }

    /// A unit without spikes or without trials carries no usable data.
    pub fn is_empty(&self) -> bool {
        self.spikes.is_empty() || self.trials.is_empty()
    }

    pub fn is_excluded(&self) -> bool {
        self.state.excluded
    }

    pub fn set_excluded(&mut self, excluded: bool) {
        self.state.excluded = excluded;
        self.state.metrics.excluded = excluded;
    }

    /// Indices of included trials.
    pub fn inc_trials(&self) -> Vec<usize> {
        self.state
            .trial_included
            .iter()
            .enumerate()
            .filter_map(|(i, &inc)| inc.then_some(i))
            .collect()
    }

    // ── State transitions ──────────────────────────────────────────────────

    /// Replace the trial-inclusion mask and everything derived from it.
    ///
    /// Spikes are included between the first included trial's start and the
    /// last included trial's stop, or over the whole recording when every
    /// trial is included.
    pub fn update_included_trials(&mut self, tr_inc: &[bool]) {
        debug_assert_eq!(tr_inc.len(), self.trials.len());
        let n_inc = tr_inc.iter().filter(|&&inc| inc).count();

        self.state.trial_included = tr_inc.to_vec();
        self.state.metrics.n_trials_total = tr_inc.len();
        self.state.metrics.n_trials_included = n_inc;
        self.state.metrics.n_trials_excluded = tr_inc.len() - n_inc;

        let times = &self.spikes.times;
        self.state.spike_included = if n_inc == tr_inc.len() {
            vec![true; times.len()]
        } else if n_inc == 0 {
            vec![false; times.len()]
        } else {
            let inc: Vec<usize> = tr_inc
                .iter()
                .enumerate()
                .filter_map(|(i, &b)| b.then_some(i))
                .collect();
            let t1 = inc.iter().map(|&i| self.trials.starts[i]).fold(f64::INFINITY, f64::min);
            let t2 = inc.iter().map(|&i| self.trials.stops[i]).fold(f64::NEG_INFINITY, f64::max);
            times.iter().map(|&t| t >= t1 && t <= t2).collect()
        };
    }

    /// Store the outcome of a QC pass, replacing the previous metrics.
    ///
    /// Trial counts already set by [`Unit::update_included_trials`] are kept.
    pub fn store_quality(&mut self, mut metrics: QualityMetrics, shapes: SpikeShapes) {
        metrics.n_trials_total = self.state.metrics.n_trials_total;
        metrics.n_trials_included = self.state.metrics.n_trials_included;
        metrics.n_trials_excluded = self.state.metrics.n_trials_excluded;
        self.state.excluded = metrics.excluded;
        self.state.metrics = metrics;
        self.state.shapes = Some(shapes);
    }
}
