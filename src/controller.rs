//! Per-unit quality-control pass.
//!
//! ```text
//! waveform stats (all spikes)
//!   → time bins + per-bin rates
//!   → included window (drift scan or manual trial bounds)
//!   → Unit::update_included_trials
//!   → SNR, mean rate, ISI stats, waveform means (included spikes)
//!   → unit type, baseline rate, task relatedness
//!   → quality gate (or caller override)
//!   → Unit::store_quality
//! ```
//!
//! Every step except the two `Unit` transitions is pure, so a pass can be
//! rerun on the same unit with different bounds and gives the same result.
use ndarray::Axis;
use rayon::prelude::*;

use crate::binning::TimeBins;
use crate::classify::classify_unit;
use crate::config::QcConfig;
use crate::gate::{self, GateResult};
use crate::inclusion::{Inclusion, InclusionStrategy, TrialInclusionResolver};
use crate::isi::isi_stats;
use crate::task::{baseline_rate, test_task_relatedness};
use crate::unit::{QualityMetrics, SpikeShapes, Unit};
use crate::waveform::{snr, stats::nan_mean, waveform_stats};

/// What the caller asks of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QcRequest {
    /// How the included period is chosen.
    pub strategy: InclusionStrategy,
    /// Manual curation: `Some(true)` keeps and `Some(false)` drops the unit
    /// regardless of the quality gate.
    pub include: Option<bool>,
}

/// Intermediate series of one pass, enough to plot or audit the decision.
#[derive(Debug, Clone, PartialEq)]
pub struct QcTrace {
    /// Bin midpoints (s).
    pub tbin_vmid: Vec<f64>,
    /// Firing rate of each bin (sp/s).
    pub rate_t: Vec<f64>,
    pub t1_inc: f64,
    pub t2_inc: f64,
    /// Included-bin mask.
    pub prd_inc: Vec<bool>,
    /// Included-trial mask.
    pub tr_inc: Vec<bool>,
    /// Included-spike mask.
    pub spk_inc: Vec<bool>,
}

impl QcTrace {
    fn new(bins: &TimeBins, rates: Vec<f64>, inc: Inclusion) -> Self {
        Self {
            tbin_vmid: bins.midpoints(),
            rate_t: rates,
            t1_inc: inc.t1,
            t2_inc: inc.t2,
            prd_inc: inc.bins,
            tr_inc: inc.trials,
            spk_inc: inc.spikes,
        }
    }
}

/// Result of one pass.
#[derive(Debug, Clone)]
pub struct QcOutcome {
    pub metrics: QualityMetrics,
    pub trace: QcTrace,
    /// Gate criteria; `None` when the caller overrode the decision.
    pub gate: Option<GateResult>,
}

/// Runs the quality-control pass with one configuration.
#[derive(Debug, Clone, Default)]
pub struct QualityController {
    pub cfg: QcConfig,
}

impl QualityController {
    pub fn new(cfg: QcConfig) -> Self {
        Self { cfg }
    }

    /// Run QC on `unit`, updating its trial inclusion and stored metrics.
    ///
    /// Returns `None` without touching the unit when it has no spikes or no
    /// trials.
    pub fn run(&self, unit: &mut Unit, request: QcRequest) -> Option<QcOutcome> {
        if unit.is_empty() {
            tracing::debug!(unit = unit.name.as_str(), "empty unit, QC skipped");
            return None;
        }
        let cfg = &self.cfg;
        let spikes = unit.spikes();
        let trials = unit.trials();

        // 1. Waveform shape of every spike.
        let wf = waveform_stats(
            spikes.waveforms.view(),
            spikes.wave_time.view(),
            cfg.wf_t_start,
            cfg.wf_fit_step,
        );

        // 2. Binned firing rate.
        let bins = TimeBins::new(&spikes.times, &trials.starts, &trials.stops, cfg.min_bin_len);
        let rates = bins.rates();

        // 3. Included window.
        let resolver = TrialInclusionResolver::new(cfg.max_drift_ratio);
        let inc = resolver.resolve(request.strategy, &bins, &rates, &spikes.times, &trials.starts);

        // 5. Statistics of the included spikes.
        let idx = inc.spike_indices();
        let inc_times = inc.spike_times(&spikes.times);
        let inc_wfs = spikes.waveforms.select(Axis(0), &idx);
        let unit_snr = snr(inc_wfs.view());
        let isi = isi_stats(&inc_times, cfg.isi_threshold, cfg.censored_period);
        let mean_rate = if inc.t2 > inc.t1 {
            inc_times.len() as f64 / (inc.t2 - inc.t1)
        } else {
            f64::NAN
        };
        let mean_wf_duration = nan_mean(idx.iter().map(|&i| wf.duration[i]));
        let mean_wf_amplitude = nan_mean(idx.iter().map(|&i| wf.amplitude[i]));

        let shapes = SpikeShapes {
            min_v: wf.min_v.min(cfg.vmin),
            max_v: wf.max_v.max(cfg.vmax),
            truncated: wf.truncated,
            duration: wf.duration,
            amplitude: wf.amplitude,
            n_valid: wf.n_valid,
        };

        // 4. Trial-level state transition.
        unit.update_included_trials(&inc.trials);
        let tr_idx = unit.inc_trials();

        // 6–7. Type, baseline and task relatedness.
        let unit_type = classify_unit(unit_snr, isi.true_spikes, cfg);
        let base_rate = baseline_rate(unit, &tr_idx, cfg);
        let task_related = test_task_relatedness(unit, &tr_idx, cfg);

        let mut metrics = QualityMetrics {
            snr: unit_snr,
            mean_wf_duration,
            mean_wf_amplitude,
            mean_rate,
            isi_violation: isi.violation,
            true_spikes: isi.true_spikes,
            unit_type: Some(unit_type),
            baseline_rate: base_rate,
            task_related,
            ..unit.metrics().clone()
        };

        // 8. Exclusion.
        let gate = match request.include {
            Some(include) => {
                metrics.excluded = !include;
                None
            }
            None => {
                let g = gate::evaluate(&metrics, cfg);
                metrics.excluded = !g.passed();
                Some(g)
            }
        };

        tracing::info!(
            unit = unit.name.as_str(),
            unit_type = unit_type.as_str(),
            snr = metrics.snr,
            rate = metrics.mean_rate,
            isi_violation = metrics.isi_violation,
            n_trials = metrics.n_trials_total,
            n_included = metrics.n_trials_included,
            excluded = metrics.excluded,
            failed = ?gate.map(|g| g.failures()).unwrap_or_default(),
            "unit QC done"
        );

        unit.store_quality(metrics.clone(), shapes);
        Some(QcOutcome { metrics, trace: QcTrace::new(&bins, rates, inc), gate })
    }

    /// Run QC on many units in parallel with the automatic strategy.
    ///
    /// Each unit is handled by one worker; empty units get empty metrics.
    pub fn run_batch(&self, units: &mut [Unit]) -> Vec<QualityMetrics> {
        units
            .par_iter_mut()
            .map(|u| {
                self.run(u, QcRequest::default())
                    .map(|o| o.metrics)
                    .unwrap_or_default()
            })
            .collect()
    }
}
