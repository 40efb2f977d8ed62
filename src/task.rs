//! Baseline rate and task relatedness.
//!
//! A unit is task related when, during any tested trial period, its
//! time-resolved rate differs from its baseline rate for long enough: at
//! every rate sample the per-trial rates are compared with the per-trial
//! baseline rates by a paired test, and a run of consecutive samples with
//! `p < significance` lasting at least `min_task_related_dur` counts.
use std::ops::Range;

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use crate::config::{QcConfig, SignificanceTest};
use crate::rate::PeriodRates;

/// Mean baseline-period rate over `trials`; `NaN` without trials or
/// without a baseline period.
pub fn baseline_rate<R: PeriodRates + ?Sized>(unit: &R, trials: &[usize], cfg: &QcConfig) -> f64 {
    match unit.period_mean_rates(&cfg.baseline_period, trials) {
        Some(rates) if !rates.is_empty() => rates.iter().sum::<f64>() / rates.len() as f64,
        _ => f64::NAN,
    }
}

/// Whether the unit responds to any of `cfg.task_periods` during `trials`.
///
/// Periods the unit does not define are skipped.  No trials, or no baseline
/// period, means not task related.
pub fn test_task_relatedness<R: PeriodRates + ?Sized>(unit: &R, trials: &[usize], cfg: &QcConfig) -> bool {
    if trials.is_empty() {
        return false;
    }
    let Some(baseline) = unit.period_mean_rates(&cfg.baseline_period, trials) else {
        return false;
    };
    let min_len = cfg.min_task_related_samples();

    for period in &cfg.task_periods {
        let Some(m) = unit.period_rate_matrix(period, trials, cfg.rate_kernel, cfg.kernel_step) else {
            continue;
        };
        let pvals: Vec<f64> = m
            .rates
            .columns()
            .into_iter()
            .map(|col| {
                let x = col.to_vec();
                paired_test(&x, &baseline, cfg.significance_test)
            })
            .collect();

        let runs = significant_runs(&pvals, cfg.significance, min_len);
        if let Some(first) = runs.first() {
            tracing::debug!(
                period = period.as_str(),
                t_start = m.times[first.start],
                n_samples = first.len(),
                "task-related activity"
            );
            return true;
        }
    }
    false
}

/// p-value of the chosen paired test.
pub fn paired_test(x: &[f64], y: &[f64], test: SignificanceTest) -> f64 {
    match test {
        SignificanceTest::Wilcoxon => wilcoxon(x, y),
        SignificanceTest::PairedT => paired_t(x, y),
    }
}

/// Maximal runs of `p < alpha` at least `min_len` samples long.
pub fn significant_runs(pvals: &[f64], alpha: f64, min_len: usize) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    for (i, &p) in pvals.iter().chain(std::iter::once(&f64::NAN)).enumerate() {
        match (p < alpha, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= min_len {
                    runs.push(s..i);
                }
                start = None;
            }
            _ => {}
        }
    }
    runs
}

/// Two-sided Wilcoxon signed-rank test of paired samples.
///
/// Zero differences are dropped; ties get average ranks; the statistic
/// `T = min(W+, W−)` is compared with its normal approximation using the
/// tie-corrected variance.  `NaN` when no non-zero difference remains.
pub fn wilcoxon(x: &[f64], y: &[f64]) -> f64 {
    let d: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(a, b)| a - b)
        .filter(|d| *d != 0.0 && !d.is_nan())
        .collect();
    let n = d.len();
    if n == 0 {
        return f64::NAN;
    }

    let abs: Vec<f64> = d.iter().map(|v| v.abs()).collect();
    let (ranks, tie_sizes) = average_ranks(&abs);
    let w_plus: f64 = d.iter().zip(&ranks).filter(|(v, _)| **v > 0.0).map(|(_, r)| r).sum();
    let w_minus: f64 = d.iter().zip(&ranks).filter(|(v, _)| **v < 0.0).map(|(_, r)| r).sum();
    let t = w_plus.min(w_minus);

    let nf = n as f64;
    let mean = nf * (nf + 1.0) / 4.0;
    let tie_corr: f64 = tie_sizes.iter().map(|&t| (t * t * t - t) as f64).sum::<f64>() / 48.0;
    let var = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_corr;
    if !(var > 0.0) {
        return f64::NAN;
    }
    let z = (t - mean) / var.sqrt();
    Normal::new(0.0, 1.0)
        .map(|norm| (2.0 * norm.cdf(z)).min(1.0))
        .unwrap_or(f64::NAN)
}

/// Two-sided paired Student t-test.
pub fn paired_t(x: &[f64], y: &[f64]) -> f64 {
    let d: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).filter(|d| !d.is_nan()).collect();
    let n = d.len();
    if n < 2 {
        return f64::NAN;
    }
    let nf = n as f64;
    let mean = d.iter().sum::<f64>() / nf;
    let var = d.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (nf - 1.0);
    if var == 0.0 {
        return if mean == 0.0 { f64::NAN } else { 0.0 };
    }
    let t = mean / (var / nf).sqrt();
    StudentsT::new(0.0, 1.0, nf - 1.0)
        .map(|dist| 2.0 * (1.0 - dist.cdf(t.abs())))
        .unwrap_or(f64::NAN)
}

/// 1-based average ranks of `v`, plus the size of every tie group.
fn average_ranks(v: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..v.len()).collect();
    order.sort_by(|&a, &b| v[a].total_cmp(&v[b]));

    let mut ranks = vec![0.0; v.len()];
    let mut ties = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && v[order[j]] == v[order[i]] {
            j += 1;
        }
        let avg = (i + j + 1) as f64 / 2.0;
        for &k in &order[i..j] {
            ranks[k] = avg;
        }
        ties.push(j - i);
        i = j;
    }
    (ranks, ties)
}
