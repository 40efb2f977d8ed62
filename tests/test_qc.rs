mod common;
use common::{constant_rate_unit, drifting_unit, task_unit};
use ndarray::{Array1, Array2};
use spikeqc::{
    is_unit_rejected, run_quality_control, run_quality_control_batch, test_task_relatedness,
    InclusionStrategy, QcConfig, QcRequest, QualityController, QualityMetrics, Unit, UnitType,
};

/// Field-by-field equality that treats `NaN` as equal to itself.
fn assert_same_metrics(a: &QualityMetrics, b: &QualityMetrics) {
    assert_eq!(format!("{a:?}"), format!("{b:?}"));
}

#[test]
fn stable_unit_is_kept() {
    let mut unit = constant_rate_unit();
    let cfg = QcConfig::default();
    let qm = run_quality_control(&mut unit, None, None, None, &cfg);

    assert_eq!(qm.n_trials_total, 100);
    assert_eq!(qm.n_trials_included, 100);
    assert_eq!(qm.n_trials_excluded, 0);
    approx::assert_abs_diff_eq!(qm.mean_rate, 6001.0 / 1200.0, epsilon = 1e-9);
    assert_eq!(qm.isi_violation, 0.0);
    assert_eq!(qm.true_spikes, 100.0);
    assert!(qm.snr > 2.0, "snr = {}", qm.snr);
    assert_eq!(qm.unit_type, Some(UnitType::SingleUnit));
    assert!(qm.mean_wf_duration > 0.0);
    assert!(qm.mean_wf_amplitude > 0.0);
    assert!(!qm.excluded);
    assert!(!is_unit_rejected(&unit));
    assert_same_metrics(unit.metrics(), &qm);
}

#[test]
fn drifting_unit_keeps_stable_tail() {
    let mut unit = drifting_unit();
    let qm = run_quality_control(&mut unit, None, None, None, &QcConfig::default());

    assert_eq!(qm.n_trials_included, 70);
    assert_eq!(unit.inc_trials(), (30..100).collect::<Vec<_>>());
    approx::assert_abs_diff_eq!(qm.mean_rate, 6721.0 / 840.0, epsilon = 1e-9);
    assert!(!qm.excluded);

    // Trial-level write-back: spikes between trial 30's start and trial 99's stop.
    let spk = &unit.state().spike_included;
    let times = &unit.spikes().times;
    for (t, inc) in times.iter().zip(spk) {
        assert_eq!(*inc, *t >= 360.0 && *t <= 1198.0, "t = {t}");
    }
}

#[test]
fn manual_bounds_can_fail_the_ratio_criterion() {
    let mut unit = constant_rate_unit();
    let ctrl = QualityController::default();
    let req = QcRequest {
        strategy: InclusionStrategy::Manual { first_trial: 10, last_trial: 20 },
        include: None,
    };
    let out = ctrl.run(&mut unit, req).unwrap();
    assert_eq!(out.metrics.n_trials_included, 10);
    assert_eq!((out.trace.t1_inc, out.trace.t2_inc), (120.0, 240.0));
    assert_eq!(out.gate.unwrap().failures(), vec!["IncTrsRatio"]);
    assert!(out.metrics.excluded);
    assert!(is_unit_rejected(&unit));
}

#[test]
fn curator_override_wins() {
    let mut unit = constant_rate_unit();
    let qm = run_quality_control(&mut unit, Some(true), Some(10), Some(20), &QcConfig::default());
    assert!(!qm.excluded);
    assert!(!is_unit_rejected(&unit));

    let qm = run_quality_control(&mut unit, Some(false), None, None, &QcConfig::default());
    assert!(qm.excluded);
    assert!(is_unit_rejected(&unit));
}

#[test]
fn rerun_replaces_previous_pass() {
    let mut unit = constant_rate_unit();
    let cfg = QcConfig::default();
    run_quality_control(&mut unit, None, Some(10), Some(20), &cfg);
    let again = run_quality_control(&mut unit, None, None, None, &cfg);
    let mut fresh = constant_rate_unit();
    let first = run_quality_control(&mut fresh, None, None, None, &cfg);
    assert_same_metrics(&again, &first);
    assert_eq!(unit.state().trial_included, fresh.state().trial_included);
}

#[test]
fn empty_unit_short_circuits() {
    let mut unit = Unit::new(
        "empty",
        vec![],
        Array2::zeros((0, 8)),
        Array1::zeros(8),
        vec![0.0, 10.0],
        vec![5.0, 15.0],
    )
    .unwrap();
    let qm = run_quality_control(&mut unit, None, None, None, &QcConfig::default());
    assert!(qm.excluded);
    assert!(qm.snr.is_nan() && qm.mean_rate.is_nan());
    assert_eq!(qm.unit_type, None);
    assert!(is_unit_rejected(&unit));
    assert!(unit.state().trial_included.iter().all(|&b| b));
}

#[test]
fn manual_bounds_past_last_trial_select_nothing() {
    let cfg = QcConfig::default();
    for (first, last) in [(100, 100), (500, 900)] {
        let mut unit = constant_rate_unit();
        let qm = run_quality_control(&mut unit, None, Some(first), Some(last), &cfg);
        assert_eq!(qm.n_trials_total, 100);
        assert_eq!(qm.n_trials_included, 0, "bounds {first}..{last}");
        assert!(qm.mean_rate.is_nan() && qm.snr.is_nan());
        assert!(qm.excluded);
        assert!(unit.state().spike_included.iter().all(|&b| !b));
        assert!(is_unit_rejected(&unit));
    }
}

#[test]
fn stricter_config_excludes() {
    let mut unit = constant_rate_unit();
    let cfg = QcConfig { min_rate: 10.0, ..QcConfig::default() };
    let qm = run_quality_control(&mut unit, None, None, None, &cfg);
    assert!(qm.excluded);
}

#[test]
fn responsive_unit_is_task_related() {
    let cfg = QcConfig::default();
    let unit = task_unit(true);
    let trials: Vec<usize> = (0..60).collect();
    assert!(test_task_relatedness(&unit, &trials, &cfg));
    assert!(!test_task_relatedness(&unit, &[], &cfg));

    let cfg_t = QcConfig { significance_test: spikeqc::SignificanceTest::PairedT, ..cfg.clone() };
    assert!(test_task_relatedness(&unit, &trials, &cfg_t));
}

#[test]
fn silent_unit_is_not_task_related() {
    let cfg = QcConfig::default();
    let trials: Vec<usize> = (0..60).collect();
    assert!(!test_task_relatedness(&task_unit(false), &trials, &cfg));

    // Periods not listed in the configuration are not tested.
    let cfg = QcConfig { task_periods: vec!["S2".into()], ..cfg };
    assert!(!test_task_relatedness(&task_unit(true), &trials, &cfg));
}

#[test]
fn controller_reports_task_relatedness() {
    let mut unit = task_unit(true);
    let qm = run_quality_control(&mut unit, None, None, None, &QcConfig::default());
    assert!(qm.task_related);
    assert_eq!(qm.baseline_rate, 0.0);
}

#[test]
fn batch_runs_every_unit() {
    let mut units = vec![constant_rate_unit(), drifting_unit()];
    let all = run_quality_control_batch(&mut units, &QcConfig::default());
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].n_trials_included, 100);
    assert_eq!(all[1].n_trials_included, 70);
    assert_same_metrics(units[1].metrics(), &all[1]);
}
