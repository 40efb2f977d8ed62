mod common;
use common::{constant_rate_unit, drifting_unit, trials, Lcg};
use spikeqc::{
    DriftDetector, InclusionStrategy, TimeBins, TrialInclusionResolver, Unit,
};

fn binned(unit: &Unit) -> (TimeBins, Vec<f64>) {
    let bins = TimeBins::new(
        &unit.spikes().times,
        &unit.trials().starts,
        &unit.trials().stops,
        120.0,
    );
    let rates = bins.rates();
    (bins, rates)
}

#[test]
fn constant_rate_selects_whole_session() {
    let unit = constant_rate_unit();
    let (bins, rates) = binned(&unit);
    assert_eq!(bins.len(), 10);
    for r in &rates {
        approx::assert_abs_diff_eq!(*r, 5.0, epsilon = 0.01);
    }

    let w = DriftDetector::new(2.0)
        .detect(&bins, &rates, &unit.trials().starts)
        .unwrap();
    assert_eq!((w.bin_start, w.bin_end), (0, 9));
    assert_eq!((w.trial_start, w.trial_end), (0, 100));
    assert_eq!((w.t_start, w.t_end), (0.0, 1200.0));
}

#[test]
fn stable_tail_after_rate_jump() {
    let unit = drifting_unit();
    let (bins, rates) = binned(&unit);
    let resolver = TrialInclusionResolver::new(2.0);
    let inc = resolver.resolve(
        InclusionStrategy::Automatic,
        &bins,
        &rates,
        &unit.spikes().times,
        &unit.trials().starts,
    );
    assert_eq!((inc.first_trial, inc.last_trial), (30, 100));
    assert_eq!((inc.t1, inc.t2), (360.0, 1200.0));
    assert_eq!(inc.bins, [vec![false; 3], vec![true; 7]].concat());
    // Every spike from 360 s on, including the one at the session stop.
    let first_inc = unit.spikes().times.partition_point(|&t| t < 360.0);
    assert_eq!(inc.n_spikes(), unit.spikes().len() - first_inc);
}

#[test]
fn trial_range_follows_bin_range() {
    let mut rng = Lcg::new(42);
    let rates: Vec<f64> = (0..30).map(|_| 1.0 + 9.0 * rng.next_f64()).collect();
    let bins = TimeBins::from_bounds(&[], 0.0, 3600.0, 120.0);
    let (starts, _) = trials(300, 0.0, 12.0, 10.0);

    let periods = DriftDetector::new(2.0).periods(&bins, &rates, &starts);
    assert_eq!(periods.len(), 30);
    for p in &periods {
        assert!(p.bin_start <= p.bin_end);
        assert!(p.trial_start <= p.trial_end);
        assert!(p.t_start < p.t_end);
    }
    // Later periods never start at an earlier trial.
    for w in periods.windows(2) {
        assert!(w[0].trial_start <= w[1].trial_start);
    }
}

#[test]
fn full_session_round_trip() {
    let unit = constant_rate_unit();
    let (bins, rates) = binned(&unit);
    let n = unit.trials().len();
    let resolver = TrialInclusionResolver::new(2.0);
    let resolve = |s| resolver.resolve(s, &bins, &rates, &unit.spikes().times, &unit.trials().starts);

    let auto = resolve(InclusionStrategy::Automatic);
    let full = resolve(InclusionStrategy::FullSession);
    let manual = resolve(InclusionStrategy::Manual { first_trial: 0, last_trial: n });
    assert_eq!(auto, full);
    assert_eq!(full, manual);
    assert!(full.trials.iter().all(|&b| b));
    assert!(full.spikes.iter().all(|&b| b));
}

#[test]
fn detection_is_repeatable() {
    let unit = drifting_unit();
    let (bins, rates) = binned(&unit);
    let d = DriftDetector::new(2.0);
    let a = d.detect(&bins, &rates, &unit.trials().starts);
    let b = d.detect(&bins, &rates, &unit.trials().starts);
    assert_eq!(a, b);
}
