/// Shared builders for synthetic units.
use ndarray::{Array1, Array2};
use spikeqc::{TrialPeriod, Unit};

/// Samples per waveform.
#[allow(unused)]
pub const N_SAMPLES: usize = 32;

/// Deterministic uniform numbers in `[0, 1)` (64-bit LCG).
#[allow(unused)]
pub struct Lcg(u64);

#[allow(unused)]
impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407))
    }

    pub fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Spikes every `1 / rate` seconds in `[t_start, t_stop]`.
#[allow(unused)]
pub fn regular_train(rate: f64, t_start: f64, t_stop: f64) -> Vec<f64> {
    let n = ((t_stop - t_start) * rate).round() as usize;
    (0..=n).map(|i| t_start + i as f64 / rate).collect()
}

/// `n` trials starting every `every` seconds from `t0`, each `dur` long.
#[allow(unused)]
pub fn trials(n: usize, t0: f64, every: f64, dur: f64) -> (Vec<f64>, Vec<f64>) {
    let starts: Vec<f64> = (0..n).map(|i| t0 + i as f64 * every).collect();
    let stops = starts.iter().map(|s| s + dur).collect();
    (starts, stops)
}

/// Biphasic spike waveforms (trough at sample 10, peak at 15) plus uniform
/// noise of ±`noise`, sampled every 25 µs.
#[allow(unused)]
pub fn biphasic_waveforms(n_spikes: usize, noise: f64, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = Lcg::new(seed);
    let wave_time = Array1::from_iter((0..N_SAMPLES).map(|k| k as f64 * 25.0));
    let waveforms = Array2::from_shape_fn((n_spikes, N_SAMPLES), |(_, k)| {
        let x = k as f64;
        let shape = -100.0 * (-((x - 10.0) / 1.5).powi(2)).exp()
            + 50.0 * (-((x - 15.0) / 3.0).powi(2)).exp();
        shape + noise * (2.0 * rng.next_f64() - 1.0)
    });
    (waveforms, wave_time)
}

/// Unit with clean waveforms and the given spike train and trials.
#[allow(unused)]
pub fn unit_from(spike_times: Vec<f64>, starts: Vec<f64>, stops: Vec<f64>) -> Unit {
    let (wfs, wt) = biphasic_waveforms(spike_times.len(), 5.0, 7);
    Unit::new("synthetic", spike_times, wfs, wt, starts, stops).unwrap()
}

/// 5 sp/s for 1200 s (ten 120 s bins), 100 trials every 12 s.
#[allow(unused)]
pub fn constant_rate_unit() -> Unit {
    let (starts, stops) = trials(100, 0.0, 12.0, 10.0);
    unit_from(regular_train(5.0, 0.0, 1200.0), starts, stops)
}

/// 2 sp/s for the first 360 s, then 8 sp/s until 1200 s; 100 trials
/// every 12 s, so the stable tail covers trials 30..100.
#[allow(unused)]
pub fn drifting_unit() -> Unit {
    let mut spikes: Vec<f64> = (0..720).map(|i| i as f64 / 2.0).collect();
    spikes.extend(regular_train(8.0, 360.0, 1200.0));
    let (starts, stops) = trials(100, 0.0, 12.0, 10.0);
    unit_from(spikes, starts, stops)
}

/// 60 trials every 2 s with a silent `baseline` `[0, 0.5)` and an `S1`
/// period `[0.5, 1.0)` relative to trial start.  Between trials the unit
/// fires at 50 sp/s; with `responsive`, it also fires at 100 sp/s during S1.
#[allow(unused)]
pub fn task_unit(responsive: bool) -> Unit {
    let (starts, stops) = trials(60, 0.0, 2.0, 1.5);
    let mut spikes = Vec::new();
    for &s in &starts {
        if responsive {
            spikes.extend((0..50).map(|k| s + 0.5 + k as f64 * 0.01));
        }
        spikes.extend((0..30).map(|k| s + 1.2 + k as f64 * 0.02));
    }
    let period = |name: &str, a: f64, b: f64| TrialPeriod {
        name: name.to_string(),
        starts: starts.iter().map(|s| s + a).collect(),
        stops: starts.iter().map(|s| s + b).collect(),
    };
    let baseline = period("baseline", 0.0, 0.5);
    let s1 = period("S1", 0.5, 1.0);
    unit_from(spikes, starts, stops)
        .with_period(baseline)
        .unwrap()
        .with_period(s1)
        .unwrap()
}
