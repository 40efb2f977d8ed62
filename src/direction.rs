//! Direction selectivity of stimulus responses.
//!
//! Directions are in degrees.  Two estimates of the preferred direction
//! (PD) are given:
//!
//! - maximum based: the direction with the highest mean rate, the
//!   anti-preferred direction 180° away, and the modulation index
//!   `DSI = (r_pd − r_ad) / (r_pd + r_ad)`;
//! - weighted: the angle of the rate-weighted vector sum, with
//!   `DSI = |Σ r·e^{iθ}| / Σ r`.

/// Direction modulo 360, in `[0, 360)`.
pub fn deg_mod(d: f64) -> f64 {
    let m = d.rem_euclid(360.0);
    if m >= 360.0 { 0.0 } else { m }
}

/// Absolute angular difference on the circle, in `[0, 180]`.
pub fn deg_diff(d1: f64, d2: f64) -> f64 {
    let d = deg_mod(d1 - d2);
    d.min(360.0 - d)
}

/// Mean rate of each distinct direction, directions sorted ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionRates {
    pub dirs: Vec<f64>,
    pub rates: Vec<f64>,
}

impl DirectionRates {
    /// Average per-trial rates by trial direction.  Trials with a `NaN`
    /// direction or rate are ignored.
    pub fn from_trials(trial_dirs: &[f64], trial_rates: &[f64]) -> Self {
        debug_assert_eq!(trial_dirs.len(), trial_rates.len());
        let mut pairs: Vec<(f64, f64)> = trial_dirs
            .iter()
            .zip(trial_rates)
            .filter(|(d, r)| !d.is_nan() && !r.is_nan())
            .map(|(&d, &r)| (deg_mod(d), r))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut dirs = Vec::new();
        let mut rates = Vec::new();
        for group in pairs.chunk_by(|a, b| a.0 == b.0) {
            dirs.push(group[0].0);
            rates.push(group.iter().map(|p| p.1).sum::<f64>() / group.len() as f64);
        }
        Self { dirs, rates }
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Mean rate of the sampled direction closest to `d`.
    pub fn rate_at(&self, d: f64) -> f64 {
        self.dirs
            .iter()
            .zip(&self.rates)
            .min_by(|a, b| deg_diff(*a.0, d).total_cmp(&deg_diff(*b.0, d)))
            .map_or(f64::NAN, |(_, &r)| r)
    }
}

/// Preferred and anti-preferred direction and the selectivity indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirSelectivity {
    /// Direction of the maximum mean rate.
    pub pd: f64,
    /// `pd + 180`.
    pub ad: f64,
    /// Modulation index between `pd` and `ad`.
    pub dsi: f64,
    /// Angle of the weighted vector sum.
    pub pd_weighted: f64,
    pub dsi_weighted: f64,
}

impl DirSelectivity {
    /// All estimates, `NaN` when there are no directions.
    pub fn from_rates(dr: &DirectionRates) -> Self {
        let (pd, ad) = pref_dir_max(dr);
        let (pd_weighted, dsi_weighted) = pref_dir_weighted(dr);
        Self {
            pd,
            ad,
            dsi: modulation_index(dr.rate_at(pd), dr.rate_at(ad)),
            pd_weighted,
            dsi_weighted,
        }
    }
}

/// `(pd, ad)` of the maximum mean rate; the first direction wins ties.
pub fn pref_dir_max(dr: &DirectionRates) -> (f64, f64) {
    let best = dr
        .rates
        .iter()
        .enumerate()
        .fold(None::<(usize, f64)>, |best, (i, &r)| match best {
            Some((_, b)) if b >= r => best,
            _ => Some((i, r)),
        });
    match best {
        Some((i, _)) => {
            let pd = dr.dirs[i];
            (pd, deg_mod(pd + 180.0))
        }
        None => (f64::NAN, f64::NAN),
    }
}

/// `(pd, dsi)` from the rate-weighted vector sum.
pub fn pref_dir_weighted(dr: &DirectionRates) -> (f64, f64) {
    let total: f64 = dr.rates.iter().sum();
    if dr.is_empty() || !(total > 0.0) {
        return (f64::NAN, f64::NAN);
    }
    let (x, y) = dr
        .dirs
        .iter()
        .zip(&dr.rates)
        .fold((0.0, 0.0), |(x, y), (&d, &r)| {
            let a = d.to_radians();
            (x + r * a.cos(), y + r * a.sin())
        });
    (deg_mod(y.atan2(x).to_degrees()), x.hypot(y) / total)
}

/// `(a − b) / (a + b)`; `NaN` when the sum is zero.
pub fn modulation_index(a: f64, b: f64) -> f64 {
    let s = a + b;
    if s == 0.0 { f64::NAN } else { (a - b) / s }
}
