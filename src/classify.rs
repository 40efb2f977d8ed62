//! Single-unit / multi-unit classification.
use crate::config::QcConfig;
use crate::unit::UnitType;

/// `SingleUnit` iff `true_spikes ≥ 90 %` and `snr ≥ 2.0` (configurable).
///
/// `NaN` in either metric gives `MultiUnit`.
pub fn classify_unit(snr: f64, true_spikes: f64, cfg: &QcConfig) -> UnitType {
    if true_spikes >= cfg.single_unit_min_true_spikes && snr >= cfg.single_unit_min_snr {
        UnitType::SingleUnit
    } else {
        UnitType::MultiUnit
    }
}
