//! Plating target calculation: maps deposit geometry to electrical
//! setpoints and a run duration via Faraday's law of electrolysis.

use log::debug;

use crate::types::{ComputedTargets, ProcessParameters};

// Conceptual constants for a generic plating material (gold/nickel blend).
pub const MOLAR_MASS_G_MOL: f64 = 150.0;
pub const DEPOSIT_DENSITY_G_CM3: f64 = 10.0;
pub const CHARGE_VALENCE: f64 = 2.0;
pub const CURRENT_EFFICIENCY: f64 = 0.95;

/// Faraday constant (C/mol).
pub const FARADAY_C_PER_MOL: f64 = 96_485.0;

const BASE_VOLTAGE_V: f64 = 2.0;

/// Recommended current density (mA/cm^2) for a geometry complexity level.
///
/// Higher complexity plates at a lower density for even coverage. Levels
/// outside 1..=5 fall back to the basic density rather than failing.
pub fn current_density_ma_cm2(complexity_level: i32) -> f64 {
    match complexity_level {
        1 => 5.0,
        2 => 4.0,
        3 => 3.0,
        4 => 2.5,
        5 => 2.0,
        _ => 5.0,
    }
}

/// Computes electrical targets and estimated run time for the given
/// parameters.
///
/// Never fails: inputs that break the arithmetic (a zero area driving the
/// target current to zero, NaN propagation) produce the all-zero result,
/// whose zero estimated time gates starting a run downstream.
pub fn compute_targets(params: &ProcessParameters) -> ComputedTargets {
    let density_ma_cm2 = current_density_ma_cm2(params.complexity_level);
    let target_current_a = density_ma_cm2 / 1000.0 * params.area_cm2;

    let thickness_cm = params.thickness_um / 10_000.0;
    let volume_cm3 = thickness_cm * params.area_cm2;
    let mass_g = volume_cm3 * DEPOSIT_DENSITY_G_CM3;

    // Faraday's law: t = (m * n * F) / (M * I * eta)
    let estimated_time_sec = (mass_g * CHARGE_VALENCE * FARADAY_C_PER_MOL)
        / (MOLAR_MASS_G_MOL * target_current_a * CURRENT_EFFICIENCY);

    // The voltage factor scales with the raw level; the density fallback
    // does not apply here.
    let voltage_factor = 1.0 + (params.complexity_level as f64 - 1.0) * 0.2;
    let target_voltage_v = BASE_VOLTAGE_V * voltage_factor;

    if !estimated_time_sec.is_finite() {
        debug!(
            "calculation collapsed for thickness={} area={}: returning zeros",
            params.thickness_um, params.area_cm2
        );
        return ComputedTargets::default();
    }

    ComputedTargets {
        target_current_a,
        target_voltage_v,
        estimated_time_sec,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(thickness_um: f64, area_cm2: f64, complexity_level: i32) -> ProcessParameters {
        ProcessParameters {
            thickness_um,
            area_cm2,
            complexity_level,
        }
    }

    #[test]
    fn reference_case_matches_hand_calculation() {
        let targets = compute_targets(&params(10.0, 50.0, 3));
        assert!((targets.target_current_a - 0.15).abs() < 1e-12);
        assert!((targets.target_voltage_v - 2.8).abs() < 1e-12);
        assert!((targets.estimated_time_sec - 4513.92).abs() < 0.01);
        assert!(targets.startable());
    }

    #[test]
    fn out_of_range_level_uses_basic_density_but_raw_voltage() {
        let high = compute_targets(&params(10.0, 50.0, 7));
        let basic = compute_targets(&params(10.0, 50.0, 1));
        assert_eq!(high.target_current_a, basic.target_current_a);
        assert_eq!(high.estimated_time_sec, basic.estimated_time_sec);
        assert!((high.target_voltage_v - 4.4).abs() < 1e-12);

        let low = compute_targets(&params(10.0, 50.0, 0));
        assert_eq!(low.target_current_a, basic.target_current_a);
        assert!((low.target_voltage_v - 1.6).abs() < 1e-12);
    }

    #[test]
    fn zero_area_collapses_to_all_zero() {
        let targets = compute_targets(&params(10.0, 0.0, 3));
        assert_eq!(targets, ComputedTargets::default());
        assert!(!targets.startable());
    }

    #[test]
    fn zero_thickness_keeps_current_but_is_not_startable() {
        let targets = compute_targets(&params(0.0, 50.0, 3));
        assert!((targets.target_current_a - 0.15).abs() < 1e-12);
        assert_eq!(targets.estimated_time_sec, 0.0);
        assert!(!targets.startable());
    }

    #[test]
    fn recomputation_is_deterministic() {
        let a = compute_targets(&params(25.0, 12.5, 4));
        let b = compute_targets(&params(25.0, 12.5, 4));
        assert_eq!(a, b);
    }
}
