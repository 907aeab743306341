//! Canonical-scale numeric utilities.
//!
//! Every scoring path funnels through these functions to land on the
//! 0-90 integer scale. All functions are pure and total: bad input maps
//! to a defined value instead of panicking, and map iteration order
//! never affects the result.

use std::collections::BTreeMap;

use crate::domain::Dimension;

/// Upper bound of the canonical scale.
pub const CANONICAL_MAX: f64 = 90.0;

/// Round to the nearest integer and clamp into [0, 90].
///
/// Non-finite input maps to 0. Idempotent.
pub fn clamp_canonical(n: f64) -> u8 {
    if !n.is_finite() {
        return 0;
    }
    let rounded = n.round();
    if rounded <= 0.0 {
        0
    } else if rounded >= CANONICAL_MAX {
        90
    } else {
        rounded as u8
    }
}

/// Linear-map `value` from `[source_min, source_max]` onto the canonical
/// scale, then clamp. A degenerate source range falls back to
/// [`clamp_canonical`].
pub fn rescale(value: f64, source_min: f64, source_max: f64) -> u8 {
    if !source_min.is_finite() || !source_max.is_finite() || source_max <= source_min {
        return clamp_canonical(value);
    }
    clamp_canonical((value - source_min) / (source_max - source_min) * CANONICAL_MAX)
}

/// Convert an accuracy ratio (0..1) or percentage (0..100) to canonical.
pub fn accuracy_to_canonical(value: f64, is_percentage: bool) -> u8 {
    let ratio = if is_percentage { value / 100.0 } else { value };
    clamp_canonical(ratio * CANONICAL_MAX)
}

/// Convert a normalized edit rate (0.0 = perfect, may exceed 1.0) to
/// canonical: `90 - min(1, rate)*60 - max(0, rate - 1)*30`, clamped.
///
/// The first unit of error rate costs up to 60 points; error beyond 1.0
/// costs 30 per unit, so "somewhat wrong" and "completely wrong" stay
/// distinguishable without the score collapsing below zero.
pub fn edit_rate_to_canonical(rate: f64) -> u8 {
    if !rate.is_finite() {
        return 0;
    }
    let rate = rate.max(0.0);
    clamp_canonical(CANONICAL_MAX - rate.min(1.0) * 60.0 - (rate - 1.0).max(0.0) * 30.0)
}

/// Weighted average over the dimensions present in `subscores`.
///
/// Missing dimensions contribute nothing (they are not zeros). When
/// `weights` is absent, or the weights covering the present dimensions
/// sum to zero, the unweighted arithmetic mean applies. Empty
/// `subscores` yields 0.
pub fn weighted_average(
    subscores: &BTreeMap<Dimension, u8>,
    weights: Option<&BTreeMap<Dimension, f64>>,
) -> u8 {
    if subscores.is_empty() {
        return 0;
    }

    if let Some(weights) = weights {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (dim, score) in subscores {
            let weight = weights.get(dim).copied().unwrap_or(0.0).max(0.0);
            numerator += f64::from(*score) * weight;
            denominator += weight;
        }
        if denominator > 0.0 {
            return clamp_canonical(numerator / denominator);
        }
    }

    let sum: f64 = subscores.values().map(|s| f64::from(*s)).sum();
    clamp_canonical(sum / subscores.len() as f64)
}
