//! Recover the mixing weight implied by three sets of predictions.
//!
//! If the shrinkage prediction is a convex combination
//! `p3 = Z p2 + (1 - Z) p1` of the pooled (`p1`) and per-group (`p2`)
//! predictions, then `Z = 1 - (p3 - p2) / (p1 - p2)` on every row.

use serde::Serialize;

use crate::error::{CredError, Result};
use crate::math::{mean, min_max};

/// Relative tolerance for treating the implied weights as constant.
pub const DEFAULT_REL_TOL: f64 = 1e-6;

/// Absolute floor added to the relative tolerance, for `Z` at or near zero.
pub const ABS_TOL_FLOOR: f64 = 1e-12;

/// Implied weight for one row.
///
/// Fails with `DegenerateDivision` when the pooled and per-group predictions
/// coincide, since any weight mixes them to the same value.
pub fn implied_weight(pooled: f64, grouped: f64, shrunk: f64) -> Result<f64> {
    let gap = pooled - grouped;
    let scale = pooled.abs().max(grouped.abs()).max(1.0);
    if gap.abs() <= 4.0 * f64::EPSILON * scale {
        return Err(CredError::DegenerateDivision {
            quantity: "pooled - grouped prediction",
            value: gap,
        });
    }
    let z = 1.0 - (shrunk - grouped) / gap;
    if !z.is_finite() {
        return Err(CredError::numerical(format!("non-finite implied weight {z}")));
    }
    Ok(z)
}

/// Per-row implied weights plus their spread.
#[derive(Debug, Clone, Serialize)]
pub struct MixSummary {
    /// Weight per row; `None` for degenerate rows.
    pub weights: Vec<Option<f64>>,
    /// Indices of rows where pooled and per-group predictions coincide.
    pub degenerate_rows: Vec<usize>,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl MixSummary {
    /// Largest absolute distance of any row weight from `z`.
    pub fn max_abs_deviation(&self, z: f64) -> f64 {
        self.weights
            .iter()
            .flatten()
            .map(|w| (w - z).abs())
            .fold(0.0, f64::max)
    }

    /// Every non-degenerate row weight `w` satisfies
    /// `|w - z| <= rel_tol * |z| + ABS_TOL_FLOOR`.
    pub fn is_consistent_with(&self, z: f64, rel_tol: f64) -> bool {
        self.max_abs_deviation(z) <= rel_tol * z.abs() + ABS_TOL_FLOOR
    }
}

/// Implied weights for every row.
///
/// Degenerate rows are reported, not fatal; the call fails only when no row
/// carries information or the inputs disagree in length.
pub fn implied_weights(pooled: &[f64], grouped: &[f64], shrunk: &[f64]) -> Result<MixSummary> {
    if grouped.len() != pooled.len() {
        return Err(CredError::LengthMismatch {
            expected: pooled.len(),
            actual: grouped.len(),
        });
    }
    if shrunk.len() != pooled.len() {
        return Err(CredError::LengthMismatch {
            expected: pooled.len(),
            actual: shrunk.len(),
        });
    }

    let mut weights = Vec::with_capacity(pooled.len());
    let mut degenerate_rows = Vec::new();
    for (i, ((&p1, &p2), &p3)) in pooled.iter().zip(grouped).zip(shrunk).enumerate() {
        match implied_weight(p1, p2, p3) {
            Ok(z) => weights.push(Some(z)),
            Err(CredError::DegenerateDivision { .. }) => {
                degenerate_rows.push(i);
                weights.push(None);
            }
            Err(e) => return Err(e),
        }
    }

    let defined: Vec<f64> = weights.iter().flatten().copied().collect();
    let (min, max) = min_max(&defined).ok_or(CredError::DegenerateDivision {
        quantity: "pooled - grouped prediction (every row)",
        value: 0.0,
    })?;
    let mean = mean(&defined).unwrap_or(f64::NAN);

    if !degenerate_rows.is_empty() {
        log::warn!(
            "{} row(s) have identical pooled and per-group predictions; implied weight undefined",
            degenerate_rows.len()
        );
    }
    log::debug!("implied weights: min = {min:.9}, max = {max:.9}, mean = {mean:.9}");

    Ok(MixSummary {
        weights,
        degenerate_rows,
        min,
        max,
        mean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn recovers_convex_weight() {
        let z = 0.3;
        let pooled = [10.0, 10.0, 10.0];
        let grouped = [4.0, 12.0, 20.0];
        let shrunk: Vec<f64> = grouped
            .iter()
            .zip(&pooled)
            .map(|(g, p)| z * g + (1.0 - z) * p)
            .collect();

        let summary = implied_weights(&pooled, &grouped, &shrunk).unwrap();
        for w in summary.weights.iter().flatten() {
            assert_abs_diff_eq!(*w, z, epsilon = 1e-12);
        }
        assert!(summary.degenerate_rows.is_empty());
        assert!(summary.is_consistent_with(z, DEFAULT_REL_TOL));
        assert!(!summary.is_consistent_with(0.5, DEFAULT_REL_TOL));
    }

    #[test]
    fn degenerate_rows_are_reported() {
        let pooled = [10.0, 10.0];
        let grouped = [10.0, 14.0];
        let shrunk = [10.0, 12.0];
        let summary = implied_weights(&pooled, &grouped, &shrunk).unwrap();
        assert_eq!(summary.degenerate_rows, vec![0]);
        assert_eq!(summary.weights[0], None);
        assert_abs_diff_eq!(summary.weights[1].unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn all_degenerate_is_an_error() {
        let err = implied_weights(&[1.0], &[1.0], &[1.0]).unwrap_err();
        assert!(matches!(err, CredError::DegenerateDivision { .. }));
        assert!(implied_weight(5.0, 5.0, 5.0).is_err());
    }

    #[test]
    fn length_mismatch_is_an_error() {
        assert!(matches!(
            implied_weights(&[1.0, 2.0], &[1.0], &[1.0, 2.0]),
            Err(CredError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn consistency_tolerance_is_relative_to_z() {
        let summary = |w: f64| MixSummary {
            weights: vec![Some(w), None],
            degenerate_rows: vec![1],
            min: w,
            max: w,
            mean: w,
        };
        assert!(summary(0.5 + 4e-7).is_consistent_with(0.5, DEFAULT_REL_TOL));
        assert!(!summary(0.5 + 6e-7).is_consistent_with(0.5, DEFAULT_REL_TOL));
        assert!(summary(2e-3 + 1e-9).is_consistent_with(2e-3, DEFAULT_REL_TOL));
        assert!(!summary(2e-3 + 1e-8).is_consistent_with(2e-3, DEFAULT_REL_TOL));
        assert!(summary(0.0).is_consistent_with(0.0, DEFAULT_REL_TOL));
        assert!(!summary(1e-9).is_consistent_with(0.0, DEFAULT_REL_TOL));
    }
}
