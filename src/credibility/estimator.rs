//! Bühlmann credibility factor from two fitted regressions.
//!
//! The grand-mean fit (complete pooling) and the group-means fit (no pooling)
//! form a one-way ANOVA. Their residual sums of squares give the moment
//! estimates of the two variance components:
//!
//! ```text
//! MSA   = (SSE1 - SSE2) / (df1 - df2)
//! MSRes = SSE2 / df2
//! VHM   = (MSA - MSRes) / n
//! EPV   = MSRes
//! Z     = n VHM / (n VHM + EPV)
//! ```
//!
//! The moment estimator is not constrained: VHM can be negative, which makes
//! `Z` negative. Such values are returned unchanged.

use serde::Serialize;

use crate::domain::ModelKind;
use crate::error::{CredError, Result};
use crate::models::FittedModel;

/// Full ANOVA breakdown behind a credibility factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CredibilityEstimate {
    pub sse_pooled: f64,
    pub sse_grouped: f64,
    pub df_pooled: f64,
    pub df_grouped: f64,
    /// Mean square among groups.
    pub msa: f64,
    /// Mean square within groups.
    pub ms_res: f64,
    /// Between-group variance component (σ²_A).
    pub vhm: f64,
    /// Within-group variance component (σ²).
    pub epv: f64,
    /// Bühlmann `k = EPV / VHM` (infinite when VHM is zero).
    pub k: f64,
    pub obs_per_group: usize,
    /// Credibility factor.
    pub z: f64,
}

impl CredibilityEstimate {
    /// VHM came out negative or Z left `[0, 1]`.
    pub fn is_anomalous(&self) -> bool {
        self.vhm < 0.0 || !(0.0..=1.0).contains(&self.z)
    }
}

/// The credibility factor `Z`.
pub fn credibility_factor(
    grand_mean: &FittedModel,
    group_means: &FittedModel,
    obs_per_group: usize,
) -> Result<f64> {
    Ok(estimate_credibility(grand_mean, group_means, obs_per_group)?.z)
}

/// Compute the credibility factor with its intermediate quantities.
pub fn estimate_credibility(
    grand_mean: &FittedModel,
    group_means: &FittedModel,
    obs_per_group: usize,
) -> Result<CredibilityEstimate> {
    if grand_mean.kind() != ModelKind::GrandMean {
        return Err(CredError::invalid(format!(
            "expected a grand mean fit as the pooled model, got {}",
            grand_mean.kind().display_name()
        )));
    }
    if group_means.kind() != ModelKind::GroupMeans {
        return Err(CredError::invalid(format!(
            "expected a group means fit as the grouped model, got {}",
            group_means.kind().display_name()
        )));
    }
    if grand_mean.residuals().len() != group_means.residuals().len() {
        return Err(CredError::LengthMismatch {
            expected: grand_mean.residuals().len(),
            actual: group_means.residuals().len(),
        });
    }

    from_sums_of_squares(
        grand_mean.sse(),
        grand_mean.df_residual(),
        group_means.sse(),
        group_means.df_residual(),
        obs_per_group,
    )
}

/// The estimator on raw sums of squares and degrees of freedom.
pub fn from_sums_of_squares(
    sse_pooled: f64,
    df_pooled: f64,
    sse_grouped: f64,
    df_grouped: f64,
    obs_per_group: usize,
) -> Result<CredibilityEstimate> {
    if obs_per_group == 0 {
        return Err(CredError::invalid("obs_per_group must be >= 1"));
    }
    for (name, v) in [
        ("sse_pooled", sse_pooled),
        ("df_pooled", df_pooled),
        ("sse_grouped", sse_grouped),
        ("df_grouped", df_grouped),
    ] {
        if !v.is_finite() {
            return Err(CredError::numerical(format!("{name} is not finite ({v})")));
        }
    }

    let df_between = df_pooled - df_grouped;
    if df_between == 0.0 {
        return Err(CredError::DegenerateDivision {
            quantity: "df_pooled - df_grouped",
            value: df_between,
        });
    }
    if df_grouped == 0.0 {
        return Err(CredError::DegenerateDivision {
            quantity: "df_grouped",
            value: df_grouped,
        });
    }

    let n = obs_per_group as f64;
    let msa = (sse_pooled - sse_grouped) / df_between;
    let ms_res = sse_grouped / df_grouped;
    let vhm = (msa - ms_res) / n;
    let epv = ms_res;

    let denom = vhm * n + epv;
    if denom == 0.0 {
        return Err(CredError::DegenerateDivision {
            quantity: "n * VHM + EPV",
            value: denom,
        });
    }
    let z = (vhm * n) / denom;
    let k = if vhm == 0.0 { f64::INFINITY } else { epv / vhm };

    let estimate = CredibilityEstimate {
        sse_pooled,
        sse_grouped,
        df_pooled,
        df_grouped,
        msa,
        ms_res,
        vhm,
        epv,
        k,
        obs_per_group,
        z,
    };
    if estimate.is_anomalous() {
        log::warn!(
            "moment estimator outside the usual range: VHM = {vhm:.6}, Z = {z:.6} (kept as-is)"
        );
    }
    Ok(estimate)
}
