//! Fitted estimators: grand mean, group means, random intercept.
//!
//! All three reduce to "one prediction per group", so a fitted model stores
//! the per-level predictions plus the training diagnostics the credibility
//! estimator needs (residuals and residual degrees of freedom).

use serde::Serialize;

use crate::domain::{GroupId, GroupedDataset, ModelKind};
use crate::error::{CredError, Result};
use crate::math::sum_of_squares;

/// How a model maps a group label to a prediction.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictor {
    /// Same value for every group, including groups never seen in training.
    Constant(f64),
    /// One value per level; `None` for levels without training rows.
    PerGroup(Vec<Option<f64>>),
}

impl Predictor {
    pub fn predict(&self, group: GroupId) -> Result<f64> {
        match self {
            Predictor::Constant(v) => Ok(*v),
            Predictor::PerGroup(values) => {
                if group.0 == 0 {
                    return Err(CredError::UnknownGroup { group });
                }
                values
                    .get(group.index())
                    .copied()
                    .flatten()
                    .ok_or(CredError::UnknownGroup { group })
            }
        }
    }
}

/// Variance components of a random-intercept fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VarianceComponents {
    /// Between-group variance (VHM, σ²_A).
    pub vhm: f64,
    /// Within-group variance (EPV, σ²).
    pub epv: f64,
    /// Fixed intercept (GLS estimate).
    pub intercept: f64,
    /// Restricted log-likelihood at the estimate (up to a constant).
    pub log_reml: f64,
    /// True when VHM sits on the zero boundary.
    pub boundary: bool,
}

/// A model fitted to a training set. Immutable after fitting.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub(crate) kind: ModelKind,
    pub(crate) predictor: Predictor,
    pub(crate) residuals: Vec<f64>,
    pub(crate) df_residual: f64,
    pub(crate) variance: Option<VarianceComponents>,
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Training residuals, one per training row, in row order.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn df_residual(&self) -> f64 {
        self.df_residual
    }

    /// Residual sum of squares on the training rows.
    pub fn sse(&self) -> f64 {
        sum_of_squares(&self.residuals)
    }

    /// Variance components (random-intercept fits only).
    pub fn variance(&self) -> Option<&VarianceComponents> {
        self.variance.as_ref()
    }

    pub fn predict(&self, group: GroupId) -> Result<f64> {
        self.predictor.predict(group)
    }

    /// Predict every row of a dataset, in row order.
    pub fn predict_dataset(&self, data: &GroupedDataset) -> Result<Vec<f64>> {
        data.records().iter().map(|r| self.predict(r.group)).collect()
    }
}

/// Residuals `y - prediction` for every row, failing on non-finite predictions.
pub(crate) fn compute_residuals(data: &GroupedDataset, predictor: &Predictor) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(data.len());
    for r in data.records() {
        let y_fit = predictor.predict(r.group)?;
        if !y_fit.is_finite() {
            return Err(CredError::numerical(format!(
                "non-finite prediction {y_fit} for group {}",
                r.group
            )));
        }
        out.push(r.response - y_fit);
    }
    Ok(out)
}
