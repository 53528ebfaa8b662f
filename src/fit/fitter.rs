//! Fixed-effect fitting routines.
//!
//! - grand mean: `y ~ 1`, solved as least squares on one intercept column
//! - group means: `y ~ 0 + group`, whose least squares solution is the
//!   per-group sample mean
//!
//! Residual degrees of freedom are `n - rank(X)`, which for the group model is
//! `n - (number of groups with training rows)`.

use nalgebra::{DMatrix, DVector};

use crate::domain::{GroupedDataset, ModelKind};
use crate::error::{CredError, Result};
use crate::fit::reml::{GroupStats, RemlOptions, fit_random_intercept};
use crate::math::solve_least_squares;
use crate::models::{FittedModel, Predictor, compute_residuals};

/// The three estimators fitted to one training set.
#[derive(Debug, Clone)]
pub struct ModelFits {
    pub grand_mean: FittedModel,
    pub group_means: FittedModel,
    pub random_intercept: FittedModel,
}

impl ModelFits {
    pub fn get(&self, kind: ModelKind) -> &FittedModel {
        match kind {
            ModelKind::GrandMean => &self.grand_mean,
            ModelKind::GroupMeans => &self.group_means,
            ModelKind::RandomIntercept => &self.random_intercept,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FittedModel> {
        ModelKind::ALL.into_iter().map(|k| self.get(k))
    }
}

/// Fit all three estimators.
pub fn fit_all(train: &GroupedDataset, reml: &RemlOptions) -> Result<ModelFits> {
    Ok(ModelFits {
        grand_mean: fit_grand_mean(train)?,
        group_means: fit_group_means(train)?,
        random_intercept: fit_random_intercept(train, reml)?,
    })
}

/// Complete pooling: every group is predicted by the overall mean.
pub fn fit_grand_mean(train: &GroupedDataset) -> Result<FittedModel> {
    if train.is_empty() {
        return Err(CredError::invalid("cannot fit a grand mean to an empty dataset"));
    }
    let n = train.len();
    let x = DMatrix::from_element(n, 1, 1.0);
    let y = DVector::from_vec(train.responses());

    let fit = solve_least_squares(&x, &y)
        .ok_or_else(|| CredError::numerical("grand mean least squares solve failed"))?;
    let predictor = Predictor::Constant(fit.coefficients[0]);
    let residuals = compute_residuals(train, &predictor)?;

    Ok(FittedModel {
        kind: ModelKind::GrandMean,
        predictor,
        residuals,
        df_residual: (n - fit.rank) as f64,
        variance: None,
    })
}

/// No pooling: each group is predicted by its own sample mean.
///
/// The indicator-column OLS solution is the per-group mean, so the
/// coefficients come straight from the group sufficient statistics in one
/// pass. Residual df is `n - (number of groups with training rows)`, the rank
/// of the indicator design.
///
/// Levels without training rows get no coefficient; predicting them fails
/// with `UnknownGroup`.
pub fn fit_group_means(train: &GroupedDataset) -> Result<FittedModel> {
    if train.is_empty() {
        return Err(CredError::invalid("cannot fit group means to an empty dataset"));
    }
    let stats = GroupStats::from_dataset(train);

    let mut values = vec![None; train.n_levels()];
    for (&level, &m) in stats.levels.iter().zip(&stats.means) {
        values[level] = Some(m);
    }
    let predictor = Predictor::PerGroup(values);
    let residuals = compute_residuals(train, &predictor)?;

    Ok(FittedModel {
        kind: ModelKind::GroupMeans,
        predictor,
        residuals,
        df_residual: (stats.n_obs - stats.n_groups()) as f64,
        variance: None,
    })
}
