//! Held-out evaluation and terminal reports.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::domain::{GroupedDataset, ModelKind};
use crate::error::{CredError, Result};
use crate::fit::ModelFits;

/// Held-out error of one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelScore {
    pub model: ModelKind,
    pub rmse: f64,
}

/// Root mean squared error between observations and predictions.
pub fn rmse(observed: &[f64], predicted: &[f64]) -> Result<f64> {
    if observed.len() != predicted.len() {
        return Err(CredError::LengthMismatch {
            expected: observed.len(),
            actual: predicted.len(),
        });
    }
    if observed.is_empty() {
        return Err(CredError::invalid("RMSE needs at least one observation"));
    }
    let sse: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p) * (o - p))
        .sum();
    let value = (sse / observed.len() as f64).sqrt();
    if !value.is_finite() {
        return Err(CredError::numerical(format!("non-finite RMSE {value}")));
    }
    Ok(value)
}

/// Score every fitted model on a held-out dataset.
pub fn evaluate(fits: &ModelFits, test: &GroupedDataset) -> Result<Vec<ModelScore>> {
    let observed = test.responses();
    fits.iter()
        .map(|fit| {
            let predicted = fit.predict_dataset(test)?;
            Ok(ModelScore {
                model: fit.kind(),
                rmse: rmse(&observed, &predicted)?,
            })
        })
        .collect()
}

/// Lowest-RMSE model, if any.
pub fn best_model(scores: &[ModelScore]) -> Option<ModelScore> {
    scores
        .iter()
        .copied()
        .min_by(|a, b| a.rmse.partial_cmp(&b.rmse).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rmse_of_identical_series_is_zero() {
        let y = [1.0, -2.5, 3.25];
        assert_eq!(rmse(&y, &y).unwrap(), 0.0);
    }

    #[test]
    fn rmse_known_value() {
        // Errors 3 and 4: sqrt((9 + 16) / 2).
        let v = rmse(&[0.0, 0.0], &[3.0, -4.0]).unwrap();
        assert_abs_diff_eq!(v, (12.5_f64).sqrt(), epsilon = 1e-12);
        assert!(v >= 0.0);
    }

    #[test]
    fn rmse_rejects_bad_lengths() {
        assert!(matches!(
            rmse(&[1.0], &[1.0, 2.0]),
            Err(CredError::LengthMismatch { .. })
        ));
        assert!(rmse(&[], &[]).is_err());
    }

    #[test]
    fn best_model_picks_lowest_rmse() {
        let scores = [
            ModelScore {
                model: ModelKind::GrandMean,
                rmse: 3.0,
            },
            ModelScore {
                model: ModelKind::RandomIntercept,
                rmse: 1.0,
            },
            ModelScore {
                model: ModelKind::GroupMeans,
                rmse: 2.0,
            },
        ];
        assert_eq!(best_model(&scores).unwrap().model, ModelKind::RandomIntercept);
        assert!(best_model(&[]).is_none());
    }
}
