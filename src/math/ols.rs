//! Ordinary least squares solver.
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Used for the intercept-only fit. We solve with SVD so tall design
//! matrices work and so the numerical rank is available for residual degrees
//! of freedom.

use nalgebra::{DMatrix, DVector};

/// Solution of a least squares problem.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    pub coefficients: DVector<f64>,
    /// Numerical rank of the design matrix.
    pub rank: usize,
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<LeastSquares> {
    if x.nrows() != y.len() || x.nrows() == 0 || x.ncols() == 0 {
        return None;
    }

    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if !(max_sv.is_finite() && max_sv > 0.0) {
        return None;
    }
    let rank_tol = max_sv * x.nrows().max(x.ncols()) as f64 * f64::EPSILON;
    let rank = svd.rank(rank_tol);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(LeastSquares {
                    coefficients: beta,
                    rank,
                });
            }
        }
    }

    None
}
