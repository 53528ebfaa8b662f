//! Random-intercept model fitted by REML.
//!
//! Model: `y_ij = μ + u_j + ε_ij` with `u_j ~ N(0, σ²_A)` and `ε_ij ~ N(0, σ²)`.
//!
//! Everything is computed from per-group sufficient statistics
//! (counts, sample means, pooled within-group sum of squares), so no `n × n`
//! covariance matrix is ever formed.
//!
//! With `θ = σ²_A / σ²` and `σ²` profiled out, the restricted log-likelihood
//! (up to a constant) is
//!
//! ```text
//! -2ℓ(θ) = (N-1) ln Q(θ) + Σ ln(1 + n_j θ) + ln Σ n_j / (1 + n_j θ)
//! Q(θ)   = W + Σ n_j (ȳ_j - μ̂(θ))² / (1 + n_j θ)
//! σ̂²(θ)  = Q(θ) / (N-1)
//! ```
//!
//! Balanced data has the closed-form maximiser (the ANOVA estimates, with
//! σ²_A truncated at zero). Unbalanced data uses a log-spaced grid over `θ`
//! followed by golden-section refinement around the best grid point.
//!
//! Predictions are BLUPs: `μ̂ + Z_j (ȳ_j - μ̂)` with
//! `Z_j = n_j σ²_A / (n_j σ²_A + σ²)`.

use crate::domain::{GroupedDataset, ModelKind};
use crate::error::{CredError, Result};
use crate::models::{FittedModel, Predictor, VarianceComponents, compute_residuals};

/// Fixed effects (intercept) plus the two variance parameters.
const N_PARAMS: usize = 3;

/// Options for the unbalanced-data search.
#[derive(Debug, Clone)]
pub struct RemlOptions {
    /// Grid points over `ln θ`.
    pub grid_steps: usize,
    /// Lower bound of the `ln θ` grid.
    pub log_theta_min: f64,
    /// Upper bound of the `ln θ` grid.
    pub log_theta_max: f64,
    /// Golden-section stopping width on `ln θ`.
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for RemlOptions {
    fn default() -> Self {
        Self {
            grid_steps: 81,
            log_theta_min: -18.0,
            log_theta_max: 18.0,
            tol: 1e-10,
            max_iter: 200,
        }
    }
}

/// Per-group sufficient statistics over the observed levels.
#[derive(Debug, Clone)]
pub struct GroupStats {
    /// Level index of each observed group.
    pub levels: Vec<usize>,
    pub counts: Vec<f64>,
    pub means: Vec<f64>,
    /// Pooled within-group sum of squares.
    pub within_ss: f64,
    pub n_obs: usize,
}

impl GroupStats {
    pub fn from_dataset(data: &GroupedDataset) -> Self {
        let n_levels = data.n_levels();
        let count = data.group_counts();
        let mut sum = vec![0.0; n_levels];
        for r in data.records() {
            sum[r.group.index()] += r.response;
        }

        let levels: Vec<usize> = data.observed_levels().iter().map(|g| g.index()).collect();
        let mut mean_of = vec![0.0; n_levels];
        for &i in &levels {
            mean_of[i] = sum[i] / count[i] as f64;
        }

        let within_ss = data
            .records()
            .iter()
            .map(|r| {
                let d = r.response - mean_of[r.group.index()];
                d * d
            })
            .sum();

        Self {
            counts: levels.iter().map(|&i| count[i] as f64).collect(),
            means: levels.iter().map(|&i| mean_of[i]).collect(),
            levels,
            within_ss,
            n_obs: data.len(),
        }
    }

    pub fn n_groups(&self) -> usize {
        self.levels.len()
    }

    /// All observed groups have the same size.
    pub fn is_balanced(&self) -> bool {
        self.counts.windows(2).all(|w| w[0] == w[1])
    }

    /// GLS intercept for a variance ratio `θ`.
    fn gls_intercept(&self, theta: f64) -> f64 {
        let mut num = 0.0;
        let mut den = 0.0;
        for (&n, &m) in self.counts.iter().zip(&self.means) {
            let w = n / (1.0 + n * theta);
            num += w * m;
            den += w;
        }
        num / den
    }

    /// `(Q(θ), μ̂(θ))`.
    fn profile_q(&self, theta: f64) -> (f64, f64) {
        let mu = self.gls_intercept(theta);
        let between: f64 = self
            .counts
            .iter()
            .zip(&self.means)
            .map(|(&n, &m)| n * (m - mu) * (m - mu) / (1.0 + n * theta))
            .sum();
        (self.within_ss + between, mu)
    }

    /// `-2ℓ(θ)` up to a constant.
    fn neg2_profile_reml(&self, theta: f64) -> f64 {
        let (q, _) = self.profile_q(theta);
        let log_det: f64 = self.counts.iter().map(|&n| (1.0 + n * theta).ln()).sum();
        let info: f64 = self.counts.iter().map(|&n| n / (1.0 + n * theta)).sum();
        (self.n_obs as f64 - 1.0) * q.ln() + log_det + info.ln()
    }
}

/// Partial pooling via a REML-fitted random intercept.
pub fn fit_random_intercept(train: &GroupedDataset, opts: &RemlOptions) -> Result<FittedModel> {
    let stats = GroupStats::from_dataset(train);
    let j = stats.n_groups();
    if j < 2 {
        return Err(CredError::invalid(format!(
            "random intercept needs at least 2 observed groups (got {j})"
        )));
    }
    if stats.n_obs <= j {
        return Err(CredError::invalid(format!(
            "random intercept needs within-group replication (n = {}, groups = {j})",
            stats.n_obs
        )));
    }

    let components = if stats.is_balanced() {
        balanced_reml(&stats)
    } else {
        profile_reml(&stats, opts)?
    };
    if !(components.vhm.is_finite() && components.epv.is_finite() && components.epv > 0.0) {
        return Err(CredError::numerical(format!(
            "REML produced invalid variance components (vhm = {}, epv = {})",
            components.vhm, components.epv
        )));
    }
    if components.boundary {
        log::warn!("random intercept fit is singular: between-group variance estimated at 0");
    }
    log::debug!(
        "REML: vhm = {:.6}, epv = {:.6}, intercept = {:.6}, log_reml = {:.6}",
        components.vhm,
        components.epv,
        components.intercept,
        components.log_reml
    );

    let mut values = vec![None; train.n_levels()];
    for ((&level, &n), &m) in stats.levels.iter().zip(&stats.counts).zip(&stats.means) {
        let z = n * components.vhm / (n * components.vhm + components.epv);
        values[level] = Some(components.intercept + z * (m - components.intercept));
    }
    let predictor = Predictor::PerGroup(values);
    let residuals = compute_residuals(train, &predictor)?;

    Ok(FittedModel {
        kind: ModelKind::RandomIntercept,
        predictor,
        residuals,
        df_residual: (stats.n_obs - N_PARAMS) as f64,
        variance: Some(components),
    })
}

/// Closed-form REML for equal group sizes.
pub fn balanced_reml(stats: &GroupStats) -> VarianceComponents {
    let n_total = stats.n_obs as f64;
    let j = stats.n_groups() as f64;
    let n = stats.counts[0];

    let grand = stats.means.iter().sum::<f64>() / j;
    let between_ss: f64 = stats.means.iter().map(|m| n * (m - grand) * (m - grand)).sum();
    let ms_between = between_ss / (j - 1.0);
    let ms_within = stats.within_ss / (n_total - j);

    let (vhm, epv, boundary) = if ms_between > ms_within {
        ((ms_between - ms_within) / n, ms_within, false)
    } else {
        (0.0, (stats.within_ss + between_ss) / (n_total - 1.0), true)
    };

    let theta = vhm / epv;
    VarianceComponents {
        vhm,
        epv,
        intercept: grand,
        log_reml: log_reml_at(stats, theta),
        boundary,
    }
}

/// Numerical profile REML for unequal group sizes.
pub fn profile_reml(stats: &GroupStats, opts: &RemlOptions) -> Result<VarianceComponents> {
    if opts.grid_steps < 3 || !(opts.log_theta_max > opts.log_theta_min) {
        return Err(CredError::invalid("REML grid needs >= 3 steps over a non-empty range"));
    }

    let objective = |t: f64| stats.neg2_profile_reml(t.exp());
    let step = (opts.log_theta_max - opts.log_theta_min) / (opts.grid_steps - 1) as f64;
    let grid: Vec<f64> = (0..opts.grid_steps)
        .map(|i| opts.log_theta_min + i as f64 * step)
        .collect();

    let mut best_idx = 0;
    let mut best_val = f64::INFINITY;
    for (i, &t) in grid.iter().enumerate() {
        let v = objective(t);
        if v < best_val {
            best_idx = i;
            best_val = v;
        }
    }
    if !best_val.is_finite() {
        return Err(CredError::numerical("REML objective is not finite on the search grid"));
    }

    let lo = grid[best_idx.saturating_sub(1)];
    let hi = grid[(best_idx + 1).min(grid.len() - 1)];
    let (t_hat, val, iters) = golden_section_min(objective, lo, hi, opts.tol, opts.max_iter);
    log::debug!("REML golden-section: ln(theta) = {t_hat:.8} after {iters} iterations");

    // The interior optimum competes with the σ²_A = 0 boundary.
    let (theta, boundary) = if stats.neg2_profile_reml(0.0) <= val {
        (0.0, true)
    } else {
        (t_hat.exp(), false)
    };

    let (q, mu) = stats.profile_q(theta);
    let epv = q / (stats.n_obs as f64 - 1.0);
    Ok(VarianceComponents {
        vhm: theta * epv,
        epv,
        intercept: mu,
        log_reml: log_reml_at(stats, theta),
        boundary,
    })
}

/// Restricted log-likelihood (up to a constant) at ratio `θ` with σ² profiled out.
fn log_reml_at(stats: &GroupStats, theta: f64) -> f64 {
    let dof = stats.n_obs as f64 - 1.0;
    -0.5 * (stats.neg2_profile_reml(theta) - dof * dof.ln() + dof)
}

/// Minimise a unimodal function on `[a, b]`. Returns `(x, f(x), iterations)`.
fn golden_section_min<F: Fn(f64) -> f64>(
    f: F,
    mut a: f64,
    mut b: f64,
    tol: f64,
    max_iter: usize,
) -> (f64, f64, usize) {
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);
    let mut iters = 0;

    while (b - a).abs() > tol && iters < max_iter {
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = f(d);
        }
        iters += 1;
    }

    let x = 0.5 * (a + b);
    (x, f(x), iters)
}
