//! Shared scenario pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! generate -> fit -> credibility -> mix -> evaluate
//!
//! Each stage receives its inputs explicitly; a scenario either completes
//! every stage or fails as a whole with the stage named in the error.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::credibility::{
    CredibilityEstimate, DEFAULT_REL_TOL, MixSummary, estimate_credibility, implied_weights,
};
use crate::data::{SampleData, generate};
use crate::domain::{Scenario, ScenarioParams, ScenarioSet};
use crate::error::{CredError, Result, Stage};
use crate::fit::{ModelFits, RemlOptions, fit_all};
use crate::models::VarianceComponents;
use crate::report::{ModelScore, evaluate};

/// How a batch of scenarios draws its random numbers.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub seed: u64,
    /// Re-seed with `seed + index` before each scenario instead of sharing one stream.
    pub reseed_each: bool,
    pub reml: RemlOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            reseed_each: false,
            reml: RemlOptions::default(),
        }
    }
}

/// Summary of the implied-weight check.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MixStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub degenerate_rows: usize,
    /// Largest distance of a row weight from the estimated `Z`.
    pub max_abs_deviation: f64,
    pub consistent: bool,
}

/// Serializable result of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub params: ScenarioParams,
    pub n_train: usize,
    pub n_test: usize,
    pub credibility: CredibilityEstimate,
    /// `Z` implied by the generating parameters.
    pub z_population: f64,
    pub random_intercept: VarianceComponents,
    pub mix: MixStats,
    pub scores: Vec<ModelScore>,
}

/// Everything a scenario produced, for reports and exports.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub report: ScenarioReport,
    pub sample: SampleData,
    pub fits: ModelFits,
    pub mix: MixSummary,
}

/// Run one scenario on the given random stream.
pub fn run_scenario(
    rng: &mut StdRng,
    scenario: &Scenario,
    reml: &RemlOptions,
) -> Result<ScenarioRun> {
    let name = scenario.name.as_str();
    let params = &scenario.params;
    log::info!("scenario '{name}': starting ({params:?})");

    params
        .validate_for_credibility()
        .map_err(|e| e.in_scenario(name, Stage::Validate))?;

    let sample = generate(rng, params).map_err(|e| e.in_scenario(name, Stage::Generate))?;

    let fits = fit_all(&sample.train, reml).map_err(|e| e.in_scenario(name, Stage::Fit))?;
    let random_intercept = fits
        .random_intercept
        .variance()
        .copied()
        .ok_or_else(|| {
            CredError::numerical("random intercept fit has no variance components")
                .in_scenario(name, Stage::Fit)
        })?;

    let credibility =
        estimate_credibility(&fits.grand_mean, &fits.group_means, params.obs_per_group)
            .map_err(|e| e.in_scenario(name, Stage::Credibility))?;
    log::info!(
        "scenario '{name}': Z = {:.6} (VHM = {:.4}, EPV = {:.4})",
        credibility.z,
        credibility.vhm,
        credibility.epv
    );

    let mix = mix_on_training_rows(&sample, &fits).map_err(|e| e.in_scenario(name, Stage::Mix))?;
    let mix_stats = MixStats {
        min: mix.min,
        max: mix.max,
        mean: mix.mean,
        degenerate_rows: mix.degenerate_rows.len(),
        max_abs_deviation: mix.max_abs_deviation(credibility.z),
        consistent: mix.is_consistent_with(credibility.z, DEFAULT_REL_TOL),
    };
    if !mix_stats.consistent {
        log::warn!(
            "scenario '{name}': implied weights deviate from Z by up to {:.3e}",
            mix_stats.max_abs_deviation
        );
    }

    let scores = evaluate(&fits, &sample.test).map_err(|e| e.in_scenario(name, Stage::Evaluate))?;
    log::info!("scenario '{name}': done");

    let report = ScenarioReport {
        name: name.to_string(),
        params: params.clone(),
        n_train: sample.train.len(),
        n_test: sample.test.len(),
        credibility,
        z_population: params.population_credibility(),
        random_intercept,
        mix: mix_stats,
        scores,
    };

    Ok(ScenarioRun {
        report,
        sample,
        fits,
        mix,
    })
}

/// Run scenarios in order.
///
/// The seed is applied once and every scenario continues the same stream,
/// unless `reseed_each` is set.
pub fn run_all(set: &ScenarioSet, opts: &RunOptions) -> Result<Vec<ScenarioRun>> {
    if set.scenarios.is_empty() {
        return Err(CredError::invalid("no scenarios to run"));
    }
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut runs = Vec::with_capacity(set.scenarios.len());
    for (i, scenario) in set.scenarios.iter().enumerate() {
        if opts.reseed_each {
            rng = StdRng::seed_from_u64(opts.seed.wrapping_add(i as u64));
        }
        runs.push(run_scenario(&mut rng, scenario, &opts.reml)?);
    }
    Ok(runs)
}

/// One scenario per between-group standard deviation, other parameters fixed.
pub fn sweep_set(base: &ScenarioParams, sd_groups: &[f64]) -> ScenarioSet {
    ScenarioSet {
        scenarios: sd_groups
            .iter()
            .map(|&sd| {
                Scenario::new(
                    format!("sd_groups={sd}"),
                    ScenarioParams {
                        sd_groups: sd,
                        ..base.clone()
                    },
                )
            })
            .collect(),
    }
}

fn mix_on_training_rows(sample: &SampleData, fits: &ModelFits) -> Result<MixSummary> {
    let pooled = fits.grand_mean.predict_dataset(&sample.train)?;
    let grouped = fits.group_means.predict_dataset(&sample.train)?;
    let shrunk = fits.random_intercept.predict_dataset(&sample.train)?;
    implied_weights(&pooled, &grouped, &shrunk)
}
