//! Synthetic grouped data generation.
//!
//! A scenario draws its latent group means once and then derives both the
//! train and the test set from them. Rows are laid out round-robin: row `i`
//! belongs to group `(i mod n_groups) + 1`.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::domain::{GroupId, GroupMeans, GroupedDataset, Record, ScenarioParams};
use crate::error::{CredError, Result};

/// Train/test split generated from one set of latent group means.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub means: GroupMeans,
    pub train: GroupedDataset,
    pub test: GroupedDataset,
}

/// Generate a scenario's train and test sets.
///
/// Draw order on `rng`: `n_groups` latent means, then the train rows, then
/// the test rows. The caller owns the random stream, so seeding happens once
/// outside this function.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, params: &ScenarioParams) -> Result<SampleData> {
    params.validate()?;

    let means = draw_group_means(rng, params.mu_groups, params.sd_groups, params.n_groups)?;
    let train = draw_observations(rng, &means, params.obs_per_group, params.sd_obs)?;
    let test = draw_observations(rng, &means, params.test_obs_per_group, params.sd_obs)?;

    log::debug!(
        "generated {} train / {} test rows over {} groups",
        train.len(),
        test.len(),
        means.len()
    );

    Ok(SampleData { means, train, test })
}

/// Draw `n_groups` latent means from `Normal(mu, sd)`.
pub fn draw_group_means<R: Rng + ?Sized>(
    rng: &mut R,
    mu: f64,
    sd: f64,
    n_groups: usize,
) -> Result<GroupMeans> {
    if n_groups == 0 {
        return Err(CredError::invalid("n_groups must be >= 1"));
    }
    let dist = Normal::new(mu, sd)
        .map_err(|e| CredError::invalid(format!("group mean distribution: {e}")))?;
    Ok(GroupMeans((0..n_groups).map(|_| dist.sample(rng)).collect()))
}

/// Draw `per_group` observations for every group around the given means.
pub fn draw_observations<R: Rng + ?Sized>(
    rng: &mut R,
    means: &GroupMeans,
    per_group: usize,
    sd_obs: f64,
) -> Result<GroupedDataset> {
    if means.is_empty() {
        return Err(CredError::invalid("no group means to sample around"));
    }
    if per_group == 0 {
        return Err(CredError::invalid("observations per group must be >= 1"));
    }
    if !(sd_obs.is_finite() && sd_obs > 0.0) {
        return Err(CredError::invalid(format!("sd_obs must be > 0 (got {sd_obs})")));
    }
    let noise = Normal::new(0.0, sd_obs)
        .map_err(|e| CredError::invalid(format!("observation noise distribution: {e}")))?;

    let n_groups = means.len();
    let n_rows = n_groups.checked_mul(per_group).ok_or_else(|| {
        CredError::invalid(format!(
            "{n_groups} groups x {per_group} observations overflows the row count"
        ))
    })?;
    let mut records = Vec::with_capacity(n_rows);
    for i in 0..n_rows {
        let group = GroupId::from_index(i % n_groups);
        let response = means.0[i % n_groups] + noise.sample(rng);
        records.push(Record { group, response });
    }

    GroupedDataset::new(n_groups, records)
}
