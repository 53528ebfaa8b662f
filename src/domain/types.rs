//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - passed explicitly between pipeline stages (no shared "current scenario")
//! - loaded from TOML scenario files
//! - exported to JSON alongside the results

use serde::{Deserialize, Serialize};

use crate::error::{CredError, Result};

/// A 1-based group label.
///
/// Labels behave like factor levels: a dataset with `n_groups` levels uses
/// exactly the labels `1..=n_groups`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl GroupId {
    /// Zero-based level index.
    pub fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }

    pub fn from_index(index: usize) -> Self {
        GroupId(index as u32 + 1)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One observation: which group it came from and the observed response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub group: GroupId,
    pub response: f64,
}

/// An ordered, immutable set of grouped observations.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedDataset {
    n_levels: usize,
    records: Vec<Record>,
}

impl GroupedDataset {
    /// Build a dataset, checking that every record uses one of the `n_levels` labels.
    pub fn new(n_levels: usize, records: Vec<Record>) -> Result<Self> {
        if n_levels == 0 {
            return Err(CredError::invalid("a dataset needs at least one group level"));
        }
        if let Some(bad) = records
            .iter()
            .find(|r| r.group.0 == 0 || r.group.index() >= n_levels)
        {
            return Err(CredError::invalid(format!(
                "group label {} is outside 1..={n_levels}",
                bad.group
            )));
        }
        if let Some(bad) = records.iter().find(|r| !r.response.is_finite()) {
            return Err(CredError::invalid(format!(
                "non-finite response {} in group {}",
                bad.response, bad.group
            )));
        }
        Ok(Self { n_levels, records })
    }

    pub fn n_levels(&self) -> usize {
        self.n_levels
    }

    pub fn levels(&self) -> impl Iterator<Item = GroupId> {
        (0..self.n_levels).map(GroupId::from_index)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn responses(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.response).collect()
    }

    /// Per-level observation counts, indexed by `GroupId::index`.
    pub fn group_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_levels];
        for r in &self.records {
            counts[r.group.index()] += 1;
        }
        counts
    }

    /// Levels that have at least one observation.
    pub fn observed_levels(&self) -> Vec<GroupId> {
        self.group_counts()
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(i, _)| GroupId::from_index(i))
            .collect()
    }
}

/// Latent per-group means drawn once per scenario.
///
/// Shared by a scenario's train and test sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMeans(pub Vec<f64>);

impl GroupMeans {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, group: GroupId) -> Option<f64> {
        self.0.get(group.index()).copied()
    }
}

/// Distributional parameters for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub mu_groups: f64,
    pub sd_groups: f64,
    pub sd_obs: f64,
    pub n_groups: usize,
    pub obs_per_group: usize,
    pub test_obs_per_group: usize,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            mu_groups: 100.0,
            sd_groups: 40.0,
            sd_obs: 40.0,
            n_groups: 100,
            obs_per_group: 10,
            test_obs_per_group: 3,
        }
    }
}

impl ScenarioParams {
    /// Check the constraints the generator needs.
    pub fn validate(&self) -> Result<()> {
        if !self.mu_groups.is_finite() {
            return Err(CredError::invalid("mu_groups must be finite"));
        }
        if !(self.sd_groups.is_finite() && self.sd_groups >= 0.0) {
            return Err(CredError::invalid(format!(
                "sd_groups must be finite and >= 0 (got {})",
                self.sd_groups
            )));
        }
        if !(self.sd_obs.is_finite() && self.sd_obs > 0.0) {
            return Err(CredError::invalid(format!(
                "sd_obs must be finite and > 0 (got {})",
                self.sd_obs
            )));
        }
        if self.n_groups == 0 {
            return Err(CredError::invalid("n_groups must be >= 1"));
        }
        if self.n_groups > u32::MAX as usize {
            return Err(CredError::invalid("n_groups is too large"));
        }
        if self.obs_per_group == 0 {
            return Err(CredError::invalid("obs_per_group must be >= 1"));
        }
        if self.test_obs_per_group == 0 {
            return Err(CredError::invalid("test_obs_per_group must be >= 1"));
        }
        Ok(())
    }

    /// Stricter check used before a credibility factor is computed.
    ///
    /// Between-group variance needs two groups and within-group variance needs
    /// two observations per group.
    pub fn validate_for_credibility(&self) -> Result<()> {
        self.validate()?;
        if self.n_groups < 2 {
            return Err(CredError::invalid(format!(
                "n_groups must be >= 2 to estimate between-group variance (got {})",
                self.n_groups
            )));
        }
        if self.obs_per_group < 2 {
            return Err(CredError::invalid(format!(
                "obs_per_group must be >= 2 to leave within-group degrees of freedom (got {})",
                self.obs_per_group
            )));
        }
        Ok(())
    }

    /// Credibility factor implied by the true generating parameters.
    pub fn population_credibility(&self) -> f64 {
        let vhm = self.sd_groups * self.sd_groups;
        if vhm == 0.0 {
            return 0.0;
        }
        let epv = self.sd_obs * self.sd_obs;
        let n = self.obs_per_group as f64;
        n / (n + epv / vhm)
    }
}

/// A named scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(flatten)]
    pub params: ScenarioParams,
}

impl Scenario {
    pub fn new(name: impl Into<String>, params: ScenarioParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// An ordered list of scenarios, as read from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    #[serde(rename = "scenario", default)]
    pub scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    /// Baseline plus the two variance regimes.
    pub fn builtin() -> Self {
        let baseline = ScenarioParams::default();
        Self {
            scenarios: vec![
                Scenario::new("baseline", baseline.clone()),
                Scenario::new(
                    "high_between",
                    ScenarioParams {
                        sd_groups: 100.0,
                        sd_obs: 5.0,
                        ..baseline.clone()
                    },
                ),
                Scenario::new(
                    "low_between",
                    ScenarioParams {
                        sd_groups: 5.0,
                        sd_obs: 100.0,
                        ..baseline
                    },
                ),
            ],
        }
    }
}

/// Which estimator produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Complete pooling.
    GrandMean,
    /// No pooling.
    GroupMeans,
    /// Partial pooling.
    RandomIntercept,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::GrandMean,
        ModelKind::GroupMeans,
        ModelKind::RandomIntercept,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::GrandMean => "grand mean",
            ModelKind::GroupMeans => "group means",
            ModelKind::RandomIntercept => "random intercept",
        }
    }
}
