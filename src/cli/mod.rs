//! Command-line parsing for the credibility explorer.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! estimation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ScenarioParams;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "cred",
    version,
    about = "Random-intercept models as Bühlmann credibility, on synthetic grouped data"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the built-in scenarios (baseline, high_between, low_between) or a TOML file of scenarios.
    Run(RunArgs),
    /// Run a single scenario with custom parameters.
    Scenario(ScenarioArgs),
    /// Vary the between-group standard deviation and report how Z responds.
    Sweep(SweepArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Random seed, applied once for the whole run.
    #[arg(long, env = "CRED_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Re-seed with `seed + index` before each scenario.
    #[arg(long)]
    pub reseed_each: bool,

    /// Write all scenario reports to a JSON file.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Write per-scenario held-out predictions as CSV files into this directory.
    #[arg(long, value_name = "DIR")]
    pub export_csv: Option<PathBuf>,

    /// Print only the summary table.
    #[arg(long)]
    pub summary_only: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// TOML file with `[[scenario]]` entries (defaults to the built-in scenarios).
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Distributional parameters, defaulting to the baseline scenario.
#[derive(Debug, Args, Clone)]
pub struct ParamArgs {
    /// Mean of the latent group means.
    #[arg(long, default_value_t = 100.0)]
    pub mu_groups: f64,

    /// Standard deviation of the latent group means.
    #[arg(long, default_value_t = 40.0)]
    pub sd_groups: f64,

    /// Within-group observation standard deviation.
    #[arg(long, default_value_t = 40.0)]
    pub sd_obs: f64,

    /// Number of groups.
    #[arg(long, default_value_t = 100)]
    pub n_groups: usize,

    /// Training observations per group.
    #[arg(long, default_value_t = 10)]
    pub obs_per_group: usize,

    /// Held-out observations per group.
    #[arg(long, default_value_t = 3)]
    pub test_obs_per_group: usize,
}

impl From<&ParamArgs> for ScenarioParams {
    fn from(a: &ParamArgs) -> Self {
        ScenarioParams {
            mu_groups: a.mu_groups,
            sd_groups: a.sd_groups,
            sd_obs: a.sd_obs,
            n_groups: a.n_groups,
            obs_per_group: a.obs_per_group,
            test_obs_per_group: a.test_obs_per_group,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct ScenarioArgs {
    /// Label used in reports and export file names.
    #[arg(long, default_value = "custom")]
    pub name: String,

    #[command(flatten)]
    pub params: ParamArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SweepArgs {
    /// Between-group standard deviations to try (comma separated).
    #[arg(
        long = "sd-groups-values",
        value_delimiter = ',',
        num_args = 1..,
        default_values_t = [5.0, 10.0, 20.0, 40.0, 80.0, 160.0]
    )]
    pub sd_groups_values: Vec<f64>,

    #[command(flatten)]
    pub params: ParamArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scenario_args_map_to_params() {
        let cli = Cli::parse_from([
            "cred",
            "scenario",
            "--sd-groups",
            "100",
            "--sd-obs",
            "5",
            "--n-groups",
            "20",
        ]);
        let Command::Scenario(args) = cli.command else {
            panic!("expected scenario subcommand");
        };
        let params = ScenarioParams::from(&args.params);
        assert_eq!(params.sd_groups, 100.0);
        assert_eq!(params.sd_obs, 5.0);
        assert_eq!(params.n_groups, 20);
        assert_eq!(params.obs_per_group, 10);
    }

    #[test]
    fn sweep_values_split_on_commas() {
        let cli = Cli::parse_from(["cred", "sweep", "--sd-groups-values", "1,2.5,10"]);
        let Command::Sweep(args) = cli.command else {
            panic!("expected sweep subcommand");
        };
        assert_eq!(args.sd_groups_values, vec![1.0, 2.5, 10.0]);
    }
}
