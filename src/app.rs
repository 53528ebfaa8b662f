//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initialises logging
//! - parses CLI arguments
//! - runs the scenario pipeline
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, CommonArgs};
use crate::domain::{Scenario, ScenarioParams, ScenarioSet};
use crate::error::Result;
use crate::fit::RemlOptions;

pub mod pipeline;

use pipeline::{RunOptions, ScenarioRun};

/// Entry point for the `cred` binary.
pub fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    // `cred` and `cred --seed 7` behave like `cred run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => {
            let set = match &args.config {
                Some(path) => crate::io::read_scenarios_toml(path)?,
                None => ScenarioSet::builtin(),
            };
            handle_set(&set, &args.common)
        }
        Command::Scenario(args) => {
            let set = ScenarioSet {
                scenarios: vec![Scenario::new(args.name.clone(), ScenarioParams::from(&args.params))],
            };
            handle_set(&set, &args.common)
        }
        Command::Sweep(args) => {
            let base = ScenarioParams::from(&args.params);
            let set = pipeline::sweep_set(&base, &args.sd_groups_values);
            handle_set(&set, &args.common)
        }
    }
}

fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    // A second initialisation (e.g. from tests) is harmless.
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn handle_set(set: &ScenarioSet, common: &CommonArgs) -> Result<()> {
    let opts = run_options(common);
    let runs = pipeline::run_all(set, &opts)?;
    print_runs(&runs, common.summary_only);
    write_exports(&runs, common, &opts)
}

pub fn run_options(common: &CommonArgs) -> RunOptions {
    RunOptions {
        seed: common.seed,
        reseed_each: common.reseed_each,
        reml: RemlOptions::default(),
    }
}

fn print_runs(runs: &[ScenarioRun], summary_only: bool) {
    if !summary_only {
        for run in runs {
            println!("{}", crate::report::format_scenario(&run.report));
        }
    }
    let reports: Vec<_> = runs.iter().map(|r| r.report.clone()).collect();
    println!("{}", crate::report::format_summary_table(&reports));
}

fn write_exports(runs: &[ScenarioRun], common: &CommonArgs, opts: &RunOptions) -> Result<()> {
    if let Some(path) = &common.export_json {
        let reports: Vec<_> = runs.iter().map(|r| r.report.clone()).collect();
        crate::io::write_results_json(path, &reports, opts)?;
    }
    if let Some(dir) = &common.export_csv {
        for run in runs {
            let path = crate::io::write_predictions_csv(dir, run)?;
            log::info!("wrote {}", path.display());
        }
    }
    Ok(())
}

/// Rewrite argv so `cred` defaults to `cred run`.
///
/// Rules:
/// - `cred`                       -> `cred run`
/// - `cred --seed 7 ...`          -> `cred run --seed 7 ...`
/// - `cred --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "scenario" | "sweep");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}
