use approx::assert_relative_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use credibility_lmm::app::pipeline::{RunOptions, ScenarioRun, run_all, run_scenario};
use credibility_lmm::credibility::{DEFAULT_REL_TOL, credibility_factor, estimate_credibility};
use credibility_lmm::data::generate;
use credibility_lmm::domain::{ModelKind, Scenario, ScenarioParams, ScenarioSet};
use credibility_lmm::error::{CredError, Stage};
use credibility_lmm::fit::{RemlOptions, fit_grand_mean, fit_group_means};
use credibility_lmm::io::{write_predictions_csv, write_results_json};
use credibility_lmm::report::rmse;

fn run_one(seed: u64, name: &str, params: ScenarioParams) -> ScenarioRun {
    let mut rng = StdRng::seed_from_u64(seed);
    run_scenario(&mut rng, &Scenario::new(name, params), &RemlOptions::default()).unwrap()
}

/// Row weights equal the estimator's Z whenever the moment VHM is positive.
/// A non-positive moment VHM puts REML on its zero boundary, where the
/// shrinkage prediction is the grand mean and every row weight is 0.
fn assert_mix_matches(run: &ScenarioRun) {
    let z = run.report.credibility.z;
    if run.report.credibility.vhm > 0.0 {
        assert!(
            run.mix.is_consistent_with(z, DEFAULT_REL_TOL),
            "scenario {}: max |w - Z| = {:e}",
            run.report.name,
            run.mix.max_abs_deviation(z)
        );
        assert!(run.report.mix.consistent);
        assert!(!run.report.random_intercept.boundary);
    } else {
        assert!(run.report.random_intercept.boundary);
        assert!(z <= 0.0);
        for w in run.mix.weights.iter().flatten() {
            assert!(w.abs() < 1e-9, "boundary weight {w}");
        }
    }
}

#[test]
fn builtin_scenarios_recover_credibility_weight() {
    let runs = run_all(&ScenarioSet::builtin(), &RunOptions::default()).unwrap();
    assert_eq!(runs.len(), 3);
    for run in &runs {
        assert_mix_matches(run);
        assert!(run.mix.degenerate_rows.is_empty());
        assert_eq!(run.report.scores.len(), 3);
        for s in &run.report.scores {
            assert!(s.rmse.is_finite() && s.rmse >= 0.0);
        }
    }
}

#[test]
fn mix_matches_across_seeds() {
    for seed in 0..10 {
        let run = run_one(seed, "baseline", ScenarioParams::default());
        assert_mix_matches(&run);
    }
}

#[test]
fn estimator_agrees_with_reml_variance_components() {
    let run = run_one(5, "baseline", ScenarioParams::default());
    let c = &run.report.credibility;
    let ri = &run.report.random_intercept;
    assert!(c.vhm > 0.0);
    assert_relative_eq!(ri.vhm, c.vhm, max_relative = 1e-9);
    assert_relative_eq!(ri.epv, c.epv, max_relative = 1e-9);
}

#[test]
fn between_group_dominance_pushes_z_toward_one() {
    let params = ScenarioParams {
        sd_groups: 100.0,
        sd_obs: 5.0,
        ..ScenarioParams::default()
    };
    for seed in 0..5 {
        let run = run_one(seed, "high_between", params.clone());
        let z = run.report.credibility.z;
        assert!(z > 0.9 && z <= 1.0, "seed {seed}: Z = {z}");
    }
}

#[test]
fn within_group_dominance_pushes_z_toward_zero() {
    let params = ScenarioParams {
        sd_groups: 5.0,
        sd_obs: 100.0,
        ..ScenarioParams::default()
    };
    let zs: Vec<f64> = (0..20)
        .map(|seed| run_one(seed, "low_between", params.clone()).report.credibility.z)
        .collect();
    let mean_z = zs.iter().sum::<f64>() / zs.len() as f64;
    assert!(mean_z < 0.2, "mean Z = {mean_z}, all: {zs:?}");
    assert!(zs.iter().all(|z| *z < 1.0));
}

#[test]
fn baseline_generation_shapes() {
    let mut rng = StdRng::seed_from_u64(42);
    let data = generate(&mut rng, &ScenarioParams::default()).unwrap();
    assert_eq!(data.train.len(), 1000);
    assert_eq!(data.test.len(), 300);
    for r in data.train.records().iter().chain(data.test.records()) {
        assert!((1..=100).contains(&r.group.0));
    }
}

#[test]
fn credibility_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(9);
    let data = generate(&mut rng, &ScenarioParams::default()).unwrap();
    let gm = fit_grand_mean(&data.train).unwrap();
    let gr = fit_group_means(&data.train).unwrap();
    let a = credibility_factor(&gm, &gr, 10).unwrap();
    let b = credibility_factor(&gm, &gr, 10).unwrap();
    assert_eq!(a.to_bits(), b.to_bits());
}

#[test]
fn minimum_configuration_gives_finite_z() {
    let params = ScenarioParams {
        n_groups: 2,
        obs_per_group: 2,
        ..ScenarioParams::default()
    };
    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = generate(&mut rng, &params).unwrap();
        let gm = fit_grand_mean(&data.train).unwrap();
        let gr = fit_group_means(&data.train).unwrap();
        let est = estimate_credibility(&gm, &gr, 2).unwrap();
        assert!(est.z.is_finite());
        assert_eq!(est.df_pooled, 3.0);
        assert_eq!(est.df_grouped, 2.0);

        let run = run_one(seed, "minimal", params.clone());
        assert!(run.report.credibility.z.is_finite());
    }
}

#[test]
fn single_group_fails_loudly() {
    let params = ScenarioParams {
        n_groups: 1,
        ..ScenarioParams::default()
    };

    // Directly through the estimator: df1 == df2.
    let mut rng = StdRng::seed_from_u64(1);
    let data = generate(&mut rng, &params).unwrap();
    let gm = fit_grand_mean(&data.train).unwrap();
    let gr = fit_group_means(&data.train).unwrap();
    assert!(matches!(
        credibility_factor(&gm, &gr, params.obs_per_group),
        Err(CredError::DegenerateDivision { .. })
    ));

    // Through the pipeline: rejected before any model is fitted.
    let mut rng = StdRng::seed_from_u64(1);
    let err = run_scenario(
        &mut rng,
        &Scenario::new("single", params),
        &RemlOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CredError::Scenario {
            stage: Stage::Validate,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn partial_pooling_is_competitive_out_of_sample() {
    let run = run_one(3, "baseline", ScenarioParams::default());
    let score = |kind: ModelKind| {
        run.report
            .scores
            .iter()
            .find(|s| s.model == kind)
            .map(|s| s.rmse)
            .unwrap()
    };
    let ri = score(ModelKind::RandomIntercept);
    let gm = score(ModelKind::GrandMean);
    // Groups differ by ~40 while test noise is ~40, so ignoring groups costs a lot.
    assert!(ri < gm, "random intercept {ri} vs grand mean {gm}");
}

#[test]
fn rmse_basics() {
    let y = [3.0, 1.0, 4.0, 1.0, 5.0];
    assert_eq!(rmse(&y, &y).unwrap(), 0.0);
    assert!(rmse(&y, &[0.0; 5]).unwrap() > 0.0);
}

#[test]
fn exports_write_json_and_csv() {
    let opts = RunOptions::default();
    let runs = run_all(&ScenarioSet::builtin(), &opts).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("results.json");
    let reports: Vec<_> = runs.iter().map(|r| r.report.clone()).collect();
    write_results_json(&json_path, &reports, &opts).unwrap();
    let text = std::fs::read_to_string(&json_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["tool"], "cred");
    assert_eq!(value["seed"], 42);
    assert_eq!(value["scenarios"].as_array().unwrap().len(), 3);
    assert_eq!(value["scenarios"][0]["name"], "baseline");
    assert!(value["scenarios"][0]["credibility"]["z"].is_number());

    let csv_path = write_predictions_csv(dir.path(), &runs[0]).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "group,observed,grand_mean,group_means,random_intercept"
    );
    assert_eq!(lines.count(), 300);
}

#[test]
fn thousand_group_scenario_runs_quickly() {
    let params = ScenarioParams {
        n_groups: 1000,
        ..ScenarioParams::default()
    };
    let start = std::time::Instant::now();
    let run = run_one(4, "many_groups", params);
    let elapsed = start.elapsed();
    assert!(elapsed.as_secs_f64() < 5.0, "took {elapsed:?}");
    assert_eq!(run.sample.train.len(), 10_000);
    assert_eq!(run.report.credibility.df_grouped, 9_000.0);
    assert_mix_matches(&run);
}
