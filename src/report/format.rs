//! Formatted terminal output.
//!
//! We keep formatting code in one place so the estimators stay free of
//! presentation concerns and output changes are localized.

use crate::app::pipeline::ScenarioReport;
use crate::report::best_model;

/// Full report for one scenario.
pub fn format_scenario(report: &ScenarioReport) -> String {
    let p = &report.params;
    let c = &report.credibility;
    let ri = &report.random_intercept;
    let mut out = String::new();

    out.push_str(&format!("=== Scenario: {} ===\n", report.name));
    out.push_str(&format!(
        "Params: mu_groups={} sd_groups={} sd_obs={} n_groups={} obs_per_group={} test_obs_per_group={}\n",
        p.mu_groups, p.sd_groups, p.sd_obs, p.n_groups, p.obs_per_group, p.test_obs_per_group
    ));
    out.push_str(&format!("Rows: train={} test={}\n", report.n_train, report.n_test));

    out.push_str("\nCredibility (ANOVA moments):\n");
    out.push_str(&format!(
        "  SSE pooled={:.3} (df={})  SSE grouped={:.3} (df={})\n",
        c.sse_pooled, c.df_pooled, c.sse_grouped, c.df_grouped
    ));
    out.push_str(&format!("  MSA={:.4}  MSRes={:.4}\n", c.msa, c.ms_res));
    out.push_str(&format!(
        "  VHM={:.4}  EPV={:.4}  k={}\n",
        c.vhm,
        c.epv,
        fmt_k(c.k)
    ));
    out.push_str(&format!(
        "  Z={:.6}  (population Z={:.6})\n",
        c.z, report.z_population
    ));
    if c.is_anomalous() {
        out.push_str("  note: moment estimate outside [0, 1]; reported unclamped\n");
    }

    out.push_str("\nRandom intercept (REML):\n");
    out.push_str(&format!(
        "  intercept={:.4}  VHM={:.4}  EPV={:.4}{}\n",
        ri.intercept,
        ri.vhm,
        ri.epv,
        if ri.boundary { "  (singular fit)" } else { "" }
    ));

    let m = &report.mix;
    out.push_str("\nImplied weight per training row:\n");
    out.push_str(&format!(
        "  min={:.9} max={:.9} mean={:.9}\n",
        m.min, m.max, m.mean
    ));
    out.push_str(&format!(
        "  max |w - Z|={:.3e}  degenerate rows={}  consistent={}\n",
        m.max_abs_deviation, m.degenerate_rows, m.consistent
    ));

    out.push_str("\nHeld-out RMSE:\n");
    let best = best_model(&report.scores).map(|s| s.model);
    for s in &report.scores {
        let mark = if Some(s.model) == best { "*" } else { " " };
        out.push_str(&format!(
            "{mark} {:<17} {:.4}\n",
            s.model.display_name(),
            s.rmse
        ));
    }

    out
}

/// One line per scenario: name, estimated and population `Z`, best model.
pub fn format_summary_table(reports: &[ScenarioReport]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<20} {:>10} {:>10} {:>10} {:>10}  {}\n",
        "scenario", "sd_groups", "sd_obs", "Z", "Z_pop", "best"
    ));
    out.push_str(&format!("{}\n", "-".repeat(80)));
    for r in reports {
        let best = best_model(&r.scores)
            .map(|s| s.model.display_name())
            .unwrap_or("-");
        out.push_str(&format!(
            "{:<20} {:>10.3} {:>10.3} {:>10.6} {:>10.6}  {}\n",
            truncate(&r.name, 20),
            r.params.sd_groups,
            r.params.sd_obs,
            r.credibility.z,
            r.z_population,
            best
        ));
    }
    out
}

fn fmt_k(k: f64) -> String {
    if k.is_finite() {
        format!("{k:.4}")
    } else {
        "inf".to_string()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('~');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_names() {
        assert_eq!(truncate("baseline", 20), "baseline");
        assert_eq!(truncate("abcdef", 4), "abc~");
    }

    #[test]
    fn infinite_k_prints_inf() {
        assert_eq!(fmt_k(f64::INFINITY), "inf");
        assert_eq!(fmt_k(0.5), "0.5000");
    }
}
