//! Export held-out predictions to CSV.
//!
//! One file per scenario, one row per test observation, meant to be easy to
//! consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::app::pipeline::ScenarioRun;
use crate::error::{CredError, Result};

/// Write `<dir>/<scenario>_test.csv` and return its path.
pub fn write_predictions_csv(dir: &Path, run: &ScenarioRun) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| CredError::io(dir, e))?;
    let path = dir.join(format!("{}_test.csv", file_stem(&run.report.name)));
    let file = File::create(&path).map_err(|e| CredError::io(&path, e))?;
    let mut w = BufWriter::new(file);

    let test = &run.sample.test;
    let pooled = run.fits.grand_mean.predict_dataset(test)?;
    let grouped = run.fits.group_means.predict_dataset(test)?;
    let shrunk = run.fits.random_intercept.predict_dataset(test)?;

    writeln!(w, "group,observed,grand_mean,group_means,random_intercept")
        .map_err(|e| CredError::io(&path, e))?;
    for (i, r) in test.records().iter().enumerate() {
        writeln!(
            w,
            "{},{:.10},{:.10},{:.10},{:.10}",
            r.group, r.response, pooled[i], grouped[i], shrunk[i]
        )
        .map_err(|e| CredError::io(&path, e))?;
    }
    w.flush().map_err(|e| CredError::io(&path, e))?;

    Ok(path)
}

/// Scenario name reduced to characters safe in a file name.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "scenario".to_string() } else { stem }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_replaces_unsafe_characters() {
        assert_eq!(file_stem("sd_groups=2.5"), "sd_groups_2_5");
        assert_eq!(file_stem("baseline"), "baseline");
        assert_eq!(file_stem(""), "scenario");
    }
}
