//! Write run results as JSON.
//!
//! The JSON file holds every scenario report of a run plus the run metadata
//! (tool, timestamp, seed policy) needed to reproduce it.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::pipeline::{RunOptions, ScenarioReport};
use crate::error::{CredError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct RunFile<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub reseed_each: bool,
    pub scenarios: &'a [ScenarioReport],
}

/// Write all scenario reports to a pretty-printed JSON file.
pub fn write_results_json(path: &Path, reports: &[ScenarioReport], opts: &RunOptions) -> Result<()> {
    let file = File::create(path).map_err(|e| CredError::io(path, e))?;

    let run = RunFile {
        tool: "cred",
        generated_at: Utc::now(),
        seed: opts.seed,
        reseed_each: opts.reseed_each,
        scenarios: reports,
    };

    serde_json::to_writer_pretty(file, &run)
        .map_err(|e| CredError::format(format!("failed to write results JSON: {e}")))?;

    log::info!("wrote {} scenario report(s) to {}", reports.len(), path.display());
    Ok(())
}
