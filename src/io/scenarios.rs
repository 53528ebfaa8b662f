//! Load scenario definitions from TOML.
//!
//! ```toml
//! [[scenario]]
//! name = "baseline"
//! sd_groups = 40.0
//! sd_obs = 40.0
//! ```
//!
//! Fields left out take the baseline defaults.

use std::path::Path;

use crate::domain::ScenarioSet;
use crate::error::{CredError, Result};

pub fn read_scenarios_toml(path: &Path) -> Result<ScenarioSet> {
    let text = std::fs::read_to_string(path).map_err(|e| CredError::io(path, e))?;
    parse_scenarios_toml(&text)
}

pub fn parse_scenarios_toml(text: &str) -> Result<ScenarioSet> {
    let set: ScenarioSet =
        toml::from_str(text).map_err(|e| CredError::format(format!("invalid scenario TOML: {e}")))?;
    if set.scenarios.is_empty() {
        return Err(CredError::invalid("scenario file defines no [[scenario]] entries"));
    }
    for s in &set.scenarios {
        s.params.validate().map_err(|e| match e {
            CredError::InvalidConfiguration { reason } => {
                CredError::invalid(format!("scenario '{}': {reason}", s.name))
            }
            other => other,
        })?;
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScenarioParams;

    #[test]
    fn missing_fields_take_defaults() {
        let set = parse_scenarios_toml(
            r#"
            [[scenario]]
            name = "wide"
            sd_groups = 100.0
            sd_obs = 5.0

            [[scenario]]
            name = "plain"
            "#,
        )
        .unwrap();
        assert_eq!(set.scenarios.len(), 2);
        assert_eq!(set.scenarios[0].params.sd_groups, 100.0);
        assert_eq!(set.scenarios[0].params.n_groups, 100);
        assert_eq!(set.scenarios[1].params, ScenarioParams::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_scenarios_toml(
            r#"
            [[scenario]]
            name = "bad"
            sd_obs = -1.0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(parse_scenarios_toml("").is_err());
        assert!(parse_scenarios_toml("[[scenario]]\nname = 3").is_err());
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.toml");
        std::fs::write(&path, "[[scenario]]\nname = \"x\"\nobs_per_group = 4\n").unwrap();
        let set = read_scenarios_toml(&path).unwrap();
        assert_eq!(set.scenarios[0].params.obs_per_group, 4);
    }
}
