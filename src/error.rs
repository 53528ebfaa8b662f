use std::path::PathBuf;

use thiserror::Error;

use crate::domain::GroupId;

/// Every failure the library can surface.
///
/// Each variant maps to a process exit code so the binary can report failures
/// without inspecting messages:
///
/// - `2`: invalid user input (parameters, files, flags)
/// - `3`: degenerate data (a denominator vanished)
/// - `4`: numerical or internal failure
#[derive(Debug, Error)]
pub enum CredError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Degenerate division: {quantity} = {value} (cannot divide by it)")]
    DegenerateDivision { quantity: &'static str, value: f64 },

    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Group {group} has no fitted coefficient")]
    UnknownGroup { group: GroupId },

    #[error("Numerical failure: {reason}")]
    NumericalFailure { reason: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Format error: {reason}")]
    Format { reason: String },

    #[error("Scenario '{scenario}' failed during {stage}: {source}")]
    Scenario {
        scenario: String,
        stage: Stage,
        #[source]
        source: Box<CredError>,
    },
}

/// Pipeline stage a scenario failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Generate,
    Fit,
    Credibility,
    Mix,
    Evaluate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Generate => "generate",
            Stage::Fit => "fit",
            Stage::Credibility => "credibility",
            Stage::Mix => "mix",
            Stage::Evaluate => "evaluate",
        };
        f.write_str(name)
    }
}

impl CredError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        CredError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub fn numerical(reason: impl Into<String>) -> Self {
        CredError::NumericalFailure {
            reason: reason.into(),
        }
    }

    pub fn format(reason: impl Into<String>) -> Self {
        CredError::Format {
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CredError::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach scenario and stage context to an error.
    pub fn in_scenario(self, scenario: &str, stage: Stage) -> Self {
        CredError::Scenario {
            scenario: scenario.to_string(),
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping scenario wrappers.
    pub fn root(&self) -> &CredError {
        match self {
            CredError::Scenario { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            CredError::InvalidConfiguration { .. }
            | CredError::Io { .. }
            | CredError::Format { .. } => 2,
            CredError::DegenerateDivision { .. }
            | CredError::LengthMismatch { .. }
            | CredError::UnknownGroup { .. } => 3,
            CredError::NumericalFailure { .. } => 4,
            CredError::Scenario { source, .. } => source.exit_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CredError>;
