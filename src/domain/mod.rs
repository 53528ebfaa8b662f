//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - grouped observations (`GroupId`, `Record`, `GroupedDataset`, `GroupMeans`)
//! - scenario parameters (`ScenarioParams`, `Scenario`, `ScenarioSet`)
//! - the estimator labels (`ModelKind`)

pub mod types;

pub use types::*;
