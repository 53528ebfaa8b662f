//! Input/output helpers.
//!
//! - scenario TOML loading (`scenarios`)
//! - per-scenario prediction CSVs (`export`)
//! - run results JSON (`results`)

pub mod export;
pub mod results;
pub mod scenarios;

pub use export::*;
pub use results::*;
pub use scenarios::*;
