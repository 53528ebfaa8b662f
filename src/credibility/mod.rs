//! Credibility theory on top of the fitted models.
//!
//! - `estimator`: Bühlmann `Z` from the two fixed-effect fits
//! - `mixer`: the per-row weight implied by the three models' predictions

pub mod estimator;
pub mod mixer;

pub use estimator::*;
pub use mixer::*;
