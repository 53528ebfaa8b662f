//! Model fitting.
//!
//! Responsibilities:
//!
//! - fit the grand-mean and group-means regressions (least squares)
//! - fit the random-intercept model (REML)

pub mod fitter;
pub mod reml;

pub use fitter::*;
pub use reml::*;
