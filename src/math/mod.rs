//! Mathematical utilities: least squares and slice statistics.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
