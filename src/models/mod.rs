//! Fitted model representation shared by the three estimators.

pub mod model;

pub use model::*;
