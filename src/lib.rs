//! `credibility-lmm` library crate.
//!
//! Demonstrates that a random-intercept mixed model predicts exactly the
//! Bühlmann credibility-weighted blend of the grand mean and the group means.
//!
//! The binary (`cred`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - each stage (generate, fit, credibility, mix, evaluate) is reusable on its own

pub mod app;
pub mod cli;
pub mod credibility;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;

pub use error::{CredError, Result};
