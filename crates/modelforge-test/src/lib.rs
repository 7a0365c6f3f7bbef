//! Shared test fixtures for ModelForge crates.
//!
//! - [`optimizer`] - a scripted [`Optimizer`](modelforge_core::Optimizer) that replays canned solutions
//! - [`feasibility`] - row and bound checks over expanded models
//! - [`fixtures`] - small model builders and solution helpers
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! modelforge-test = { workspace = true }
//! ```

pub mod feasibility;
pub mod fixtures;
pub mod optimizer;

pub use feasibility::{
    all_satisfied, feasible_interval, feasible_interval_at, row_satisfied, Assignment, TOLERANCE,
};
pub use fixtures::{bounded, model_with, solution_with};
pub use optimizer::ScriptedOptimizer;
