//! ModelForge Goal - goal programming
//!
//! Soft constraints marked with [`Constraint::as_goal`](modelforge_core::Constraint::as_goal)
//! are relaxed into hard equalities with deviation variables and solved
//! either as one weighted objective or as a sequence of lexicographic
//! stages:
//! - [`relax`] - deviation relaxation with goal records per instance
//! - [`objective`] - priority weights and stage objectives
//! - [`solver`] - weighted and sequential solving through an
//!   [`Optimizer`](modelforge_core::Optimizer)

pub mod objective;
pub mod relax;
pub mod solver;

pub use objective::{priority_weight, GoalObjectiveBuilder, PriorityObjective};
pub use relax::{relax, relax_model, relax_with, RelaxedConstraint, RelaxedModel};
pub use solver::{DeviationRecord, GoalProgrammingSolver, GoalSolution, GoalStage};
