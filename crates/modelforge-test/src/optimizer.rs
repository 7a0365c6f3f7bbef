//! Scripted optimizer.
//!
//! Replays a queue of canned solutions and records every model it was
//! asked to solve, so orchestration code can be tested without a backend.
//!
//! # Example
//!
//! ```
//! use modelforge_core::{Model, Optimizer, SolutionStatus, SolverCapability};
//! use modelforge_test::{solution_with, ScriptedOptimizer};
//!
//! let mut optimizer = ScriptedOptimizer::new(SolverCapability::linear_programming())
//!     .then(solution_with(SolutionStatus::Optimal, &[("x", 1.0)]));
//!
//! let solution = optimizer.solve(&Model::new("m")).unwrap();
//! assert_eq!(solution.value("x"), Some(1.0));
//! assert_eq!(optimizer.calls(), 1);
//! assert!(optimizer.solve(&Model::new("m")).is_err());
//! ```

use std::collections::VecDeque;

use modelforge_core::{Model, ModelForgeError, Optimizer, Result, Solution, SolverCapability};

/// Optimizer returning pre-recorded solutions in order.
#[derive(Debug, Clone)]
pub struct ScriptedOptimizer {
    capability: SolverCapability,
    script: VecDeque<Solution>,
    models: Vec<Model>,
}

impl ScriptedOptimizer {
    /// Creates an optimizer with an empty script.
    pub fn new(capability: SolverCapability) -> Self {
        Self {
            capability,
            script: VecDeque::new(),
            models: Vec::new(),
        }
    }

    /// Appends a solution to the script.
    pub fn then(mut self, solution: Solution) -> Self {
        self.script.push_back(solution);
        self
    }

    /// Appends a solution in place.
    pub fn push(&mut self, solution: Solution) {
        self.script.push_back(solution);
    }

    /// Number of solve calls so far.
    pub fn calls(&self) -> usize {
        self.models.len()
    }

    /// Every model passed to [`Optimizer::solve`], in call order.
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Solutions not yet returned.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Optimizer for ScriptedOptimizer {
    fn solve(&mut self, model: &Model) -> Result<Solution> {
        self.models.push(model.clone());
        self.script.pop_front().ok_or_else(|| {
            ModelForgeError::Solver(format!(
                "scripted optimizer has no solution left for call {}",
                self.models.len()
            ))
        })
    }

    fn capability(&self) -> SolverCapability {
        self.capability.clone()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
