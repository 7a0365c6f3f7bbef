//! Small builders shared by tests.
//!
//! # Example
//!
//! ```
//! use modelforge_core::SolutionStatus;
//! use modelforge_test::fixtures::{bounded, model_with, solution_with};
//!
//! let x = bounded("x", 0.0, 5.0);
//! let model = model_with(&[&x]);
//! assert_eq!(model.variables().len(), 1);
//!
//! let solution = solution_with(SolutionStatus::Optimal, &[("x", 2.5)]);
//! assert_eq!(solution.value("x"), Some(2.5));
//! ```

use modelforge_core::{Model, Solution, SolutionStatus, Variable, VarKey};

/// Continuous scalar family with finite bounds.
pub fn bounded(name: &str, lower: f64, upper: f64) -> Variable {
    Variable::continuous(name).bounds(lower, upper)
}

/// Model named `test` holding the given families.
///
/// # Panics
///
/// Panics on duplicate names.
pub fn model_with(variables: &[&Variable]) -> Model {
    let mut model = Model::new("test");
    for var in variables {
        model
            .add_variable((*var).clone())
            .expect("fixture variable names must be unique");
    }
    model
}

/// Solution with the given status and scalar values.
pub fn solution_with(status: SolutionStatus, values: &[(&str, f64)]) -> Solution {
    let mut solution = Solution::new(status);
    for &(family, value) in values {
        solution.set_value(&VarKey::scalar(family), value);
    }
    solution
}
