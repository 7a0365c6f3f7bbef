//! ModelForge - solver-independent modeling with linearization and goal programming
//!
//! Build a [`Model`] from variable and constraint families, hand it to any
//! [`Optimizer`] and let [`solve_model`] rewrite whatever the backend cannot
//! handle natively.
//!
//! # Example
//!
//! ```rust
//! use modelforge::prelude::*;
//!
//! let x = Variable::continuous("x").bounds(-3.0, 5.0);
//! let mut model = Model::new("distance");
//! model.add_variable(x.clone()).unwrap();
//! model.minimize(NonlinearExpr::new().absolute(&x, 1.0));
//!
//! let engine = LinearizationEngine::new(SolverCapability::mixed_integer());
//! assert!(engine.needs_linearization(&model));
//! let (linear, report) = engine.linearize_with_report(&model).unwrap();
//! assert_eq!(report.absolute, 1);
//! assert!(linear.objective().unwrap().expr.is_linear());
//! ```

pub use modelforge_config::{ConfigError, ModelConfig};
pub use modelforge_core::{
    Constraint, Expr, LinearExpr, Model, ModelForgeError, NonlinearExpr, Optimizer, Result,
    Solution, SolutionStatus, SolverCapability, Variable,
};
pub use modelforge_goal::{GoalProgrammingSolver, GoalSolution};
pub use modelforge_linearize::{LinearizationEngine, LinearizationReport};

#[cfg(feature = "console")]
pub mod console;

mod solver;
pub use solver::{solve_model, SolveOutcome};

pub mod prelude {
    pub use super::{solve_model, SolveOutcome};
    pub use modelforge_config::{DeviationFixing, GoalMode, ModelConfig};
    pub use modelforge_core::{
        Coefficient, Constraint, DataSource, Features, IndexFn, LinearExpr, LinearTerm, Link,
        Model, NonlinearExpr, Objective, ObjectiveSense, Optimizer, PiecewiseMethod,
        PiecewiseTerm, QuadraticExpr, Sense, Solution, SolutionStatus, SolverCapability, Value,
        VarKind, Variable,
    };
    pub use modelforge_goal::{GoalProgrammingSolver, GoalSolution};
    pub use modelforge_linearize::{LinearizationEngine, LinearizationReport};
}
