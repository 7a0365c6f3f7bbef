//! ModelForge Core - model types, expressions and solver contracts
//!
//! This crate provides the fundamental abstractions for ModelForge:
//! - Data instances and sources for index-templated families
//! - Variable and constraint families
//! - Linear, quadratic and nonlinear expressions
//! - Models and their expansion into concrete rows and columns
//! - Solver capabilities, solutions and the optimizer contract
//! - Bounded-denominator rational conversion

pub mod capability;
pub mod constraint;
pub mod error;
pub mod expr;
pub mod func;
pub mod goal;
pub mod model;
pub mod optimizer;
pub mod rational;
pub mod solution;
pub mod source;
pub mod value;
pub mod variable;

pub use capability::{Features, SolverCapability};
pub use constraint::{Constraint, Sense};
pub use error::{EvalError, ModelForgeError, Result};
pub use expr::{
    AbsoluteTerm, BilinearTerm, Expr, IndicatorTerm, LinearExpr, LinearTerm, MinMaxOp, MinMaxTerm,
    MultiTerm, NonlinearExpr, NonlinearKind, NonlinearTerm, PiecewiseMethod, PiecewiseTerm,
    QuadraticExpr, QuadraticTerm, ScalarFn,
};
pub use func::{Coefficient, IndexFn, Link, MultiCoefficient, MultiPredicate, Predicate};
pub use goal::{undesired_deviations, Deviation, Goal, GoalMetadata};
pub use model::{
    Column, ExpandedModel, ExpandedObjective, ExpandedSos, IntegerRow, Model, Objective,
    ObjectiveSense, Row, SosKind, SosSet, VarKey,
};
pub use optimizer::Optimizer;
pub use rational::{RationalAlgorithm, RationalConverter};
pub use solution::{Solution, SolutionStatus, VariableValue};
pub use source::{CartesianProduct, DataQuery, DataSource, Dimension, FilteredQuery};
pub use value::Value;
pub use variable::{VarKind, Variable};
