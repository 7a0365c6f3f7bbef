//! ModelForge Linearize - reformulation of nonlinear terms
//!
//! This crate turns the nonlinear parts of a [`Model`](modelforge_core::Model)
//! into linear rows over auxiliary variables:
//! - Bilinear products (AND logic, Big-M, McCormick envelopes)
//! - Piecewise-linear approximation of scalar functions (SOS2, incremental)
//! - Absolute values, min/max and indicator constraints
//! - A capability-gated engine that only rewrites what the target solver
//!   cannot handle natively
//!
//! # Example
//!
//! ```
//! use modelforge_core::{Model, NonlinearExpr, SolverCapability, Variable};
//! use modelforge_linearize::LinearizationEngine;
//!
//! let b = Variable::binary_named("open");
//! let v = Variable::continuous("flow").bounds(0.0, 10.0);
//! let mut model = Model::new("depot");
//! model.add_variable(b.clone()).unwrap();
//! model.add_variable(v.clone()).unwrap();
//! model.maximize(NonlinearExpr::new().bilinear(&b, &v, 1.0));
//!
//! let linear = LinearizationEngine::new(SolverCapability::ortools())
//!     .linearize(&model)
//!     .unwrap();
//! let expanded = linear.expand().unwrap();
//! assert_eq!(expanded.num_columns(), 3);
//! assert_eq!(expanded.num_rows(), 4);
//! ```

pub mod auxiliary;
pub mod bilinear;
pub mod domain;
pub mod engine;
pub mod piecewise;

pub use auxiliary::{AuxNamer, Auxiliary};
pub use bilinear::BilinearLinearizer;
pub use domain::Domain;
pub use engine::{LinearizationEngine, LinearizationReport};
pub use piecewise::{breakpoints, PiecewiseApproximation, PiecewiseLinearizer};
