//! Solver capability descriptors.
//!
//! A [`SolverCapability`] tells the linearization engine which constructs
//! a backend handles natively. Everything else is reformulated before the
//! model reaches the solver.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::error::{ModelForgeError, Result};
use crate::expr::NonlinearKind;
use crate::model::ExpandedModel;

/// Set of solver features.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Features(u32);

impl Features {
    /// Linear constraints and objective.
    pub const LINEAR: Features = Features(1);
    /// Integer variables.
    pub const INTEGER: Features = Features(1 << 1);
    /// Binary variables.
    pub const BINARY: Features = Features(1 << 2);
    /// Convex quadratic objective.
    pub const QUADRATIC_CONVEX: Features = Features(1 << 3);
    /// Nonconvex quadratic terms.
    pub const QUADRATIC_NONCONVEX: Features = Features(1 << 4);
    /// Second-order cone constraints.
    pub const SOCP: Features = Features(1 << 5);
    /// SOS1 sets.
    pub const SOS1: Features = Features(1 << 6);
    /// SOS2 sets.
    pub const SOS2: Features = Features(1 << 7);
    /// Indicator constraints.
    pub const INDICATOR: Features = Features(1 << 8);
    /// Native piecewise-linear and general constraints (abs, min, max).
    pub const PIECEWISE_LINEAR: Features = Features(1 << 9);
    /// Integer-only coefficients.
    pub const RATIONAL_ONLY: Features = Features(1 << 10);

    const NAMES: [(Features, &'static str); 11] = [
        (Features::LINEAR, "LINEAR"),
        (Features::INTEGER, "INTEGER"),
        (Features::BINARY, "BINARY"),
        (Features::QUADRATIC_CONVEX, "QUADRATIC_CONVEX"),
        (Features::QUADRATIC_NONCONVEX, "QUADRATIC_NONCONVEX"),
        (Features::SOCP, "SOCP"),
        (Features::SOS1, "SOS1"),
        (Features::SOS2, "SOS2"),
        (Features::INDICATOR, "INDICATOR"),
        (Features::PIECEWISE_LINEAR, "PIECEWISE_LINEAR"),
        (Features::RATIONAL_ONLY, "RATIONAL_ONLY"),
    ];

    /// The empty set.
    pub const fn empty() -> Self {
        Features(0)
    }

    /// Returns true if every feature of `other` is present.
    pub const fn contains(self, other: Features) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no feature is present.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set union.
    pub const fn union(self, other: Features) -> Self {
        Features(self.0 | other.0)
    }
}

impl BitOr for Features {
    type Output = Features;

    fn bitor(self, rhs: Features) -> Features {
        self.union(rhs)
    }
}

impl BitOrAssign for Features {
    fn bitor_assign(&mut self, rhs: Features) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Features::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "Features(empty)")
        } else {
            write!(f, "Features({})", names.join(" | "))
        }
    }
}

const MIXED_INTEGER: Features = Features::LINEAR
    .union(Features::INTEGER)
    .union(Features::BINARY);

/// What a solver backend supports.
///
/// # Example
///
/// ```
/// use modelforge_core::{Features, NonlinearKind, SolverCapability};
///
/// let milp = SolverCapability::mixed_integer();
/// assert!(milp.supports(Features::BINARY));
/// assert!(milp.needs_linearization(NonlinearKind::Bilinear));
///
/// let gurobi = SolverCapability::gurobi();
/// assert!(!gurobi.needs_linearization(NonlinearKind::Indicator));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SolverCapability {
    /// Backend name.
    pub name: String,
    /// Supported features.
    pub features: Features,
    /// Maximum number of columns, if limited.
    pub max_variables: Option<usize>,
    /// Maximum number of rows, if limited.
    pub max_constraints: Option<usize>,
}

impl SolverCapability {
    /// Creates a descriptor without size limits.
    pub fn new(name: impl Into<String>, features: Features) -> Self {
        Self {
            name: name.into(),
            features,
            max_variables: None,
            max_constraints: None,
        }
    }

    /// Sets size limits.
    pub fn with_limits(mut self, max_variables: Option<usize>, max_constraints: Option<usize>) -> Self {
        self.max_variables = max_variables;
        self.max_constraints = max_constraints;
        self
    }

    /// Pure LP solver.
    pub fn linear_programming() -> Self {
        Self::new("lp", Features::LINEAR)
    }

    /// Generic MILP solver.
    pub fn mixed_integer() -> Self {
        Self::new("milp", MIXED_INTEGER)
    }

    /// OR-Tools linear solver wrapper.
    pub fn ortools() -> Self {
        Self::new("ortools", MIXED_INTEGER)
    }

    /// Gurobi.
    pub fn gurobi() -> Self {
        Self::new(
            "gurobi",
            MIXED_INTEGER
                | Features::QUADRATIC_CONVEX
                | Features::QUADRATIC_NONCONVEX
                | Features::SOCP
                | Features::SOS1
                | Features::SOS2
                | Features::INDICATOR
                | Features::PIECEWISE_LINEAR,
        )
    }

    /// CPLEX.
    pub fn cplex() -> Self {
        Self::new(
            "cplex",
            MIXED_INTEGER
                | Features::QUADRATIC_CONVEX
                | Features::SOCP
                | Features::SOS1
                | Features::SOS2
                | Features::INDICATOR,
        )
    }

    /// OR-Tools CP-SAT.
    pub fn cpsat() -> Self {
        Self::new(
            "cpsat",
            MIXED_INTEGER | Features::INDICATOR | Features::RATIONAL_ONLY,
        )
    }

    /// Returns true if the feature set contains `feature`.
    pub fn supports(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }

    /// Returns true if terms of `kind` must be reformulated for this solver.
    ///
    /// Products are judged conservatively (nonconvex). A square term in a
    /// minimized objective can still stay native on convex-only solvers;
    /// see [`SolverCapability::supports_product`].
    pub fn needs_linearization(&self, kind: NonlinearKind) -> bool {
        let required = match kind {
            NonlinearKind::Bilinear => Features::QUADRATIC_NONCONVEX,
            NonlinearKind::Absolute | NonlinearKind::MinMax | NonlinearKind::PiecewiseLinear => {
                Features::PIECEWISE_LINEAR
            }
            NonlinearKind::Indicator => Features::INDICATOR,
        };
        !self.supports(required)
    }

    /// Returns true if a product term can be passed through natively.
    ///
    /// Without nonconvex support only `coeff * x * x` with `coeff >= 0` in a
    /// minimized objective qualifies.
    pub fn supports_product(&self, is_square: bool, coeff: f64, in_minimized_objective: bool) -> bool {
        self.supports(Features::QUADRATIC_NONCONVEX)
            || (is_square
                && coeff >= 0.0
                && in_minimized_objective
                && self.supports(Features::QUADRATIC_CONVEX))
    }

    /// Checks an expanded model against the size limits.
    pub fn check_scale(&self, model: &ExpandedModel) -> Result<()> {
        if let Some(max) = self.max_variables {
            if model.num_columns() > max {
                return Err(ModelForgeError::Unsupported(format!(
                    "{} supports at most {} variables, model has {}",
                    self.name,
                    max,
                    model.num_columns()
                )));
            }
        }
        if let Some(max) = self.max_constraints {
            if model.num_rows() > max {
                return Err(ModelForgeError::Unsupported(format!(
                    "{} supports at most {} constraints, model has {}",
                    self.name,
                    max,
                    model.num_rows()
                )));
            }
        }
        Ok(())
    }
}

impl Default for SolverCapability {
    fn default() -> Self {
        Self::mixed_integer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::variable::Variable;

    #[test]
    fn test_feature_set_operations() {
        let f = Features::LINEAR | Features::SOS2;
        assert!(f.contains(Features::SOS2));
        assert!(!f.contains(Features::SOS1));
        assert!(f.contains(Features::LINEAR | Features::SOS2));
        assert!(Features::empty().is_empty());
        assert_eq!(format!("{:?}", f), "Features(LINEAR | SOS2)");
    }

    #[test]
    fn test_presets() {
        let lp = SolverCapability::linear_programming();
        assert!(!lp.supports(Features::INTEGER));
        for kind in [
            NonlinearKind::Bilinear,
            NonlinearKind::Absolute,
            NonlinearKind::MinMax,
            NonlinearKind::Indicator,
            NonlinearKind::PiecewiseLinear,
        ] {
            assert!(lp.needs_linearization(kind));
            assert!(!SolverCapability::gurobi().needs_linearization(kind));
        }
        let cplex = SolverCapability::cplex();
        assert!(cplex.needs_linearization(NonlinearKind::Bilinear));
        assert!(cplex.supports_product(true, 1.0, true));
        assert!(!cplex.supports_product(true, -1.0, true));
        assert!(!cplex.supports_product(true, 1.0, false));
        assert!(!cplex.supports_product(false, 1.0, true));
        assert!(SolverCapability::gurobi().supports_product(false, -1.0, false));
        assert!(SolverCapability::cpsat().supports(Features::RATIONAL_ONLY));
    }

    #[test]
    fn test_check_scale() {
        let mut model = Model::new("m");
        model
            .add_variable(Variable::continuous("x").from_data([1, 2, 3]))
            .unwrap();
        let expanded = model.expand().unwrap();
        let small = SolverCapability::mixed_integer().with_limits(Some(2), None);
        assert!(small.check_scale(&expanded).unwrap_err().is_unsupported());
        let big = SolverCapability::mixed_integer().with_limits(Some(3), Some(0));
        assert!(big.check_scale(&expanded).is_ok());
    }
}
