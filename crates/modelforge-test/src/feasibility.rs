//! Feasibility checks over expanded models.
//!
//! Reformulations are verified by fixing every column but one and asking
//! which values the rows still allow for the remaining one.
//!
//! # Example
//!
//! ```
//! use modelforge_core::{Constraint, LinearExpr, Model, Variable};
//! use modelforge_test::{feasible_interval, Assignment};
//!
//! let x = Variable::continuous("x").bounds(0.0, 10.0);
//! let y = Variable::continuous("y").bounds(0.0, 10.0);
//! let mut model = Model::new("m");
//! model.add_variable(x.clone()).unwrap();
//! model.add_variable(y.clone()).unwrap();
//! model
//!     .add_constraint(Constraint::new("sum").lhs(LinearExpr::new().term(&x, 1.0).term(&y, 1.0)).le(6.0))
//!     .unwrap();
//!
//! let expanded = model.expand().unwrap();
//! let fixed = Assignment::new().set("x", 4.0);
//! assert_eq!(feasible_interval(&expanded, &fixed, "y"), Some((0.0, 2.0)));
//! ```

use std::collections::HashMap;

use modelforge_core::{ExpandedModel, Row, Sense, Value, VarKey};

/// Absolute tolerance used by every check in this module.
pub const TOLERANCE: f64 = 1e-9;

/// Values for concrete columns. Unassigned columns read as `0.0`.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    values: HashMap<VarKey, f64>,
}

impl Assignment {
    /// Creates an empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a scalar family.
    pub fn set(mut self, family: &str, value: f64) -> Self {
        self.values.insert(VarKey::scalar(family), value);
        self
    }

    /// Assigns `family[key]`.
    pub fn set_at(mut self, family: &str, key: impl Into<Value>, value: f64) -> Self {
        self.values.insert(VarKey::new(family, key.into()), value);
        self
    }

    /// Assigns a concrete column in place.
    pub fn insert(&mut self, key: VarKey, value: f64) {
        self.values.insert(key, value);
    }

    /// Value of a concrete column.
    pub fn get(&self, key: &VarKey) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Dense column vector in the expanded model's column order.
    pub fn to_vector(&self, expanded: &ExpandedModel) -> Vec<f64> {
        expanded.columns().iter().map(|c| self.get(&c.key)).collect()
    }
}

/// Returns true if `row` holds under the assignment.
pub fn row_satisfied(expanded: &ExpandedModel, row: &Row, assignment: &Assignment) -> bool {
    row.is_satisfied(&assignment.to_vector(expanded), TOLERANCE)
}

/// Returns true if every row and every column bound holds.
pub fn all_satisfied(expanded: &ExpandedModel, assignment: &Assignment) -> bool {
    let values = assignment.to_vector(expanded);
    let bounds_ok = expanded
        .columns()
        .iter()
        .zip(&values)
        .all(|(c, &v)| v >= c.lower - TOLERANCE && v <= c.upper + TOLERANCE);
    bounds_ok && expanded.rows().iter().all(|r| r.is_satisfied(&values, TOLERANCE))
}

/// Range of values the scalar column `family` may take when every other
/// column is fixed by `assignment`.
///
/// Returns `None` when no value is feasible, including when a row that
/// does not involve the column is violated.
pub fn feasible_interval(
    expanded: &ExpandedModel,
    assignment: &Assignment,
    family: &str,
) -> Option<(f64, f64)> {
    feasible_interval_at(expanded, assignment, &VarKey::scalar(family))
}

/// Like [`feasible_interval`] for an indexed column.
pub fn feasible_interval_at(
    expanded: &ExpandedModel,
    assignment: &Assignment,
    key: &VarKey,
) -> Option<(f64, f64)> {
    let target = expanded.column(key)?;
    let values = assignment.to_vector(expanded);
    let column = &expanded.columns()[target];
    let (mut lo, mut hi) = (column.lower, column.upper);

    for row in expanded.rows() {
        let mut a = 0.0;
        let mut rest = 0.0;
        for &(col, c) in &row.coeffs {
            if col == target {
                a += c;
            } else {
                rest += c * values[col];
            }
        }
        if a == 0.0 {
            if !row.sense.holds(rest, row.rhs, TOLERANCE) {
                return None;
            }
            continue;
        }
        let bound = (row.rhs - rest) / a;
        let sense = if a < 0.0 { row.sense.flipped() } else { row.sense };
        match sense {
            Sense::Le => hi = hi.min(bound),
            Sense::Ge => lo = lo.max(bound),
            Sense::Eq => {
                lo = lo.max(bound);
                hi = hi.min(bound);
            }
        }
    }

    if lo > hi + TOLERANCE {
        None
    } else {
        Some((lo, hi.max(lo)))
    }
}
