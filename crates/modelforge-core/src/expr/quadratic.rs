//! Quadratic expressions.

use super::linear::LinearExpr;
use crate::variable::Variable;

/// `coeff * var1 * var2`.
#[derive(Debug, Clone)]
pub struct QuadraticTerm {
    /// First factor.
    pub var1: Variable,
    /// Second factor.
    pub var2: Variable,
    /// Coefficient.
    pub coeff: f64,
}

impl QuadraticTerm {
    /// Creates a quadratic term.
    pub fn new(var1: &Variable, var2: &Variable, coeff: f64) -> Self {
        Self {
            var1: var1.clone(),
            var2: var2.clone(),
            coeff,
        }
    }

    /// Returns true for `x * x`.
    pub fn is_square(&self) -> bool {
        self.var1.name() == self.var2.name()
    }
}

/// Linear part plus quadratic terms plus a constant.
#[derive(Debug, Clone, Default)]
pub struct QuadraticExpr {
    /// Linear sub-expression.
    pub linear: LinearExpr,
    /// Quadratic terms.
    pub terms: Vec<QuadraticTerm>,
    /// Constant offset.
    pub constant: f64,
}

impl QuadraticExpr {
    /// Creates an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a linear expression.
    pub fn from_linear(linear: LinearExpr) -> Self {
        Self {
            linear,
            terms: Vec::new(),
            constant: 0.0,
        }
    }

    /// Adds `coeff * var1 * var2`.
    pub fn product(mut self, var1: &Variable, var2: &Variable, coeff: f64) -> Self {
        self.terms.push(QuadraticTerm::new(var1, var2, coeff));
        self
    }

    /// Adds a linear term.
    pub fn term(mut self, var: &Variable, coeff: f64) -> Self {
        self.linear = self.linear.term(var, coeff);
        self
    }

    /// Adds to the constant.
    pub fn plus_constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    /// Multiplies every coefficient and the constant by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            linear: self.linear.scaled(factor),
            terms: self
                .terms
                .iter()
                .map(|t| QuadraticTerm {
                    coeff: t.coeff * factor,
                    ..t.clone()
                })
                .collect(),
            constant: self.constant * factor,
        }
    }
}
