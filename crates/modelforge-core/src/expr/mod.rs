//! Expression model.
//!
//! Constraints and objectives hold an [`Expr`], a closed sum over linear,
//! quadratic and nonlinear containers.

mod linear;
mod nonlinear;
mod quadratic;

#[cfg(test)]
mod tests;

pub use linear::{LinearExpr, LinearTerm, MultiTerm};
pub use nonlinear::{
    AbsoluteTerm, BilinearTerm, IndicatorTerm, MinMaxOp, MinMaxTerm, NonlinearExpr, NonlinearKind,
    NonlinearTerm, PiecewiseMethod, PiecewiseTerm, ScalarFn,
};
pub use quadratic::{QuadraticExpr, QuadraticTerm};

use crate::variable::Variable;

/// Expression attached to a constraint or objective.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Purely linear.
    Linear(LinearExpr),
    /// Linear plus quadratic terms.
    Quadratic(QuadraticExpr),
    /// Linear plus nonlinear terms.
    Nonlinear(NonlinearExpr),
}

impl Expr {
    /// Builds the narrowest expression for the given parts.
    ///
    /// Quadratic terms that share an expression with nonlinear terms are
    /// carried as bilinear terms.
    pub fn from_parts(
        linear: LinearExpr,
        quadratic: Vec<QuadraticTerm>,
        nonlinear: Vec<NonlinearTerm>,
    ) -> Self {
        if !nonlinear.is_empty() {
            let mut expr = NonlinearExpr::from_linear(linear);
            for q in quadratic {
                expr.push(NonlinearTerm::Bilinear(BilinearTerm {
                    var1: q.var1,
                    var2: q.var2,
                    coeff: q.coeff,
                }));
            }
            for term in nonlinear {
                expr.push(term);
            }
            Expr::Nonlinear(expr)
        } else if !quadratic.is_empty() {
            Expr::Quadratic(QuadraticExpr {
                linear,
                terms: quadratic,
                constant: 0.0,
            })
        } else {
            Expr::Linear(linear)
        }
    }

    /// Splits into linear part, quadratic terms and nonlinear terms.
    ///
    /// The quadratic constant is folded into the linear part.
    pub fn into_parts(self) -> (LinearExpr, Vec<QuadraticTerm>, Vec<NonlinearTerm>) {
        match self {
            Expr::Linear(l) => (l, Vec::new(), Vec::new()),
            Expr::Quadratic(q) => {
                let mut linear = q.linear;
                linear.add_constant(q.constant);
                (linear, q.terms, Vec::new())
            }
            Expr::Nonlinear(n) => {
                let (linear, terms) = n.into_parts();
                (linear, Vec::new(), terms)
            }
        }
    }

    /// Returns the linear part.
    pub fn linear(&self) -> &LinearExpr {
        match self {
            Expr::Linear(l) => l,
            Expr::Quadratic(q) => &q.linear,
            Expr::Nonlinear(n) => &n.linear,
        }
    }

    /// Returns the quadratic terms (empty unless quadratic).
    pub fn quadratic_terms(&self) -> &[QuadraticTerm] {
        match self {
            Expr::Quadratic(q) => &q.terms,
            _ => &[],
        }
    }

    /// Returns the nonlinear terms (empty unless nonlinear).
    pub fn nonlinear_terms(&self) -> &[NonlinearTerm] {
        match self {
            Expr::Nonlinear(n) => n.terms(),
            _ => &[],
        }
    }

    /// Total constant offset.
    pub fn constant(&self) -> f64 {
        match self {
            Expr::Quadratic(q) => q.linear.constant() + q.constant,
            _ => self.linear().constant(),
        }
    }

    /// Returns true when only linear terms remain.
    pub fn is_linear(&self) -> bool {
        self.quadratic_terms().is_empty() && self.nonlinear_terms().is_empty()
    }

    /// Adds a linear expression to the linear part.
    pub fn add_linear(&mut self, other: LinearExpr) {
        match self {
            Expr::Linear(l) => l.merge(other),
            Expr::Quadratic(q) => q.linear.merge(other),
            Expr::Nonlinear(n) => n.linear.merge(other),
        }
    }

    /// Every variable family referenced anywhere in the expression.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars: Vec<&Variable> = self.linear().variables().collect();
        for q in self.quadratic_terms() {
            vars.push(&q.var1);
            vars.push(&q.var2);
        }
        for term in self.nonlinear_terms() {
            vars.extend(term.variables());
        }
        vars
    }
}

impl Default for Expr {
    fn default() -> Self {
        Expr::Linear(LinearExpr::new())
    }
}

impl From<LinearExpr> for Expr {
    fn from(expr: LinearExpr) -> Self {
        Expr::Linear(expr)
    }
}

impl From<QuadraticExpr> for Expr {
    fn from(expr: QuadraticExpr) -> Self {
        Expr::Quadratic(expr)
    }
}

impl From<NonlinearExpr> for Expr {
    fn from(expr: NonlinearExpr) -> Self {
        Expr::Nonlinear(expr)
    }
}

impl From<&Variable> for Expr {
    fn from(var: &Variable) -> Self {
        Expr::Linear(LinearExpr::from(var))
    }
}
