//! Linear expressions over variable families.

use std::collections::HashMap;
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

use crate::func::{Coefficient, Link, MultiCoefficient, MultiPredicate, Predicate};
use crate::variable::Variable;

/// `coefficient * variable`, summed over the family's instances that pass
/// the filter (and, inside an indexed constraint, the link).
#[derive(Debug, Clone)]
pub struct LinearTerm {
    /// The variable family.
    pub var: Variable,
    /// Per-instance coefficient.
    pub coeff: Coefficient,
    /// Optional instance filter.
    pub filter: Option<Predicate>,
    /// Optional binding to the row instance of an indexed constraint.
    pub link: Option<Link>,
}

impl LinearTerm {
    /// Creates a term.
    pub fn new(var: &Variable, coeff: impl Into<Coefficient>) -> Self {
        Self {
            var: var.clone(),
            coeff: coeff.into(),
            filter: None,
            link: None,
        }
    }

    /// Adds a filter (AND-combined with any existing one).
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(&predicate),
            None => predicate,
        });
        self
    }

    /// Adds a link (AND-combined with any existing one).
    pub fn link(mut self, link: Link) -> Self {
        self.link = Some(match self.link {
            Some(existing) => existing.and(&link),
            None => link,
        });
        self
    }

    /// Returns the term with its coefficient multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            coeff: self.coeff.scaled(factor),
            ..self.clone()
        }
    }

    fn absorb(&mut self, other: LinearTerm) {
        self.coeff = self.coeff.plus(&other.coeff);
        self.filter = match (self.filter.take(), other.filter) {
            (Some(a), Some(b)) => Some(a.and(&b)),
            (a, b) => a.or(b),
        };
        self.link = match (self.link.take(), other.link) {
            (Some(a), Some(b)) => Some(a.and(&b)),
            (a, b) => a.or(b),
        };
    }
}

/// Term over a cartesian-indexed variable whose coefficient and filter see
/// the tuple components.
#[derive(Debug, Clone)]
pub struct MultiTerm {
    /// The variable family (instances must be tuples).
    pub var: Variable,
    /// Coefficient over tuple components.
    pub coeff: MultiCoefficient,
    /// Optional filter over tuple components.
    pub filter: Option<MultiPredicate>,
}

/// A linear expression: variable terms, multi-dimensional terms and a constant.
///
/// Adding a term for a variable that already has one sums the coefficient
/// functions and AND-combines the filters.
///
/// # Example
///
/// ```
/// use modelforge_core::{LinearExpr, Variable};
///
/// let x = Variable::continuous("x");
/// let y = Variable::continuous("y");
///
/// let expr = LinearExpr::new().term(&x, 2.0).term(&y, 1.0).term(&x, 3.0) + 4.0;
/// assert_eq!(expr.len(), 2);
/// assert_eq!(expr.term_for("x").unwrap().coeff.as_constant(), Some(5.0));
/// assert_eq!(expr.constant(), 4.0);
///
/// let scaled = expr * 2.0;
/// assert_eq!(scaled.term_for("y").unwrap().coeff.as_constant(), Some(2.0));
/// assert_eq!(scaled.constant(), 8.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LinearExpr {
    terms: Vec<LinearTerm>,
    positions: HashMap<Arc<str>, usize>,
    multi_terms: Vec<MultiTerm>,
    constant: f64,
}

impl LinearExpr {
    /// Creates an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a constant expression.
    pub fn from_constant(constant: f64) -> Self {
        Self {
            constant,
            ..Self::default()
        }
    }

    /// Adds `coeff * var`.
    pub fn term(mut self, var: &Variable, coeff: impl Into<Coefficient>) -> Self {
        self.add_term(LinearTerm::new(var, coeff));
        self
    }

    /// Adds `coeff * var` restricted to instances passing `filter`.
    pub fn term_where(
        mut self,
        var: &Variable,
        coeff: impl Into<Coefficient>,
        filter: Predicate,
    ) -> Self {
        self.add_term(LinearTerm::new(var, coeff).filter(filter));
        self
    }

    /// Adds a prepared term.
    pub fn with_term(mut self, term: LinearTerm) -> Self {
        self.add_term(term);
        self
    }

    /// Adds a multi-dimensional term.
    pub fn multi_term(
        mut self,
        var: &Variable,
        coeff: impl Into<MultiCoefficient>,
        filter: Option<MultiPredicate>,
    ) -> Self {
        self.multi_terms.push(MultiTerm {
            var: var.clone(),
            coeff: coeff.into(),
            filter,
        });
        self
    }

    /// Adds a term in place, merging with an existing term for the same variable.
    pub fn add_term(&mut self, term: LinearTerm) {
        match self.positions.get(term.var.name()) {
            Some(&pos) => self.terms[pos].absorb(term),
            None => {
                self.positions.insert(term.var.name_arc(), self.terms.len());
                self.terms.push(term);
            }
        }
    }

    /// Adds to the constant.
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Returns the constant.
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Returns the single-variable terms in insertion order.
    pub fn terms(&self) -> &[LinearTerm] {
        &self.terms
    }

    /// Returns the multi-dimensional terms.
    pub fn multi_terms(&self) -> &[MultiTerm] {
        &self.multi_terms
    }

    /// Looks up the term for a variable family.
    pub fn term_for(&self, name: &str) -> Option<&LinearTerm> {
        self.positions.get(name).map(|&pos| &self.terms[pos])
    }

    /// Number of single-variable terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns true if the expression has no variable terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.multi_terms.is_empty()
    }

    /// Iterates over every referenced variable family.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.terms
            .iter()
            .map(|t| &t.var)
            .chain(self.multi_terms.iter().map(|t| &t.var))
    }

    /// Multiplies every coefficient and the constant by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            terms: self.terms.iter().map(|t| t.scaled(factor)).collect(),
            positions: self.positions.clone(),
            multi_terms: self
                .multi_terms
                .iter()
                .map(|t| MultiTerm {
                    var: t.var.clone(),
                    coeff: t.coeff.scaled(factor),
                    filter: t.filter.clone(),
                })
                .collect(),
            constant: self.constant * factor,
        }
    }

    /// Adds every term and the constant of `other`.
    pub fn merge(&mut self, other: LinearExpr) {
        for term in other.terms {
            self.add_term(term);
        }
        self.multi_terms.extend(other.multi_terms);
        self.constant += other.constant;
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self.merge(rhs);
        self
    }
}

impl Add<f64> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: f64) -> LinearExpr {
        self.constant += rhs;
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        self.merge(rhs.scaled(-1.0));
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scaled(-1.0)
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        self.scaled(rhs)
    }
}

impl From<&Variable> for LinearExpr {
    fn from(var: &Variable) -> Self {
        LinearExpr::new().term(var, 1.0)
    }
}
