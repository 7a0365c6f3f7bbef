//! Index domains of auxiliary families.
//!
//! Auxiliary variables and constraints built for a term expand over the
//! same keys as the term's indexed operands. Operand instances are tied to
//! the row being expanded with key-equality links.

use std::collections::HashSet;

use modelforge_core::{
    Constraint, LinearExpr, LinearTerm, Link, ModelForgeError, Result, Value, VarKind,
    Variable,
};

/// Key space shared by a term's operands.
#[derive(Debug, Clone)]
pub enum Domain {
    /// Every operand is scalar.
    Scalar,
    /// Auxiliaries align with this indexed operand.
    Indexed(Variable),
}

impl Domain {
    /// Resolves the domain of a set of operands.
    ///
    /// # Errors
    ///
    /// Indexed operands with different key sets are a configuration error.
    pub fn of(vars: &[&Variable]) -> Result<Self> {
        let mut indexed = vars.iter().filter(|v| v.is_indexed());
        let Some(anchor) = indexed.next() else {
            return Ok(Domain::Scalar);
        };
        let mut anchor_keys: Option<HashSet<Value>> = None;
        for other in indexed {
            if other.name() == anchor.name() {
                continue;
            }
            if anchor_keys.is_none() {
                anchor_keys = Some(keys(anchor)?);
            }
            if anchor_keys.as_ref() != Some(&keys(other)?) {
                return Err(ModelForgeError::Config(format!(
                    "indexed operands '{}' and '{}' expand over different keys",
                    anchor.name(),
                    other.name()
                )));
            }
        }
        Ok(Domain::Indexed((*anchor).clone()))
    }

    /// Returns true when auxiliaries are indexed.
    pub fn is_indexed(&self) -> bool {
        matches!(self, Domain::Indexed(_))
    }

    /// A new variable family over this domain.
    pub fn variable(&self, name: String, kind: VarKind) -> Variable {
        let var = Variable::new(name, kind);
        match self {
            Domain::Scalar => var,
            Domain::Indexed(anchor) => var.aligned_with(anchor),
        }
    }

    /// A new constraint family with one row per key of this domain.
    pub fn constraint(&self, name: String) -> Constraint {
        let con = Constraint::new(name);
        match self {
            Domain::Scalar => con,
            Domain::Indexed(anchor) => con.aligned_with(anchor),
        }
    }

    /// `coeff * var`, restricted to the row's key when `var` is indexed.
    pub fn term(&self, var: &Variable, coeff: f64) -> LinearTerm {
        let term = LinearTerm::new(var, coeff);
        match self.link_for(var) {
            Some(link) => term.link(link),
            None => term,
        }
    }

    /// Sum of linked terms.
    pub fn expr(&self, terms: &[(&Variable, f64)]) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for &(var, coeff) in terms {
            expr.add_term(self.term(var, coeff));
        }
        expr
    }

    /// Copy of `expr` with every indexed term tied to the row's key.
    pub fn relink(&self, expr: &LinearExpr) -> LinearExpr {
        let mut out = LinearExpr::from_constant(expr.constant());
        for term in expr.terms() {
            let term = match self.link_for(&term.var) {
                Some(link) => term.clone().link(link),
                None => term.clone(),
            };
            out.add_term(term);
        }
        for multi in expr.multi_terms() {
            out = out.multi_term(&multi.var, multi.coeff.clone(), multi.filter.clone());
        }
        out
    }

    fn link_for(&self, var: &Variable) -> Option<Link> {
        match self {
            Domain::Indexed(anchor) if var.is_indexed() => {
                Some(Link::keys_equal(var.index_fn(), anchor.index_fn()))
            }
            _ => None,
        }
    }
}

fn keys(var: &Variable) -> Result<HashSet<Value>> {
    Ok(var
        .get_keyed_instances()?
        .into_iter()
        .map(|(_, key)| key)
        .collect())
}
