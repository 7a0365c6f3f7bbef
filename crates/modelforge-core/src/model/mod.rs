//! Optimization models.
//!
//! A [`Model`] owns variable families, constraint families, an optional
//! objective and SOS annotations. [`Model::expand`] materializes it into
//! concrete columns and rows.

mod expand;


pub use expand::{
    Column, ExpandedModel, ExpandedObjective, ExpandedSos, IntegerRow, Row, VarKey,
};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::constraint::Constraint;
use crate::error::{ModelForgeError, Result};
use crate::expr::Expr;
use crate::variable::Variable;

/// Direction of optimization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ObjectiveSense {
    /// Minimize the objective.
    #[default]
    Minimize,
    /// Maximize the objective.
    Maximize,
}

impl fmt::Display for ObjectiveSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveSense::Minimize => write!(f, "minimize"),
            ObjectiveSense::Maximize => write!(f, "maximize"),
        }
    }
}

/// Objective function.
#[derive(Debug, Clone)]
pub struct Objective {
    /// Expression to optimize.
    pub expr: Expr,
    /// Direction.
    pub sense: ObjectiveSense,
}

impl Objective {
    /// Minimize `expr`.
    pub fn minimize(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            sense: ObjectiveSense::Minimize,
        }
    }

    /// Maximize `expr`.
    pub fn maximize(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            sense: ObjectiveSense::Maximize,
        }
    }
}

/// Type of a special ordered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SosKind {
    /// At most one member nonzero.
    Sos1,
    /// At most two adjacent members nonzero.
    Sos2,
}

/// Special ordered set over variable families.
///
/// Members are expanded key by key: for every index key of the first
/// member, the set contains that key's column of every member, ordered by
/// weight. All members must share the same keys.
#[derive(Debug, Clone)]
pub struct SosSet {
    /// Set name.
    pub name: Arc<str>,
    /// SOS type.
    pub kind: SosKind,
    /// Member families with their ordering weights.
    pub members: Vec<(Variable, f64)>,
}

impl SosSet {
    /// Creates an SOS2 set.
    pub fn sos2(name: impl Into<Arc<str>>, members: Vec<(Variable, f64)>) -> Self {
        Self {
            name: name.into(),
            kind: SosKind::Sos2,
            members,
        }
    }
}

/// An optimization model.
///
/// Variable and constraint names are unique within a model.
#[derive(Debug, Clone, Default)]
pub struct Model {
    name: String,
    variables: Vec<Variable>,
    var_pos: HashMap<Arc<str>, usize>,
    constraints: Vec<Constraint>,
    con_pos: HashMap<Arc<str>, usize>,
    objective: Option<Objective>,
    sos_sets: Vec<SosSet>,
}

impl Model {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a variable family.
    ///
    /// # Errors
    ///
    /// A family with the same name is a configuration error.
    pub fn add_variable(&mut self, var: Variable) -> Result<()> {
        if self.var_pos.contains_key(var.name()) {
            return Err(ModelForgeError::Config(format!(
                "duplicate variable '{}' in model '{}'",
                var.name(),
                self.name
            )));
        }
        self.var_pos.insert(var.name_arc(), self.variables.len());
        self.variables.push(var);
        Ok(())
    }

    /// Adds a constraint family.
    ///
    /// # Errors
    ///
    /// A family with the same name is a configuration error.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<()> {
        if self.con_pos.contains_key(constraint.name()) {
            return Err(ModelForgeError::Config(format!(
                "duplicate constraint '{}' in model '{}'",
                constraint.name(),
                self.name
            )));
        }
        self.con_pos
            .insert(constraint.name_arc(), self.constraints.len());
        self.constraints.push(constraint);
        Ok(())
    }

    /// Replaces a constraint family of the same name.
    pub fn replace_constraint(&mut self, constraint: Constraint) -> Result<()> {
        match self.con_pos.get(constraint.name()) {
            Some(&pos) => {
                self.constraints[pos] = constraint;
                Ok(())
            }
            None => Err(ModelForgeError::Config(format!(
                "no constraint '{}' in model '{}'",
                constraint.name(),
                self.name
            ))),
        }
    }

    /// Sets the objective.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Minimizes `expr`.
    pub fn minimize(&mut self, expr: impl Into<Expr>) {
        self.set_objective(Objective::minimize(expr));
    }

    /// Maximizes `expr`.
    pub fn maximize(&mut self, expr: impl Into<Expr>) {
        self.set_objective(Objective::maximize(expr));
    }

    /// Removes and returns the objective.
    pub fn take_objective(&mut self) -> Option<Objective> {
        self.objective.take()
    }

    /// Adds an SOS annotation.
    pub fn add_sos(&mut self, set: SosSet) {
        self.sos_sets.push(set);
    }

    /// Variable families in insertion order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Constraint families in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Mutable access to constraint families.
    pub fn constraints_mut(&mut self) -> &mut [Constraint] {
        &mut self.constraints
    }

    /// The objective, if set.
    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// SOS annotations.
    pub fn sos_sets(&self) -> &[SosSet] {
        &self.sos_sets
    }

    /// Looks up a variable family.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.var_pos.get(name).map(|&pos| &self.variables[pos])
    }

    /// Looks up a constraint family.
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.con_pos.get(name).map(|&pos| &self.constraints[pos])
    }

    /// Returns true if a variable or constraint uses `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.var_pos.contains_key(name) || self.con_pos.contains_key(name)
    }

    /// Constraint families marked as goals.
    pub fn goal_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(|c| c.is_goal())
    }

    /// Materializes the model into concrete columns and rows.
    ///
    /// # Errors
    ///
    /// Nonlinear terms anywhere, or quadratic terms in constraints, are
    /// unsupported here and must be linearized first.
    pub fn expand(&self) -> Result<ExpandedModel> {
        expand::expand(self)
    }
}
