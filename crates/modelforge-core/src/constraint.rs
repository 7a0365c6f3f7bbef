//! Constraint families.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ModelForgeError, Result};
use crate::expr::Expr;
use crate::func::{Coefficient, IndexFn, Predicate};
use crate::goal::GoalMetadata;
use crate::source::{CartesianProduct, DataQuery, DataSource, Template};
use crate::value::Value;
use crate::variable::Variable;

/// Relational sense of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Sense {
    /// `lhs <= rhs`
    Le,
    /// `lhs >= rhs`
    Ge,
    /// `lhs == rhs`
    Eq,
}

impl Sense {
    /// Returns true if `lhs (sense) rhs` holds within `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Sense::Le => lhs <= rhs + tolerance,
            Sense::Ge => lhs >= rhs - tolerance,
            Sense::Eq => (lhs - rhs).abs() <= tolerance,
        }
    }

    /// Sense after multiplying both sides by -1.
    pub fn flipped(self) -> Self {
        match self {
            Sense::Le => Sense::Ge,
            Sense::Ge => Sense::Le,
            Sense::Eq => Sense::Eq,
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Le => write!(f, "<="),
            Sense::Ge => write!(f, ">="),
            Sense::Eq => write!(f, "=="),
        }
    }
}

impl FromStr for Sense {
    type Err = ModelForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "<=" | "le" | "Le" => Ok(Sense::Le),
            ">=" | "ge" | "Ge" => Ok(Sense::Ge),
            "==" | "=" | "eq" | "Eq" => Ok(Sense::Eq),
            other => Err(ModelForgeError::Config(format!(
                "unknown constraint sense '{}'",
                other
            ))),
        }
    }
}

/// An indexed family of constraints `lhs (sense) rhs`.
///
/// Without a data source the family is a single constraint.
///
/// # Example
///
/// ```
/// use modelforge_core::{Coefficient, Constraint, IndexFn, LinearExpr, Sense, Value, Variable};
///
/// let depots = vec![
///     Value::record([("id", Value::from("north")), ("cap", Value::from(40.0))]),
///     Value::record([("id", Value::from("south")), ("cap", Value::from(25.0))]),
/// ];
/// let x = Variable::continuous("x").lower(0.0);
/// let cap = Constraint::new("capacity")
///     .lhs(LinearExpr::from(&x))
///     .le(Coefficient::from_fn(|d| d.get_f64("cap")))
///     .indexed_by(IndexFn::field("id"))
///     .from_data(depots);
///
/// assert_eq!(cap.sense(), Sense::Le);
/// let keyed = cap.get_keyed_instances().unwrap();
/// assert_eq!(cap.rhs_of(&keyed[1].0).unwrap(), 25.0);
/// ```
#[derive(Debug, Clone)]
pub struct Constraint {
    name: Arc<str>,
    lhs: Option<Expr>,
    sense: Sense,
    rhs: Option<Coefficient>,
    index: Option<IndexFn>,
    filter: Option<Predicate>,
    source: Option<DataSource>,
    goal: Option<GoalMetadata>,
}

impl Constraint {
    /// Creates an empty `<=` constraint family.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            lhs: None,
            sense: Sense::Le,
            rhs: None,
            index: None,
            filter: None,
            source: None,
            goal: None,
        }
    }

    /// Sets the left-hand side.
    pub fn lhs(mut self, lhs: impl Into<Expr>) -> Self {
        self.lhs = Some(lhs.into());
        self
    }

    /// Sets the sense.
    pub fn with_sense(mut self, sense: Sense) -> Self {
        self.sense = sense;
        self
    }

    /// Sets the right-hand side.
    pub fn rhs(mut self, rhs: impl Into<Coefficient>) -> Self {
        self.rhs = Some(rhs.into());
        self
    }

    /// `lhs <= rhs`.
    pub fn le(self, rhs: impl Into<Coefficient>) -> Self {
        self.with_sense(Sense::Le).rhs(rhs)
    }

    /// `lhs >= rhs`.
    pub fn ge(self, rhs: impl Into<Coefficient>) -> Self {
        self.with_sense(Sense::Ge).rhs(rhs)
    }

    /// `lhs == rhs`.
    #[allow(clippy::should_implement_trait)]
    pub fn eq(self, rhs: impl Into<Coefficient>) -> Self {
        self.with_sense(Sense::Eq).rhs(rhs)
    }

    /// Sets the index function. Requires a data source.
    pub fn indexed_by(mut self, index: IndexFn) -> Self {
        self.index = Some(index);
        self
    }

    /// Uses explicit instances as the data source.
    pub fn from_data<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.from_source(DataSource::instances(values))
    }

    /// Uses an external query as the data source.
    pub fn from_query(self, query: Arc<dyn DataQuery>) -> Self {
        self.from_source(DataSource::Query(query))
    }

    /// Uses a cartesian product as the data source.
    pub fn cartesian(self, product: CartesianProduct) -> Self {
        self.from_source(DataSource::Cartesian(product))
    }

    /// Sets the data source, replacing any previous one.
    pub fn from_source(mut self, source: DataSource) -> Self {
        self.source = Some(source);
        if self.index.is_none() {
            self.index = Some(IndexFn::identity());
        }
        self
    }

    /// Adds an instance filter. Filters are AND-combined.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(&predicate),
            None => predicate,
        });
        self
    }

    /// Expands over the same instances as a variable family.
    pub fn aligned_with(mut self, var: &Variable) -> Self {
        self.source = var.source().cloned();
        self.index = var.source().map(|_| var.index_fn());
        self.filter = var.instance_filter().cloned();
        self
    }

    /// Marks this family as a soft goal.
    pub fn as_goal(mut self, priority: u32, weight: f64) -> Self {
        self.goal = Some(GoalMetadata::new(priority, weight, self.sense));
        self
    }

    /// Drops goal metadata, turning the family back into a hard constraint.
    pub fn hard(mut self) -> Self {
        self.goal = None;
        self
    }

    /// Replaces the left-hand side in place.
    pub fn set_lhs(&mut self, lhs: Expr) {
        self.lhs = Some(lhs);
    }

    /// Removes and returns the left-hand side.
    pub fn take_lhs(&mut self) -> Option<Expr> {
        self.lhs.take()
    }

    /// Returns the family name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the shared family name.
    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Returns the left-hand side, if set.
    pub fn lhs_expr(&self) -> Option<&Expr> {
        self.lhs.as_ref()
    }

    /// Returns the sense.
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Returns the right-hand side function, if set.
    pub fn rhs_fn(&self) -> Option<&Coefficient> {
        self.rhs.as_ref()
    }

    /// Returns the goal metadata.
    pub fn goal(&self) -> Option<&GoalMetadata> {
        self.goal.as_ref()
    }

    /// Returns true for soft goal families.
    pub fn is_goal(&self) -> bool {
        self.goal.is_some()
    }

    /// Returns true if the family expands from a data source.
    pub fn is_indexed(&self) -> bool {
        self.source.is_some()
    }

    /// Returns the data source.
    pub fn source(&self) -> Option<&DataSource> {
        self.source.as_ref()
    }

    /// Returns the index function (identity when unset).
    pub fn index_fn(&self) -> IndexFn {
        self.index.clone().unwrap_or_default()
    }

    /// Returns the instance filter.
    pub fn instance_filter(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }

    /// Evaluates the right-hand side for one instance.
    ///
    /// # Errors
    ///
    /// A missing right-hand side is a configuration error.
    pub fn rhs_of(&self, instance: &Value) -> Result<f64> {
        let rhs = self.rhs.as_ref().ok_or_else(|| {
            ModelForgeError::Config(format!("constraint '{}' has no right-hand side", self.name))
        })?;
        rhs.eval(instance)
            .map_err(|e| ModelForgeError::evaluation(self.name(), e))
    }

    /// Materializes the family's instances.
    pub fn get_instances(&self) -> Result<Vec<Value>> {
        self.template().instances()
    }

    /// Materializes instances paired with their index keys.
    pub fn get_keyed_instances(&self) -> Result<Vec<(Value, Value)>> {
        self.template().keyed_instances()
    }

    fn template(&self) -> Template<'_> {
        Template {
            what: "constraint",
            name: &self.name,
            source: self.source.as_ref(),
            index: self.index.as_ref(),
            filter: self.filter.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::LinearExpr;

    #[test]
    fn test_missing_rhs_is_config_error() {
        let x = Variable::continuous("x");
        let c = Constraint::new("c").lhs(LinearExpr::from(&x));
        assert!(c.rhs_of(&Value::None).unwrap_err().is_config());
    }

    #[test]
    fn test_index_without_source_is_config_error() {
        let c = Constraint::new("c").le(1.0).indexed_by(IndexFn::field("id"));
        assert!(c.get_instances().unwrap_err().is_config());
    }

    #[test]
    fn test_as_goal_takes_current_sense() {
        let c = Constraint::new("target").ge(10.0).as_goal(2, 3.0);
        let goal = c.goal().unwrap();
        assert_eq!(goal.priority, 2);
        assert_eq!(goal.weight, 3.0);
        assert_eq!(goal.sense, Sense::Ge);
        assert!(c.clone().hard().goal().is_none());
    }

    #[test]
    fn test_aligned_with_variable() {
        let x = Variable::continuous("x")
            .from_data([Value::record([("id", Value::from(7))])])
            .indexed_by(IndexFn::field("id"));
        let c = Constraint::new("link").le(0.0).aligned_with(&x);
        let keyed = c.get_keyed_instances().unwrap();
        assert_eq!(keyed.len(), 1);
        assert_eq!(keyed[0].1, Value::from(7));
    }

    #[test]
    fn test_sense_parsing_and_holds() {
        assert_eq!("<=".parse::<Sense>().unwrap(), Sense::Le);
        assert_eq!("eq".parse::<Sense>().unwrap(), Sense::Eq);
        assert!("~".parse::<Sense>().is_err());
        assert!(Sense::Le.holds(1.0, 1.0, 0.0));
        assert!(!Sense::Ge.holds(0.5, 1.0, 1e-9));
        assert_eq!(Sense::Le.flipped(), Sense::Ge);
    }
}
