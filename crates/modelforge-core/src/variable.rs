//! Variable families.
//!
//! A [`Variable`] is a template that expands to one concrete solver
//! variable per matching data instance. Families are configured with
//! consuming builder methods and materialized lazily.

use std::fmt;
use std::sync::Arc;

use crate::error::{ModelForgeError, Result};
use crate::func::{Coefficient, IndexFn, Predicate};
use crate::source::{CartesianProduct, DataQuery, DataSource, Template};
use crate::value::Value;

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarKind {
    /// Real-valued.
    Continuous,
    /// Integer-valued.
    Integer,
    /// 0/1 valued.
    Binary,
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::Continuous => write!(f, "continuous"),
            VarKind::Integer => write!(f, "integer"),
            VarKind::Binary => write!(f, "binary"),
        }
    }
}

/// An indexed family of decision variables.
///
/// # Example
///
/// ```
/// use modelforge_core::{IndexFn, Value, Variable};
///
/// let routes = vec![
///     Value::record([("id", Value::from(1)), ("len", Value::from(12.0))]),
///     Value::record([("id", Value::from(2)), ("len", Value::from(30.0))]),
/// ];
/// let buses = Variable::integer("buses")
///     .bounds(0.0, 20.0)
///     .indexed_by(IndexFn::field("id"))
///     .from_data(routes);
///
/// assert!(buses.is_indexed());
/// assert_eq!(buses.get_instances().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Variable {
    name: Arc<str>,
    kind: VarKind,
    lower: Option<f64>,
    upper: Option<f64>,
    index: Option<IndexFn>,
    cost: Option<Coefficient>,
    filter: Option<Predicate>,
    source: Option<DataSource>,
}

impl Variable {
    /// Creates an unbounded family of the given kind.
    pub fn new(name: impl Into<Arc<str>>, kind: VarKind) -> Self {
        let var = Self {
            name: name.into(),
            kind,
            lower: None,
            upper: None,
            index: None,
            cost: None,
            filter: None,
            source: None,
        };
        if kind == VarKind::Binary {
            var.binary()
        } else {
            var
        }
    }

    /// Creates a continuous family.
    pub fn continuous(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, VarKind::Continuous)
    }

    /// Creates an integer family.
    pub fn integer(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, VarKind::Integer)
    }

    /// Creates a binary family (bounds [0, 1]).
    pub fn binary_named(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, VarKind::Binary)
    }

    /// Turns this family binary. Forces bounds to [0, 1].
    pub fn binary(mut self) -> Self {
        self.kind = VarKind::Binary;
        self.lower = Some(0.0);
        self.upper = Some(1.0);
        self
    }

    /// Sets both bounds.
    pub fn bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower = Some(lower);
        self.upper = Some(upper);
        self
    }

    /// Sets the lower bound.
    pub fn lower(mut self, lower: f64) -> Self {
        self.lower = Some(lower);
        self
    }

    /// Sets the upper bound.
    pub fn upper(mut self, upper: f64) -> Self {
        self.upper = Some(upper);
        self
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

    /// Sets the cost coefficient function.
    pub fn cost(mut self, cost: impl Into<Coefficient>) -> Self {
        self.cost = Some(cost.into());
        self
    }

    /// Copies the data source, index function and filter of another family,
    /// so both expand over the same keys.
    pub fn aligned_with(mut self, other: &Variable) -> Self {
        self.source = other.source.clone();
        self.index = other.index.clone();
        self.filter = other.filter.clone();
        self
    }

    /// Returns the family name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the shared family name.
    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Returns the variable kind.
    pub fn kind(&self) -> VarKind {
        self.kind
    }

    /// Returns the lower bound, if any.
    pub fn lower_bound(&self) -> Option<f64> {
        self.lower
    }

    /// Returns the upper bound, if any.
    pub fn upper_bound(&self) -> Option<f64> {
        self.upper
    }

    /// Returns both bounds when both are finite.
    pub fn finite_bounds(&self) -> Option<(f64, f64)> {
        match (self.lower, self.upper) {
            (Some(l), Some(u)) if l.is_finite() && u.is_finite() => Some((l, u)),
            _ => None,
        }
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

    /// Returns the cost coefficient function.
    pub fn cost_fn(&self) -> Option<&Coefficient> {
        self.cost.as_ref()
    }

    /// Evaluates the cost coefficient of one instance (0 when unset).
    pub fn cost_of(&self, instance: &Value) -> Result<f64> {
        match &self.cost {
            Some(c) => c
                .eval(instance)
                .map_err(|e| ModelForgeError::evaluation(self.name(), e)),
            None => Ok(0.0),
        }
    }

    /// Materializes the family's instances.
    ///
    /// A family without a data source is scalar and has exactly one
    /// instance, [`Value::None`].
    pub fn get_instances(&self) -> Result<Vec<Value>> {
        self.template().instances()
    }

    /// Materializes instances paired with their index keys.
    ///
    /// # Errors
    ///
    /// Duplicate keys are a configuration error.
    pub fn get_keyed_instances(&self) -> Result<Vec<(Value, Value)>> {
        self.template().keyed_instances()
    }

    fn template(&self) -> Template<'_> {
        Template {
            what: "variable",
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
    use crate::source::Dimension;

    #[test]
    fn test_scalar_has_single_instance() {
        let x = Variable::continuous("x").bounds(0.0, 5.0);
        assert!(!x.is_indexed());
        assert_eq!(x.get_instances().unwrap(), vec![Value::None]);
        assert_eq!(x.finite_bounds(), Some((0.0, 5.0)));
    }

    #[test]
    fn test_binary_forces_bounds() {
        let b = Variable::continuous("b").bounds(-3.0, 7.0).binary();
        assert_eq!(b.kind(), VarKind::Binary);
        assert_eq!(b.finite_bounds(), Some((0.0, 1.0)));
        let b2 = Variable::binary_named("b2");
        assert_eq!(b2.finite_bounds(), Some((0.0, 1.0)));
    }

    #[test]
    fn test_index_without_source_fails() {
        let x = Variable::continuous("x").indexed_by(IndexFn::field("id"));
        let err = x.get_instances().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_filter_applies_lazily() {
        let x = Variable::continuous("x")
            .from_data([1, 2, 3, 4])
            .filter(Predicate::new(|v| Ok(v.as_i64().unwrap_or(0) > 2)));
        assert_eq!(x.get_instances().unwrap(), vec![Value::from(3), Value::from(4)]);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let x = Variable::continuous("x")
            .from_data([
                Value::record([("id", Value::from(1))]),
                Value::record([("id", Value::from(1))]),
            ])
            .indexed_by(IndexFn::field("id"));
        assert!(x.get_keyed_instances().unwrap_err().is_config());
    }

    #[test]
    fn test_cartesian_family() {
        let flow = Variable::continuous("flow").cartesian(
            CartesianProduct::new()
                .dimension(Dimension::new("from", ["a", "b"]))
                .dimension(Dimension::new("to", ["c", "d", "e"])),
        );
        let keyed = flow.get_keyed_instances().unwrap();
        assert_eq!(keyed.len(), 6);
        assert_eq!(keyed[0].0, keyed[0].1);
    }

    #[test]
    fn test_cost_evaluation_wraps_name() {
        let x = Variable::continuous("trucks")
            .from_data([Value::from(1)])
            .cost(Coefficient::from_fn(|v| v.get_f64("cost")));
        let err = x.cost_of(&Value::from(1)).unwrap_err();
        assert!(err.to_string().contains("trucks"));
    }
}
