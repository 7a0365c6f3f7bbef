//! User-supplied functions over data instances.
//!
//! Coefficients, filters, index functions and links are pure functions of
//! the instance value. They are stored behind `Arc` so families and
//! expressions stay cheap to clone and `Send + Sync`.

use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::error::EvalError;
use crate::value::Value;

type CoeffFn = dyn Fn(&Value) -> Result<f64, EvalError> + Send + Sync;
type MultiCoeffFn = dyn Fn(&[Value]) -> Result<f64, EvalError> + Send + Sync;
type PredFn = dyn Fn(&Value) -> Result<bool, EvalError> + Send + Sync;
type MultiPredFn = dyn Fn(&[Value]) -> Result<bool, EvalError> + Send + Sync;
type KeyFn = dyn Fn(&Value) -> Result<Value, EvalError> + Send + Sync;
type LinkFn = dyn Fn(&Value, &Value) -> Result<bool, EvalError> + Send + Sync;

fn finite(value: f64) -> Result<f64, EvalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::new(format!("coefficient evaluated to {}", value)))
    }
}

/// Coefficient of a linear term: a constant or a function of the variable instance.
///
/// # Example
///
/// ```
/// use modelforge_core::{Coefficient, Value};
///
/// let cost = Coefficient::from_fn(|route| route.get_f64("cost"));
/// let doubled = cost.scaled(2.0);
/// let route = Value::record([("cost", Value::from(3.5))]);
/// assert_eq!(doubled.eval(&route).unwrap(), 7.0);
/// ```
#[derive(Clone)]
pub enum Coefficient {
    /// Same value for every instance.
    Constant(f64),
    /// Evaluated per instance.
    Func(Arc<CoeffFn>),
}

impl Coefficient {
    /// Creates a constant coefficient.
    pub fn constant(value: f64) -> Self {
        Coefficient::Constant(value)
    }

    /// Creates a per-instance coefficient.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<f64, EvalError> + Send + Sync + 'static,
    {
        Coefficient::Func(Arc::new(f))
    }

    /// Evaluates the coefficient for one instance. Non-finite results are errors.
    pub fn eval(&self, instance: &Value) -> Result<f64, EvalError> {
        match self {
            Coefficient::Constant(c) => finite(*c),
            Coefficient::Func(f) => finite(f(instance)?),
        }
    }

    /// Returns the value if this coefficient is constant.
    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Coefficient::Constant(c) => Some(*c),
            Coefficient::Func(_) => None,
        }
    }

    /// Multiplies the coefficient by a scalar.
    pub fn scaled(&self, factor: f64) -> Self {
        match self {
            Coefficient::Constant(c) => Coefficient::Constant(c * factor),
            Coefficient::Func(f) => {
                let f = Arc::clone(f);
                Coefficient::from_fn(move |v| Ok(f(v)? * factor))
            }
        }
    }

    /// Sums two coefficients.
    pub fn plus(&self, other: &Coefficient) -> Self {
        match (self, other) {
            (Coefficient::Constant(a), Coefficient::Constant(b)) => Coefficient::Constant(a + b),
            _ => {
                let a = self.clone();
                let b = other.clone();
                Coefficient::from_fn(move |v| Ok(a.eval(v)? + b.eval(v)?))
            }
        }
    }
}

impl From<f64> for Coefficient {
    fn from(value: f64) -> Self {
        Coefficient::Constant(value)
    }
}

impl Debug for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coefficient::Constant(c) => write!(f, "Constant({})", c),
            Coefficient::Func(_) => write!(f, "Func(..)"),
        }
    }
}

/// Coefficient of a multi-dimensional term, evaluated over tuple components.
#[derive(Clone)]
pub enum MultiCoefficient {
    /// Same value for every instance.
    Constant(f64),
    /// Evaluated per instance.
    Func(Arc<MultiCoeffFn>),
}

impl MultiCoefficient {
    /// Creates a per-instance coefficient over tuple components.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<f64, EvalError> + Send + Sync + 'static,
    {
        MultiCoefficient::Func(Arc::new(f))
    }

    /// Evaluates the coefficient.
    pub fn eval(&self, components: &[Value]) -> Result<f64, EvalError> {
        match self {
            MultiCoefficient::Constant(c) => finite(*c),
            MultiCoefficient::Func(f) => finite(f(components)?),
        }
    }

    /// Multiplies the coefficient by a scalar.
    pub fn scaled(&self, factor: f64) -> Self {
        match self {
            MultiCoefficient::Constant(c) => MultiCoefficient::Constant(c * factor),
            MultiCoefficient::Func(f) => {
                let f = Arc::clone(f);
                MultiCoefficient::from_fn(move |v| Ok(f(v)? * factor))
            }
        }
    }
}

impl From<f64> for MultiCoefficient {
    fn from(value: f64) -> Self {
        MultiCoefficient::Constant(value)
    }
}

impl Debug for MultiCoefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultiCoefficient::Constant(c) => write!(f, "Constant({})", c),
            MultiCoefficient::Func(_) => write!(f, "Func(..)"),
        }
    }
}

/// Filter over data instances.
#[derive(Clone)]
pub struct Predicate(Arc<PredFn>);

impl Predicate {
    /// Creates a predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, EvalError> + Send + Sync + 'static,
    {
        Predicate(Arc::new(f))
    }

    /// Evaluates the predicate.
    pub fn eval(&self, instance: &Value) -> Result<bool, EvalError> {
        (self.0)(instance)
    }

    /// Logical AND of two predicates.
    pub fn and(&self, other: &Predicate) -> Self {
        let a = Arc::clone(&self.0);
        let b = Arc::clone(&other.0);
        Predicate::new(move |v| Ok(a(v)? && b(v)?))
    }
}

impl Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Filter over tuple components.
#[derive(Clone)]
pub struct MultiPredicate(Arc<MultiPredFn>);

impl MultiPredicate {
    /// Creates a predicate over tuple components.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<bool, EvalError> + Send + Sync + 'static,
    {
        MultiPredicate(Arc::new(f))
    }

    /// Evaluates the predicate.
    pub fn eval(&self, components: &[Value]) -> Result<bool, EvalError> {
        (self.0)(components)
    }

    /// Logical AND of two predicates.
    pub fn and(&self, other: &MultiPredicate) -> Self {
        let a = Arc::clone(&self.0);
        let b = Arc::clone(&other.0);
        MultiPredicate::new(move |v| Ok(a(v)? && b(v)?))
    }
}

impl Debug for MultiPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MultiPredicate(..)")
    }
}

/// Maps a data instance to its index key. The default is the identity.
#[derive(Clone, Default)]
pub struct IndexFn(Option<Arc<KeyFn>>);

impl IndexFn {
    /// The identity index: the instance is its own key.
    pub fn identity() -> Self {
        IndexFn(None)
    }

    /// Creates an index function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        IndexFn(Some(Arc::new(f)))
    }

    /// Indexes records by one of their fields.
    pub fn field(name: impl Into<String>) -> Self {
        let name = name.into();
        IndexFn::new(move |v| v.field(&name).cloned())
    }

    /// Returns true for the identity index.
    pub fn is_identity(&self) -> bool {
        self.0.is_none()
    }

    /// Computes the key of an instance.
    pub fn key(&self, instance: &Value) -> Result<Value, EvalError> {
        match &self.0 {
            None => Ok(instance.clone()),
            Some(f) => f(instance),
        }
    }
}

impl Debug for IndexFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            f.write_str("IndexFn(identity)")
        } else {
            f.write_str("IndexFn(..)")
        }
    }
}

/// Binds the instances of a term's variable to the row instance of an
/// indexed constraint: `(variable instance, row instance) -> keep?`.
#[derive(Clone)]
pub struct Link(Arc<LinkFn>);

impl Link {
    /// Creates a link.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<bool, EvalError> + Send + Sync + 'static,
    {
        Link(Arc::new(f))
    }

    /// Keeps variable instances whose key equals the row's key.
    pub fn keys_equal(variable_index: IndexFn, row_index: IndexFn) -> Self {
        Link::new(move |var, row| Ok(variable_index.key(var)? == row_index.key(row)?))
    }

    /// Evaluates the link.
    pub fn eval(&self, variable_instance: &Value, row_instance: &Value) -> Result<bool, EvalError> {
        (self.0)(variable_instance, row_instance)
    }

    /// Logical AND of two links.
    pub fn and(&self, other: &Link) -> Self {
        let a = Arc::clone(&self.0);
        let b = Arc::clone(&other.0);
        Link::new(move |v, r| Ok(a(v, r)? && b(v, r)?))
    }
}

impl Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Link(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_folding() {
        let c = Coefficient::constant(2.0).scaled(3.0).plus(&Coefficient::constant(1.0));
        assert_eq!(c.as_constant(), Some(7.0));
    }

    #[test]
    fn test_function_sum() {
        let a = Coefficient::from_fn(|v| v.get_f64("w"));
        let b = Coefficient::constant(1.5);
        let sum = a.plus(&b).scaled(2.0);
        let inst = Value::record([("w", Value::from(2.0))]);
        assert_eq!(sum.eval(&inst).unwrap(), 7.0);
        assert!(sum.as_constant().is_none());
    }

    #[test]
    fn test_non_finite_coefficient_is_error() {
        let c = Coefficient::from_fn(|_| Ok(f64::NAN));
        assert!(c.eval(&Value::None).is_err());
    }

    #[test]
    fn test_predicate_and() {
        let positive = Predicate::new(|v| Ok(v.as_f64().unwrap_or(0.0) > 0.0));
        let small = Predicate::new(|v| Ok(v.as_f64().unwrap_or(0.0) < 10.0));
        let both = positive.and(&small);
        assert!(both.eval(&Value::from(5.0)).unwrap());
        assert!(!both.eval(&Value::from(15.0)).unwrap());
        assert!(!both.eval(&Value::from(-1.0)).unwrap());
    }

    #[test]
    fn test_keys_equal_link() {
        let link = Link::keys_equal(IndexFn::field("id"), IndexFn::identity());
        let var = Value::record([("id", Value::from(3))]);
        assert!(link.eval(&var, &Value::from(3)).unwrap());
        assert!(!link.eval(&var, &Value::from(4)).unwrap());
    }
}
