//! Dynamically typed data instances.
//!
//! Variable and constraint families are expanded from data. Every data
//! instance, and every index key derived from one, is a [`Value`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::EvalError;

/// A data instance or index key.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// No value. The single instance of a non-indexed family.
    #[default]
    None,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// String value.
    Str(Arc<str>),
    /// Ordered tuple, produced by cartesian-product sources.
    Tuple(Vec<Value>),
    /// Named fields in insertion order.
    Record(Arc<Vec<(Arc<str>, Value)>>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // Bit equality keeps Eq consistent with Hash.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::None => {}
            Value::Bool(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::Tuple(v) => v.hash(state),
            Value::Record(fields) => {
                for (name, value) in fields.iter() {
                    name.hash(state);
                    value.hash(state);
                }
            }
        }
    }
}

impl Value {
    /// Builds a record from `(field, value)` pairs.
    ///
    /// # Example
    ///
    /// ```
    /// use modelforge_core::Value;
    ///
    /// let route = Value::record([("id", Value::from(5)), ("demand", Value::from(12.5))]);
    /// assert_eq!(route.get_i64("id").unwrap(), 5);
    /// assert_eq!(route.get_f64("demand").unwrap(), 12.5);
    /// ```
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<Arc<str>>,
    {
        Value::Record(Arc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Returns true if this value is None.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Attempts to extract an i64 value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to extract an f64 value. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Attempts to extract a bool value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to extract a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the components of a tuple.
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a record field.
    pub fn field(&self, name: &str) -> Result<&Value, EvalError> {
        match self {
            Value::Record(fields) => fields
                .iter()
                .find(|(k, _)| k.as_ref() == name)
                .map(|(_, v)| v)
                .ok_or_else(|| EvalError::new(format!("missing field '{}'", name))),
            other => Err(EvalError::new(format!(
                "cannot read field '{}' of non-record value {}",
                name, other
            ))),
        }
    }

    /// Reads a numeric record field.
    pub fn get_f64(&self, name: &str) -> Result<f64, EvalError> {
        let value = self.field(name)?;
        value
            .as_f64()
            .ok_or_else(|| EvalError::new(format!("field '{}' is not numeric: {}", name, value)))
    }

    /// Reads an integer record field.
    pub fn get_i64(&self, name: &str) -> Result<i64, EvalError> {
        let value = self.field(name)?;
        value
            .as_i64()
            .ok_or_else(|| EvalError::new(format!("field '{}' is not an integer: {}", name, value)))
    }

    /// Reads a string record field.
    pub fn get_str(&self, name: &str) -> Result<&str, EvalError> {
        let value = self.field(name)?;
        value
            .as_str()
            .ok_or_else(|| EvalError::new(format!("field '{}' is not a string: {}", name, value)))
    }

    /// Reads a boolean record field.
    pub fn get_bool(&self, name: &str) -> Result<bool, EvalError> {
        let value = self.field(name)?;
        value
            .as_bool()
            .ok_or_else(|| EvalError::new(format!("field '{}' is not a bool: {}", name, value)))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "-"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

/// Indices past `i64::MAX` become `Float` rather than wrapping negative.
impl From<usize> for Value {
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or(Value::Float(v as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Tuple(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_record_field_access() {
        let v = Value::record([("name", Value::from("north")), ("cap", Value::from(40))]);
        assert_eq!(v.get_str("name").unwrap(), "north");
        assert_eq!(v.get_f64("cap").unwrap(), 40.0);
        assert!(v.get_f64("missing").is_err());
        assert!(v.get_i64("name").is_err());
    }

    #[test]
    fn test_field_on_scalar_fails() {
        let err = Value::from(3).field("x").unwrap_err();
        assert!(err.message().contains("non-record"));
    }

    #[test]
    fn test_hash_and_eq_agree() {
        let mut set = HashSet::new();
        set.insert(Value::Tuple(vec![Value::from(1), Value::from("a")]));
        set.insert(Value::Tuple(vec![Value::from(1), Value::from("a")]));
        set.insert(Value::Float(0.5));
        set.insert(Value::Float(0.5));
        assert_eq!(set.len(), 2);
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn test_large_index_does_not_wrap() {
        assert_eq!(Value::from(7usize), Value::Int(7));
        assert_eq!(Value::from(i64::MAX as usize), Value::Int(i64::MAX));
        if let Ok(big) = usize::try_from(u64::MAX) {
            assert_eq!(Value::from(big), Value::Float(u64::MAX as f64));
        }
    }

    #[test]
    fn test_display() {
        let v = Value::Tuple(vec![Value::from(1), Value::from("b")]);
        assert_eq!(v.to_string(), "(1, b)");
        assert_eq!(Value::None.to_string(), "-");
    }
}
