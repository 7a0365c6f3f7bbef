//! Data sources for indexed families.
//!
//! A family is expanded from exactly one source: an explicit instance list,
//! an external query, or the cartesian product of named dimensions.

use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::error::{self, EvalError, ModelForgeError};
use crate::func::{IndexFn, MultiPredicate, Predicate};
use crate::value::Value;

/// External data collaborator (e.g. an ORM query).
///
/// # Example
///
/// ```
/// use modelforge_core::{DataQuery, EvalError, Value};
///
/// #[derive(Debug)]
/// struct Routes;
///
/// impl DataQuery for Routes {
///     fn all(&self) -> Result<Vec<Value>, EvalError> {
///         Ok((1..=3).map(Value::from).collect())
///     }
/// }
///
/// assert_eq!(Routes.all().unwrap().len(), 3);
/// ```
pub trait DataQuery: Send + Sync + Debug {
    /// Executes the query.
    fn all(&self) -> Result<Vec<Value>, EvalError>;
}

/// A query with predicates layered on before execution.
#[derive(Debug, Clone)]
pub struct FilteredQuery {
    inner: Arc<dyn DataQuery>,
    filters: Vec<Predicate>,
}

impl FilteredQuery {
    /// Wraps a query.
    pub fn new(inner: Arc<dyn DataQuery>) -> Self {
        Self {
            inner,
            filters: Vec::new(),
        }
    }

    /// Adds a filter.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }
}

impl DataQuery for FilteredQuery {
    fn all(&self) -> Result<Vec<Value>, EvalError> {
        let mut out = Vec::new();
        'rows: for row in self.inner.all()? {
            for f in &self.filters {
                if !f.eval(&row)? {
                    continue 'rows;
                }
            }
            out.push(row);
        }
        Ok(out)
    }
}

/// One named dimension of a cartesian product.
#[derive(Debug, Clone)]
pub struct Dimension {
    /// Dimension name.
    pub name: Arc<str>,
    /// Values along this dimension.
    pub values: Vec<Value>,
}

impl Dimension {
    /// Creates a dimension.
    pub fn new<I, V>(name: impl Into<Arc<str>>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Cartesian product of dimensions with an optional cross-dimension filter.
#[derive(Debug, Clone, Default)]
pub struct CartesianProduct {
    dimensions: Vec<Dimension>,
    filter: Option<MultiPredicate>,
}

impl CartesianProduct {
    /// Creates an empty product.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dimension.
    pub fn dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Sets the cross-dimension filter.
    pub fn filter(mut self, predicate: MultiPredicate) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(&predicate),
            None => predicate,
        });
        self
    }

    /// Returns the dimensions.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Enumerates the product in row-major order.
    pub fn instances(&self) -> Result<Vec<Value>, EvalError> {
        if self.dimensions.is_empty() {
            return Ok(Vec::new());
        }
        let mut combos: Vec<Vec<Value>> = vec![Vec::new()];
        for dim in &self.dimensions {
            let mut next = Vec::with_capacity(combos.len() * dim.values.len());
            for combo in &combos {
                for value in &dim.values {
                    let mut extended = combo.clone();
                    extended.push(value.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }
        let mut out = Vec::with_capacity(combos.len());
        for combo in combos {
            if let Some(filter) = &self.filter {
                if !filter.eval(&combo)? {
                    continue;
                }
            }
            out.push(Value::Tuple(combo));
        }
        Ok(out)
    }
}

/// Where a family's instances come from.
#[derive(Clone)]
pub enum DataSource {
    /// Explicit in-memory instances.
    Instances(Arc<Vec<Value>>),
    /// External query, executed on materialization.
    Query(Arc<dyn DataQuery>),
    /// Cartesian product of dimensions.
    Cartesian(CartesianProduct),
}

impl DataSource {
    /// Creates a source from explicit instances.
    pub fn instances<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        DataSource::Instances(Arc::new(values.into_iter().map(Into::into).collect()))
    }

    /// Materializes all instances.
    pub fn fetch(&self) -> Result<Vec<Value>, EvalError> {
        match self {
            DataSource::Instances(values) => Ok(values.as_ref().clone()),
            DataSource::Query(query) => query.all(),
            DataSource::Cartesian(product) => product.instances(),
        }
    }

    /// Returns true for cartesian sources.
    pub fn is_cartesian(&self) -> bool {
        matches!(self, DataSource::Cartesian(_))
    }
}

/// Shared materialization for variable and constraint families.
pub(crate) struct Template<'a> {
    pub what: &'static str,
    pub name: &'a str,
    pub source: Option<&'a DataSource>,
    pub index: Option<&'a IndexFn>,
    pub filter: Option<&'a Predicate>,
}

impl Template<'_> {
    pub(crate) fn instances(&self) -> error::Result<Vec<Value>> {
        let Some(source) = self.source else {
            if self.index.is_some() {
                return Err(ModelForgeError::Config(format!(
                    "{} '{}' has an index function but no data source",
                    self.what, self.name
                )));
            }
            return Ok(vec![Value::None]);
        };
        let rows = source
            .fetch()
            .map_err(|e| ModelForgeError::evaluation(self.name, e))?;
        let Some(filter) = self.filter else {
            return Ok(rows);
        };
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if filter
                .eval(&row)
                .map_err(|e| ModelForgeError::evaluation(self.name, e))?
            {
                kept.push(row);
            }
        }
        Ok(kept)
    }

    pub(crate) fn keyed_instances(&self) -> error::Result<Vec<(Value, Value)>> {
        let instances = self.instances()?;
        if self.source.is_none() {
            return Ok(instances.into_iter().map(|i| (i, Value::None)).collect());
        }
        let index = self.index.cloned().unwrap_or_default();
        let mut seen = HashSet::with_capacity(instances.len());
        let mut out = Vec::with_capacity(instances.len());
        for inst in instances {
            let key = index
                .key(&inst)
                .map_err(|e| ModelForgeError::evaluation(self.name, e))?;
            if !seen.insert(key.clone()) {
                return Err(ModelForgeError::Config(format!(
                    "{} '{}' has duplicate index key {}",
                    self.what, self.name, key
                )));
            }
            out.push((inst, key));
        }
        Ok(out)
    }
}

impl Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Instances(values) => write!(f, "Instances({})", values.len()),
            DataSource::Query(query) => write!(f, "Query({:?})", query),
            DataSource::Cartesian(product) => write!(
                f,
                "Cartesian({})",
                product
                    .dimensions()
                    .iter()
                    .map(|d| d.name.as_ref())
                    .collect::<Vec<_>>()
                    .join(" x ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Numbers(i64);

    impl DataQuery for Numbers {
        fn all(&self) -> Result<Vec<Value>, EvalError> {
            Ok((0..self.0).map(Value::from).collect())
        }
    }

    #[test]
    fn test_filtered_query() {
        let query = FilteredQuery::new(Arc::new(Numbers(10)))
            .filter(Predicate::new(|v| Ok(v.as_i64().unwrap_or(0) % 2 == 0)))
            .filter(Predicate::new(|v| Ok(v.as_i64().unwrap_or(0) > 2)));
        let rows = query.all().unwrap();
        assert_eq!(rows, vec![Value::from(4), Value::from(6), Value::from(8)]);
    }

    #[test]
    fn test_cartesian_product() {
        let product = CartesianProduct::new()
            .dimension(Dimension::new("depot", ["a", "b"]))
            .dimension(Dimension::new("day", [1, 2, 3]));
        let all = product.instances().unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(
            all[0],
            Value::Tuple(vec![Value::from("a"), Value::from(1)])
        );
    }

    #[test]
    fn test_cartesian_cross_filter() {
        let product = CartesianProduct::new()
            .dimension(Dimension::new("i", [1, 2, 3]))
            .dimension(Dimension::new("j", [1, 2, 3]))
            .filter(MultiPredicate::new(|c| Ok(c[0] != c[1])));
        assert_eq!(product.instances().unwrap().len(), 6);
    }

    #[test]
    fn test_empty_cartesian() {
        assert!(CartesianProduct::new().instances().unwrap().is_empty());
    }
}
