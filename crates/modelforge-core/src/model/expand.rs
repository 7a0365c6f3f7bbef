//! Materialization of a model into concrete columns and rows.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{Model, ObjectiveSense, SosKind};
use crate::constraint::Sense;
use crate::error::{ModelForgeError, Result};
use crate::expr::LinearExpr;
use crate::rational::RationalConverter;
use crate::value::Value;
use crate::variable::{VarKind, Variable};

/// Identity of one concrete solver variable: family name plus index key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarKey {
    /// Variable family name.
    pub family: Arc<str>,
    /// Index key ([`Value::None`] for scalar families).
    pub index: Value,
}

impl VarKey {
    /// Creates a key.
    pub fn new(family: impl Into<Arc<str>>, index: Value) -> Self {
        Self {
            family: family.into(),
            index,
        }
    }

    /// Key of a scalar family.
    pub fn scalar(family: impl Into<Arc<str>>) -> Self {
        Self::new(family, Value::None)
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index.is_none() {
            write!(f, "{}", self.family)
        } else {
            write!(f, "{}[{}]", self.family, self.index)
        }
    }
}

/// One concrete solver variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Identity.
    pub key: VarKey,
    /// Domain.
    pub kind: VarKind,
    /// Lower bound (`-inf` when unbounded).
    pub lower: f64,
    /// Upper bound (`+inf` when unbounded).
    pub upper: f64,
    /// Cost coefficient.
    pub cost: f64,
}

/// One concrete linear constraint `sum(coeff * column) (sense) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Constraint family name.
    pub name: Arc<str>,
    /// Index key of the row instance.
    pub index: Value,
    /// Coefficients by column position.
    pub coeffs: Vec<(usize, f64)>,
    /// Sense.
    pub sense: Sense,
    /// Right-hand side with the expression constant folded in.
    pub rhs: f64,
}

impl Row {
    /// Left-hand side value for a full column assignment.
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.coeffs.iter().map(|&(col, c)| c * values[col]).sum()
    }

    /// Returns true if the row holds for a full column assignment.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        self.sense.holds(self.activity(values), self.rhs, tolerance)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index.is_none() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}[{}]", self.name, self.index)
        }
    }
}

/// Expanded objective: linear and quadratic parts plus a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedObjective {
    /// Direction.
    pub sense: ObjectiveSense,
    /// Linear coefficients by column.
    pub linear: Vec<(usize, f64)>,
    /// Quadratic coefficients by column pair.
    pub quadratic: Vec<(usize, usize, f64)>,
    /// Constant offset.
    pub constant: f64,
}

impl ExpandedObjective {
    /// Objective value for a full column assignment.
    pub fn value(&self, values: &[f64]) -> f64 {
        let linear: f64 = self.linear.iter().map(|&(c, w)| w * values[c]).sum();
        let quadratic: f64 = self
            .quadratic
            .iter()
            .map(|&(a, b, w)| w * values[a] * values[b])
            .sum();
        self.constant + linear + quadratic
    }
}

/// One expanded special ordered set.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedSos {
    /// Set name.
    pub name: Arc<str>,
    /// Index key of the set instance.
    pub index: Value,
    /// SOS type.
    pub kind: SosKind,
    /// Member columns with weights, ordered by weight.
    pub members: Vec<(usize, f64)>,
}

/// A row scaled to integer coefficients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerRow {
    /// Constraint family name.
    pub name: Arc<str>,
    /// Index key of the row instance.
    pub index: Value,
    /// Integer coefficients by column position.
    pub coeffs: Vec<(usize, i64)>,
    /// Sense.
    pub sense: Sense,
    /// Integer right-hand side.
    pub rhs: i64,
    /// Multiplier applied to the original row.
    pub scale: i64,
}

/// A model materialized into concrete columns and rows.
#[derive(Debug, Clone, Default)]
pub struct ExpandedModel {
    columns: Vec<Column>,
    column_pos: HashMap<VarKey, usize>,
    rows: Vec<Row>,
    objective: Option<ExpandedObjective>,
    sos: Vec<ExpandedSos>,
}

impl ExpandedModel {
    /// Concrete columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Concrete rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Expanded objective.
    pub fn objective(&self) -> Option<&ExpandedObjective> {
        self.objective.as_ref()
    }

    /// Expanded SOS sets.
    pub fn sos_sets(&self) -> &[ExpandedSos] {
        &self.sos
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column.
    pub fn column(&self, key: &VarKey) -> Option<usize> {
        self.column_pos.get(key).copied()
    }

    /// Position of the column `family[index]`.
    pub fn column_index(&self, family: &str, index: &Value) -> Option<usize> {
        self.column(&VarKey::new(family, index.clone()))
    }

    /// Rows of one constraint family.
    pub fn rows_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.iter().filter(move |r| r.name.as_ref() == name)
    }

    /// Scales every row to integer coefficients for integer-only backends.
    ///
    /// # Errors
    ///
    /// Fails when a row cannot be represented within the converter's
    /// denominator bound and tolerance, or the common multiplier overflows.
    pub fn to_integer_rows(&self, converter: &RationalConverter) -> Result<Vec<IntegerRow>> {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
        enum Entry {
            Column(usize),
            Rhs,
        }

        let mut out = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut entries: BTreeMap<Entry, f64> = row
                .coeffs
                .iter()
                .map(|&(col, c)| (Entry::Column(col), c))
                .collect();
            entries.insert(Entry::Rhs, row.rhs);
            let (ints, scale) = converter
                .convert_coefficients(&entries)
                .map_err(|e| ModelForgeError::Rational(format!("row {}: {}", row, e)))?;
            let mut coeffs = Vec::with_capacity(row.coeffs.len());
            let mut rhs = 0;
            for (entry, value) in ints {
                match entry {
                    Entry::Column(col) => coeffs.push((col, value)),
                    Entry::Rhs => rhs = value,
                }
            }
            out.push(IntegerRow {
                name: Arc::clone(&row.name),
                index: row.index.clone(),
                coeffs,
                sense: row.sense,
                rhs,
                scale,
            });
        }
        Ok(out)
    }
}

/// Coefficient accumulator keeping first-seen column order.
#[derive(Default)]
struct Coeffs {
    entries: Vec<(usize, f64)>,
    pos: HashMap<usize, usize>,
}

impl Coeffs {
    fn add(&mut self, col: usize, coeff: f64) {
        match self.pos.get(&col) {
            Some(&p) => self.entries[p].1 += coeff,
            None => {
                self.pos.insert(col, self.entries.len());
                self.entries.push((col, coeff));
            }
        }
    }

    fn finish(self) -> Vec<(usize, f64)> {
        self.entries.into_iter().filter(|&(_, c)| c != 0.0).collect()
    }
}

struct Expander<'a> {
    keyed: HashMap<Arc<str>, Vec<(Value, Value)>>,
    column_pos: &'a HashMap<VarKey, usize>,
}

impl Expander<'_> {
    fn instances(&self, entity: &str, var: &Variable) -> Result<&[(Value, Value)]> {
        self.keyed.get(var.name()).map(Vec::as_slice).ok_or_else(|| {
            ModelForgeError::Config(format!(
                "'{}' references variable '{}' which is not part of the model",
                entity,
                var.name()
            ))
        })
    }

    fn column(&self, var: &Variable, key: &Value) -> Result<usize> {
        self.column_pos
            .get(&VarKey::new(var.name_arc(), key.clone()))
            .copied()
            .ok_or_else(|| {
                ModelForgeError::Config(format!(
                    "variable '{}' has no instance with key {}",
                    var.name(),
                    key
                ))
            })
    }

    fn linear(&self, entity: &str, expr: &LinearExpr, row: &Value, acc: &mut Coeffs) -> Result<()> {
        let wrap = |e| ModelForgeError::evaluation(entity, e);
        for term in expr.terms() {
            for (inst, key) in self.instances(entity, &term.var)? {
                if let Some(filter) = &term.filter {
                    if !filter.eval(inst).map_err(wrap)? {
                        continue;
                    }
                }
                if let Some(link) = &term.link {
                    if !link.eval(inst, row).map_err(wrap)? {
                        continue;
                    }
                }
                let coeff = term.coeff.eval(inst).map_err(wrap)?;
                acc.add(self.column(&term.var, key)?, coeff);
            }
        }
        for term in expr.multi_terms() {
            for (inst, key) in self.instances(entity, &term.var)? {
                let components = inst.as_tuple().ok_or_else(|| {
                    ModelForgeError::Config(format!(
                        "multi-dimensional term over '{}' needs tuple instances, got {}",
                        term.var.name(),
                        inst
                    ))
                })?;
                if let Some(filter) = &term.filter {
                    if !filter.eval(components).map_err(wrap)? {
                        continue;
                    }
                }
                let coeff = term.coeff.eval(components).map_err(wrap)?;
                acc.add(self.column(&term.var, key)?, coeff);
            }
        }
        Ok(())
    }

    /// Column pairs of a product term. Two indexed families are paired key
    /// by key; otherwise every combination is used.
    fn pairs(&self, entity: &str, a: &Variable, b: &Variable) -> Result<Vec<(usize, usize)>> {
        let left = self.instances(entity, a)?;
        let right = self.instances(entity, b)?;
        let mut out = Vec::new();
        if a.is_indexed() && b.is_indexed() {
            if left.len() != right.len() {
                return Err(ModelForgeError::Config(format!(
                    "product of '{}' and '{}' needs matching index keys",
                    a.name(),
                    b.name()
                )));
            }
            for (_, key) in left {
                out.push((self.column(a, key)?, self.column(b, key)?));
            }
        } else {
            for (_, ka) in left {
                for (_, kb) in right {
                    out.push((self.column(a, ka)?, self.column(b, kb)?));
                }
            }
        }
        Ok(out)
    }
}

pub(super) fn expand(model: &Model) -> Result<ExpandedModel> {
    let mut columns = Vec::new();
    let mut column_pos = HashMap::new();
    let mut keyed = HashMap::new();

    for var in model.variables() {
        let instances = var.get_keyed_instances()?;
        let lower = var.lower_bound().unwrap_or(f64::NEG_INFINITY);
        let upper = var.upper_bound().unwrap_or(f64::INFINITY);
        if lower > upper {
            return Err(ModelForgeError::Config(format!(
                "variable '{}' has empty domain [{}, {}]",
                var.name(),
                lower,
                upper
            )));
        }
        for (inst, key) in &instances {
            let key = VarKey::new(var.name_arc(), key.clone());
            column_pos.insert(key.clone(), columns.len());
            columns.push(Column {
                key,
                kind: var.kind(),
                lower,
                upper,
                cost: var.cost_of(inst)?,
            });
        }
        keyed.insert(var.name_arc(), instances);
    }

    let ctx = Expander {
        keyed,
        column_pos: &column_pos,
    };

    let mut rows = Vec::new();
    for constraint in model.constraints() {
        let lhs = constraint.lhs_expr().ok_or_else(|| {
            ModelForgeError::Config(format!(
                "constraint '{}' has no left-hand side",
                constraint.name()
            ))
        })?;
        if !lhs.nonlinear_terms().is_empty() || !lhs.quadratic_terms().is_empty() {
            return Err(ModelForgeError::Unsupported(format!(
                "constraint '{}' is not linear; linearize the model first",
                constraint.name()
            )));
        }
        for (inst, key) in constraint.get_keyed_instances()? {
            let mut acc = Coeffs::default();
            ctx.linear(constraint.name(), lhs.linear(), &inst, &mut acc)?;
            rows.push(Row {
                name: constraint.name_arc(),
                index: key,
                coeffs: acc.finish(),
                sense: constraint.sense(),
                rhs: constraint.rhs_of(&inst)? - lhs.constant(),
            });
        }
    }

    let objective = match model.objective() {
        Some(obj) => {
            if !obj.expr.nonlinear_terms().is_empty() {
                return Err(ModelForgeError::Unsupported(
                    "objective has nonlinear terms; linearize the model first".into(),
                ));
            }
            let mut acc = Coeffs::default();
            ctx.linear("objective", obj.expr.linear(), &Value::None, &mut acc)?;
            let mut quadratic = Vec::new();
            for term in obj.expr.quadratic_terms() {
                for (a, b) in ctx.pairs("objective", &term.var1, &term.var2)? {
                    quadratic.push((a, b, term.coeff));
                }
            }
            Some(ExpandedObjective {
                sense: obj.sense,
                linear: acc.finish(),
                quadratic,
                constant: obj.expr.constant(),
            })
        }
        None if columns.iter().any(|c| c.cost != 0.0) => Some(ExpandedObjective {
            sense: ObjectiveSense::Minimize,
            linear: columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.cost != 0.0)
                .map(|(i, c)| (i, c.cost))
                .collect(),
            quadratic: Vec::new(),
            constant: 0.0,
        }),
        None => None,
    };

    let mut sos = Vec::new();
    for set in model.sos_sets() {
        let Some((first, _)) = set.members.first() else {
            continue;
        };
        for (_, key) in ctx.instances(&set.name, first)? {
            let mut members = Vec::with_capacity(set.members.len());
            for (var, weight) in &set.members {
                members.push((ctx.column(var, key)?, *weight));
            }
            members.sort_by(|a, b| a.1.total_cmp(&b.1));
            sos.push(ExpandedSos {
                name: Arc::clone(&set.name),
                index: key.clone(),
                kind: set.kind,
                members,
            });
        }
    }

    debug!(
        model = model.name(),
        columns = columns.len(),
        rows = rows.len(),
        sos = sos.len(),
        "Model expanded"
    );

    Ok(ExpandedModel {
        columns,
        column_pos,
        rows,
        objective,
        sos,
    })
}
