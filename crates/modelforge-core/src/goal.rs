//! Goal metadata and goal records.

use crate::constraint::Sense;
use crate::error::{EvalError, ModelForgeError, Result};
use crate::value::Value;

/// Which deviation direction a goal penalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Deviation {
    /// Overshoot: `lhs > target`.
    Positive,
    /// Undershoot: `lhs < target`.
    Negative,
}

/// Soft-constraint attributes attached to a constraint family.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GoalMetadata {
    /// Priority level; 1 is most important, 0 marks custom objective terms.
    pub priority: u32,
    /// Relative weight within the priority level.
    pub weight: f64,
    /// Sense of the constraint when it was turned into a goal.
    pub sense: Sense,
}

impl GoalMetadata {
    /// Creates goal metadata.
    pub fn new(priority: u32, weight: f64, sense: Sense) -> Self {
        Self {
            priority,
            weight,
            sense,
        }
    }

    /// Deviations that count against the goal.
    ///
    /// `<=` goals penalize overshoot, `>=` goals penalize undershoot and
    /// equality goals penalize both.
    pub fn undesired(&self) -> &'static [Deviation] {
        undesired_deviations(self.sense)
    }
}

/// Undesired deviations for a goal of the given sense.
pub fn undesired_deviations(sense: Sense) -> &'static [Deviation] {
    match sense {
        Sense::Le => &[Deviation::Positive],
        Sense::Ge => &[Deviation::Negative],
        Sense::Eq => &[Deviation::Positive, Deviation::Negative],
    }
}

/// One goal: a single instance of a relaxed goal constraint.
///
/// Goal records are the data source of deviation-variable families, so
/// they convert to and from [`Value::Record`].
///
/// # Example
///
/// ```
/// use modelforge_core::{Goal, Sense, Value};
///
/// let goal = Goal {
///     id: 3,
///     constraint_name: "service_level".into(),
///     priority: 1,
///     weight: 2.0,
///     sense: Sense::Ge,
///     target_value: 0.95,
///     instance_id: Some(Value::from("north")),
/// };
/// let back = Goal::from_value(&goal.to_value()).unwrap();
/// assert_eq!(back, goal);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    /// Unique goal id within a relaxation.
    pub id: usize,
    /// Name of the originating constraint family.
    pub constraint_name: String,
    /// Priority level.
    pub priority: u32,
    /// Weight within the priority level.
    pub weight: f64,
    /// Original sense.
    pub sense: Sense,
    /// Right-hand side evaluated for the instance.
    pub target_value: f64,
    /// Index key of the originating instance, for indexed families.
    pub instance_id: Option<Value>,
}

impl Goal {
    /// Deviations that count against this goal.
    pub fn undesired(&self) -> &'static [Deviation] {
        undesired_deviations(self.sense)
    }

    /// Key under which this goal's deviation variables are indexed.
    pub fn key(&self) -> Value {
        Value::from(self.id)
    }

    /// Encodes the goal as a record.
    pub fn to_value(&self) -> Value {
        Value::record([
            ("id", Value::from(self.id)),
            ("constraint_name", Value::from(self.constraint_name.as_str())),
            ("priority", Value::from(i64::from(self.priority))),
            ("weight", Value::from(self.weight)),
            ("sense", Value::from(self.sense.to_string())),
            ("target_value", Value::from(self.target_value)),
            ("instance_id", self.instance_id.clone().unwrap_or_default()),
        ])
    }

    /// Decodes a record produced by [`Goal::to_value`].
    pub fn from_value(value: &Value) -> Result<Self> {
        let wrap = |e: EvalError| ModelForgeError::evaluation("goal", e);
        let id = usize::try_from(value.get_i64("id").map_err(wrap)?)
            .map_err(|_| ModelForgeError::Config("goal id must be non-negative".into()))?;
        let priority = u32::try_from(value.get_i64("priority").map_err(wrap)?)
            .map_err(|_| ModelForgeError::Config("goal priority out of range".into()))?;
        let sense = value.get_str("sense").map_err(wrap)?.parse()?;
        let instance_id = match value.field("instance_id").map_err(wrap)? {
            Value::None => None,
            other => Some(other.clone()),
        };
        Ok(Self {
            id,
            constraint_name: value.get_str("constraint_name").map_err(wrap)?.to_string(),
            priority,
            weight: value.get_f64("weight").map_err(wrap)?,
            sense,
            target_value: value.get_f64("target_value").map_err(wrap)?,
            instance_id,
        })
    }
}
