//! Deviation relaxation of goal constraints.
//!
//! A goal `lhs (sense) rhs` becomes the hard equality
//! `lhs + neg_dev - pos_dev = rhs`. One [`Goal`] record is created per
//! constraint instance and both deviation families are indexed by those
//! records, so every deviation value traces back to its goal, priority and
//! original target.

use modelforge_core::{
    Constraint, Deviation, Goal, GoalMetadata, IndexFn, LinearExpr, LinearTerm, Link, Model,
    ModelForgeError, Result, Sense, Variable,
};
use tracing::debug;

/// A goal constraint after relaxation.
#[derive(Debug, Clone)]
pub struct RelaxedConstraint {
    /// The hard equality replacing the goal.
    pub constraint: Constraint,
    /// Overshoot family, one instance per goal.
    pub pos_dev: Variable,
    /// Undershoot family, one instance per goal.
    pub neg_dev: Variable,
    /// One record per instance of the original constraint.
    pub goals: Vec<Goal>,
    /// Goal attributes of the original constraint.
    pub metadata: GoalMetadata,
}

impl RelaxedConstraint {
    /// Priority of every goal in this family.
    pub fn priority(&self) -> u32 {
        self.metadata.priority
    }

    /// Deviation family for one direction.
    pub fn deviation(&self, direction: Deviation) -> &Variable {
        match direction {
            Deviation::Positive => &self.pos_dev,
            Deviation::Negative => &self.neg_dev,
        }
    }

    /// Deviation families that count against the goals.
    pub fn undesired(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.metadata.undesired().iter().map(|&d| self.deviation(d))
    }
}

/// A model whose goal constraints were relaxed.
#[derive(Debug, Clone)]
pub struct RelaxedModel {
    /// Hard constraints, relaxed equalities and deviation families.
    pub model: Model,
    /// One entry per original goal constraint, in model order.
    pub relaxed: Vec<RelaxedConstraint>,
}

impl RelaxedModel {
    /// Every goal record.
    pub fn goals(&self) -> impl Iterator<Item = &Goal> {
        self.relaxed.iter().flat_map(|r| r.goals.iter())
    }

    /// Distinct priorities of at least 1, ascending.
    pub fn priorities(&self) -> Vec<u32> {
        let mut priorities: Vec<u32> = self
            .relaxed
            .iter()
            .map(RelaxedConstraint::priority)
            .filter(|&p| p > 0)
            .collect();
        priorities.sort_unstable();
        priorities.dedup();
        priorities
    }
}

/// Relaxes a constraint carrying goal metadata.
///
/// # Errors
///
/// A constraint without goal metadata or without a left-hand side is a
/// configuration error; instance and right-hand side failures propagate.
///
/// # Example
///
/// ```
/// use modelforge_core::{Constraint, IndexFn, LinearExpr, Sense, Value, Variable};
/// use modelforge_goal::relax;
///
/// let regions = vec![Value::from("north"), Value::from("south")];
/// let sales = Variable::continuous("sales").lower(0.0).from_data(regions.clone());
/// let target = Constraint::new("target")
///     .lhs(LinearExpr::from(&sales))
///     .ge(50.0)
///     .from_data(regions)
///     .as_goal(1, 2.0);
///
/// let relaxed = relax(&target).unwrap();
/// assert_eq!(relaxed.goals.len(), 2);
/// assert_eq!(relaxed.goals[1].instance_id, Some(Value::from("south")));
/// assert_eq!(relaxed.constraint.sense(), Sense::Eq);
/// assert_eq!(relaxed.undesired().count(), 1);
/// ```
pub fn relax(constraint: &Constraint) -> Result<RelaxedConstraint> {
    let metadata = *constraint.goal().ok_or_else(|| {
        ModelForgeError::Config(format!("constraint '{}' is not a goal", constraint.name()))
    })?;
    relax_with(constraint, metadata)
}

/// Relaxes `constraint` with explicit goal attributes.
pub fn relax_with(constraint: &Constraint, metadata: GoalMetadata) -> Result<RelaxedConstraint> {
    let Some(lhs) = constraint.lhs_expr() else {
        return Err(ModelForgeError::Config(format!(
            "goal constraint '{}' has no left-hand side",
            constraint.name()
        )));
    };

    let mut goals = Vec::new();
    for (id, (instance, key)) in constraint.get_keyed_instances()?.into_iter().enumerate() {
        goals.push(Goal {
            id,
            constraint_name: constraint.name().to_string(),
            priority: metadata.priority,
            weight: metadata.weight,
            sense: metadata.sense,
            target_value: constraint.rhs_of(&instance)?,
            instance_id: constraint.is_indexed().then_some(key),
        });
    }

    let records: Vec<_> = goals.iter().map(Goal::to_value).collect();
    let deviation = |suffix: &str| {
        Variable::continuous(format!("{}_{}", constraint.name(), suffix))
            .lower(0.0)
            .from_data(records.clone())
            .indexed_by(IndexFn::field("id"))
    };
    let pos_dev = deviation("pos_dev");
    let neg_dev = deviation("neg_dev");

    let mut lhs = lhs.clone();
    lhs.add_linear(
        LinearExpr::new()
            .with_term(row_term(constraint, &neg_dev, 1.0))
            .with_term(row_term(constraint, &pos_dev, -1.0)),
    );
    let mut relaxed = constraint.clone().hard().with_sense(Sense::Eq);
    relaxed.set_lhs(lhs);

    debug!(
        constraint = constraint.name(),
        goals = goals.len(),
        priority = metadata.priority,
        "Relaxed goal constraint"
    );
    Ok(RelaxedConstraint {
        constraint: relaxed,
        pos_dev,
        neg_dev,
        goals,
        metadata,
    })
}

/// `coeff * dev`, restricted to the goal of the row for indexed constraints.
fn row_term(constraint: &Constraint, dev: &Variable, coeff: f64) -> LinearTerm {
    let term = LinearTerm::new(dev, coeff);
    if constraint.is_indexed() {
        term.link(Link::keys_equal(IndexFn::field("instance_id"), constraint.index_fn()))
    } else {
        term
    }
}

/// Relaxes every goal constraint of `model`.
///
/// Hard constraints, variables, SOS sets and the objective are carried
/// over; each goal is replaced by its relaxed equality and deviation
/// families.
///
/// # Errors
///
/// Deviation names clashing with existing names are configuration errors.
pub fn relax_model(model: &Model) -> Result<RelaxedModel> {
    let mut out = Model::new(model.name());
    for var in model.variables() {
        out.add_variable(var.clone())?;
    }
    for set in model.sos_sets() {
        out.add_sos(set.clone());
    }

    let mut relaxed = Vec::new();
    for constraint in model.constraints() {
        if !constraint.is_goal() {
            out.add_constraint(constraint.clone())?;
            continue;
        }
        let r = relax(constraint)?;
        out.add_variable(r.pos_dev.clone())?;
        out.add_variable(r.neg_dev.clone())?;
        out.add_constraint(r.constraint.clone())?;
        relaxed.push(r);
    }
    if let Some(objective) = model.objective() {
        out.set_objective(objective.clone());
    }
    Ok(RelaxedModel {
        model: out,
        relaxed,
    })
}
