//! Goal objectives.

use modelforge_config::GoalProgrammingConfig;
use modelforge_core::{LinearExpr, LinearTerm};

use crate::relax::RelaxedConstraint;

/// `base^(offset - priority + 1)` for `priority >= 1`; `1` for priority 0.
///
/// Priority 1 gets `base^offset`.
///
/// # Example
///
/// ```
/// use modelforge_goal::priority_weight;
///
/// assert_eq!(priority_weight(1, 10.0, 6), 1e6);
/// assert_eq!(priority_weight(2, 10.0, 6), 1e5);
/// assert_eq!(priority_weight(7, 10.0, 6), 1.0);
/// assert_eq!(priority_weight(0, 3.0, 2), 1.0);
/// ```
pub fn priority_weight(priority: u32, base: f64, offset: i32) -> f64 {
    if priority == 0 {
        return 1.0;
    }
    match i32::try_from(priority) {
        Ok(p) => base.powi(offset.saturating_sub(p).saturating_add(1)),
        Err(_) => 0.0,
    }
}

/// Objective of one lexicographic stage.
#[derive(Debug, Clone)]
pub struct PriorityObjective {
    /// Priority level, 1 first.
    pub priority: u32,
    /// Weighted sum of this level's undesired deviations, to minimize.
    pub expr: LinearExpr,
}

/// Builds objectives over relaxed goals.
#[derive(Debug, Clone)]
pub struct GoalObjectiveBuilder {
    base: f64,
    offset: i32,
}

impl GoalObjectiveBuilder {
    /// Creates a builder from the `[goal_programming]` section.
    pub fn new(config: &GoalProgrammingConfig) -> Self {
        Self {
            base: config.priority_base,
            offset: config.priority_exponent_offset,
        }
    }

    /// Scale applied to goals of `priority`.
    pub fn priority_weight(&self, priority: u32) -> f64 {
        priority_weight(priority, self.base, self.offset)
    }

    /// Single objective approximating lexicographic order.
    ///
    /// Each undesired deviation is scaled by its priority weight times the
    /// goal weight. Priority-0 goals and `custom` enter unscaled. Separation
    /// between levels is only as good as the base allows for the model's
    /// numeric range; use sequential solving when it must be strict.
    ///
    /// # Example
    ///
    /// ```
    /// use modelforge_config::GoalProgrammingConfig;
    /// use modelforge_core::{Constraint, LinearExpr, Variable};
    /// use modelforge_goal::{relax, GoalObjectiveBuilder};
    ///
    /// let production = Variable::continuous("production").lower(0.0);
    /// let goal = Constraint::new("output")
    ///     .lhs(LinearExpr::from(&production))
    ///     .ge(100.0)
    ///     .as_goal(1, 1.0);
    /// let relaxed = relax(&goal).unwrap();
    ///
    /// let builder = GoalObjectiveBuilder::new(&GoalProgrammingConfig::default());
    /// let objective = builder.weighted(&[relaxed], None);
    /// assert_eq!(objective.term_for("output_neg_dev").unwrap().coeff.as_constant(), Some(1e6));
    /// assert!(objective.term_for("output_pos_dev").is_none());
    /// ```
    pub fn weighted(&self, relaxed: &[RelaxedConstraint], custom: Option<&LinearExpr>) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for r in relaxed {
            let coeff = self.priority_weight(r.priority()) * r.metadata.weight;
            for dev in r.undesired() {
                expr.add_term(LinearTerm::new(dev, coeff));
            }
        }
        if let Some(custom) = custom {
            expr.merge(custom.clone());
        }
        expr
    }

    /// One objective per priority of at least 1, ascending.
    ///
    /// Stage objectives use goal weights only; priorities are separated by
    /// solving the stages in order.
    pub fn sequential(&self, relaxed: &[RelaxedConstraint]) -> Vec<PriorityObjective> {
        let mut stages: Vec<PriorityObjective> = Vec::new();
        let mut ordered: Vec<&RelaxedConstraint> =
            relaxed.iter().filter(|r| r.priority() > 0).collect();
        ordered.sort_by_key(|r| r.priority());
        for r in ordered {
            if stages.last().map(|s| s.priority) != Some(r.priority()) {
                stages.push(PriorityObjective {
                    priority: r.priority(),
                    expr: LinearExpr::new(),
                });
            }
            if let Some(stage) = stages.last_mut() {
                for dev in r.undesired() {
                    stage.expr.add_term(LinearTerm::new(dev, r.metadata.weight));
                }
            }
        }
        stages
    }
}
