//! Weighted and sequential goal solving.

use std::collections::HashMap;

use modelforge_config::{DeviationFixing, GoalMode, GoalProgrammingConfig, ModelConfig};
use modelforge_core::{
    Coefficient, Constraint, Deviation, EvalError, Goal, LinearExpr, LinearTerm, Link, Model,
    ModelForgeError, Objective, ObjectiveSense, Optimizer, Result, Solution, Value, Variable,
};
use tracing::{debug, info, info_span, warn};

use crate::objective::GoalObjectiveBuilder;
use crate::relax::{relax_model, RelaxedConstraint, RelaxedModel};

/// Deviations of one goal in a solved stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationRecord {
    /// The goal.
    pub goal: Goal,
    /// Overshoot.
    pub positive: f64,
    /// Undershoot.
    pub negative: f64,
}

impl DeviationRecord {
    /// Deviation in one direction.
    pub fn get(&self, direction: Deviation) -> f64 {
        match direction {
            Deviation::Positive => self.positive,
            Deviation::Negative => self.negative,
        }
    }

    /// Sum of the deviations that count against the goal.
    pub fn undesired(&self) -> f64 {
        self.goal.undesired().iter().map(|&d| self.get(d)).sum()
    }

    /// Returns true when no undesired deviation exceeds `tolerance`.
    pub fn is_met(&self, tolerance: f64) -> bool {
        self.undesired() <= tolerance
    }
}

/// One solve of a goal program.
#[derive(Debug, Clone)]
pub struct GoalStage {
    /// Priority optimized in this stage; `None` for the weighted solve.
    pub priority: Option<u32>,
    /// What the optimizer returned.
    pub solution: Solution,
    /// Deviations of every goal, empty when the stage had no solution.
    pub deviations: Vec<DeviationRecord>,
}

/// Outcome of a goal program.
#[derive(Debug, Clone)]
pub struct GoalSolution {
    /// Solution of the last stage that ran.
    pub solution: Solution,
    /// Every stage in solve order.
    pub stages: Vec<GoalStage>,
    /// False when a stage was not optimal and later priorities were skipped.
    pub completed: bool,
}

impl GoalSolution {
    /// Solution of the last optimal stage.
    pub fn best_optimal(&self) -> Option<&Solution> {
        self.stages
            .iter()
            .rev()
            .map(|s| &s.solution)
            .find(|s| s.is_optimal())
    }

    /// Deviations recorded by the last stage that produced any.
    pub fn deviations(&self) -> &[DeviationRecord] {
        self.stages
            .iter()
            .rev()
            .find(|s| !s.deviations.is_empty())
            .map_or(&[], |s| s.deviations.as_slice())
    }
}

/// Drives goal programs through an [`Optimizer`].
///
/// # Example
///
/// ```
/// use modelforge_core::{
///     Constraint, LinearExpr, Model, SolutionStatus, SolverCapability, Value, VarKey, Variable,
/// };
/// use modelforge_goal::GoalProgrammingSolver;
/// use modelforge_test::{solution_with, ScriptedOptimizer};
///
/// let x = Variable::continuous("x").bounds(0.0, 80.0);
/// let mut model = Model::new("plan");
/// model.add_variable(x.clone()).unwrap();
/// model
///     .add_constraint(Constraint::new("output").lhs(LinearExpr::from(&x)).ge(100.0).as_goal(1, 1.0))
///     .unwrap();
///
/// let mut solved = solution_with(SolutionStatus::Optimal, &[("x", 80.0)]);
/// solved.set_value(&VarKey::new("output_pos_dev", Value::from(0usize)), 0.0);
/// solved.set_value(&VarKey::new("output_neg_dev", Value::from(0usize)), 20.0);
/// let mut optimizer = ScriptedOptimizer::new(SolverCapability::linear_programming()).then(solved);
///
/// let result = GoalProgrammingSolver::default().solve(&mut optimizer, &model).unwrap();
/// assert!(result.completed);
/// assert_eq!(result.deviations()[0].negative, 20.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GoalProgrammingSolver {
    config: GoalProgrammingConfig,
}

impl GoalProgrammingSolver {
    /// Creates a solver from the `[goal_programming]` section.
    pub fn new(config: GoalProgrammingConfig) -> Self {
        Self { config }
    }

    /// Creates a solver from a full configuration.
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.goal_programming.clone())
    }

    /// Settings in use.
    pub fn config(&self) -> &GoalProgrammingConfig {
        &self.config
    }

    /// Relaxes the goal constraints of `model` and solves it.
    pub fn solve<O>(&self, optimizer: &mut O, model: &Model) -> Result<GoalSolution>
    where
        O: Optimizer + ?Sized,
    {
        self.solve_relaxed(optimizer, relax_model(model)?)
    }

    /// Solves an already relaxed model.
    ///
    /// The model may have been rewritten in between (e.g. linearized) as
    /// long as the deviation families keep their names.
    ///
    /// # Errors
    ///
    /// Optimizer failures propagate. A non-optimal stage is not an error:
    /// it ends the run with `completed == false`.
    pub fn solve_relaxed<O>(&self, optimizer: &mut O, relaxed: RelaxedModel) -> Result<GoalSolution>
    where
        O: Optimizer + ?Sized,
    {
        let span = info_span!("goal_solve", model = relaxed.model.name(), mode = ?self.config.mode);
        let _enter = span.enter();
        info!(
            event = "goal_solve_start",
            goals = relaxed.goals().count(),
            priorities = relaxed.priorities().len(),
            optimizer = optimizer.name(),
        );
        match self.config.mode {
            GoalMode::Weighted => self.solve_weighted(optimizer, relaxed),
            GoalMode::Sequential => self.solve_sequential(optimizer, relaxed),
        }
    }

    fn solve_weighted<O>(&self, optimizer: &mut O, relaxed: RelaxedModel) -> Result<GoalSolution>
    where
        O: Optimizer + ?Sized,
    {
        let RelaxedModel { mut model, relaxed } = relaxed;
        let custom = custom_terms(&mut model)?;
        let builder = GoalObjectiveBuilder::new(&self.config);
        model.set_objective(Objective::minimize(builder.weighted(&relaxed, custom.as_ref())));

        let solution = optimizer.solve(&model)?;
        let deviations = if solution.is_feasible() {
            record_deviations(&relaxed, &solution)?
        } else {
            warn!(status = %solution.status, "Weighted goal solve found no solution");
            Vec::new()
        };
        info!(
            event = "goal_stage",
            status = %solution.status,
            objective = solution.objective_value,
        );
        Ok(GoalSolution {
            solution: solution.clone(),
            stages: vec![GoalStage {
                priority: None,
                solution,
                deviations,
            }],
            completed: true,
        })
    }

    fn solve_sequential<O>(&self, optimizer: &mut O, relaxed: RelaxedModel) -> Result<GoalSolution>
    where
        O: Optimizer + ?Sized,
    {
        let RelaxedModel { mut model, relaxed } = relaxed;
        if model.take_objective().is_some() {
            debug!("Sequential goal solving ignores the model objective");
        }
        let builder = GoalObjectiveBuilder::new(&self.config);
        let objectives = builder.sequential(&relaxed);
        if objectives.is_empty() {
            let solution = optimizer.solve(&model)?;
            return Ok(GoalSolution {
                solution,
                stages: Vec::new(),
                completed: true,
            });
        }

        let mut stages: Vec<GoalStage> = Vec::with_capacity(objectives.len());
        for stage in objectives {
            model.set_objective(Objective::minimize(stage.expr));
            let solution = optimizer.solve(&model)?;
            info!(
                event = "goal_stage",
                priority = stage.priority,
                status = %solution.status,
                objective = solution.objective_value,
            );
            if !solution.is_optimal() {
                warn!(
                    priority = stage.priority,
                    status = %solution.status,
                    "Goal stage not optimal, skipping remaining priorities"
                );
                stages.push(GoalStage {
                    priority: Some(stage.priority),
                    solution: solution.clone(),
                    deviations: Vec::new(),
                });
                return Ok(GoalSolution {
                    solution,
                    stages,
                    completed: false,
                });
            }

            let deviations = record_deviations(&relaxed, &solution)?;
            for r in relaxed.iter().filter(|r| r.priority() == stage.priority) {
                for dev in r.undesired() {
                    let fix = self.fixing_constraint(dev, &r.goals, &solution)?;
                    debug!(constraint = fix.name(), "Fixing deviations");
                    model.add_constraint(fix)?;
                }
            }
            stages.push(GoalStage {
                priority: Some(stage.priority),
                solution,
                deviations,
            });
        }

        // Stages are non-empty here.
        let solution = stages
            .last()
            .map(|s| s.solution.clone())
            .ok_or_else(|| ModelForgeError::InvalidState("no goal stage ran".into()))?;
        Ok(GoalSolution {
            solution,
            stages,
            completed: true,
        })
    }

    /// Pins `dev` at its solved values for every goal, exactly or within
    /// the configured tolerance.
    fn fixing_constraint(&self, dev: &Variable, goals: &[Goal], solution: &Solution) -> Result<Constraint> {
        let mut values: HashMap<Value, f64> = HashMap::with_capacity(goals.len());
        for goal in goals {
            values.insert(goal.key(), deviation_value(solution, dev, goal)?);
        }
        let slack = match self.config.deviation_fixing {
            DeviationFixing::Exact => 0.0,
            DeviationFixing::Tolerance => self.config.fixing_tolerance,
        };
        let rhs = Coefficient::from_fn(move |goal: &Value| {
            let key = goal.field("id")?;
            values
                .get(key)
                .map(|v| v + slack)
                .ok_or_else(|| EvalError::new(format!("no solved deviation for goal {}", key)))
        });

        let name = format!("{}_fix", dev.name());
        let lhs = LinearExpr::new()
            .with_term(LinearTerm::new(dev, 1.0).link(Link::keys_equal(dev.index_fn(), dev.index_fn())));
        let fix = Constraint::new(name).aligned_with(dev).lhs(lhs);
        Ok(match self.config.deviation_fixing {
            DeviationFixing::Exact => fix.eq(rhs),
            DeviationFixing::Tolerance => fix.le(rhs),
        })
    }
}

/// Linear terms of the model's own objective, as a minimization.
fn custom_terms(model: &mut Model) -> Result<Option<LinearExpr>> {
    let Some(objective) = model.take_objective() else {
        return Ok(None);
    };
    if !objective.expr.is_linear() {
        return Err(ModelForgeError::Unsupported(
            "goal programming needs a linear model objective; linearize the model first".into(),
        ));
    }
    let linear = objective.expr.linear().clone();
    Ok(Some(match objective.sense {
        ObjectiveSense::Minimize => linear,
        ObjectiveSense::Maximize => -linear,
    }))
}

fn deviation_value(solution: &Solution, dev: &Variable, goal: &Goal) -> Result<f64> {
    solution.value_at(dev.name(), &goal.key()).ok_or_else(|| {
        ModelForgeError::InvalidState(format!(
            "solution has no value for '{}' of goal {}",
            dev.name(),
            goal.id
        ))
    })
}

fn record_deviations(relaxed: &[RelaxedConstraint], solution: &Solution) -> Result<Vec<DeviationRecord>> {
    let mut records = Vec::new();
    for r in relaxed {
        for goal in &r.goals {
            records.push(DeviationRecord {
                goal: goal.clone(),
                positive: deviation_value(solution, &r.pos_dev, goal)?,
                negative: deviation_value(solution, &r.neg_dev, goal)?,
            });
        }
    }
    Ok(records)
}
