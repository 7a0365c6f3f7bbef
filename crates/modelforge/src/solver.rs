//! One-call solving that hides linearization and goal handling.

use std::time::Instant;

use modelforge_config::ModelConfig;
use modelforge_core::{Model, Optimizer, Result, Solution, SolverCapability};
use modelforge_goal::{relax_model, GoalProgrammingSolver, GoalSolution};
use modelforge_linearize::{LinearizationEngine, LinearizationReport};
use tracing::{debug, info};

/// Result of [`solve_model`].
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// Final solution.
    pub solution: Solution,
    /// What linearization rewrote for the optimizer.
    pub report: LinearizationReport,
    /// Stages and deviations when the model had goal constraints.
    pub goals: Option<GoalSolution>,
}

/// Linearizes `model` for the optimizer's capability and solves it.
///
/// Models with goal constraints are relaxed first and solved in the
/// configured goal mode.
///
/// # Errors
///
/// Linearization, relaxation and optimizer errors propagate. Size limits
/// of the capability are checked on the expanded model before solving.
///
/// # Example
///
/// ```
/// use modelforge::prelude::*;
/// use modelforge_test::{solution_with, ScriptedOptimizer};
///
/// let b = Variable::binary_named("open");
/// let v = Variable::continuous("flow").bounds(0.0, 10.0);
/// let mut model = Model::new("depot");
/// model.add_variable(b.clone()).unwrap();
/// model.add_variable(v.clone()).unwrap();
/// model.maximize(NonlinearExpr::new().bilinear(&b, &v, 1.0));
///
/// let mut optimizer = ScriptedOptimizer::new(SolverCapability::mixed_integer())
///     .then(solution_with(SolutionStatus::Optimal, &[("open", 1.0), ("flow", 10.0)]));
/// let outcome = solve_model(&mut optimizer, &model, &ModelConfig::default()).unwrap();
/// assert_eq!(outcome.report.bilinear, 1);
/// assert!(outcome.goals.is_none());
/// assert!(optimizer.models()[0].objective().unwrap().expr.is_linear());
/// ```
pub fn solve_model<O>(optimizer: &mut O, model: &Model, config: &ModelConfig) -> Result<SolveOutcome>
where
    O: Optimizer + ?Sized,
{
    let start = Instant::now();
    let capability = optimizer.capability();
    let engine = LinearizationEngine::new(capability.clone()).with_config(config);

    let outcome = if model.goal_constraints().next().is_some() {
        let mut relaxed = relax_model(model)?;
        let (linear, report) = engine.linearize_with_report(&relaxed.model)?;
        check_scale(&capability, &linear)?;
        relaxed.model = linear;
        let goals = GoalProgrammingSolver::from_config(config).solve_relaxed(optimizer, relaxed)?;
        SolveOutcome {
            solution: goals.solution.clone(),
            report,
            goals: Some(goals),
        }
    } else {
        let (linear, report) = engine.linearize_with_report(model)?;
        check_scale(&capability, &linear)?;
        SolveOutcome {
            solution: optimizer.solve(&linear)?,
            report,
            goals: None,
        }
    };

    info!(
        event = "solve_model_end",
        model = model.name(),
        optimizer = optimizer.name(),
        status = %outcome.solution.status,
        objective = outcome.solution.objective_value,
        duration_ms = start.elapsed().as_millis() as u64,
    );
    Ok(outcome)
}

fn check_scale(capability: &SolverCapability, model: &Model) -> Result<()> {
    if capability.max_variables.is_none() && capability.max_constraints.is_none() {
        return Ok(());
    }
    let expanded = model.expand()?;
    debug!(
        columns = expanded.num_columns(),
        rows = expanded.num_rows(),
        "Checking solver size limits"
    );
    capability.check_scale(&expanded)
}
