//! Capability-gated linearization of whole models.
//!
//! The engine walks every constraint and the objective, leaves the terms the
//! target solver handles natively in place and hands every other term to
//! the matching reformulation. The output is an ordinary [`Model`], so it
//! can go to the same [`Optimizer`](modelforge_core::Optimizer) as the input.

mod absolute;
mod indicator;
mod minmax;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use modelforge_config::{LinearizationConfig, ModelConfig};
use modelforge_core::{
    Expr, Features, LinearTerm, Model, NonlinearTerm, Objective, ObjectiveSense, PiecewiseMethod,
    Result, SolverCapability, Variable,
};
use tracing::{debug, info, info_span, warn};

use crate::auxiliary::AuxBuilder;
use crate::bilinear::BilinearLinearizer;
use crate::piecewise::PiecewiseLinearizer;

/// Counts of what one linearization pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinearizationReport {
    /// Bilinear terms reformulated.
    pub bilinear: usize,
    /// Quadratic terms reformulated.
    pub quadratic: usize,
    /// Absolute values reformulated.
    pub absolute: usize,
    /// Min/max terms reformulated.
    pub min_max: usize,
    /// Indicator constraints reformulated.
    pub indicator: usize,
    /// Piecewise-linear functions approximated.
    pub piecewise: usize,
    /// Terms left in place for the solver.
    pub native: usize,
    /// Auxiliary variable families added.
    pub auxiliary_variables: usize,
    /// Auxiliary constraint families added.
    pub auxiliary_constraints: usize,
}

impl LinearizationReport {
    /// Number of reformulated terms.
    pub fn total(&self) -> usize {
        self.bilinear + self.quadratic + self.absolute + self.min_max + self.indicator + self.piecewise
    }
}

impl fmt::Display for LinearizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} terms linearized ({} native), {} auxiliary variables, {} auxiliary constraints",
            self.total(),
            self.native,
            self.auxiliary_variables,
            self.auxiliary_constraints
        )
    }
}

/// Rewrites models for a target solver.
///
/// # Example
///
/// ```
/// use modelforge_core::{Model, NonlinearExpr, SolverCapability, Variable};
/// use modelforge_linearize::LinearizationEngine;
///
/// let x = Variable::continuous("x").bounds(0.0, 5.0);
/// let y = Variable::continuous("y").bounds(0.0, 5.0);
/// let mut model = Model::new("demo");
/// model.add_variable(x.clone()).unwrap();
/// model.add_variable(y.clone()).unwrap();
/// model.maximize(NonlinearExpr::new().bilinear(&x, &y, 1.0));
///
/// let engine = LinearizationEngine::new(SolverCapability::mixed_integer());
/// assert!(engine.needs_linearization(&model));
///
/// let (linear, report) = engine.linearize_with_report(&model).unwrap();
/// assert_eq!(report.bilinear, 1);
/// assert_eq!(report.auxiliary_constraints, 4);
/// assert!(!engine.needs_linearization(&linear));
///
/// // A solver with nonconvex quadratic support gets the model unchanged.
/// let gurobi = LinearizationEngine::new(SolverCapability::gurobi());
/// assert!(!gurobi.needs_linearization(&model));
/// ```
#[derive(Debug, Clone)]
pub struct LinearizationEngine {
    capability: SolverCapability,
    config: LinearizationConfig,
    seed: Option<u64>,
}

impl LinearizationEngine {
    /// Creates an engine with default settings.
    pub fn new(capability: SolverCapability) -> Self {
        Self {
            capability,
            config: LinearizationConfig::default(),
            seed: None,
        }
    }

    /// Applies the `[linearization]` section and the random seed.
    pub fn with_config(mut self, config: &ModelConfig) -> Self {
        self.config = config.linearization.clone();
        self.seed = config.random_seed;
        self
    }

    /// Replaces the linearization settings.
    pub fn with_linearization_config(mut self, config: LinearizationConfig) -> Self {
        self.config = config;
        self
    }

    /// Target solver capability.
    pub fn capability(&self) -> &SolverCapability {
        &self.capability
    }

    /// Returns true if any term of `model` must be reformulated.
    pub fn needs_linearization(&self, model: &Model) -> bool {
        let constraints = model
            .constraints()
            .iter()
            .filter_map(|c| c.lhs_expr())
            .any(|expr| self.expr_needs(expr, false));
        constraints
            || model.objective().is_some_and(|obj| {
                self.expr_needs(&obj.expr, obj.sense == ObjectiveSense::Minimize)
            })
    }

    /// Returns a copy of `model` without terms the target cannot handle.
    ///
    /// # Errors
    ///
    /// Propagates the first reformulation failure; nothing is partially
    /// applied.
    pub fn linearize(&self, model: &Model) -> Result<Model> {
        self.linearize_with_report(model).map(|(model, _)| model)
    }

    /// Like [`linearize`](Self::linearize), also returning what was done.
    pub fn linearize_with_report(&self, model: &Model) -> Result<(Model, LinearizationReport)> {
        let span = info_span!("linearize", model = model.name(), solver = %self.capability.name);
        let _enter = span.enter();

        let mut pass = Pass::new(&self.capability, &self.config, self.seed, model);
        let mut out = Model::new(model.name());
        for var in model.variables() {
            out.add_variable(var.clone())?;
        }
        for set in model.sos_sets() {
            out.add_sos(set.clone());
        }

        for constraint in model.constraints() {
            let mut constraint = constraint.clone();
            let Some(lhs) = constraint.take_lhs() else {
                out.add_constraint(constraint)?;
                continue;
            };
            let had_indicator = lhs
                .nonlinear_terms()
                .iter()
                .any(|t| matches!(t, NonlinearTerm::Indicator(_)));
            let lhs = pass.rewrite(lhs, false)?;
            if had_indicator && lhs.variables().is_empty() {
                debug!(constraint = constraint.name(), "Constraint replaced by indicator rows");
                continue;
            }
            constraint.set_lhs(lhs);
            out.add_constraint(constraint)?;
        }

        if let Some(objective) = model.objective() {
            let minimized = objective.sense == ObjectiveSense::Minimize;
            let expr = pass.rewrite(objective.expr.clone(), minimized)?;
            out.set_objective(Objective {
                expr,
                sense: objective.sense,
            });
        }

        let mut report = pass.report;
        let mut aux = pass.bilinear.take_auxiliary();
        aux.absorb(pass.piecewise.take_auxiliary());
        aux.absorb(pass.builder.take());
        let (vars, cons) = aux.merge_into(&mut out)?;
        report.auxiliary_variables = vars;
        report.auxiliary_constraints = cons;

        info!(
            event = "linearize_end",
            model = model.name(),
            linearized = report.total(),
            native = report.native,
            auxiliary_variables = vars,
            auxiliary_constraints = cons,
        );
        Ok((out, report))
    }

    fn expr_needs(&self, expr: &Expr, minimized: bool) -> bool {
        let quadratic = expr
            .quadratic_terms()
            .iter()
            .any(|q| !self.capability.supports_product(q.is_square(), q.coeff, minimized));
        quadratic
            || expr.nonlinear_terms().iter().any(|term| match term {
                NonlinearTerm::Bilinear(t) => !self
                    .capability
                    .supports_product(t.var1.name() == t.var2.name(), t.coeff, minimized),
                other => self.capability.needs_linearization(other.kind()),
            })
    }
}

/// State of one `linearize` call.
struct Pass<'a> {
    capability: &'a SolverCapability,
    big_m: f64,
    default_method: PiecewiseMethod,
    bilinear: BilinearLinearizer,
    piecewise: PiecewiseLinearizer,
    builder: AuxBuilder,
    absolute_cache: HashMap<Arc<str>, Variable>,
    report: LinearizationReport,
}

impl<'a> Pass<'a> {
    fn new(
        capability: &'a SolverCapability,
        config: &LinearizationConfig,
        seed: Option<u64>,
        model: &Model,
    ) -> Self {
        let mut bilinear = BilinearLinearizer::new(config);
        bilinear.reserve_model(model);
        let mut piecewise = PiecewiseLinearizer::new(config).with_seed(seed);
        piecewise.reserve_model(model);
        let mut builder = AuxBuilder::new(&config.aux_prefix);
        builder.namer.reserve_model(model);
        Self {
            capability,
            big_m: config.big_m,
            default_method: config.piecewise.method,
            bilinear,
            piecewise,
            builder,
            absolute_cache: HashMap::new(),
            report: LinearizationReport::default(),
        }
    }

    /// Replaces every unsupported term of `expr` by linear terms over
    /// auxiliaries. Indicator terms only produce auxiliary rows.
    fn rewrite(&mut self, expr: Expr, minimized: bool) -> Result<Expr> {
        let (mut linear, quadratic, nonlinear) = expr.into_parts();
        let mut kept_quadratic = Vec::new();
        let mut kept = Vec::new();

        for q in quadratic {
            if self.capability.supports_product(q.is_square(), q.coeff, minimized) {
                self.report.native += 1;
                kept_quadratic.push(q);
                continue;
            }
            let z = self.bilinear.product(&q.var1, &q.var2)?;
            linear.add_term(LinearTerm::new(&z, q.coeff));
            self.report.quadratic += 1;
        }

        for term in nonlinear {
            let native = match &term {
                NonlinearTerm::Bilinear(t) => self
                    .capability
                    .supports_product(t.var1.name() == t.var2.name(), t.coeff, minimized),
                other => !self.capability.needs_linearization(other.kind()),
            };
            if native {
                debug!(kind = %term.kind(), "Leaving term to the solver");
                self.report.native += 1;
                kept.push(term);
                continue;
            }
            match term {
                NonlinearTerm::Bilinear(t) => {
                    let z = self.bilinear.linearize(&t)?;
                    linear.add_term(LinearTerm::new(&z, t.coeff));
                    self.report.bilinear += 1;
                }
                NonlinearTerm::Absolute(t) => {
                    let abs = self.absolute(&t.var)?;
                    linear.add_term(LinearTerm::new(&abs, t.coeff));
                    self.report.absolute += 1;
                }
                NonlinearTerm::MinMax(t) => {
                    let z = self.min_max(&t)?;
                    linear.add_term(LinearTerm::new(&z, 1.0));
                    self.report.min_max += 1;
                }
                NonlinearTerm::Indicator(t) => {
                    self.indicator(&t)?;
                    self.report.indicator += 1;
                }
                NonlinearTerm::PiecewiseLinear(mut t) => {
                    let method = t.method.unwrap_or(self.default_method);
                    if method == PiecewiseMethod::Sos2 && !self.capability.supports(Features::SOS2) {
                        warn!(
                            var = t.var.name(),
                            solver = %self.capability.name,
                            "Solver lacks SOS2, using incremental formulation"
                        );
                        t.method = Some(PiecewiseMethod::Incremental);
                    }
                    let approx = self.piecewise.approximate(&t)?;
                    linear.add_term(LinearTerm::new(&approx.output, t.coeff));
                    self.report.piecewise += 1;
                }
            }
        }
        Ok(Expr::from_parts(linear, kept_quadratic, kept))
    }
}

/// Finite bounds of `var`, substituting `±big_m` for missing ones.
fn bounds_or_big_m(var: &Variable, big_m: f64) -> (f64, f64) {
    let lower = var.lower_bound().filter(|l| l.is_finite()).unwrap_or_else(|| {
        warn!(var = var.name(), big_m, "Missing lower bound, using -big_m");
        -big_m
    });
    let upper = var.upper_bound().filter(|u| u.is_finite()).unwrap_or_else(|| {
        warn!(var = var.name(), big_m, "Missing upper bound, using big_m");
        big_m
    });
    (lower, upper)
}

