//! Nonlinear terms and expressions.
//!
//! Nonlinear terms are a closed set. Consumers match on [`NonlinearTerm`]
//! exhaustively, so a new kind is a compile-time change everywhere it
//! matters.

use std::fmt::{self, Debug};
use std::sync::Arc;

use super::linear::LinearExpr;
use crate::constraint::Sense;
use crate::error::EvalError;
use crate::variable::Variable;

/// A scalar function `f(x)` to be approximated piecewise-linearly.
#[derive(Clone)]
pub struct ScalarFn(Arc<dyn Fn(f64) -> f64 + Send + Sync>);

impl ScalarFn {
    /// Wraps a function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        ScalarFn(Arc::new(f))
    }

    /// Evaluates the function. Non-finite results are errors.
    pub fn eval(&self, x: f64) -> Result<f64, EvalError> {
        let y = (self.0)(x);
        if y.is_finite() {
            Ok(y)
        } else {
            Err(EvalError::new(format!("function evaluated to {} at x = {}", y, x)))
        }
    }
}

impl Debug for ScalarFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScalarFn(..)")
    }
}

/// Exact reformulation used for a piecewise-linear approximation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PiecewiseMethod {
    /// Convex-combination weights per breakpoint with an SOS2 annotation.
    #[default]
    Sos2,
    /// Segment selection binaries with fill fractions.
    Incremental,
    /// Logarithmic encoding. Not implemented.
    Logarithmic,
}

impl fmt::Display for PiecewiseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PiecewiseMethod::Sos2 => write!(f, "sos2"),
            PiecewiseMethod::Incremental => write!(f, "incremental"),
            PiecewiseMethod::Logarithmic => write!(f, "logarithmic"),
        }
    }
}

/// `coeff * var1 * var2`.
#[derive(Debug, Clone)]
pub struct BilinearTerm {
    /// First factor.
    pub var1: Variable,
    /// Second factor.
    pub var2: Variable,
    /// Coefficient.
    pub coeff: f64,
}

/// `coeff * |var|`.
#[derive(Debug, Clone)]
pub struct AbsoluteTerm {
    /// Argument.
    pub var: Variable,
    /// Coefficient.
    pub coeff: f64,
}

/// Aggregation used by [`MinMaxTerm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinMaxOp {
    /// Minimum.
    Min,
    /// Maximum.
    Max,
}

/// `op(coeffs[i] * vars[i])`.
#[derive(Debug, Clone)]
pub struct MinMaxTerm {
    /// Arguments.
    pub vars: Vec<Variable>,
    /// Per-argument coefficients.
    pub coeffs: Vec<f64>,
    /// Min or max.
    pub op: MinMaxOp,
}

/// `binary == condition  =>  expr (sense) rhs`.
#[derive(Debug, Clone)]
pub struct IndicatorTerm {
    /// Controlling binary variable.
    pub binary: Variable,
    /// Value of the binary that activates the constraint.
    pub condition: bool,
    /// Constrained expression.
    pub expr: LinearExpr,
    /// Constraint sense.
    pub sense: Sense,
    /// Right-hand side.
    pub rhs: f64,
}

/// `coeff * f(var)` approximated piecewise-linearly.
#[derive(Debug, Clone)]
pub struct PiecewiseTerm {
    /// Argument.
    pub var: Variable,
    /// Function to approximate.
    pub func: ScalarFn,
    /// Number of segments; `None` uses the configured default.
    pub segments: Option<usize>,
    /// Domain lower end, overriding the variable's bound.
    pub x_min: Option<f64>,
    /// Domain upper end, overriding the variable's bound.
    pub x_max: Option<f64>,
    /// Place breakpoints where curvature is high.
    pub adaptive: bool,
    /// Reformulation; `None` uses the configured default.
    pub method: Option<PiecewiseMethod>,
    /// Coefficient applied to the approximated output.
    pub coeff: f64,
}

impl PiecewiseTerm {
    /// Creates a term using configured defaults for everything but the function.
    pub fn new<F>(var: &Variable, func: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            var: var.clone(),
            func: ScalarFn::new(func),
            segments: None,
            x_min: None,
            x_max: None,
            adaptive: false,
            method: None,
            coeff: 1.0,
        }
    }

    /// Sets the number of segments.
    pub fn segments(mut self, segments: usize) -> Self {
        self.segments = Some(segments);
        self
    }

    /// Sets the approximation domain.
    pub fn domain(mut self, x_min: f64, x_max: f64) -> Self {
        self.x_min = Some(x_min);
        self.x_max = Some(x_max);
        self
    }

    /// Sets the reformulation method.
    pub fn method(mut self, method: PiecewiseMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Enables curvature-adaptive breakpoints.
    pub fn adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    /// Sets the output coefficient.
    pub fn coeff(mut self, coeff: f64) -> Self {
        self.coeff = coeff;
        self
    }
}

/// Kind tag of a nonlinear term, used for capability lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonlinearKind {
    /// Product of two variables.
    Bilinear,
    /// Absolute value.
    Absolute,
    /// Minimum or maximum.
    MinMax,
    /// Indicator constraint.
    Indicator,
    /// Piecewise-linear function.
    PiecewiseLinear,
}

impl fmt::Display for NonlinearKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonlinearKind::Bilinear => write!(f, "bilinear"),
            NonlinearKind::Absolute => write!(f, "absolute"),
            NonlinearKind::MinMax => write!(f, "minmax"),
            NonlinearKind::Indicator => write!(f, "indicator"),
            NonlinearKind::PiecewiseLinear => write!(f, "piecewise"),
        }
    }
}

/// A nonlinear term.
#[derive(Debug, Clone)]
pub enum NonlinearTerm {
    /// `coeff * x * y`.
    Bilinear(BilinearTerm),
    /// `coeff * |x|`.
    Absolute(AbsoluteTerm),
    /// `min/max(c_i * x_i)`.
    MinMax(MinMaxTerm),
    /// Conditional linear constraint. Contributes nothing to the expression value.
    Indicator(IndicatorTerm),
    /// `coeff * f(x)`.
    PiecewiseLinear(PiecewiseTerm),
}

impl NonlinearTerm {
    /// Returns the kind tag.
    pub fn kind(&self) -> NonlinearKind {
        match self {
            NonlinearTerm::Bilinear(_) => NonlinearKind::Bilinear,
            NonlinearTerm::Absolute(_) => NonlinearKind::Absolute,
            NonlinearTerm::MinMax(_) => NonlinearKind::MinMax,
            NonlinearTerm::Indicator(_) => NonlinearKind::Indicator,
            NonlinearTerm::PiecewiseLinear(_) => NonlinearKind::PiecewiseLinear,
        }
    }

    /// Returns every variable the term references.
    pub fn variables(&self) -> Vec<&Variable> {
        match self {
            NonlinearTerm::Bilinear(t) => vec![&t.var1, &t.var2],
            NonlinearTerm::Absolute(t) => vec![&t.var],
            NonlinearTerm::MinMax(t) => t.vars.iter().collect(),
            NonlinearTerm::Indicator(t) => {
                let mut vars = vec![&t.binary];
                vars.extend(t.expr.variables());
                vars
            }
            NonlinearTerm::PiecewiseLinear(t) => vec![&t.var],
        }
    }
}

/// Linear part plus nonlinear terms.
///
/// # Example
///
/// ```
/// use modelforge_core::{NonlinearExpr, NonlinearKind, Variable};
///
/// let x = Variable::continuous("x").bounds(0.0, 5.0);
/// let y = Variable::continuous("y").bounds(0.0, 5.0);
/// let expr = NonlinearExpr::new().term(&x, 1.0).bilinear(&x, &y, 2.0).absolute(&y, 1.0);
///
/// assert_eq!(expr.terms().len(), 2);
/// assert_eq!(expr.terms()[0].kind(), NonlinearKind::Bilinear);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NonlinearExpr {
    /// Linear sub-expression.
    pub linear: LinearExpr,
    terms: Vec<NonlinearTerm>,
}

impl NonlinearExpr {
    /// Creates an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a linear expression.
    pub fn from_linear(linear: LinearExpr) -> Self {
        Self {
            linear,
            terms: Vec::new(),
        }
    }

    /// Adds a linear term.
    pub fn term(mut self, var: &Variable, coeff: f64) -> Self {
        self.linear = self.linear.term(var, coeff);
        self
    }

    /// Adds `coeff * x * y`.
    pub fn bilinear(self, var1: &Variable, var2: &Variable, coeff: f64) -> Self {
        self.with(NonlinearTerm::Bilinear(BilinearTerm {
            var1: var1.clone(),
            var2: var2.clone(),
            coeff,
        }))
    }

    /// Adds `coeff * |x|`.
    pub fn absolute(self, var: &Variable, coeff: f64) -> Self {
        self.with(NonlinearTerm::Absolute(AbsoluteTerm {
            var: var.clone(),
            coeff,
        }))
    }

    /// Adds `min(c_i * x_i)`.
    pub fn min(self, vars: &[Variable], coeffs: &[f64]) -> Self {
        self.with(NonlinearTerm::MinMax(MinMaxTerm {
            vars: vars.to_vec(),
            coeffs: coeffs.to_vec(),
            op: MinMaxOp::Min,
        }))
    }

    /// Adds `max(c_i * x_i)`.
    pub fn max(self, vars: &[Variable], coeffs: &[f64]) -> Self {
        self.with(NonlinearTerm::MinMax(MinMaxTerm {
            vars: vars.to_vec(),
            coeffs: coeffs.to_vec(),
            op: MinMaxOp::Max,
        }))
    }

    /// Adds an indicator constraint.
    pub fn indicator(
        self,
        binary: &Variable,
        condition: bool,
        expr: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) -> Self {
        self.with(NonlinearTerm::Indicator(IndicatorTerm {
            binary: binary.clone(),
            condition,
            expr,
            sense,
            rhs,
        }))
    }

    /// Adds a piecewise-linear term.
    pub fn piecewise(self, term: PiecewiseTerm) -> Self {
        self.with(NonlinearTerm::PiecewiseLinear(term))
    }

    /// Adds any nonlinear term.
    pub fn with(mut self, term: NonlinearTerm) -> Self {
        self.terms.push(term);
        self
    }

    /// Adds any nonlinear term in place.
    pub fn push(&mut self, term: NonlinearTerm) {
        self.terms.push(term);
    }

    /// Returns the nonlinear terms.
    pub fn terms(&self) -> &[NonlinearTerm] {
        &self.terms
    }

    /// Splits into linear part and nonlinear terms.
    pub fn into_parts(self) -> (LinearExpr, Vec<NonlinearTerm>) {
        (self.linear, self.terms)
    }
}
