//! Piecewise-linear approximation of scalar functions.
//!
//! `f(x)` is replaced by an output variable `y` tied to `x` through
//! breakpoints and one of two exact encodings of the interpolant:
//!
//! - `sos2`: one weight per breakpoint, a convexity row and two
//!   interpolation rows. Adjacency of the nonzero weights is carried by an
//!   [`SosSet`] annotation that the solver binding must enforce.
//! - `incremental`: one selection binary and one fill fraction per segment.
//!   Purely linear/binary, no annotation needed.
//!
//! The logarithmic encoding is not implemented.

pub mod breakpoints;

#[cfg(test)]
mod tests;

use modelforge_config::{LinearizationConfig, PiecewiseConfig};
use modelforge_core::{
    Model, ModelForgeError, PiecewiseMethod, PiecewiseTerm, Result, Sense, SosSet, VarKind,
    Variable,
};
use tracing::debug;

use crate::auxiliary::{AuxBuilder, Auxiliary};
use crate::domain::Domain;

/// Result of approximating one function.
#[derive(Debug, Clone)]
pub struct PiecewiseApproximation {
    /// Variable standing for `f(x)`.
    pub output: Variable,
    /// Sorted breakpoints.
    pub breakpoints: Vec<f64>,
    /// `f` at each breakpoint.
    pub values: Vec<f64>,
    /// Encoding used.
    pub method: PiecewiseMethod,
}

impl PiecewiseApproximation {
    /// Number of linear pieces.
    pub fn segments(&self) -> usize {
        self.breakpoints.len().saturating_sub(1)
    }

    /// Value of the interpolant at `x`, or `None` outside the domain.
    pub fn interpolate(&self, x: f64) -> Option<f64> {
        let first = *self.breakpoints.first()?;
        let last = *self.breakpoints.last()?;
        if !(first..=last).contains(&x) {
            return None;
        }
        let i = self.breakpoints.partition_point(|&b| b <= x);
        if self.breakpoints[i - 1] == x {
            return Some(self.values[i - 1]);
        }
        let (x0, x1) = (self.breakpoints[i - 1], self.breakpoints[i]);
        let (y0, y1) = (self.values[i - 1], self.values[i]);
        Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
    }
}

/// Builds piecewise-linear approximations.
///
/// # Example
///
/// ```
/// use modelforge_config::LinearizationConfig;
/// use modelforge_core::{PiecewiseMethod, PiecewiseTerm, Variable};
/// use modelforge_linearize::PiecewiseLinearizer;
///
/// let x = Variable::continuous("x").bounds(0.0, 4.0);
/// let term = PiecewiseTerm::new(&x, |x| x * x).segments(4).method(PiecewiseMethod::Sos2);
///
/// let mut linearizer = PiecewiseLinearizer::new(&LinearizationConfig::default());
/// let approx = linearizer.approximate(&term).unwrap();
///
/// assert_eq!(approx.breakpoints, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
/// assert_eq!(approx.interpolate(3.0), Some(9.0));
/// assert_eq!(approx.interpolate(2.5), Some(6.5));
/// assert_eq!(linearizer.auxiliary().sos_sets.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct PiecewiseLinearizer {
    config: PiecewiseConfig,
    seed: Option<u64>,
    builder: AuxBuilder,
}

impl PiecewiseLinearizer {
    /// Creates a linearizer using the `[linearization.piecewise]` defaults.
    pub fn new(config: &LinearizationConfig) -> Self {
        Self {
            config: config.piecewise.clone(),
            seed: None,
            builder: AuxBuilder::new(&config.aux_prefix),
        }
    }

    /// Seeds adaptive breakpoint sampling.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Keeps generated names clear of everything in `model`.
    pub fn reserve_model(&mut self, model: &Model) {
        self.builder.namer.reserve_model(model);
    }

    /// Approximates `term.func` over the term's domain.
    ///
    /// The term coefficient is not applied; callers multiply the output
    /// variable by it.
    ///
    /// # Errors
    ///
    /// - configuration error: unresolved or empty domain, zero segments
    /// - unsupported: the logarithmic method
    /// - evaluation error: `f` is not finite at a breakpoint or sample
    pub fn approximate(&mut self, term: &PiecewiseTerm) -> Result<PiecewiseApproximation> {
        let method = term.method.unwrap_or(self.config.method);
        if method == PiecewiseMethod::Logarithmic {
            return Err(unsupported(term, method));
        }
        let segments = term.segments.unwrap_or(self.config.segments);
        if segments == 0 {
            return Err(ModelForgeError::Config(format!(
                "piecewise approximation of '{}' needs at least one segment",
                term.var.name()
            )));
        }
        let (x_min, x_max) = resolve_domain(term)?;

        let entity = term.var.name();
        let breakpoints = if term.adaptive || self.config.adaptive {
            breakpoints::adaptive(
                &term.func,
                entity,
                x_min,
                x_max,
                segments,
                self.config.adaptive_samples,
                self.seed,
            )?
        } else {
            breakpoints::uniform(x_min, x_max, segments)
        };
        let values = breakpoints
            .iter()
            .map(|&x| term.func.eval(x))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ModelForgeError::evaluation(entity, e))?;

        let domain = Domain::of(&[&term.var])?;
        let output = match method {
            PiecewiseMethod::Sos2 => self.sos2(&term.var, &domain, &breakpoints, &values),
            PiecewiseMethod::Incremental => {
                self.incremental(&term.var, &domain, &breakpoints, &values)
            }
            PiecewiseMethod::Logarithmic => return Err(unsupported(term, method)),
        };
        debug!(
            var = entity,
            output = output.name(),
            %method,
            breakpoints = breakpoints.len(),
            "Approximated function"
        );
        Ok(PiecewiseApproximation {
            output,
            breakpoints,
            values,
            method,
        })
    }

    /// Auxiliaries produced so far.
    pub fn auxiliary(&self) -> &Auxiliary {
        &self.builder.aux
    }

    /// Takes the auxiliaries produced so far.
    pub fn take_auxiliary(&mut self) -> Auxiliary {
        self.builder.take()
    }

    fn output(&mut self, domain: &Domain, values: &[f64]) -> Variable {
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        self.builder
            .variable(domain, "pw_y", VarKind::Continuous, Some((lo, hi)))
    }

    fn sos2(&mut self, x: &Variable, domain: &Domain, bps: &[f64], values: &[f64]) -> Variable {
        let y = self.output(domain, values);
        let b = &mut self.builder;
        let lambdas: Vec<Variable> = bps
            .iter()
            .map(|_| b.variable(domain, "pw_lambda", VarKind::Continuous, Some((0.0, 1.0))))
            .collect();

        let convex: Vec<(&Variable, f64)> = lambdas.iter().map(|l| (l, 1.0)).collect();
        b.constraint(domain, "pw_convex", domain.expr(&convex), Sense::Eq, 1.0);

        let mut x_row = vec![(x, 1.0)];
        x_row.extend(lambdas.iter().zip(bps).map(|(l, &bp)| (l, -bp)));
        b.constraint(domain, "pw_x", domain.expr(&x_row), Sense::Eq, 0.0);

        let mut y_row = vec![(&y, 1.0)];
        y_row.extend(lambdas.iter().zip(values).map(|(l, &v)| (l, -v)));
        b.constraint(domain, "pw_y_def", domain.expr(&y_row), Sense::Eq, 0.0);

        let name = b.namer.fresh("pw_sos");
        b.aux.sos_sets.push(SosSet::sos2(
            name,
            lambdas.iter().cloned().zip(bps.iter().copied()).collect(),
        ));
        y
    }

    fn incremental(
        &mut self,
        x: &Variable,
        domain: &Domain,
        bps: &[f64],
        values: &[f64],
    ) -> Variable {
        let y = self.output(domain, values);
        let b = &mut self.builder;
        let segments = bps.len() - 1;
        let mut selects = Vec::with_capacity(segments);
        let mut fills = Vec::with_capacity(segments);
        for _ in 0..segments {
            let s = b.variable(domain, "pw_seg", VarKind::Binary, None);
            let d = b.variable(domain, "pw_fill", VarKind::Continuous, Some((0.0, 1.0)));
            b.constraint(domain, "pw_fill_on", domain.expr(&[(&d, 1.0), (&s, -1.0)]), Sense::Le, 0.0);
            selects.push(s);
            fills.push(d);
        }

        let pick: Vec<(&Variable, f64)> = selects.iter().map(|s| (s, 1.0)).collect();
        b.constraint(domain, "pw_select", domain.expr(&pick), Sense::Eq, 1.0);

        // x = sum(bp_i * s_i + width_i * d_i), y = sum(v_i * s_i + rise_i * d_i)
        let mut x_row = vec![(x, 1.0)];
        let mut y_row = vec![(&y, 1.0)];
        for i in 0..segments {
            x_row.push((&selects[i], -bps[i]));
            x_row.push((&fills[i], -(bps[i + 1] - bps[i])));
            y_row.push((&selects[i], -values[i]));
            y_row.push((&fills[i], -(values[i + 1] - values[i])));
        }
        b.constraint(domain, "pw_x", domain.expr(&x_row), Sense::Eq, 0.0);
        b.constraint(domain, "pw_y_def", domain.expr(&y_row), Sense::Eq, 0.0);
        y
    }
}

fn unsupported(term: &PiecewiseTerm, method: PiecewiseMethod) -> ModelForgeError {
    ModelForgeError::Unsupported(format!(
        "piecewise method '{}' for '{}'",
        method,
        term.var.name()
    ))
}

fn resolve_domain(term: &PiecewiseTerm) -> Result<(f64, f64)> {
    let x_min = term.x_min.or(term.var.lower_bound()).filter(|v| v.is_finite());
    let x_max = term.x_max.or(term.var.upper_bound()).filter(|v| v.is_finite());
    match (x_min, x_max) {
        (Some(lo), Some(hi)) if lo < hi => Ok((lo, hi)),
        (Some(lo), Some(hi)) => Err(ModelForgeError::Config(format!(
            "piecewise domain of '{}' is empty: [{}, {}]",
            term.var.name(),
            lo,
            hi
        ))),
        _ => Err(ModelForgeError::Config(format!(
            "piecewise approximation of '{}' needs a finite domain: set x_min/x_max or bound the variable",
            term.var.name()
        ))),
    }
}
