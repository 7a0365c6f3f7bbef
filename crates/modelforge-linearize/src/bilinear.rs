//! Bilinear products.
//!
//! `x * y` is replaced by an auxiliary variable `z` tied to the operands by
//! linear constraints chosen from the operand kinds:
//!
//! | operands              | formulation          | exact |
//! |-----------------------|----------------------|-------|
//! | binary × binary       | AND logic            | yes   |
//! | binary × continuous   | Big-M                | yes, given true bounds |
//! | continuous × continuous | McCormick envelope | no (relaxation) |
//!
//! Every other combination is unsupported.

use std::collections::HashMap;
use std::sync::Arc;

use modelforge_config::LinearizationConfig;
use modelforge_core::{
    BilinearTerm, Model, ModelForgeError, Result, Sense, VarKind, Variable,
};
use tracing::{debug, warn};

use crate::auxiliary::{AuxBuilder, Auxiliary};
use crate::domain::Domain;

/// Linearizes bilinear products, one auxiliary per unordered operand pair.
///
/// # Example
///
/// ```
/// use modelforge_config::LinearizationConfig;
/// use modelforge_core::{BilinearTerm, Variable};
/// use modelforge_linearize::BilinearLinearizer;
///
/// let x = Variable::continuous("x").bounds(0.0, 5.0);
/// let y = Variable::continuous("y").bounds(-1.0, 2.0);
///
/// let mut linearizer = BilinearLinearizer::new(&LinearizationConfig::default());
/// let z = linearizer
///     .linearize(&BilinearTerm { var1: x.clone(), var2: y.clone(), coeff: 1.0 })
///     .unwrap();
///
/// assert_eq!(z.finite_bounds(), Some((-5.0, 10.0)));
/// assert_eq!(linearizer.auxiliary().constraints.len(), 4);
///
/// // The same pair in either order reuses the auxiliary.
/// let again = linearizer.product(&y, &x).unwrap();
/// assert_eq!(again.name(), z.name());
/// ```
#[derive(Debug, Clone)]
pub struct BilinearLinearizer {
    big_m: f64,
    builder: AuxBuilder,
    cache: HashMap<(Arc<str>, Arc<str>), Variable>,
}

impl BilinearLinearizer {
    /// Creates a linearizer.
    pub fn new(config: &LinearizationConfig) -> Self {
        Self {
            big_m: config.big_m,
            builder: AuxBuilder::new(&config.aux_prefix),
            cache: HashMap::new(),
        }
    }

    /// Keeps generated names clear of everything in `model`.
    pub fn reserve_model(&mut self, model: &Model) {
        self.builder.namer.reserve_model(model);
    }

    /// Returns the variable standing for `term.var1 * term.var2`.
    ///
    /// The term coefficient is not applied; callers multiply the returned
    /// variable by it.
    ///
    /// # Errors
    ///
    /// - configuration error: McCormick operands without finite bounds, or
    ///   indexed operands over different keys
    /// - unsupported: any integer operand
    pub fn linearize(&mut self, term: &BilinearTerm) -> Result<Variable> {
        self.product(&term.var1, &term.var2)
    }

    /// Returns the variable standing for `x * y`.
    pub fn product(&mut self, x: &Variable, y: &Variable) -> Result<Variable> {
        let key = pair_key(x, y);
        if let Some(z) = self.cache.get(&key) {
            debug!(x = x.name(), y = y.name(), z = z.name(), "Reusing product");
            return Ok(z.clone());
        }

        let domain = Domain::of(&[x, y])?;
        let z = match (x.kind(), y.kind()) {
            (VarKind::Binary, VarKind::Binary) => self.and_logic(x, y, &domain),
            (VarKind::Binary, VarKind::Continuous) => self.big_m(x, y, &domain),
            (VarKind::Continuous, VarKind::Binary) => self.big_m(y, x, &domain),
            (VarKind::Continuous, VarKind::Continuous) => self.mccormick(x, y, &domain)?,
            (k1, k2) => {
                return Err(ModelForgeError::Unsupported(format!(
                    "bilinear product of {} '{}' and {} '{}'",
                    k1,
                    x.name(),
                    k2,
                    y.name()
                )))
            }
        };
        debug!(x = x.name(), y = y.name(), z = z.name(), "Linearized product");
        self.cache.insert(key, z.clone());
        Ok(z)
    }

    /// Auxiliaries produced so far.
    pub fn auxiliary(&self) -> &Auxiliary {
        &self.builder.aux
    }

    /// Takes the auxiliaries produced so far. The product cache is kept.
    pub fn take_auxiliary(&mut self) -> Auxiliary {
        self.builder.take()
    }

    /// Number of distinct products linearized.
    pub fn cached_products(&self) -> usize {
        self.cache.len()
    }

    /// `z = x AND y`.
    fn and_logic(&mut self, x: &Variable, y: &Variable, domain: &Domain) -> Variable {
        let b = &mut self.builder;
        let z = b.variable(domain, "and", VarKind::Binary, None);
        b.constraint(domain, "and_x", domain.expr(&[(&z, 1.0), (x, -1.0)]), Sense::Le, 0.0);
        b.constraint(domain, "and_y", domain.expr(&[(&z, 1.0), (y, -1.0)]), Sense::Le, 0.0);
        b.constraint(
            domain,
            "and_xy",
            domain.expr(&[(&z, 1.0), (x, -1.0), (y, -1.0)]),
            Sense::Ge,
            -1.0,
        );
        z
    }

    /// `z = b * v` for binary `b` and continuous `v` in `[m, M]`.
    fn big_m(&mut self, bin: &Variable, v: &Variable, domain: &Domain) -> Variable {
        let lower = v.lower_bound().filter(|l| l.is_finite()).unwrap_or_else(|| {
            warn!(var = v.name(), big_m = self.big_m, "Missing lower bound, using -big_m");
            -self.big_m
        });
        let upper = v.upper_bound().filter(|u| u.is_finite()).unwrap_or_else(|| {
            warn!(var = v.name(), big_m = self.big_m, "Missing upper bound, using big_m");
            self.big_m
        });

        let b = &mut self.builder;
        let z = b.variable(
            domain,
            "bigm",
            VarKind::Continuous,
            Some((lower.min(0.0), upper.max(0.0))),
        );
        // z <= M*b, z >= m*b
        b.constraint(domain, "bigm_ub", domain.expr(&[(&z, 1.0), (bin, -upper)]), Sense::Le, 0.0);
        b.constraint(domain, "bigm_lb", domain.expr(&[(&z, 1.0), (bin, -lower)]), Sense::Ge, 0.0);
        // z <= v - m*(1-b), z >= v - M*(1-b)
        b.constraint(
            domain,
            "bigm_v_ub",
            domain.expr(&[(&z, 1.0), (v, -1.0), (bin, -lower)]),
            Sense::Le,
            -lower,
        );
        b.constraint(
            domain,
            "bigm_v_lb",
            domain.expr(&[(&z, 1.0), (v, -1.0), (bin, -upper)]),
            Sense::Ge,
            -upper,
        );
        z
    }

    /// McCormick envelope of `x * y`.
    fn mccormick(&mut self, x: &Variable, y: &Variable, domain: &Domain) -> Result<Variable> {
        let (Some((xl, xu)), Some((yl, yu))) = (x.finite_bounds(), y.finite_bounds()) else {
            return Err(ModelForgeError::Config(format!(
                "McCormick envelope of '{}' * '{}' needs finite bounds on both variables",
                x.name(),
                y.name()
            )));
        };
        let corners = [xl * yl, xl * yu, xu * yl, xu * yu];
        let lo = corners.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let b = &mut self.builder;
        let z = b.variable(domain, "mcc", VarKind::Continuous, Some((lo, hi)));
        // Under-estimators.
        b.constraint(
            domain,
            "mcc_lo_l",
            domain.expr(&[(&z, 1.0), (y, -xl), (x, -yl)]),
            Sense::Ge,
            -xl * yl,
        );
        b.constraint(
            domain,
            "mcc_lo_u",
            domain.expr(&[(&z, 1.0), (y, -xu), (x, -yu)]),
            Sense::Ge,
            -xu * yu,
        );
        // Over-estimators.
        b.constraint(
            domain,
            "mcc_hi_lu",
            domain.expr(&[(&z, 1.0), (y, -xl), (x, -yu)]),
            Sense::Le,
            -xl * yu,
        );
        b.constraint(
            domain,
            "mcc_hi_ul",
            domain.expr(&[(&z, 1.0), (y, -xu), (x, -yl)]),
            Sense::Le,
            -xu * yl,
        );
        Ok(z)
    }
}

fn pair_key(x: &Variable, y: &Variable) -> (Arc<str>, Arc<str>) {
    if x.name() <= y.name() {
        (x.name_arc(), y.name_arc())
    } else {
        (y.name_arc(), x.name_arc())
    }
}

#[cfg(test)]
mod tests;
