//! `z = max(c_i * x_i)` and `z = min(c_i * x_i)` with selection binaries.

use modelforge_core::{MinMaxOp, MinMaxTerm, ModelForgeError, Result, Sense, VarKind, Variable};
use tracing::debug;

use super::{bounds_or_big_m, Pass};
use crate::domain::Domain;

impl Pass<'_> {
    /// Returns a variable equal to the min or max of the scaled arguments.
    ///
    /// For `max`, `z >= a_i` for every argument and `z <= a_i + M_i (1 - s_i)`
    /// for the selected one, with `M_i` the gap between the largest upper
    /// bound and the argument's lower bound. `min` mirrors it.
    pub(super) fn min_max(&mut self, term: &MinMaxTerm) -> Result<Variable> {
        if term.vars.is_empty() || term.vars.len() != term.coeffs.len() {
            return Err(ModelForgeError::Config(format!(
                "min/max needs one coefficient per argument, got {} arguments and {} coefficients",
                term.vars.len(),
                term.coeffs.len()
            )));
        }
        let refs: Vec<&Variable> = term.vars.iter().collect();
        let domain = Domain::of(&refs)?;

        // Bounds of each scaled argument.
        let ranges: Vec<(f64, f64)> = term
            .vars
            .iter()
            .zip(&term.coeffs)
            .map(|(var, &c)| {
                let (lower, upper) = bounds_or_big_m(var, self.big_m);
                let (a, b) = (c * lower, c * upper);
                (a.min(b), a.max(b))
            })
            .collect();
        let min_lo = ranges.iter().map(|r| r.0).fold(f64::INFINITY, f64::min);
        let max_lo = ranges.iter().map(|r| r.0).fold(f64::NEG_INFINITY, f64::max);
        let min_hi = ranges.iter().map(|r| r.1).fold(f64::INFINITY, f64::min);
        let max_hi = ranges.iter().map(|r| r.1).fold(f64::NEG_INFINITY, f64::max);

        let (tag, bounds) = match term.op {
            MinMaxOp::Max => ("max", (max_lo, max_hi)),
            MinMaxOp::Min => ("min", (min_lo, min_hi)),
        };
        let b = &mut self.builder;
        let z = b.variable(&domain, tag, VarKind::Continuous, Some(bounds));
        let mut picks = Vec::with_capacity(term.vars.len());
        for ((x, &c), &(lo, hi)) in term.vars.iter().zip(&term.coeffs).zip(&ranges) {
            let s = b.variable(&domain, &format!("{}_sel", tag), VarKind::Binary, None);
            match term.op {
                MinMaxOp::Max => {
                    let m = max_hi - lo;
                    b.constraint(&domain, "max_ge", domain.expr(&[(&z, 1.0), (x, -c)]), Sense::Ge, 0.0);
                    b.constraint(
                        &domain,
                        "max_pick",
                        domain.expr(&[(&z, 1.0), (x, -c), (&s, m)]),
                        Sense::Le,
                        m,
                    );
                }
                MinMaxOp::Min => {
                    let m = hi - min_lo;
                    b.constraint(&domain, "min_le", domain.expr(&[(&z, 1.0), (x, -c)]), Sense::Le, 0.0);
                    b.constraint(
                        &domain,
                        "min_pick",
                        domain.expr(&[(&z, 1.0), (x, -c), (&s, -m)]),
                        Sense::Ge,
                        -m,
                    );
                }
            }
            picks.push(s);
        }
        let one: Vec<(&Variable, f64)> = picks.iter().map(|s| (s, 1.0)).collect();
        b.constraint(&domain, &format!("{}_one", tag), domain.expr(&one), Sense::Eq, 1.0);

        debug!(z = z.name(), op = tag, args = term.vars.len(), "Linearized min/max");
        Ok(z)
    }
}
