//! `t = |x|` with a sign binary.

use modelforge_core::{Result, Sense, VarKind, Variable};
use tracing::debug;

use super::{bounds_or_big_m, Pass};
use crate::domain::Domain;

impl Pass<'_> {
    /// Returns a variable equal to `|x|`, reusing one per argument.
    ///
    /// Nonnegative arguments are their own absolute value. Otherwise
    /// `x = p - n`, `p <= U+ * s`, `n <= L- * (1 - s)` and `t = p + n`, where
    /// `U+` and `L-` are the positive and negative bound magnitudes.
    pub(super) fn absolute(&mut self, x: &Variable) -> Result<Variable> {
        if x.lower_bound().is_some_and(|l| l >= 0.0) {
            return Ok(x.clone());
        }
        if let Some(t) = self.absolute_cache.get(x.name()) {
            return Ok(t.clone());
        }

        let (lower, upper) = bounds_or_big_m(x, self.big_m);
        let pos_mag = upper.max(0.0);
        let neg_mag = (-lower).max(0.0);
        let domain = Domain::of(&[x])?;

        let b = &mut self.builder;
        let p = b.variable(&domain, "abs_pos", VarKind::Continuous, Some((0.0, pos_mag)));
        let n = b.variable(&domain, "abs_neg", VarKind::Continuous, Some((0.0, neg_mag)));
        let s = b.variable(&domain, "abs_sign", VarKind::Binary, None);
        let t = b.variable(
            &domain,
            "abs",
            VarKind::Continuous,
            Some((0.0, pos_mag.max(neg_mag))),
        );
        b.constraint(
            &domain,
            "abs_split",
            domain.expr(&[(x, 1.0), (&p, -1.0), (&n, 1.0)]),
            Sense::Eq,
            0.0,
        );
        b.constraint(&domain, "abs_pos_on", domain.expr(&[(&p, 1.0), (&s, -pos_mag)]), Sense::Le, 0.0);
        b.constraint(
            &domain,
            "abs_neg_on",
            domain.expr(&[(&n, 1.0), (&s, neg_mag)]),
            Sense::Le,
            neg_mag,
        );
        b.constraint(
            &domain,
            "abs_def",
            domain.expr(&[(&t, 1.0), (&p, -1.0), (&n, -1.0)]),
            Sense::Eq,
            0.0,
        );
        debug!(x = x.name(), t = t.name(), "Linearized absolute value");
        self.absolute_cache.insert(x.name_arc(), t.clone());
        Ok(t)
    }
}
