//! Big-M reformulation of indicator constraints.

use modelforge_core::{IndicatorTerm, ModelForgeError, Result, Sense, VarKind};
use tracing::debug;

use super::Pass;
use crate::domain::Domain;

impl Pass<'_> {
    /// Emits rows enforcing `b == condition => expr (sense) rhs`.
    ///
    /// Rows expand over the binary's keys; indexed terms of `expr` are tied
    /// to the same key.
    pub(super) fn indicator(&mut self, term: &IndicatorTerm) -> Result<()> {
        if term.binary.kind() != VarKind::Binary {
            return Err(ModelForgeError::Config(format!(
                "indicator variable '{}' must be binary, is {}",
                term.binary.name(),
                term.binary.kind()
            )));
        }
        let domain = Domain::of(&[&term.binary])?;
        match term.sense {
            Sense::Eq => {
                self.indicator_row(term, &domain, Sense::Le);
                self.indicator_row(term, &domain, Sense::Ge);
            }
            sense => self.indicator_row(term, &domain, sense),
        }
        debug!(
            binary = term.binary.name(),
            condition = term.condition,
            sense = %term.sense,
            "Linearized indicator"
        );
        Ok(())
    }

    /// One directional row. With `M` the Big-M constant:
    ///
    /// | condition | sense | row                  |
    /// |-----------|-------|----------------------|
    /// | true      | `<=`  | `e + M b <= r + M`   |
    /// | true      | `>=`  | `e - M b >= r - M`   |
    /// | false     | `<=`  | `e - M b <= r`       |
    /// | false     | `>=`  | `e + M b >= r`       |
    fn indicator_row(&mut self, term: &IndicatorTerm, domain: &Domain, sense: Sense) {
        let m = self.big_m;
        let (tag, coeff, rhs) = match (term.condition, sense) {
            (true, Sense::Le) => ("ind_le", m, term.rhs + m),
            (true, _) => ("ind_ge", -m, term.rhs - m),
            (false, Sense::Le) => ("ind_le", -m, term.rhs),
            (false, _) => ("ind_ge", m, term.rhs),
        };
        let mut lhs = domain.relink(&term.expr);
        lhs.add_term(domain.term(&term.binary, coeff));
        self.builder.constraint(domain, tag, lhs, sense, rhs);
    }
}
