//! Optimizer contract.

use crate::capability::SolverCapability;
use crate::error::Result;
use crate::model::Model;
use crate::solution::Solution;

/// An external solver backend.
///
/// Implementations translate a [`Model`] (usually via
/// [`Model::expand`]) into their native API. A non-optimal termination is
/// reported through [`Solution::status`], not as an error; `Err` means the
/// backend itself failed.
pub trait Optimizer {
    /// Solves the model.
    fn solve(&mut self, model: &Model) -> Result<Solution>;

    /// What this backend supports natively.
    fn capability(&self) -> SolverCapability;

    /// Backend name for logging.
    fn name(&self) -> &str {
        "optimizer"
    }
}

impl<O: Optimizer + ?Sized> Optimizer for &mut O {
    fn solve(&mut self, model: &Model) -> Result<Solution> {
        (**self).solve(model)
    }

    fn capability(&self) -> SolverCapability {
        (**self).capability()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<O: Optimizer + ?Sized> Optimizer for Box<O> {
    fn solve(&mut self, model: &Model) -> Result<Solution> {
        (**self).solve(model)
    }

    fn capability(&self) -> SolverCapability {
        (**self).capability()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
