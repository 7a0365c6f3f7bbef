//! Auxiliary variables and constraints produced by reformulations.

use std::collections::HashSet;

use modelforge_core::{
    Constraint, LinearExpr, Model, ModelForgeError, Result, Sense, SosSet, VarKind, Variable,
};

use crate::domain::Domain;

/// Generates auxiliary names `{prefix}_{tag}_{n}` from a monotonic counter.
///
/// Reserved names (typically everything already in the input model) and
/// names handed out earlier are skipped.
#[derive(Debug, Clone)]
pub struct AuxNamer {
    prefix: String,
    counter: usize,
    taken: HashSet<String>,
}

impl AuxNamer {
    /// Creates a namer.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
            taken: HashSet::new(),
        }
    }

    /// Marks names as unavailable.
    pub fn reserve<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.taken.extend(names.into_iter().map(Into::into));
    }

    /// Marks every variable, constraint and SOS set name of `model` as unavailable.
    pub fn reserve_model(&mut self, model: &Model) {
        self.reserve(model.variables().iter().map(|v| v.name().to_string()));
        self.reserve(model.constraints().iter().map(|c| c.name().to_string()));
        self.reserve(model.sos_sets().iter().map(|s| s.name.to_string()));
    }

    /// Returns a name not handed out or reserved before.
    pub fn fresh(&mut self, tag: &str) -> String {
        loop {
            self.counter += 1;
            let name = format!("{}_{}_{}", self.prefix, tag, self.counter);
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }

    /// Number of names generated so far, skipped ones included.
    pub fn counter(&self) -> usize {
        self.counter
    }
}

/// Auxiliary families waiting to be merged into an output model.
#[derive(Debug, Clone, Default)]
pub struct Auxiliary {
    /// Auxiliary variable families.
    pub variables: Vec<Variable>,
    /// Auxiliary constraint families.
    pub constraints: Vec<Constraint>,
    /// SOS annotations.
    pub sos_sets: Vec<SosSet>,
}

impl Auxiliary {
    /// Returns true if nothing was produced.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.constraints.is_empty() && self.sos_sets.is_empty()
    }

    /// Moves everything from `other` into `self`.
    pub fn absorb(&mut self, other: Auxiliary) {
        self.variables.extend(other.variables);
        self.constraints.extend(other.constraints);
        self.sos_sets.extend(other.sos_sets);
    }

    /// Adds the auxiliaries to `model`.
    ///
    /// Returns the number of variable and constraint families added. A
    /// variable, constraint or SOS set whose name the model already uses is
    /// a `Config` error and leaves the model untouched.
    pub fn merge_into(self, model: &mut Model) -> Result<(usize, usize)> {
        let clash = self
            .variables
            .iter()
            .map(Variable::name)
            .find(|name| model.variable(name).is_some())
            .or_else(|| {
                self.constraints
                    .iter()
                    .map(Constraint::name)
                    .find(|name| model.constraint(name).is_some())
            })
            .or_else(|| {
                self.sos_sets
                    .iter()
                    .map(|set| &*set.name)
                    .find(|name| model.sos_sets().iter().any(|s| &*s.name == *name))
            });
        if let Some(name) = clash {
            return Err(ModelForgeError::Config(format!(
                "auxiliary name '{}' already exists in model '{}'",
                name,
                model.name()
            )));
        }
        let (vars, cons) = (self.variables.len(), self.constraints.len());
        for var in self.variables {
            model.add_variable(var)?;
        }
        for con in self.constraints {
            model.add_constraint(con)?;
        }
        for set in self.sos_sets {
            model.add_sos(set);
        }
        Ok((vars, cons))
    }
}

/// Namer plus accumulator: the private state of one linearizer.
#[derive(Debug, Clone)]
pub(crate) struct AuxBuilder {
    pub namer: AuxNamer,
    pub aux: Auxiliary,
}

impl AuxBuilder {
    pub fn new(prefix: &str) -> Self {
        Self {
            namer: AuxNamer::new(prefix),
            aux: Auxiliary::default(),
        }
    }

    /// Creates and records a variable family over `domain`.
    pub fn variable(
        &mut self,
        domain: &Domain,
        tag: &str,
        kind: VarKind,
        bounds: Option<(f64, f64)>,
    ) -> Variable {
        let mut var = domain.variable(self.namer.fresh(tag), kind);
        if let Some((lower, upper)) = bounds {
            var = var.bounds(lower, upper);
        }
        self.aux.variables.push(var.clone());
        var
    }

    /// Records `lhs (sense) rhs` over `domain`.
    pub fn constraint(
        &mut self,
        domain: &Domain,
        tag: &str,
        lhs: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) {
        let con = domain
            .constraint(self.namer.fresh(tag))
            .lhs(lhs)
            .with_sense(sense)
            .rhs(rhs);
        self.aux.constraints.push(con);
    }

    pub fn take(&mut self) -> Auxiliary {
        std::mem::take(&mut self.aux)
    }
}

#[cfg(test)]
mod tests {
    use modelforge_test::{bounded, model_with};

    use super::*;

    fn aux_with(var: &str, con: &str) -> Auxiliary {
        let z = bounded(var, 0.0, 1.0);
        Auxiliary {
            constraints: vec![Constraint::new(con).lhs(LinearExpr::from(&z)).le(1.0)],
            variables: vec![z],
            sos_sets: Vec::new(),
        }
    }

    #[test]
    fn test_namer_skips_reserved() {
        let mut namer = AuxNamer::new("aux");
        namer.reserve(["aux_z_1"]);
        assert_eq!(namer.fresh("z"), "aux_z_2");
        assert_eq!(namer.fresh("z"), "aux_z_3");
        assert_eq!(namer.counter(), 3);
    }

    #[test]
    fn test_merge_counts_families() {
        let mut model = model_with(&[&bounded("x", 0.0, 1.0)]);
        let merged = aux_with("z", "z_cap").merge_into(&mut model).unwrap();
        assert_eq!(merged, (1, 1));
        assert!(model.variable("z").is_some());
        assert!(model.constraint("z_cap").is_some());
    }

    #[test]
    fn test_merge_rejects_existing_names() {
        let mut model = model_with(&[&bounded("x", 0.0, 1.0)]);
        let err = aux_with("x", "x_cap").merge_into(&mut model);
        assert!(matches!(err, Err(ModelForgeError::Config(_))));
        // The constraint was not added either.
        assert!(model.constraint("x_cap").is_none());
        assert_eq!(model.variables().len(), 1);

        model.add_sos(SosSet::sos2("pw", Vec::new()));
        let mut aux = aux_with("z", "z_cap");
        aux.sos_sets.push(SosSet::sos2("pw", Vec::new()));
        assert!(matches!(aux.merge_into(&mut model), Err(ModelForgeError::Config(_))));
        assert!(model.variable("z").is_none());
        assert_eq!(model.sos_sets().len(), 1);
    }
}
