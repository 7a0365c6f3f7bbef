//! Solver results.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::model::VarKey;
use crate::value::Value;

/// Termination status reported by a solver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SolutionStatus {
    /// Proven optimal.
    Optimal,
    /// Feasible, optimality not proven.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// Objective is unbounded.
    Unbounded,
    /// Anything else the backend reports.
    Other(String),
}

impl SolutionStatus {
    /// Returns true for [`SolutionStatus::Optimal`].
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }

    /// Returns true if a feasible point is available.
    pub fn is_feasible(&self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }
}

impl FromStr for SolutionStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Infallible> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "optimal" => SolutionStatus::Optimal,
            "feasible" => SolutionStatus::Feasible,
            "infeasible" => SolutionStatus::Infeasible,
            "unbounded" => SolutionStatus::Unbounded,
            _ => SolutionStatus::Other(s.to_string()),
        })
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Feasible => write!(f, "feasible"),
            SolutionStatus::Infeasible => write!(f, "infeasible"),
            SolutionStatus::Unbounded => write!(f, "unbounded"),
            SolutionStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Values of one variable or constraint family.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    /// Scalar family.
    Scalar(f64),
    /// Indexed family, by index key.
    Indexed(HashMap<Value, f64>),
}

impl VariableValue {
    /// Value at `key`. A scalar answers only for [`Value::None`].
    pub fn get(&self, key: &Value) -> Option<f64> {
        match self {
            VariableValue::Scalar(v) if key.is_none() => Some(*v),
            VariableValue::Scalar(_) => None,
            VariableValue::Indexed(map) => map.get(key).copied(),
        }
    }

    /// Sum over all instances.
    pub fn total(&self) -> f64 {
        match self {
            VariableValue::Scalar(v) => *v,
            VariableValue::Indexed(map) => map.values().sum(),
        }
    }
}

fn insert(map: &mut HashMap<String, VariableValue>, key: &VarKey, value: f64) {
    let family = key.family.to_string();
    if key.index.is_none() {
        map.insert(family, VariableValue::Scalar(value));
        return;
    }
    match map.get_mut(&family) {
        Some(VariableValue::Indexed(values)) => {
            values.insert(key.index.clone(), value);
        }
        _ => {
            let mut values = HashMap::new();
            values.insert(key.index.clone(), value);
            map.insert(family, VariableValue::Indexed(values));
        }
    }
}

/// Result of one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Termination status.
    pub status: SolutionStatus,
    /// Objective value, when a point is available.
    pub objective_value: Option<f64>,
    /// Wall-clock solve time.
    pub solve_time: Duration,
    /// Primal values by family.
    pub variables: HashMap<String, VariableValue>,
    /// Duals by constraint family.
    pub shadow_prices: HashMap<String, VariableValue>,
    /// Reduced costs by variable family.
    pub reduced_costs: HashMap<String, VariableValue>,
    /// Relative MIP gap.
    pub gap: Option<f64>,
    /// Simplex or barrier iterations.
    pub iterations: Option<u64>,
    /// Branch-and-bound nodes.
    pub nodes: Option<u64>,
}

impl Solution {
    /// Creates an empty solution with the given status.
    pub fn new(status: SolutionStatus) -> Self {
        Self {
            status,
            objective_value: None,
            solve_time: Duration::ZERO,
            variables: HashMap::new(),
            shadow_prices: HashMap::new(),
            reduced_costs: HashMap::new(),
            gap: None,
            iterations: None,
            nodes: None,
        }
    }

    /// Sets the objective value.
    pub fn with_objective(mut self, value: f64) -> Self {
        self.objective_value = Some(value);
        self
    }

    /// Sets the solve time.
    pub fn with_solve_time(mut self, time: Duration) -> Self {
        self.solve_time = time;
        self
    }

    /// Records the value of one concrete variable.
    pub fn set_value(&mut self, key: &VarKey, value: f64) {
        insert(&mut self.variables, key, value);
    }

    /// Records the dual of one concrete constraint.
    pub fn set_shadow_price(&mut self, key: &VarKey, value: f64) {
        insert(&mut self.shadow_prices, key, value);
    }

    /// Records the reduced cost of one concrete variable.
    pub fn set_reduced_cost(&mut self, key: &VarKey, value: f64) {
        insert(&mut self.reduced_costs, key, value);
    }

    /// Values of a family.
    pub fn values(&self, family: &str) -> Option<&VariableValue> {
        self.variables.get(family)
    }

    /// Value of a scalar family.
    pub fn value(&self, family: &str) -> Option<f64> {
        self.values(family).and_then(|v| v.get(&Value::None))
    }

    /// Value of `family[key]`.
    pub fn value_at(&self, family: &str, key: &Value) -> Option<f64> {
        self.values(family).and_then(|v| v.get(key))
    }

    /// Returns true for optimal solutions.
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    /// Returns true if a feasible point is available.
    pub fn is_feasible(&self) -> bool {
        self.status.is_feasible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("OPTIMAL".parse::<SolutionStatus>().unwrap(), SolutionStatus::Optimal);
        assert_eq!(" feasible ".parse::<SolutionStatus>().unwrap(), SolutionStatus::Feasible);
        let other: SolutionStatus = "time_limit".parse().unwrap();
        assert_eq!(other, SolutionStatus::Other("time_limit".into()));
        assert!(!other.is_optimal());
        assert!(!other.is_feasible());
        assert!(SolutionStatus::Feasible.is_feasible());
    }

    #[test]
    fn test_scalar_and_indexed_values() {
        let mut sol = Solution::new(SolutionStatus::Optimal).with_objective(3.0);
        sol.set_value(&VarKey::scalar("x"), 1.5);
        sol.set_value(&VarKey::new("y", Value::from(1)), 2.0);
        sol.set_value(&VarKey::new("y", Value::from(2)), 4.0);
        assert_eq!(sol.value("x"), Some(1.5));
        assert_eq!(sol.value_at("y", &Value::from(2)), Some(4.0));
        assert_eq!(sol.value("y"), None);
        assert_eq!(sol.values("y").unwrap().total(), 6.0);
        assert!(sol.is_optimal());
    }
}
