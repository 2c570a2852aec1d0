//! Boolean constraint model shared by the optimization components.
//!
//! The matcher and the recurring-duty solver both describe their
//! problems as boolean decision variables under linear constraints with
//! an optional linear objective, and hand the model to any `CpSolver`
//! implementation. Callers depend only on this surface, so a different
//! constraint-programming or integer-programming backend can be
//! substituted without touching them.

use std::time::Duration;

/// Handle to a boolean decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

/// A bounded linear constraint: `min <= Σ coeff·var <= max`.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub terms: Vec<(VarId, i64)>,
    pub min: i64,
    pub max: i64,
}

/// Objective direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// A boolean CP model: variables, linear constraints, linear objective.
#[derive(Debug, Clone)]
pub struct CpModel {
    label: String,
    names: Vec<String>,
    constraints: Vec<LinearConstraint>,
    objective: Vec<(VarId, i64)>,
    sense: Sense,
}

impl CpModel {
    /// Creates an empty model.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            names: Vec::new(),
            constraints: Vec::new(),
            objective: Vec::new(),
            sense: Sense::Maximize,
        }
    }

    /// Model label (diagnostics only).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Adds a boolean variable.
    pub fn new_bool(&mut self, name: impl Into<String>) -> VarId {
        self.names.push(name.into());
        VarId(self.names.len() - 1)
    }

    /// Adds `min <= Σ coeff·var <= max`.
    pub fn add_linear(&mut self, terms: Vec<(VarId, i64)>, min: i64, max: i64) {
        self.constraints.push(LinearConstraint { terms, min, max });
    }

    /// Exactly one of `vars` is true.
    pub fn add_exactly_one(&mut self, vars: &[VarId]) {
        self.add_linear(vars.iter().map(|&v| (v, 1)).collect(), 1, 1);
    }

    /// At most `k` of `vars` are true.
    pub fn add_at_most(&mut self, vars: &[VarId], k: i64) {
        self.add_linear(vars.iter().map(|&v| (v, 1)).collect(), 0, k);
    }

    /// Forces a variable to a value.
    pub fn fix(&mut self, var: VarId, value: bool) {
        let v = i64::from(value);
        self.add_linear(vec![(var, 1)], v, v);
    }

    /// Sets the linear objective.
    pub fn set_objective(&mut self, terms: Vec<(VarId, i64)>, sense: Sense) {
        self.objective = terms;
        self.sense = sense;
    }

    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn var_name(&self, var: VarId) -> &str {
        &self.names[var.0]
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[(VarId, i64)] {
        &self.objective
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }
}

/// Terminal outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Best solution found and proven optimal.
    Optimal,
    /// A solution was found but the budget ran out before proving
    /// optimality. Still a valid, applicable result.
    Feasible,
    /// Proven to have no solution.
    Infeasible,
    /// Budget ran out with no solution and no infeasibility proof.
    Unknown,
}

impl SolveStatus {
    /// Status name, as reported in results.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::Unknown => "UNKNOWN",
        }
    }
}

/// A solve outcome: status, variable values, objective value.
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolveStatus,
    values: Vec<bool>,
    pub objective: i64,
}

impl Solution {
    pub(crate) fn new(status: SolveStatus, values: Vec<bool>, objective: i64) -> Self {
        Self {
            status,
            values,
            objective,
        }
    }

    pub(crate) fn empty(status: SolveStatus, num_vars: usize) -> Self {
        Self::new(status, vec![false; num_vars], 0)
    }

    /// Whether a usable assignment was found.
    pub fn is_feasible(&self) -> bool {
        matches!(self.status, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    /// Value of a variable. Only meaningful when `is_feasible()`.
    pub fn value(&self, var: VarId) -> bool {
        self.values[var.0]
    }
}

/// Solver budget.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Wall-clock cutoff for the search.
    pub time_limit: Duration,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(30),
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }
}

/// A synchronous boolean CP solver.
///
/// The call blocks until a terminal status is reached or the time
/// budget elapses; there is no external cancellation path.
pub trait CpSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> Solution;
}
