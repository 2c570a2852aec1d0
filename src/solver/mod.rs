//! Constraint models and the exact solver behind the optimization
//! phases.
//!
//! `model` defines the solver-agnostic boolean CP surface, `branch` the
//! in-crate exact backend, and `matcher`/`duty` the two problem
//! formulations built on top of it.

mod branch;
mod duty;
mod matcher;
mod model;

pub use branch::BranchBoundSolver;
pub use duty::{solve_duty_roster, DutyLock, DutyRosterResult};
pub use matcher::{
    round_robin_assignment, solve_template_match, MatchOptions, PersonMatch, TemplateMatchResult,
};
pub use model::{
    CpModel, CpSolver, LinearConstraint, Sense, Solution, SolveStatus, SolverConfig, VarId,
};
