//! Recurring-duty roster: quota, spacing, and blackout constraints.
//!
//! Every participating trainee gets boolean pick variables for
//! (week, duty type). All constraints are per person, so the search
//! decomposes into one component per trainee:
//!
//! * year-specific quotas (exact for years 2 and 4, bounded for year 3),
//! * duty-type eligibility by cohort year,
//! * at most one duty per week,
//! * no two duty weeks within the minimum spacing window,
//! * blackout weeks fixed off, pre-locked weeks fixed on.
//!
//! The objective prefers pulling duty from weeks whose base rotation is
//! on the preferred-pull list and penalizes pulling from other staffed
//! rotations; weeks with an empty base calendar are neutral.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use super::model::{CpModel, CpSolver, Sense, SolveStatus, SolverConfig, VarId};
use crate::models::{DutyType, Trainee, WEEKS_PER_CYCLE};
use crate::policy::DutyRules;

/// A pre-committed duty week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyLock {
    pub person: String,
    pub week: u32,
    pub duty: DutyType,
}

/// Outcome of a duty-roster solve.
#[derive(Debug, Clone)]
pub struct DutyRosterResult {
    pub status: SolveStatus,
    /// person id → duty weeks, in week order. Empty when infeasible.
    pub assignments: BTreeMap<String, Vec<(u32, DutyType)>>,
    pub objective: i64,
}

impl DutyRosterResult {
    pub fn is_feasible(&self) -> bool {
        matches!(self.status, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    fn empty(status: SolveStatus) -> Self {
        Self {
            status,
            assignments: BTreeMap::new(),
            objective: 0,
        }
    }
}

/// Solves the recurring-duty roster over the participating cohort
/// years. `blackouts` are resolved week numbers per person, merged with
/// each trainee's own `no_duty_weeks`.
pub fn solve_duty_roster(
    people: &[&Trainee],
    rules: &DutyRules,
    blackouts: &BTreeMap<String, BTreeSet<u32>>,
    locks: &[DutyLock],
    solver: &dyn CpSolver,
    config: &SolverConfig,
) -> DutyRosterResult {
    let participants: Vec<&Trainee> = people
        .iter()
        .copied()
        .filter(|p| rules.year_participates(p.year))
        .collect();
    if participants.is_empty() {
        return DutyRosterResult::empty(SolveStatus::Optimal);
    }

    let mut model = CpModel::new("duty-roster");
    // vars[person index][week - 1] = (First, Second)
    let mut vars: Vec<Vec<(VarId, VarId)>> = Vec::with_capacity(participants.len());
    let mut objective = Vec::new();

    for person in &participants {
        let mut row = Vec::with_capacity(WEEKS_PER_CYCLE as usize);
        for week in 1..=WEEKS_PER_CYCLE {
            let first = model.new_bool(format!("{}:w{}:{}", person.id, week, DutyType::First.code()));
            let second =
                model.new_bool(format!("{}:w{}:{}", person.id, week, DutyType::Second.code()));
            row.push((first, second));

            for (var, duty) in [(first, DutyType::First), (second, DutyType::Second)] {
                if !rules.eligible(person.year, duty) {
                    model.fix(var, false);
                    continue;
                }
                if let Some(weight) = pull_weight(person, week, rules) {
                    objective.push((var, weight));
                }
            }
            // One duty per week.
            model.add_at_most(&[first, second], 1);
        }

        // Year quotas.
        let firsts: Vec<(VarId, i64)> = row.iter().map(|(f, _)| (*f, 1)).collect();
        let seconds: Vec<(VarId, i64)> = row.iter().map(|(_, s)| (*s, 1)).collect();
        let all: Vec<(VarId, i64)> = row
            .iter()
            .flat_map(|(f, s)| [(*f, 1), (*s, 1)])
            .collect();
        match person.year {
            2 => {
                let n = i64::from(rules.year2_first_weeks);
                model.add_linear(firsts, n, n);
            }
            3 => {
                model.add_linear(
                    all,
                    i64::from(rules.year3_min_total),
                    i64::from(rules.year3_max_total),
                );
            }
            4 => {
                let n = i64::from(rules.year4_second_weeks);
                model.add_linear(seconds, n, n);
            }
            _ => {}
        }

        // Minimum spacing between any two duty weeks.
        for w in 0..row.len() {
            for offset in 1..rules.min_spacing_weeks as usize {
                let Some(&(f2, s2)) = row.get(w + offset) else {
                    break;
                };
                let (f1, s1) = row[w];
                model.add_at_most(&[f1, s1, f2, s2], 1);
            }
        }

        // Blackouts: the shared table plus the trainee's own weeks.
        let shared = blackouts.get(&person.id);
        for week in 1..=WEEKS_PER_CYCLE {
            let blocked = person.no_duty_weeks.contains(&week)
                || shared.is_some_and(|set| set.contains(&week));
            if blocked {
                let (f, s) = row[(week - 1) as usize];
                model.fix(f, false);
                model.fix(s, false);
            }
        }

        vars.push(row);
    }

    // Locks for unknown people or out-of-range weeks are skipped.
    for lock in locks {
        if !(1..=WEEKS_PER_CYCLE).contains(&lock.week) {
            continue;
        }
        let Some(i) = participants.iter().position(|p| p.id == lock.person) else {
            continue;
        };
        let (f, s) = vars[i][(lock.week - 1) as usize];
        let var = match lock.duty {
            DutyType::First => f,
            DutyType::Second => s,
        };
        model.fix(var, true);
    }

    model.set_objective(objective, Sense::Maximize);
    let solution = solver.solve(&model, config);
    if !solution.is_feasible() {
        info!(
            status = solution.status.as_str(),
            participants = participants.len(),
            "duty roster found no assignment"
        );
        return DutyRosterResult::empty(solution.status);
    }

    let mut assignments: BTreeMap<String, Vec<(u32, DutyType)>> = BTreeMap::new();
    for (i, person) in participants.iter().enumerate() {
        let picked: Vec<(u32, DutyType)> = vars[i]
            .iter()
            .enumerate()
            .flat_map(|(w, &(f, s))| {
                let week = w as u32 + 1;
                [(f, DutyType::First), (s, DutyType::Second)]
                    .into_iter()
                    .filter(|(var, _)| solution.value(*var))
                    .map(move |(_, duty)| (week, duty))
                    .collect::<Vec<_>>()
            })
            .collect();
        assignments.insert(person.id.clone(), picked);
    }
    info!(
        status = solution.status.as_str(),
        objective = solution.objective,
        "duty roster solved"
    );

    DutyRosterResult {
        status: solution.status,
        assignments,
        objective: solution.objective,
    }
}

/// Objective weight for pulling this person's week into duty, from the
/// base rotation under it. Unassigned weeks are neutral.
fn pull_weight(person: &Trainee, week: u32, rules: &DutyRules) -> Option<i64> {
    let code = person.calendar.get(&week)?;
    if code.is_empty() {
        return None;
    }
    if rules.preferred_pull.contains(code) {
        Some(rules.preferred_weight)
    } else {
        Some(rules.other_weight)
    }
}
