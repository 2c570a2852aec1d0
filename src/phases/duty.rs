//! Recurring-duty phase wiring.
//!
//! Runs after the base calendars are frozen: derives per-person
//! blackout weeks from protected calendar codes, locks the opening
//! week's first-duty slot to a year-3 trainee, solves, and applies the
//! roster to the grid overlay. An infeasible solve writes nothing.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::models::{ScheduleGrid, Trainee};
use crate::policy::DutyRules;
use crate::solver::{solve_duty_roster, CpSolver, DutyLock, DutyRosterResult, SolverConfig};

/// Weeks whose base calendar carries a protected code (exam prep,
/// review course) are duty blackouts on top of the trainee's own
/// no-duty weeks.
fn protected_weeks(trainee: &Trainee, protected_codes: &[&str]) -> BTreeSet<u32> {
    trainee
        .calendar
        .iter()
        .filter(|(_, code)| protected_codes.contains(&code.as_str()))
        .map(|(week, _)| *week)
        .collect()
}

/// The opening-week lock: the first year-3 trainee (in roster order)
/// with week 1 free of blackouts starts the first-duty rotation.
fn opening_lock(roster: &[Trainee], blackouts: &BTreeMap<String, BTreeSet<u32>>) -> Option<DutyLock> {
    roster
        .iter()
        .filter(|t| t.year == 3)
        .find(|t| {
            !t.no_duty_weeks.contains(&1)
                && !blackouts
                    .get(&t.id)
                    .is_some_and(|weeks| weeks.contains(&1))
        })
        .map(|t| DutyLock {
            person: t.id.clone(),
            week: 1,
            duty: crate::models::DutyType::First,
        })
}

/// Solves the duty roster and applies it to the grid overlay.
pub fn run_duty_phase(
    roster: &[Trainee],
    rules: &DutyRules,
    protected_codes: &[&str],
    solver: &dyn CpSolver,
    config: &SolverConfig,
    grid: &mut ScheduleGrid,
) -> DutyRosterResult {
    let blackouts: BTreeMap<String, BTreeSet<u32>> = roster
        .iter()
        .map(|t| (t.id.clone(), protected_weeks(t, protected_codes)))
        .collect();
    let locks: Vec<DutyLock> = opening_lock(roster, &blackouts).into_iter().collect();

    let people: Vec<&Trainee> = roster.iter().collect();
    let result = solve_duty_roster(&people, rules, &blackouts, &locks, solver, config);

    if !result.is_feasible() {
        warn!(
            status = result.status.as_str(),
            "duty roster infeasible, overlay left empty"
        );
        return result;
    }

    let mut applied = 0;
    for (person, weeks) in &result.assignments {
        for (week, duty) in weeks {
            grid.assign_duty(person, *week, *duty);
            applied += 1;
        }
    }
    info!(applied, objective = result.objective, "duty overlay applied");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DutyType;
    use crate::solver::BranchBoundSolver;

    fn run(roster: &[Trainee], grid: &mut ScheduleGrid) -> DutyRosterResult {
        run_duty_phase(
            roster,
            &DutyRules::default(),
            &["Study", "Crs"],
            &BranchBoundSolver::new(),
            &SolverConfig::default(),
            grid,
        )
    }

    #[test]
    fn test_opening_week_locked_to_year3() {
        let roster = vec![Trainee::new("jr", 2), Trainee::new("sr", 3)];
        let mut grid = ScheduleGrid::new();
        let result = run(&roster, &mut grid);

        assert!(result.is_feasible());
        assert!(result.assignments["sr"].contains(&(1, DutyType::First)));
        assert_eq!(grid.effective("sr", 1), Some("Nf1"));
    }

    #[test]
    fn test_protected_codes_block_duty() {
        let mut sr = Trainee::new("sr", 3);
        for week in 1..=48 {
            sr.calendar.insert(week, "Study".to_string());
        }
        let roster = vec![sr];
        let mut grid = ScheduleGrid::new();
        let result = run(&roster, &mut grid);

        assert!(result.is_feasible());
        // Week 1 is protected, so the opening lock moved off this
        // trainee and every duty week sits past the protected span.
        assert!(result.assignments["sr"].iter().all(|(w, _)| *w > 48));
    }

    #[test]
    fn test_infeasible_writes_nothing() {
        // A year-2 trainee with every week blacked out cannot meet the
        // exact quota.
        let mut jr = Trainee::new("jr", 2);
        jr.no_duty_weeks = (1..=52).collect();
        let roster = vec![jr, Trainee::new("sr", 3)];
        let mut grid = ScheduleGrid::new();
        let result = run(&roster, &mut grid);

        assert!(!result.is_feasible());
        assert_eq!(grid.overlay_len(), 0);
    }

    #[test]
    fn test_overlay_preserves_base() {
        let mut sr = Trainee::new("sr", 3);
        sr.calendar.insert(1, "Pbr".to_string());
        let mut grid = ScheduleGrid::new();
        grid.assign("sr", 1, "Pbr");
        let result = run(&[sr], &mut grid);

        assert!(result.is_feasible());
        assert_eq!(grid.effective("sr", 1), Some("Nf1"));
        assert_eq!(grid.base("sr", 1), Some("Pbr"));
    }
}
