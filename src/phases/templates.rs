//! Template placement phases.
//!
//! Year 1 gets templates round-robin (the catalog's year-1 tracks are
//! content-equivalent, so optimization is pointless and duplicates are
//! allowed). Year 2 goes through the ranked matcher; an infeasible
//! match leaves every year-2 calendar untouched.

use tracing::{info, warn};

use crate::models::{RotationTemplate, Trainee};
use crate::solver::{
    round_robin_assignment, solve_template_match, CpSolver, MatchOptions, SolverConfig,
    TemplateMatchResult,
};

/// Writes a template's weekly expansion into a trainee's calendar and
/// records the assignment.
pub fn apply_template(trainee: &mut Trainee, template: &RotationTemplate) {
    for (week, code) in template.to_weekly() {
        trainee.calendar.insert(week, code);
    }
    trainee.template = Some(template.number);
}

fn template_by_number(templates: &[RotationTemplate], number: u32) -> Option<&RotationTemplate> {
    templates.iter().find(|t| t.number == number)
}

/// Round-robin template placement for the year-1 cohort, in roster
/// order. With more people than templates the catalog wraps around.
pub fn run_year1_templates(roster: &mut [Trainee], templates: &[RotationTemplate]) {
    let people: Vec<&Trainee> = roster.iter().filter(|t| t.year == 1).collect();
    let assigned = round_robin_assignment(&people, templates);
    drop(people);

    let mut placed = 0;
    for trainee in roster.iter_mut() {
        if let Some(&number) = assigned.get(&trainee.id) {
            if let Some(template) = template_by_number(templates, number) {
                apply_template(trainee, template);
                placed += 1;
            }
        }
    }
    info!(cohort_year = 1, placed, "round-robin templates placed");
}

/// Ranked template matching for the year-2 cohort. Applies the result
/// only when the matcher found a complete assignment.
pub fn run_year2_templates(
    roster: &mut [Trainee],
    templates: &[RotationTemplate],
    options: &MatchOptions,
    solver: &dyn CpSolver,
    config: &SolverConfig,
) -> TemplateMatchResult {
    let people: Vec<&Trainee> = roster.iter().filter(|t| t.year == 2).collect();
    let result = solve_template_match(&people, templates, options, solver, config);
    drop(people);

    if !result.is_feasible() {
        warn!(
            status = result.status.as_str(),
            "year-2 template match infeasible, calendars left untouched"
        );
        return result;
    }

    for trainee in roster.iter_mut() {
        if let Some(&number) = result.assignments.get(&trainee.id) {
            if let Some(template) = template_by_number(templates, number) {
                apply_template(trainee, template);
            }
        }
    }
    info!(
        cohort_year = 2,
        placed = result.assignments.len(),
        total_rank_penalty = result.total_rank_penalty,
        "ranked templates placed"
    );
    result
}
