//! Template matching: ranked preferences to catalog slots.
//!
//! An assignment problem over boolean pick variables: every person gets
//! exactly one template, every template takes at most `ceil(N / T)`
//! people, and the objective minimizes total rank penalty (rank − 1,
//! summed). A person with no ranking for a template pays the worst
//! possible rank, so unranked templates are used only when capacity
//! forces them.

use std::collections::BTreeMap;

use tracing::info;

use super::model::{CpModel, CpSolver, Sense, SolveStatus, SolverConfig, VarId};
use crate::models::{RotationTemplate, Trainee};

/// Matcher inputs beyond the people and the catalog.
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    /// Hard cap: no one may receive a template they ranked worse than
    /// this (1 = top choice only). `None` allows any rank.
    pub max_rank: Option<u32>,
}

/// One person's outcome in a template match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonMatch {
    pub template: u32,
    /// The rank the person gave this template (worst-rank for unranked).
    pub rank: u32,
    pub penalty: u32,
}

/// Outcome of a template match.
#[derive(Debug, Clone)]
pub struct TemplateMatchResult {
    pub status: SolveStatus,
    /// person id → assigned template number. Empty when infeasible.
    pub assignments: BTreeMap<String, u32>,
    pub per_person: BTreeMap<String, PersonMatch>,
    pub total_rank_penalty: u32,
}

impl TemplateMatchResult {
    pub fn is_feasible(&self) -> bool {
        matches!(self.status, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    fn empty(status: SolveStatus) -> Self {
        Self {
            status,
            assignments: BTreeMap::new(),
            per_person: BTreeMap::new(),
            total_rank_penalty: 0,
        }
    }
}

/// The rank a person effectively gave a template.
///
/// Unranked templates cost the worst rank (the catalog size), one worse
/// than any expressed preference can be.
fn effective_rank(person: &Trainee, template: u32, num_templates: u32) -> u32 {
    person
        .template_prefs
        .as_ref()
        .and_then(|p| p.rankings.get(&template).copied())
        .unwrap_or(num_templates)
}

/// Matches people to templates by ranked preference.
///
/// Capacity is the balanced ceiling `ceil(people / templates)`; with an
/// exact multiple every template fills evenly, otherwise some templates
/// take one extra person.
pub fn solve_template_match(
    people: &[&Trainee],
    templates: &[RotationTemplate],
    options: &MatchOptions,
    solver: &dyn CpSolver,
    config: &SolverConfig,
) -> TemplateMatchResult {
    if people.is_empty() {
        return TemplateMatchResult::empty(SolveStatus::Optimal);
    }
    if templates.is_empty() {
        return TemplateMatchResult::empty(SolveStatus::Infeasible);
    }

    let num_templates = templates.len() as u32;
    let capacity = (people.len() as i64 + templates.len() as i64 - 1) / templates.len() as i64;

    let mut model = CpModel::new("template-match");
    // picks[person index][template index]
    let mut picks: Vec<Vec<VarId>> = Vec::with_capacity(people.len());
    for person in people {
        let row: Vec<VarId> = templates
            .iter()
            .map(|t| model.new_bool(format!("{}:t{}", person.id, t.number)))
            .collect();
        model.add_exactly_one(&row);
        picks.push(row);
    }
    for (j, _) in templates.iter().enumerate() {
        let column: Vec<VarId> = picks.iter().map(|row| row[j]).collect();
        model.add_at_most(&column, capacity);
    }

    let mut objective = Vec::new();
    for (i, person) in people.iter().enumerate() {
        for (j, template) in templates.iter().enumerate() {
            let rank = effective_rank(person, template.number, num_templates);
            if let Some(cap) = options.max_rank {
                if rank > cap {
                    model.fix(picks[i][j], false);
                    continue;
                }
            }
            let penalty = i64::from(rank) - 1;
            if penalty != 0 {
                objective.push((picks[i][j], penalty));
            }
        }
    }
    model.set_objective(objective, Sense::Minimize);

    let solution = solver.solve(&model, config);
    if !solution.is_feasible() {
        info!(
            status = solution.status.as_str(),
            people = people.len(),
            templates = templates.len(),
            "template match found no assignment"
        );
        return TemplateMatchResult::empty(solution.status);
    }

    let mut assignments = BTreeMap::new();
    let mut per_person = BTreeMap::new();
    let mut total = 0u32;
    for (i, person) in people.iter().enumerate() {
        for (j, template) in templates.iter().enumerate() {
            if solution.value(picks[i][j]) {
                let rank = effective_rank(person, template.number, num_templates);
                let penalty = rank - 1;
                total += penalty;
                assignments.insert(person.id.clone(), template.number);
                per_person.insert(
                    person.id.clone(),
                    PersonMatch {
                        template: template.number,
                        rank,
                        penalty,
                    },
                );
            }
        }
    }
    info!(
        status = solution.status.as_str(),
        total_rank_penalty = total,
        "template match solved"
    );

    TemplateMatchResult {
        status: solution.status,
        assignments,
        per_person,
        total_rank_penalty: total,
    }
}

/// Position-based round-robin assignment, used for cohorts that submit
/// no rankings: person `i` (in the given order) gets template
/// `(i mod T) + 1`'s catalog entry. Deterministic and rank-blind.
pub fn round_robin_assignment(
    people: &[&Trainee],
    templates: &[RotationTemplate],
) -> BTreeMap<String, u32> {
    if templates.is_empty() {
        return BTreeMap::new();
    }
    people
        .iter()
        .enumerate()
        .map(|(i, person)| {
            let template = &templates[i % templates.len()];
            (person.id.clone(), template.number)
        })
        .collect()
}
