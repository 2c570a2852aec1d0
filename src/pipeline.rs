//! The sequential scheduling pipeline.
//!
//! Phases run in fixed dependency order and each one's output is
//! frozen before the next begins; there is no cross-phase backtracking.
//! Infeasible solver outcomes are carried in the outcome struct and
//! skipped, never applied partially and never fatal.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, Result};
use crate::models::{FacilityMap, RotationTemplate, ScheduleGrid, Trainee};
use crate::phases::{
    build_year3, build_year4, run_duty_phase, run_year1_templates, run_year2_templates,
    substitute_sampler, FillOutcome, GreedyFiller,
};
use crate::policy::{
    standard_credit, standard_staffing, CommitmentPolicy, CourseSessions, CreditRequirement,
    DutyRules, FillPolicy, SamplerPolicy, StaffingGroup,
};
use crate::solver::{
    BranchBoundSolver, DutyRosterResult, MatchOptions, SolverConfig, TemplateMatchResult,
};
use crate::validation::{ValidationReport, Validator};

/// Every policy table the pipeline consumes, bundled for injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePolicies {
    pub facilities: FacilityMap,
    pub staffing: Vec<StaffingGroup>,
    pub credit: Vec<CreditRequirement>,
    pub duty: DutyRules,
    pub fill: FillPolicy,
    pub courses: CourseSessions,
    pub commitments: CommitmentPolicy,
    pub sampler: SamplerPolicy,
}

impl SchedulePolicies {
    /// The standard program's catalogs.
    pub fn standard() -> Self {
        Self {
            facilities: FacilityMap::standard(),
            staffing: standard_staffing(),
            credit: standard_credit(),
            duty: DutyRules::default(),
            fill: FillPolicy::standard(),
            courses: CourseSessions::standard(),
            commitments: CommitmentPolicy::standard(),
            sampler: SamplerPolicy::standard(),
        }
    }
}

/// Everything one pipeline run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The roster with final per-person calendars.
    pub roster: Vec<Trainee>,
    /// The final grid: base layer plus duty overlay.
    pub grid: ScheduleGrid,
    /// Year-2 template match result, if that cohort was present.
    pub template_match: Option<TemplateMatchResult>,
    /// Year-3 and year-4 fill outcomes, in roster order.
    pub fills: Vec<FillOutcome>,
    /// Duty roster result; infeasible means the overlay is empty.
    pub duty: DutyRosterResult,
    /// Validation of the finished schedule.
    pub report: ValidationReport,
}

/// The phase orchestrator.
pub struct SchedulePipeline {
    policies: SchedulePolicies,
    match_options: MatchOptions,
    solver_config: SolverConfig,
}

impl SchedulePipeline {
    pub fn new(policies: SchedulePolicies) -> Self {
        Self {
            policies,
            match_options: MatchOptions::default(),
            solver_config: SolverConfig::default(),
        }
    }

    pub fn with_match_options(mut self, options: MatchOptions) -> Self {
        self.match_options = options;
        self
    }

    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.solver_config = config;
        self
    }

    /// Runs every phase over the roster and returns the final state.
    pub fn run(
        &self,
        mut roster: Vec<Trainee>,
        templates: &[RotationTemplate],
    ) -> Result<PipelineOutcome> {
        self.check_inputs(&roster, templates)?;
        let solver = BranchBoundSolver::new();
        info!(people = roster.len(), templates = templates.len(), "pipeline start");

        run_year1_templates(&mut roster, templates);
        let template_match = if roster.iter().any(|t| t.year == 2) {
            Some(run_year2_templates(
                &mut roster,
                templates,
                &self.match_options,
                &solver,
                &self.solver_config,
            ))
        } else {
            None
        };

        let filler = GreedyFiller::new(
            self.policies.fill.clone(),
            self.policies.facilities.clone(),
        )
        .with_timing_anchor(self.policies.commitments.admin_code.clone());
        let mut fills = build_year3(&mut roster, &self.policies.courses, &filler);
        fills.extend(build_year4(
            &mut roster,
            &self.policies.commitments,
            &self.policies.facilities,
            &filler,
        ));

        // The base calendar is now frozen; mirror it into the grid.
        let mut grid = ScheduleGrid::new();
        sync_base(&roster, &mut grid);

        let protected = [
            self.policies.courses.study_code.as_str(),
            self.policies.courses.code.as_str(),
        ];
        let duty = run_duty_phase(
            &roster,
            &self.policies.duty,
            &protected,
            &solver,
            &self.solver_config,
            &mut grid,
        );

        // Sampler substitution rewrites year-1 placeholder weeks last.
        for trainee in roster.iter_mut().filter(|t| t.year == 1) {
            if substitute_sampler(trainee, &self.policies.sampler) > 0 {
                for (week, code) in trainee.calendar.clone() {
                    grid.assign(&trainee.id, week, code);
                }
            }
        }

        let validator = Validator::new(
            self.policies.staffing.clone(),
            self.policies.credit.clone(),
            self.policies.facilities.clone(),
        );
        let report = validator.validate(&roster, &grid);
        info!(
            base_weeks = grid.base_len(),
            duty_weeks = grid.overlay_len(),
            clean = report.is_clean(),
            "pipeline done"
        );

        Ok(PipelineOutcome {
            roster,
            grid,
            template_match,
            fills,
            duty,
            report,
        })
    }

    fn check_inputs(&self, roster: &[Trainee], templates: &[RotationTemplate]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for trainee in roster {
            if !seen.insert(trainee.id.as_str()) {
                return Err(EngineError::DuplicateTrainee(trainee.id.clone()));
            }
        }
        if templates.is_empty() {
            if let Some(t) = roster.iter().find(|t| t.year <= 2) {
                return Err(EngineError::EmptyTemplateCatalog(t.year));
            }
        }
        Ok(())
    }
}

/// Copies every trainee calendar into the grid's base layer.
fn sync_base(roster: &[Trainee], grid: &mut ScheduleGrid) {
    for trainee in roster {
        for (week, code) in &trainee.calendar {
            grid.assign(&trainee.id, *week, code.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DutyType, TemplatePrefs};

    fn catalog() -> Vec<RotationTemplate> {
        vec![
            RotationTemplate::staggered(1, &["Intro", "Mab", "Mch", "Mus"], 1),
            RotationTemplate::staggered(2, &["Mab", "Mch", "Mus", "Mmsk"], 1),
            RotationTemplate::staggered(3, &["Mch", "Mus", "Mmsk", "Mab"], 1),
        ]
    }

    fn roster() -> Vec<Trainee> {
        vec![
            Trainee::new("y1a", 1),
            Trainee::new("y2a", 2).with_template_prefs(TemplatePrefs {
                rankings: [(2, 1), (3, 2)].into(),
            }),
            Trainee::new("y2b", 2).with_template_prefs(TemplatePrefs {
                rankings: [(3, 1), (2, 2)].into(),
            }),
            Trainee::new("y3a", 3),
            Trainee::new("y4a", 4),
        ]
    }

    #[test]
    fn test_full_run_covers_every_week() {
        let outcome = SchedulePipeline::new(SchedulePolicies::standard())
            .run(roster(), &catalog())
            .expect("valid inputs");

        // Every person ends with a complete base calendar.
        assert_eq!(outcome.grid.base_len(), 5 * 52);
        for trainee in &outcome.roster {
            assert_eq!(trainee.calendar.len(), 52, "{}", trainee.id);
        }
    }

    #[test]
    fn test_phase_results_reported() {
        let outcome = SchedulePipeline::new(SchedulePolicies::standard())
            .run(roster(), &catalog())
            .expect("valid inputs");

        let matched = outcome.template_match.expect("year-2 cohort present");
        assert!(matched.is_feasible());
        assert_eq!(matched.total_rank_penalty, 0);
        // One fill outcome per year-3/4 person.
        assert_eq!(outcome.fills.len(), 2);

        assert!(outcome.duty.is_feasible());
        let y2_duties = &outcome.duty.assignments["y2a"];
        assert_eq!(y2_duties.len(), 2);
        assert!(y2_duties.iter().all(|(_, d)| *d == DutyType::First));
        assert!(outcome.grid.overlay_len() > 0);
    }

    #[test]
    fn test_sampler_placeholders_resolved() {
        let outcome = SchedulePipeline::new(SchedulePolicies::standard())
            .run(roster(), &catalog())
            .expect("valid inputs");

        let y1 = outcome
            .roster
            .iter()
            .find(|t| t.id == "y1a")
            .expect("year-1 trainee");
        assert!(!y1.calendar.values().any(|c| c == "Intro"));
        // The grid base layer was refreshed with the substitution.
        assert!((1..=52).all(|w| outcome.grid.base("y1a", w) != Some("Intro")));
        // The first placeholder run starts with the fixed opener.
        assert_eq!(y1.calendar[&1], "Pbr");
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let roster = vec![Trainee::new("dup", 3), Trainee::new("dup", 4)];
        let err = SchedulePipeline::new(SchedulePolicies::standard())
            .run(roster, &catalog())
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateTrainee(id) if id == "dup"));
    }

    #[test]
    fn test_empty_catalog_rejected_for_template_cohorts() {
        let err = SchedulePipeline::new(SchedulePolicies::standard())
            .run(vec![Trainee::new("a", 2)], &[])
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyTemplateCatalog(2)));

        // Cohorts that never use templates run fine without a catalog.
        let outcome = SchedulePipeline::new(SchedulePolicies::standard())
            .run(vec![Trainee::new("a", 3)], &[])
            .expect("no templates needed");
        assert_eq!(outcome.grid.base_len(), 52);
    }

    #[test]
    fn test_validation_runs_on_final_state() {
        let outcome = SchedulePipeline::new(SchedulePolicies::standard())
            .run(roster(), &catalog())
            .expect("valid inputs");

        // A 5-person roster cannot meet the full staffing minima; the
        // report carries the shortfalls rather than failing the run.
        assert!(!outcome.report.staffing.is_empty());
        // Exclusivity must hold everywhere by construction.
        assert!(outcome.report.exclusivity.is_empty());
    }
}
