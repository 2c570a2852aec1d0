//! Post-hoc schedule validation.
//!
//! A pure function of (roster, grid): recomputes staffing coverage,
//! graduation credit, and facility exclusivity from scratch and reports
//! every violation found. Nothing here mutates state and nothing is
//! fail-fast; the full report is the product.
//!
//! Staffing and exclusivity read *effective* assignments (duty overlay
//! wins); credit reads the base layer only, because a duty week does
//! not cancel the credit of the rotation underneath it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::{
    biweek_weeks, Biweek, Facility, FacilityMap, ScheduleGrid, Trainee, BLOCKS_PER_CYCLE,
    WEEKS_PER_CYCLE,
};
use crate::policy::{standard_credit, standard_staffing, CreditRequirement, StaffingGroup};

const CREDIT_EPSILON: f64 = 1e-9;

/// A week where a staffing group fell below its minimum headcount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffingViolation {
    pub week: u32,
    pub group: String,
    pub headcount: u32,
    pub min_headcount: u32,
}

/// A person short of a graduation-credit requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditDeficit {
    pub person: String,
    pub category: String,
    pub earned: f64,
    pub required: f64,
}

impl CreditDeficit {
    /// Weeks still missing.
    pub fn deficit(&self) -> f64 {
        self.required - self.earned
    }
}

/// A biweek holding rotations from more than one facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityConflict {
    pub person: String,
    pub block: u32,
    pub biweek: Biweek,
    pub facilities: Vec<Facility>,
}

/// Informational aggregates; never pass/fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    /// Average effective headcount per week, by facility.
    pub facility_weekly_average: BTreeMap<String, f64>,
    /// Average duty weeks per person, by cohort year.
    pub duty_weeks_by_year: BTreeMap<u8, f64>,
    /// Average unassigned weeks per person, by cohort year.
    pub unassigned_weeks_by_year: BTreeMap<u8, f64>,
}

/// The full validation report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub staffing: Vec<StaffingViolation>,
    pub credit: Vec<CreditDeficit>,
    pub exclusivity: Vec<FacilityConflict>,
    pub summary: ScheduleSummary,
}

impl ValidationReport {
    /// Whether no check flagged anything.
    pub fn is_clean(&self) -> bool {
        self.staffing.is_empty() && self.credit.is_empty() && self.exclusivity.is_empty()
    }

    /// Renders the report as plain text, violations first.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "validation: {} staffing, {} credit, {} exclusivity",
            self.staffing.len(),
            self.credit.len(),
            self.exclusivity.len()
        );
        for v in &self.staffing {
            let _ = writeln!(
                out,
                "  staffing: week {} group '{}' has {} of {} required",
                v.week, v.group, v.headcount, v.min_headcount
            );
        }
        for d in &self.credit {
            let _ = writeln!(
                out,
                "  credit: {} short {:.2} weeks of '{}' ({:.2} of {:.2})",
                d.person,
                d.deficit(),
                d.category,
                d.earned,
                d.required
            );
        }
        for c in &self.exclusivity {
            let facilities: Vec<&str> = c.facilities.iter().map(|f| f.name()).collect();
            let _ = writeln!(
                out,
                "  exclusivity: {} block {} biweek {} spans {}",
                c.person,
                c.block,
                c.biweek.label(),
                facilities.join(" + ")
            );
        }
        for (facility, avg) in &self.summary.facility_weekly_average {
            let _ = writeln!(out, "  avg weekly headcount {facility}: {avg:.1}");
        }
        for (year, avg) in &self.summary.duty_weeks_by_year {
            let _ = writeln!(out, "  avg duty weeks, year {year}: {avg:.1}");
        }
        for (year, avg) in &self.summary.unassigned_weeks_by_year {
            let _ = writeln!(out, "  avg unassigned weeks, year {year}: {avg:.1}");
        }
        out
    }
}

/// The validation engine: injected policy tables, no other state.
#[derive(Debug, Clone)]
pub struct Validator {
    staffing: Vec<StaffingGroup>,
    credit: Vec<CreditRequirement>,
    facilities: FacilityMap,
}

impl Validator {
    pub fn new(
        staffing: Vec<StaffingGroup>,
        credit: Vec<CreditRequirement>,
        facilities: FacilityMap,
    ) -> Self {
        Self {
            staffing,
            credit,
            facilities,
        }
    }

    /// A validator over the standard policy catalogs.
    pub fn standard() -> Self {
        Self::new(standard_staffing(), standard_credit(), FacilityMap::standard())
    }

    /// Runs all three checks plus the summaries. Pure: identical inputs
    /// produce an identical report.
    pub fn validate(&self, roster: &[Trainee], grid: &ScheduleGrid) -> ValidationReport {
        ValidationReport {
            staffing: self.check_staffing(grid),
            credit: self.check_credit(roster, grid),
            exclusivity: self.check_exclusivity(roster, grid),
            summary: self.summarize(roster, grid),
        }
    }

    /// Weekly headcount per staffing group, under-minimum only.
    fn check_staffing(&self, grid: &ScheduleGrid) -> Vec<StaffingViolation> {
        let mut violations = Vec::new();
        for week in 1..=WEEKS_PER_CYCLE {
            let assignments = grid.week_assignments(week);
            for group in &self.staffing {
                let headcount = assignments
                    .values()
                    .filter(|code| group.codes.contains(**code))
                    .count() as u32;
                if headcount < group.min_headcount {
                    violations.push(StaffingViolation {
                        week,
                        group: group.label.clone(),
                        headcount,
                        min_headcount: group.min_headcount,
                    });
                }
            }
        }
        violations
    }

    /// Historical plus current-cycle credit against every applicable
    /// requirement. Current-cycle weeks come from the base layer.
    fn check_credit(&self, roster: &[Trainee], grid: &ScheduleGrid) -> Vec<CreditDeficit> {
        let mut deficits = Vec::new();
        for trainee in roster {
            for requirement in &self.credit {
                if !requirement.gate.applies_to(trainee.pathways) {
                    continue;
                }
                let earned = self.earned_credit(trainee, grid, requirement);
                if earned + CREDIT_EPSILON < requirement.required_weeks {
                    deficits.push(CreditDeficit {
                        person: trainee.id.clone(),
                        category: requirement.label.clone(),
                        earned,
                        required: requirement.required_weeks,
                    });
                }
            }
        }
        deficits
    }

    fn earned_credit(
        &self,
        trainee: &Trainee,
        grid: &ScheduleGrid,
        requirement: &CreditRequirement,
    ) -> f64 {
        let weeks_of = |code: &str| -> f64 {
            trainee.history.get(code).copied().unwrap_or(0.0)
                + f64::from(grid.count_base_weeks(&trainee.id, code))
        };
        let full: f64 = requirement.qualifying.iter().map(|c| weeks_of(c)).sum();
        let partial: f64 = requirement
            .partial_credit
            .iter()
            .map(|(code, ratio)| weeks_of(code) * ratio)
            .sum();
        full + partial
    }

    /// At most one facility per person per biweek, from effective
    /// assignments. Duty and administrative codes carry no facility and
    /// never conflict.
    fn check_exclusivity(&self, roster: &[Trainee], grid: &ScheduleGrid) -> Vec<FacilityConflict> {
        let mut conflicts = Vec::new();
        for trainee in roster {
            for block in 1..=BLOCKS_PER_CYCLE {
                for biweek in Biweek::BOTH {
                    let facilities: BTreeSet<Facility> = biweek_weeks(block, biweek)
                        .iter()
                        .filter_map(|&w| grid.effective(&trainee.id, w))
                        .filter_map(|code| self.facilities.facility_of(code))
                        .collect();
                    if facilities.len() > 1 {
                        conflicts.push(FacilityConflict {
                            person: trainee.id.clone(),
                            block,
                            biweek,
                            facilities: facilities.into_iter().collect(),
                        });
                    }
                }
            }
        }
        conflicts
    }

    fn summarize(&self, roster: &[Trainee], grid: &ScheduleGrid) -> ScheduleSummary {
        let mut facility_totals: BTreeMap<String, u32> = BTreeMap::new();
        for week in 1..=WEEKS_PER_CYCLE {
            for code in grid.week_assignments(week).values() {
                if let Some(facility) = self.facilities.facility_of(code) {
                    *facility_totals.entry(facility.name().to_string()).or_insert(0) += 1;
                }
            }
        }
        let facility_weekly_average = facility_totals
            .into_iter()
            .map(|(name, total)| (name, f64::from(total) / f64::from(WEEKS_PER_CYCLE)))
            .collect();

        let mut people_by_year: BTreeMap<u8, u32> = BTreeMap::new();
        let mut duty_by_year: BTreeMap<u8, u32> = BTreeMap::new();
        let mut unassigned_by_year: BTreeMap<u8, u32> = BTreeMap::new();
        for trainee in roster {
            *people_by_year.entry(trainee.year).or_insert(0) += 1;
            *duty_by_year.entry(trainee.year).or_insert(0) +=
                grid.duty_weeks_of(&trainee.id).len() as u32;
            let assigned = (1..=WEEKS_PER_CYCLE)
                .filter(|&w| grid.effective(&trainee.id, w).is_some())
                .count() as u32;
            *unassigned_by_year.entry(trainee.year).or_insert(0) += WEEKS_PER_CYCLE - assigned;
        }
        let average = |totals: BTreeMap<u8, u32>| -> BTreeMap<u8, f64> {
            totals
                .into_iter()
                .map(|(year, total)| (year, f64::from(total) / f64::from(people_by_year[&year])))
                .collect()
        };

        ScheduleSummary {
            facility_weekly_average,
            duty_weeks_by_year: average(duty_by_year),
            unassigned_weeks_by_year: average(unassigned_by_year),
        }
    }
}
