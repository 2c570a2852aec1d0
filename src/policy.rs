//! Injected policy catalogs.
//!
//! Staffing groups, credit requirements, duty rules, and the filler's
//! placement policy are immutable configuration handed to the engine at
//! construction time. Nothing in here is consulted as a module-level
//! constant: tests substitute alternate tables freely, and the
//! `standard_*` constructors only describe the default program.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::{DutyType, Pathway};

/// A named staffing group: a fixed set of rotation codes with a
/// minimum weekly headcount. Maxima are informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffingGroup {
    pub label: String,
    pub codes: BTreeSet<String>,
    pub min_headcount: u32,
    pub max_headcount: u32,
}

impl StaffingGroup {
    /// Creates a group with the given minimum.
    pub fn new(label: impl Into<String>, codes: &[&str], min_headcount: u32) -> Self {
        Self {
            label: label.into(),
            codes: codes.iter().map(|c| c.to_string()).collect(),
            min_headcount,
            max_headcount: 99,
        }
    }
}

/// Pathway applicability of a credit requirement.
///
/// `ExceptWhen` expresses supersession: the default variant of a
/// category applies to everyone the pathway-specific variant does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathwayGate {
    /// Applies to everyone.
    All,
    /// Applies only to trainees with this pathway flag.
    Requires(Pathway),
    /// Applies to everyone without this pathway flag.
    ExceptWhen(Pathway),
}

impl PathwayGate {
    /// Whether the gate admits a trainee with these pathway flags.
    pub fn applies_to(&self, pathways: Pathway) -> bool {
        match self {
            PathwayGate::All => true,
            PathwayGate::Requires(p) => pathways.contains(*p),
            PathwayGate::ExceptWhen(p) => !pathways.contains(*p),
        }
    }
}

/// A graduation-credit requirement category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditRequirement {
    pub label: String,
    /// Minimum total weeks (historical + current cycle).
    pub required_weeks: f64,
    /// Codes counting at full credit.
    pub qualifying: BTreeSet<String>,
    /// Codes counting at a fractional ratio (code → ratio).
    pub partial_credit: BTreeMap<String, f64>,
    pub gate: PathwayGate,
}

impl CreditRequirement {
    pub fn new(label: impl Into<String>, required_weeks: f64, qualifying: &[&str]) -> Self {
        Self {
            label: label.into(),
            required_weeks,
            qualifying: qualifying.iter().map(|c| c.to_string()).collect(),
            partial_credit: BTreeMap::new(),
            gate: PathwayGate::All,
        }
    }

    pub fn with_partial(mut self, code: impl Into<String>, ratio: f64) -> Self {
        self.partial_credit.insert(code.into(), ratio);
        self
    }

    pub fn with_gate(mut self, gate: PathwayGate) -> Self {
        self.gate = gate;
        self
    }
}

/// Recurring-duty rules: quotas, eligibility, spacing, pull preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DutyRules {
    /// Exact `First`-duty weeks for every year-2 trainee.
    pub year2_first_weeks: u32,
    /// Combined duty-week bounds for year-3 trainees.
    pub year3_min_total: u32,
    pub year3_max_total: u32,
    /// Exact `Second`-duty weeks for every year-4 trainee.
    pub year4_second_weeks: u32,
    /// No two duty weeks for one person within this window.
    pub min_spacing_weeks: u32,
    /// Base rotations it is preferable to pull duty from.
    pub preferred_pull: BTreeSet<String>,
    /// Objective weight for a duty week on a preferred base rotation.
    pub preferred_weight: i64,
    /// Objective weight for a duty week on any other non-empty base rotation.
    pub other_weight: i64,
}

impl Default for DutyRules {
    fn default() -> Self {
        Self {
            year2_first_weeks: 2,
            year3_min_total: 1,
            year3_max_total: 3,
            year4_second_weeks: 2,
            min_spacing_weeks: 4,
            preferred_pull: ["Pbr", "Mbr", "Mmsk", "Mpd", "Mnuc"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            preferred_weight: 10,
            other_weight: -5,
        }
    }
}

impl DutyRules {
    /// Whether a cohort year may ever take a duty type.
    pub fn eligible(&self, year: u8, duty: DutyType) -> bool {
        matches!(
            (year, duty),
            (2, DutyType::First) | (3, _) | (4, DutyType::Second)
        )
    }

    /// Whether a cohort year takes any duty at all.
    pub fn year_participates(&self, year: u8) -> bool {
        (2..=4).contains(&year)
    }
}

/// Placement policy for the greedy requirement filler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillPolicy {
    /// Hard pathway quota prepended at highest priority:
    /// (pathway flag, rotation code, block count).
    pub pathway_quota: Option<(Pathway, String, u32)>,
    /// Rotation that must finish before the block preceding the
    /// filler's timing-anchor block (exam prep for year 3, the fixed
    /// administrative block for year 4).
    pub timing_restricted: Option<String>,
    /// Rotation subject to the trainee's preferred-block list.
    pub block_preferred: Option<String>,
    /// Deficiency catch-up: (rotation code, history floor in weeks).
    /// One block is granted in the second pass when history is below
    /// the floor.
    pub catchup: Option<(String, f64)>,
    /// Round-robin cycle of general clinical rotations for the second pass.
    pub fill_cycle: Vec<String>,
}

impl FillPolicy {
    /// The standard program policy.
    pub fn standard() -> Self {
        Self {
            pathway_quota: Some((Pathway::NUCLEAR, "Mnuc".to_string(), 6)),
            timing_restricted: Some("Gir".to_string()),
            block_preferred: Some("Gir".to_string()),
            catchup: Some(("Mpd".to_string(), 8.0)),
            fill_cycle: ["Mab", "Mch", "Mus", "Mmsk", "Mbr", "Gab"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

/// Review-course session catalog for year 3 (session id → block).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSessions {
    pub sessions: BTreeMap<String, u32>,
    pub capacity: u32,
    /// Code written into the calendar for the course block.
    pub code: String,
    /// Exam-prep code; the prep block lands immediately before the
    /// exam block.
    pub study_code: String,
    pub exam_block: u32,
}

impl CourseSessions {
    /// The standard five-session catalog, four seats each.
    pub fn standard() -> Self {
        let sessions = [("2", 2), ("3", 3), ("4", 4), ("9", 9), ("10", 10)]
            .iter()
            .map(|(id, b)| (id.to_string(), *b))
            .collect();
        Self {
            sessions,
            capacity: 4,
            code: "Crs".to_string(),
            study_code: "Study".to_string(),
            exam_block: 13,
        }
    }
}

/// Year-4 fixed commitments placed before requirement filling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentPolicy {
    /// Preferred block order for protected research.
    pub research_order: Vec<u32>,
    pub research_code: String,
    /// Interventional-pathway block quota and code.
    pub interventional_blocks: u32,
    pub interventional_code: String,
    /// Neuro-pathway block quota, primary/alternate codes, alternate cap.
    pub neuro_blocks: u32,
    pub neuro_primary: String,
    pub neuro_alternate: String,
    pub neuro_alternate_max: u32,
    /// Administrative block code (skipped for research/dual-pathway trainees).
    pub admin_code: String,
    /// Focused-experience block counts: default, and the extended
    /// specialty that needs more.
    pub focus_default_blocks: u32,
    pub focus_extended: Option<(String, u32)>,
    /// Focused-experience specialty name → rotation code.
    pub focus_codes: BTreeMap<String, String>,
}

impl CommitmentPolicy {
    pub fn standard() -> Self {
        Self {
            research_order: vec![3, 4, 8, 9, 10, 11, 2, 12],
            research_code: "Res".to_string(),
            interventional_blocks: 8,
            interventional_code: "Mir".to_string(),
            neuro_blocks: 6,
            neuro_primary: "Gnr".to_string(),
            neuro_alternate: "Mnr".to_string(),
            neuro_alternate_max: 1,
            admin_code: "Adm".to_string(),
            focus_default_blocks: 2,
            focus_extended: Some(("breast".to_string(), 6)),
            focus_codes: [
                ("breast", "Mbr"),
                ("chest", "Mch"),
                ("msk", "Mmsk"),
                ("abdominal", "Mab"),
                ("ultrasound", "Mus"),
                ("pediatrics", "Mpd"),
                ("nuclear", "Mnuc"),
            ]
            .iter()
            .map(|(name, code)| (name.to_string(), code.to_string()))
            .collect(),
        }
    }

    /// Blocks a focused-experience specialty needs.
    pub fn focus_blocks_for(&self, specialty: &str) -> u32 {
        if let Some((name, blocks)) = &self.focus_extended {
            if specialty.to_lowercase().contains(name) {
                return *blocks;
            }
        }
        self.focus_default_blocks
    }

    /// The rotation code behind a focused-experience specialty name.
    pub fn focus_code_for(&self, specialty: &str) -> Option<&str> {
        let wanted = specialty.to_lowercase();
        self.focus_codes
            .iter()
            .find(|(name, _)| wanted.contains(name.as_str()))
            .map(|(_, code)| code.as_str())
    }
}

/// Year-1 sampler substitution policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerPolicy {
    /// Placeholder code templates carry for sampler blocks.
    pub placeholder: String,
    /// Week 1 of each sampler run.
    pub first: String,
    /// Week 2 alternatives, chosen by sampler ranking.
    pub choice: (String, String),
    /// Weeks 3+ of each sampler run.
    pub tail: String,
}

impl SamplerPolicy {
    pub fn standard() -> Self {
        Self {
            placeholder: "Intro".to_string(),
            first: "Pbr".to_string(),
            choice: ("Mmsk".to_string(), "Mir".to_string()),
            tail: "Mnuc".to_string(),
        }
    }
}

/// The standard staffing-minimum table.
pub fn standard_staffing() -> Vec<StaffingGroup> {
    vec![
        StaffingGroup::new("Main abdominal", &["Mab"], 3),
        StaffingGroup::new("Main ultrasound", &["Mus"], 2),
        StaffingGroup::new("Main chest", &["Mch"], 2),
        StaffingGroup::new("Main nuclear", &["Mnuc"], 2),
        StaffingGroup::new("Main MSK", &["Mmsk"], 1),
        StaffingGroup::new("Pediatrics", &["Mpd"], 1),
        StaffingGroup::new("Breast", &["Pbr", "Mbr"], 1),
        StaffingGroup::new(
            "General hospital total",
            &["Gab", "Gus", "Gbr", "Gir", "Gnr", "Gmsk", "Gch", "Gnuc"],
            8,
        ),
        StaffingGroup::new("Veterans total", &["Vnuc", "Vbr", "Vir"], 1),
        StaffingGroup::new("Interventional total", &["Mir", "Gir", "Vir"], 1),
    ]
}

/// The standard graduation-credit catalog.
pub fn standard_credit() -> Vec<CreditRequirement> {
    vec![
        CreditRequirement::new("Breast imaging", 12.0, &["Pbr", "Mbr", "Gbr", "Vbr"]),
        // Default nuclear requirement: 4 weeks of a qualifying general
        // rotation earn 1 week of nuclear credit.
        CreditRequirement::new("Nuclear medicine", 16.0, &["Mnuc", "Vnuc", "Gnuc"])
            .with_partial("Mab", 0.25)
            .with_partial("Mch", 0.25)
            .with_partial("Mpd", 0.25)
            .with_partial("Adm", 0.25)
            .with_gate(PathwayGate::ExceptWhen(Pathway::NUCLEAR)),
        // The pathway variant supersedes the default and earns no
        // partial credit.
        CreditRequirement::new("Nuclear medicine (pathway)", 48.0, &["Mnuc", "Vnuc", "Gnuc"])
            .with_gate(PathwayGate::Requires(Pathway::NUCLEAR)),
        CreditRequirement::new("Interventional", 12.0, &["Mir", "Gir", "Vir"])
            .with_gate(PathwayGate::Requires(Pathway::INTERVENTIONAL)),
        CreditRequirement::new("Neuro", 24.0, &["Gnr", "Mnr"])
            .with_gate(PathwayGate::Requires(Pathway::NEURO)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_applicability() {
        let nuclear = Pathway::NUCLEAR;
        let none = Pathway::NONE;

        assert!(PathwayGate::All.applies_to(none));
        assert!(PathwayGate::Requires(nuclear).applies_to(nuclear));
        assert!(!PathwayGate::Requires(nuclear).applies_to(none));
        assert!(PathwayGate::ExceptWhen(nuclear).applies_to(none));
        assert!(!PathwayGate::ExceptWhen(nuclear).applies_to(nuclear));
        // Dual pathway still matches both gates on its flags.
        let dual = Pathway::NUCLEAR | Pathway::NEURO;
        assert!(PathwayGate::Requires(Pathway::NEURO).applies_to(dual));
        assert!(!PathwayGate::ExceptWhen(nuclear).applies_to(dual));
    }

    #[test]
    fn test_duty_eligibility() {
        let rules = DutyRules::default();
        assert!(rules.eligible(2, DutyType::First));
        assert!(!rules.eligible(2, DutyType::Second));
        assert!(rules.eligible(3, DutyType::First));
        assert!(rules.eligible(3, DutyType::Second));
        assert!(!rules.eligible(4, DutyType::First));
        assert!(rules.eligible(4, DutyType::Second));
        assert!(!rules.eligible(1, DutyType::First));
    }

    #[test]
    fn test_standard_credit_supersession() {
        let reqs = standard_credit();
        let default_nm = reqs.iter().find(|r| r.label == "Nuclear medicine").unwrap();
        let pathway_nm = reqs
            .iter()
            .find(|r| r.label == "Nuclear medicine (pathway)")
            .unwrap();
        // Exactly one of the two applies to any trainee.
        for p in [Pathway::NONE, Pathway::NUCLEAR, Pathway::NEURO] {
            assert_ne!(default_nm.gate.applies_to(p), pathway_nm.gate.applies_to(p));
        }
    }

    #[test]
    fn test_focus_blocks() {
        let policy = CommitmentPolicy::standard();
        assert_eq!(policy.focus_blocks_for("Breast imaging"), 6);
        assert_eq!(policy.focus_blocks_for("Chest"), 2);
    }

    #[test]
    fn test_focus_code_lookup() {
        let policy = CommitmentPolicy::standard();
        assert_eq!(policy.focus_code_for("Breast imaging"), Some("Mbr"));
        assert_eq!(policy.focus_code_for("MSK"), Some("Mmsk"));
        assert_eq!(policy.focus_code_for("cardiac"), None);
    }
}
