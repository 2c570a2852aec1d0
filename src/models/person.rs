//! Trainee model: identity, cohort year, pathways, preferences, history.
//!
//! A trainee's current-cycle calendar is built up phase by phase as a
//! sparse week → rotation-code map. Phases run sequentially and each
//! owns disjoint sets of weeks by the time it finishes, so a later
//! overwrite of a week is a deliberate outcome (e.g. the sampler
//! substitution), never a race.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::calendar::{block_weeks, BLOCKS_PER_CYCLE};

/// Specialization pathway flags.
///
/// A trainee may pursue zero or more pathways concurrently; the set is
/// a bitset because membership and combination tests are the only
/// operations the engine needs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pathway(u8);

impl Pathway {
    /// No pathway.
    pub const NONE: Pathway = Pathway(0);
    /// Extended nuclear-medicine pathway (6-block quota, 48-week credit floor).
    pub const NUCLEAR: Pathway = Pathway(1);
    /// Early interventional pathway (12-week credit floor, 8 fixed year-4 blocks).
    pub const INTERVENTIONAL: Pathway = Pathway(1 << 1);
    /// Neuro pathway (24-week credit floor, 6 fixed year-4 blocks).
    pub const NEURO: Pathway = Pathway(1 << 2);
    /// Protected-research pathway (research blocks, exempt from admin fill).
    pub const RESEARCH: Pathway = Pathway(1 << 3);

    /// Whether all flags in `other` are present.
    pub fn contains(&self, other: Pathway) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Set union.
    pub fn with(self, other: Pathway) -> Pathway {
        Pathway(self.0 | other.0)
    }

    /// Number of pathways being pursued.
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Whether 2+ pathways are pursued concurrently.
    pub fn is_dual(&self) -> bool {
        self.count() >= 2
    }

    /// Whether no pathway is pursued.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Pathway {
    type Output = Pathway;
    fn bitor(self, rhs: Pathway) -> Pathway {
        self.with(rhs)
    }
}

/// Ranked template preferences (template number → rank, 1 = top).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatePrefs {
    pub rankings: BTreeMap<u32, u32>,
}

/// Ranked sampler-rotation preferences (rotation code → rank, 1 = top).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplerPrefs {
    pub rankings: BTreeMap<String, u32>,
}

/// Ranked review-course session preferences (session id → rank).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoursePrefs {
    pub rankings: BTreeMap<String, u32>,
}

/// Preferred block numbers for the timing-sensitive rotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockPrefs {
    pub preferred: Vec<u32>,
}

/// Year-4 focused-experience preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FocusPrefs {
    /// Requested specialty areas, most wanted first.
    pub specialties: Vec<String>,
    /// Whether the blocks should be contiguous.
    pub contiguous: bool,
}

/// A member of the training cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trainee {
    /// Stable identifier (used as the grid key).
    pub id: String,
    /// Cohort year, 1-4.
    pub year: u8,
    /// Specialization pathways (combinable).
    pub pathways: Pathway,
    /// Prior-cycle credit: rotation code → weeks accumulated before this cycle.
    pub history: BTreeMap<String, f64>,
    /// Current-cycle calendar: week → rotation code, sparse.
    pub calendar: BTreeMap<u32, String>,
    /// Assigned template number, if any.
    pub template: Option<u32>,

    // Preference bundles, all independent and optional.
    pub template_prefs: Option<TemplatePrefs>,
    pub sampler_prefs: Option<SamplerPrefs>,
    pub course_prefs: Option<CoursePrefs>,
    pub block_prefs: Option<BlockPrefs>,
    pub focus_prefs: Option<FocusPrefs>,

    /// Weeks where no recurring duty may be assigned (blackouts from
    /// away periods, already resolved to week numbers).
    pub no_duty_weeks: BTreeSet<u32>,
    /// Requirement categories flagged deficient by the program.
    pub deficient_categories: Vec<String>,
    /// Externally recommended block counts: rotation code → blocks.
    pub recommended_blocks: BTreeMap<String, f64>,
    /// Protected research blocks to place (year 4).
    pub research_blocks: u32,
}

impl Trainee {
    /// Creates a trainee with the given id and cohort year.
    pub fn new(id: impl Into<String>, year: u8) -> Self {
        Self {
            id: id.into(),
            year,
            pathways: Pathway::NONE,
            history: BTreeMap::new(),
            calendar: BTreeMap::new(),
            template: None,
            template_prefs: None,
            sampler_prefs: None,
            course_prefs: None,
            block_prefs: None,
            focus_prefs: None,
            no_duty_weeks: BTreeSet::new(),
            deficient_categories: Vec::new(),
            recommended_blocks: BTreeMap::new(),
            research_blocks: 0,
        }
    }

    /// Adds pathway flags.
    pub fn with_pathways(mut self, pathways: Pathway) -> Self {
        self.pathways = self.pathways.with(pathways);
        self
    }

    /// Records prior-cycle credit for a rotation code.
    pub fn with_history(mut self, code: impl Into<String>, weeks: f64) -> Self {
        self.history.insert(code.into(), weeks);
        self
    }

    /// Sets template rankings.
    pub fn with_template_prefs(mut self, prefs: TemplatePrefs) -> Self {
        self.template_prefs = Some(prefs);
        self
    }

    /// Sets a recommended block count.
    pub fn with_recommended(mut self, code: impl Into<String>, blocks: f64) -> Self {
        self.recommended_blocks.insert(code.into(), blocks);
        self
    }

    /// The rotation codes of a block's 4 weeks ("" for empty weeks).
    pub fn block_codes(&self, block: u32) -> Vec<&str> {
        block_weeks(block)
            .map(|w| self.calendar.get(&w).map(String::as_str).unwrap_or(""))
            .collect()
    }

    /// Week numbers of a block not yet assigned.
    pub fn empty_weeks_in_block(&self, block: u32) -> Vec<u32> {
        block_weeks(block)
            .filter(|w| !self.calendar.contains_key(w))
            .collect()
    }

    /// Blocks with at least one unassigned week, in block order.
    pub fn open_blocks(&self) -> Vec<u32> {
        (1..=BLOCKS_PER_CYCLE)
            .filter(|&b| !self.empty_weeks_in_block(b).is_empty())
            .collect()
    }

    /// Current-cycle weeks per rotation code.
    pub fn current_week_counts(&self) -> BTreeMap<String, f64> {
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        for code in self.calendar.values() {
            if !code.is_empty() {
                *counts.entry(code.clone()).or_insert(0.0) += 1.0;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pathway_combination() {
        let p = Pathway::NUCLEAR | Pathway::RESEARCH;
        assert!(p.contains(Pathway::NUCLEAR));
        assert!(p.contains(Pathway::RESEARCH));
        assert!(!p.contains(Pathway::NEURO));
        assert_eq!(p.count(), 2);
        assert!(p.is_dual());
        assert!(!Pathway::NUCLEAR.is_dual());
        assert!(Pathway::NONE.is_empty());
    }

    #[test]
    fn test_block_codes() {
        let mut t = Trainee::new("a", 3);
        t.calendar.insert(1, "Mnuc".into());
        t.calendar.insert(2, "Mnuc".into());
        assert_eq!(t.block_codes(1), vec!["Mnuc", "Mnuc", "", ""]);
        assert_eq!(t.empty_weeks_in_block(1), vec![3, 4]);
    }

    #[test]
    fn test_open_blocks() {
        let mut t = Trainee::new("a", 3);
        for w in 1..=4 {
            t.calendar.insert(w, "Mab".into());
        }
        let open = t.open_blocks();
        assert!(!open.contains(&1));
        assert!(open.contains(&2));
        assert_eq!(open.len(), 12);
    }

    #[test]
    fn test_current_week_counts() {
        let mut t = Trainee::new("a", 4);
        t.calendar.insert(1, "Mnuc".into());
        t.calendar.insert(2, "Mnuc".into());
        t.calendar.insert(3, "Pbr".into());
        let counts = t.current_week_counts();
        assert_eq!(counts.get("Mnuc"), Some(&2.0));
        assert_eq!(counts.get("Pbr"), Some(&1.0));
    }
}
