//! Greedy requirement filler and the year-3/year-4 calendar builders.
//!
//! The filler works per person, rotation-first: each needed rotation in
//! priority order takes the first empty block that passes every
//! placement rule. A rotation with no admissible block is dropped, not
//! retried; the validator later surfaces the resulting deficit. A
//! second pass tops up still-empty blocks from a fixed round-robin
//! cycle of general rotations.
//!
//! The year-3 builder seats the review-course sessions and the exam
//! prep block before filling; the year-4 builder places the fixed
//! commitments (research, pathway quotas, administration, focused
//! experience) first.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::models::{biweek_weeks, Biweek, FacilityMap, Trainee};
use crate::policy::{CommitmentPolicy, CourseSessions, FillPolicy};

/// What the filler did for one person.
#[derive(Debug, Clone, Default)]
pub struct FillOutcome {
    /// (rotation code, block) placements, in placement order.
    pub placed: Vec<(String, u32)>,
    /// Requirements with no admissible block, in priority order.
    pub dropped: Vec<String>,
}

/// Rotation-first greedy placement over one person's empty blocks.
#[derive(Debug, Clone)]
pub struct GreedyFiller {
    policy: FillPolicy,
    facilities: FacilityMap,
    /// Code of the fixed block the timing rule keys off: the exam-prep
    /// block for year-3 fills, the administrative block for year 4.
    anchor_code: String,
}

impl GreedyFiller {
    pub fn new(policy: FillPolicy, facilities: FacilityMap) -> Self {
        Self {
            policy,
            facilities,
            anchor_code: "Adm".to_string(),
        }
    }

    pub fn with_timing_anchor(mut self, code: impl Into<String>) -> Self {
        self.anchor_code = code.into();
        self
    }

    /// Fills a trainee's remaining blocks: the requirement pass, then
    /// the top-up pass. Deterministic for fixed inputs, never fails.
    pub fn fill(&self, trainee: &mut Trainee) -> FillOutcome {
        let mut outcome = FillOutcome::default();
        let anchor = self.anchor_block(trainee);
        let mut used: BTreeSet<u32> = BTreeSet::new();

        for code in self.priority_list(trainee) {
            match self.find_block(trainee, &code, anchor, &used) {
                Some(block) => {
                    write_block(trainee, block, &code);
                    used.insert(block);
                    outcome.placed.push((code, block));
                }
                None => {
                    debug!(person = %trainee.id, code = %code, "requirement unplaceable, dropped");
                    outcome.dropped.push(code);
                }
            }
        }

        self.top_up(trainee, &mut outcome);
        info!(
            person = %trainee.id,
            placed = outcome.placed.len(),
            dropped = outcome.dropped.len(),
            "requirement fill done"
        );
        outcome
    }

    /// The priority-ordered needed-rotation list: pathway quota first,
    /// then recommended counts (rounded up, descending), then deficient
    /// categories not already represented.
    fn priority_list(&self, trainee: &Trainee) -> Vec<String> {
        let mut needed = Vec::new();

        if let Some((flag, code, quota)) = &self.policy.pathway_quota {
            if trainee.pathways.contains(*flag) {
                let have = blocks_holding(trainee, code);
                for _ in have..*quota {
                    needed.push(code.clone());
                }
            }
        }

        let mut recommended: Vec<(String, u32)> = trainee
            .recommended_blocks
            .iter()
            .map(|(code, count)| (code.clone(), count.ceil() as u32))
            .filter(|(_, count)| *count > 0)
            .collect();
        recommended.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (code, count) in recommended {
            for _ in 0..count {
                needed.push(code.clone());
            }
        }

        for code in &trainee.deficient_categories {
            if !needed.contains(code) {
                needed.push(code.clone());
            }
        }
        needed
    }

    /// First admissible block for a requirement, or `None` to drop it.
    fn find_block(
        &self,
        trainee: &Trainee,
        code: &str,
        anchor: Option<u32>,
        used: &BTreeSet<u32>,
    ) -> Option<u32> {
        let open = trainee.open_blocks();
        let preferred: Vec<u32> = match (&self.policy.block_preferred, &trainee.block_prefs) {
            (Some(c), Some(prefs)) if c == code => prefs.preferred.clone(),
            _ => Vec::new(),
        };
        let preferred_available = open
            .iter()
            .any(|b| preferred.contains(b) && !used.contains(b));

        for &block in &open {
            if used.contains(&block) {
                continue;
            }
            if self.policy.timing_restricted.as_deref() == Some(code) {
                if let Some(anchor) = anchor {
                    if block >= anchor.saturating_sub(1) {
                        continue;
                    }
                }
            }
            if preferred_available && !preferred.contains(&block) {
                continue;
            }
            if self.placement_conflicts(trainee, block, code) {
                continue;
            }
            return Some(block);
        }
        None
    }

    /// The second pass: one deficiency catch-up block, then the fixed
    /// round-robin cycle over still-empty blocks. Candidates that would
    /// break facility exclusivity are skipped in favor of the next one
    /// in the cycle.
    fn top_up(&self, trainee: &mut Trainee, outcome: &mut FillOutcome) {
        if let Some((code, floor)) = &self.policy.catchup {
            let historical = trainee.history.get(code).copied().unwrap_or(0.0);
            if historical < *floor {
                let spot = trainee
                    .open_blocks()
                    .into_iter()
                    .find(|&b| !self.placement_conflicts(trainee, b, code));
                if let Some(block) = spot {
                    write_block(trainee, block, code);
                    outcome.placed.push((code.clone(), block));
                }
            }
        }

        if self.policy.fill_cycle.is_empty() {
            return;
        }
        let cycle = &self.policy.fill_cycle;
        let mut cursor = 0;
        for block in trainee.open_blocks() {
            for attempt in 0..cycle.len() {
                let code = &cycle[(cursor + attempt) % cycle.len()];
                if self.placement_conflicts(trainee, block, code) {
                    continue;
                }
                write_block(trainee, block, code);
                outcome.placed.push((code.clone(), block));
                cursor = (cursor + attempt + 1) % cycle.len();
                break;
            }
        }
    }

    /// Whether writing `code` into the block's empty weeks would put
    /// two facilities into one biweek.
    fn placement_conflicts(&self, trainee: &Trainee, block: u32, code: &str) -> bool {
        let Some(new_facility) = self.facilities.facility_of(code) else {
            return false; // facility-less codes never conflict
        };
        for biweek in Biweek::BOTH {
            let weeks = biweek_weeks(block, biweek);
            let writes_here = weeks.iter().any(|w| !trainee.calendar.contains_key(w));
            if !writes_here {
                continue;
            }
            for week in weeks {
                if let Some(existing) = trainee.calendar.get(&week) {
                    if let Some(facility) = self.facilities.facility_of(existing) {
                        if facility != new_facility {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    /// Block holding the timing-anchor code, if placed.
    fn anchor_block(&self, trainee: &Trainee) -> Option<u32> {
        trainee
            .calendar
            .iter()
            .find(|(_, code)| code.as_str() == self.anchor_code)
            .map(|(week, _)| crate::models::week_to_block(*week))
    }
}

/// Writes a code into every still-empty week of a block.
fn write_block(trainee: &mut Trainee, block: u32, code: &str) {
    for week in trainee.empty_weeks_in_block(block) {
        trainee.calendar.insert(week, code.to_string());
    }
}

/// Number of blocks in which a code already appears.
fn blocks_holding(trainee: &Trainee, code: &str) -> u32 {
    (1..=crate::models::BLOCKS_PER_CYCLE)
        .filter(|&b| trainee.block_codes(b).contains(&code))
        .count() as u32
}

/// Builds the year-3 cohort: exam prep block, capacity-bounded review
/// course seating, then the greedy fill.
pub fn build_year3(
    roster: &mut [Trainee],
    sessions: &CourseSessions,
    filler: &GreedyFiller,
) -> Vec<FillOutcome> {
    // The year-3 timing rule keys off the exam-prep block, not the
    // year-4 administrative block.
    let filler = filler.clone().with_timing_anchor(sessions.study_code.clone());

    // Exam prep goes in the block before the exam, for everyone.
    let prep_block = sessions.exam_block.saturating_sub(1).max(1);
    for trainee in roster.iter_mut().filter(|t| t.year == 3) {
        write_block(trainee, prep_block, &sessions.study_code);
    }

    // Seat course sessions most-constrained first (fewest ranked
    // sessions, roster order on ties): ranked choice, then the
    // least-full session with open seats.
    let mut order: Vec<usize> = (0..roster.len())
        .filter(|&i| roster[i].year == 3)
        .collect();
    order.sort_by_key(|&i| {
        roster[i]
            .course_prefs
            .as_ref()
            .map(|p| p.rankings.len())
            .filter(|n| *n > 0)
            .unwrap_or(usize::MAX)
    });
    let mut seats: std::collections::BTreeMap<String, u32> = sessions
        .sessions
        .keys()
        .map(|id| (id.clone(), 0))
        .collect();
    for &index in &order {
        let trainee = &mut roster[index];
        let available = |id: &str, trainee: &Trainee| {
            seats[id] < sessions.capacity
                && !trainee
                    .empty_weeks_in_block(sessions.sessions[id])
                    .is_empty()
        };

        let mut chosen: Option<String> = None;
        if let Some(prefs) = &trainee.course_prefs {
            let mut ranked: Vec<(&String, &u32)> = prefs.rankings.iter().collect();
            ranked.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
            chosen = ranked
                .iter()
                .map(|(id, _)| (*id).clone())
                .find(|id| sessions.sessions.contains_key(id) && available(id.as_str(), trainee));
        }
        if chosen.is_none() {
            chosen = seats
                .iter()
                .filter(|(id, _)| available(id.as_str(), trainee))
                .min_by_key(|(id, count)| (**count, sessions.sessions[*id]))
                .map(|(id, _)| id.clone());
        }

        if let Some(id) = chosen {
            write_block(trainee, sessions.sessions[&id], &sessions.code);
            *seats.get_mut(&id).expect("seat counter exists") += 1;
        } else {
            debug!(person = %trainee.id, "no review-course seat available");
        }
    }

    roster
        .iter_mut()
        .filter(|t| t.year == 3)
        .map(|t| filler.fill(t))
        .collect()
}

/// Builds the year-4 cohort: fixed commitments, then the greedy fill.
pub fn build_year4(
    roster: &mut [Trainee],
    commitments: &CommitmentPolicy,
    facilities: &FacilityMap,
    filler: &GreedyFiller,
) -> Vec<FillOutcome> {
    let mut outcomes = Vec::new();
    for trainee in roster.iter_mut().filter(|t| t.year == 4) {
        place_commitments(trainee, commitments, facilities);
        outcomes.push(filler.fill(trainee));
    }
    outcomes
}

fn place_commitments(trainee: &mut Trainee, commitments: &CommitmentPolicy, facilities: &FacilityMap) {
    // Protected research, in the policy's preferred block order with a
    // fallback scan for any leftovers.
    let mut remaining = trainee.research_blocks;
    let order: Vec<u32> = commitments
        .research_order
        .iter()
        .copied()
        .chain(1..=crate::models::BLOCKS_PER_CYCLE)
        .collect();
    for block in order {
        if remaining == 0 {
            break;
        }
        if !trainee.empty_weeks_in_block(block).is_empty() {
            write_block(trainee, block, &commitments.research_code);
            remaining -= 1;
        }
    }

    let conflicts = |trainee: &Trainee, block: u32, code: &str| -> bool {
        let Some(new_facility) = facilities.facility_of(code) else {
            return false;
        };
        Biweek::BOTH.iter().any(|&bw| {
            biweek_weeks(block, bw).iter().any(|w| {
                trainee
                    .calendar
                    .get(w)
                    .and_then(|c| facilities.facility_of(c))
                    .is_some_and(|f| f != new_facility)
            })
        })
    };

    if trainee.pathways.contains(crate::models::Pathway::INTERVENTIONAL) {
        let mut placed = 0;
        for block in trainee.open_blocks() {
            if placed == commitments.interventional_blocks {
                break;
            }
            if conflicts(trainee, block, &commitments.interventional_code) {
                continue;
            }
            write_block(trainee, block, &commitments.interventional_code);
            placed += 1;
        }
    }

    if trainee.pathways.contains(crate::models::Pathway::NEURO) {
        let mut placed = 0;
        let mut alternates = 0;
        for block in trainee.open_blocks() {
            if placed == commitments.neuro_blocks {
                break;
            }
            if !conflicts(trainee, block, &commitments.neuro_primary) {
                write_block(trainee, block, &commitments.neuro_primary);
                placed += 1;
            } else if alternates < commitments.neuro_alternate_max
                && !conflicts(trainee, block, &commitments.neuro_alternate)
            {
                write_block(trainee, block, &commitments.neuro_alternate);
                placed += 1;
                alternates += 1;
            }
        }
    }

    // Focused experience from the trainee's first recognized specialty.
    if let Some(prefs) = trainee.focus_prefs.clone() {
        let choice = prefs.specialties.iter().find_map(|s| {
            commitments
                .focus_code_for(s)
                .map(|code| (code.to_string(), commitments.focus_blocks_for(s)))
        });
        if let Some((code, blocks)) = choice {
            place_focus(trainee, &code, blocks, prefs.contiguous, &conflicts);
        }
    }

    // Administration, in the last open block; research and dual-pathway
    // trainees are exempt.
    if !trainee.pathways.contains(crate::models::Pathway::RESEARCH) && !trainee.pathways.is_dual() {
        if let Some(&block) = trainee.open_blocks().last() {
            write_block(trainee, block, &commitments.admin_code);
        }
    }
}

/// Places focused-experience blocks, contiguously when requested and a
/// long-enough run of open blocks exists.
fn place_focus(
    trainee: &mut Trainee,
    code: &str,
    blocks: u32,
    contiguous: bool,
    conflicts: &dyn Fn(&Trainee, u32, &str) -> bool,
) {
    let open: Vec<u32> = trainee
        .open_blocks()
        .into_iter()
        .filter(|&b| !conflicts(trainee, b, code))
        .collect();

    let chosen: Vec<u32> = if contiguous {
        open.windows(blocks as usize)
            .find(|run| run.last().copied() == run.first().map(|f| f + blocks - 1))
            .map(|run| run.to_vec())
            .unwrap_or_else(|| open.iter().copied().take(blocks as usize).collect())
    } else {
        open.iter().copied().take(blocks as usize).collect()
    };

    for block in chosen {
        write_block(trainee, block, code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockPrefs, CoursePrefs, FocusPrefs, Pathway};

    fn standard_filler() -> GreedyFiller {
        GreedyFiller::new(FillPolicy::standard(), FacilityMap::standard())
    }

    /// A filler with no quotas, no catch-up, and no top-up cycle, for
    /// isolating single placements.
    fn bare_filler() -> GreedyFiller {
        let policy = FillPolicy {
            pathway_quota: None,
            timing_restricted: None,
            block_preferred: None,
            catchup: None,
            fill_cycle: Vec::new(),
        };
        GreedyFiller::new(policy, FacilityMap::standard())
    }

    fn fill_blocks(trainee: &mut Trainee, blocks: impl IntoIterator<Item = u32>, code: &str) {
        for block in blocks {
            write_block(trainee, block, code);
        }
    }

    fn biweek_facilities_ok(trainee: &Trainee) -> bool {
        let map = FacilityMap::standard();
        (1..=13).all(|block| {
            Biweek::BOTH.iter().all(|&bw| {
                let facilities: BTreeSet<_> = biweek_weeks(block, bw)
                    .iter()
                    .filter_map(|w| trainee.calendar.get(w))
                    .filter_map(|c| map.facility_of(c))
                    .collect();
                facilities.len() <= 1
            })
        })
    }

    #[test]
    fn test_partial_biweek_same_facility_accepted() {
        // Biweek B of block 1 holds a Main rotation in week 3; a Main
        // request fits into week 4, a General one must not.
        let mut a = Trainee::new("a", 3);
        fill_blocks(&mut a, 2..=13, "Mab");
        for w in 1..=3 {
            a.calendar.insert(w, "Mab".to_string());
        }
        let mut b = a.clone();

        a.recommended_blocks.insert("Mch".to_string(), 1.0);
        let outcome = bare_filler().fill(&mut a);
        assert_eq!(outcome.placed, vec![("Mch".to_string(), 1)]);
        assert_eq!(a.calendar[&4], "Mch");

        b.recommended_blocks.insert("Gab".to_string(), 1.0);
        let outcome = bare_filler().fill(&mut b);
        assert_eq!(outcome.dropped, vec!["Gab".to_string()]);
        assert!(!b.calendar.contains_key(&4));
    }

    #[test]
    fn test_priority_order() {
        // Pathway quota first, then recommended by descending count,
        // then deficient categories.
        let mut t = Trainee::new("a", 4)
            .with_pathways(Pathway::NUCLEAR)
            .with_recommended("Mab", 2.0)
            .with_recommended("Mch", 1.0);
        t.deficient_categories.push("Mus".to_string());
        let outcome = standard_filler().fill(&mut t);

        let codes: Vec<&str> = outcome.placed.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(
            &codes[..10],
            &["Mnuc", "Mnuc", "Mnuc", "Mnuc", "Mnuc", "Mnuc", "Mab", "Mab", "Mch", "Mus"]
        );
        // Requirements land in block order.
        assert_eq!(outcome.placed[0].1, 1);
        assert_eq!(outcome.placed[6].1, 7);
        assert!(biweek_facilities_ok(&t));
    }

    #[test]
    fn test_fractional_recommendation_rounds_up() {
        let mut t = Trainee::new("a", 3).with_recommended("Mab", 1.5);
        let outcome = bare_filler().fill(&mut t);
        let mab = outcome.placed.iter().filter(|(c, _)| c == "Mab").count();
        assert_eq!(mab, 2);
    }

    #[test]
    fn test_existing_quota_blocks_count() {
        // 2 blocks of Mnuc already on the calendar leave 4 to place.
        let mut t = Trainee::new("a", 4).with_pathways(Pathway::NUCLEAR);
        fill_blocks(&mut t, [1, 2], "Mnuc");
        let outcome = bare_filler_with_quota().fill(&mut t);
        let placed = outcome.placed.iter().filter(|(c, _)| c == "Mnuc").count();
        assert_eq!(placed, 4);
    }

    fn bare_filler_with_quota() -> GreedyFiller {
        let policy = FillPolicy {
            pathway_quota: Some((Pathway::NUCLEAR, "Mnuc".to_string(), 6)),
            timing_restricted: None,
            block_preferred: None,
            catchup: None,
            fill_cycle: Vec::new(),
        };
        GreedyFiller::new(policy, FacilityMap::standard())
    }

    #[test]
    fn test_timing_rule_avoids_admin_window() {
        // Admin sits in block 12; blocks 1-9 are full. The restricted
        // rotation may use block 10 but not 11+ (>= admin - 1).
        let mut t = Trainee::new("a", 4).with_recommended("Gir", 1.0);
        fill_blocks(&mut t, 1..=9, "Mab");
        write_block(&mut t, 12, "Adm");
        let outcome = bare_filler_with_timing().fill(&mut t);
        assert_eq!(outcome.placed, vec![("Gir".to_string(), 10)]);
    }

    #[test]
    fn test_timing_rule_can_drop() {
        let mut t = Trainee::new("a", 4).with_recommended("Gir", 1.0);
        fill_blocks(&mut t, 1..=10, "Mab");
        write_block(&mut t, 12, "Adm");
        let outcome = bare_filler_with_timing().fill(&mut t);
        assert_eq!(outcome.dropped, vec!["Gir".to_string()]);
    }

    fn bare_filler_with_timing() -> GreedyFiller {
        let policy = FillPolicy {
            pathway_quota: None,
            timing_restricted: Some("Gir".to_string()),
            block_preferred: None,
            catchup: None,
            fill_cycle: Vec::new(),
        };
        GreedyFiller::new(policy, FacilityMap::standard())
    }

    #[test]
    fn test_block_preference_respected() {
        let policy = FillPolicy {
            pathway_quota: None,
            timing_restricted: None,
            block_preferred: Some("Gir".to_string()),
            catchup: None,
            fill_cycle: Vec::new(),
        };
        let filler = GreedyFiller::new(policy, FacilityMap::standard());

        let mut t = Trainee::new("a", 4).with_recommended("Gir", 1.0);
        t.block_prefs = Some(BlockPrefs { preferred: vec![5] });
        let outcome = filler.fill(&mut t);
        assert_eq!(outcome.placed, vec![("Gir".to_string(), 5)]);
    }

    #[test]
    fn test_catchup_block_granted_when_history_low() {
        let mut t = Trainee::new("a", 4).with_history("Mpd", 4.0);
        let outcome = standard_filler().fill(&mut t);
        assert!(outcome.placed.iter().any(|(c, _)| c == "Mpd"));

        let mut experienced = Trainee::new("b", 4).with_history("Mpd", 10.0);
        let outcome = standard_filler().fill(&mut experienced);
        assert!(!outcome.placed.iter().any(|(c, _)| c == "Mpd"));
    }

    #[test]
    fn test_top_up_cycles_general_rotations() {
        let mut t = Trainee::new("a", 3);
        standard_filler().fill(&mut t);

        // Every block ends up assigned: the catch-up block first, then
        // the fill list cycling through the rest.
        assert_eq!(t.calendar.len(), 52);
        assert_eq!(t.block_codes(1), vec!["Mpd"; 4]);
        assert_eq!(t.block_codes(2), vec!["Mab"; 4]);
        assert_eq!(t.block_codes(3), vec!["Mch"; 4]);
        assert_eq!(t.block_codes(8), vec!["Mab"; 4]);
        assert!(biweek_facilities_ok(&t));
    }

    #[test]
    fn test_exclusivity_holds_with_empty_and_single_request() {
        let mut empty = Trainee::new("a", 3);
        standard_filler().fill(&mut empty);
        assert!(biweek_facilities_ok(&empty));

        let mut single = Trainee::new("b", 3).with_recommended("Vir", 1.0);
        standard_filler().fill(&mut single);
        assert!(biweek_facilities_ok(&single));
    }

    #[test]
    fn test_year3_course_seating() {
        // Five trainees all rank session "2" first; capacity 4 pushes
        // the last one to the least-full remaining session.
        let mut roster: Vec<Trainee> = (0..5)
            .map(|i| {
                let mut t = Trainee::new(format!("p{i}"), 3);
                t.course_prefs = Some(CoursePrefs {
                    rankings: [("2".to_string(), 1)].into(),
                });
                t
            })
            .collect();
        let sessions = CourseSessions::standard();
        build_year3(&mut roster, &sessions, &standard_filler());

        let in_block2 = roster
            .iter()
            .filter(|t| t.block_codes(2) == vec!["Crs"; 4])
            .count();
        assert_eq!(in_block2, 4);
        // The fifth fell back to the least-full session, block 3.
        assert_eq!(roster[4].block_codes(3), vec!["Crs"; 4]);
        // Everyone has the exam prep block before the exam block.
        for t in &roster {
            assert_eq!(t.block_codes(12), vec!["Study"; 4]);
            assert_eq!(t.calendar.len(), 52);
        }
    }

    #[test]
    fn test_year3_timing_rule_keys_off_study_block() {
        // Blocks 1-10 are full, so after the exam-prep block lands in
        // block 12 only blocks 11 and 13 remain. Both sit in or after
        // study_block - 1, so the restricted rotation is dropped
        // rather than scheduled against the prep window.
        let mut roster = vec![Trainee::new("a", 3).with_recommended("Gir", 1.0)];
        fill_blocks(&mut roster[0], 1..=10, "Mab");
        let outcomes = build_year3(
            &mut roster,
            &CourseSessions::standard(),
            &bare_filler_with_timing(),
        );

        assert_eq!(roster[0].block_codes(12), vec!["Study"; 4]);
        assert_eq!(outcomes[0].dropped, vec!["Gir".to_string()]);
        assert!(!roster[0].calendar.values().any(|c| c == "Gir"));
    }

    #[test]
    fn test_year3_timing_rule_allows_early_blocks() {
        // Block 5 holds no course session and sits ahead of the
        // block-12 prep window, so the restricted rotation lands there.
        let mut roster = vec![Trainee::new("a", 3).with_recommended("Gir", 1.0)];
        fill_blocks(&mut roster[0], 1..=4, "Mab");
        fill_blocks(&mut roster[0], 6..=10, "Mab");
        let outcomes = build_year3(
            &mut roster,
            &CourseSessions::standard(),
            &bare_filler_with_timing(),
        );
        assert_eq!(outcomes[0].placed, vec![("Gir".to_string(), 5)]);
    }

    #[test]
    fn test_constrained_choosers_seat_first() {
        // Four flexible trainees rank sessions 2 then 3; the last
        // roster entry ranks only session 2. Fewest ranked sessions
        // seats first, so the constrained trainee keeps a block-2 seat
        // and the bumped flexible one takes their second choice.
        let mut roster: Vec<Trainee> = (0..4)
            .map(|i| {
                let mut t = Trainee::new(format!("flex{i}"), 3);
                t.course_prefs = Some(CoursePrefs {
                    rankings: [("2".to_string(), 1), ("3".to_string(), 2)].into(),
                });
                t
            })
            .collect();
        let mut only2 = Trainee::new("only2", 3);
        only2.course_prefs = Some(CoursePrefs {
            rankings: [("2".to_string(), 1)].into(),
        });
        roster.push(only2);
        build_year3(&mut roster, &CourseSessions::standard(), &standard_filler());

        assert_eq!(roster[4].block_codes(2), vec!["Crs"; 4]);
        let in_block2 = roster
            .iter()
            .filter(|t| t.block_codes(2) == vec!["Crs"; 4])
            .count();
        assert_eq!(in_block2, 4);
        assert_eq!(roster[3].block_codes(3), vec!["Crs"; 4]);
    }

    #[test]
    fn test_year4_research_and_admin() {
        let mut roster = vec![{
            let mut t = Trainee::new("a", 4);
            t.research_blocks = 2;
            t
        }];
        let outcomes = build_year4(
            &mut roster,
            &CommitmentPolicy::standard(),
            &FacilityMap::standard(),
            &standard_filler(),
        );

        assert_eq!(outcomes.len(), 1);
        let t = &roster[0];
        // Research follows the preferred order (blocks 3 then 4).
        assert_eq!(t.block_codes(3), vec!["Res"; 4]);
        assert_eq!(t.block_codes(4), vec!["Res"; 4]);
        // Admin lands in the last block for a no-pathway trainee.
        assert_eq!(t.block_codes(13), vec!["Adm"; 4]);
        assert_eq!(t.calendar.len(), 52);
    }

    #[test]
    fn test_year4_interventional_quota() {
        let mut roster = vec![Trainee::new("a", 4).with_pathways(Pathway::INTERVENTIONAL)];
        build_year4(
            &mut roster,
            &CommitmentPolicy::standard(),
            &FacilityMap::standard(),
            &standard_filler(),
        );
        let mir_blocks = (1..=13)
            .filter(|&b| roster[0].block_codes(b) == vec!["Mir"; 4])
            .count();
        assert_eq!(mir_blocks, 8);
    }

    #[test]
    fn test_year4_neuro_alternate_cap() {
        let mut roster = vec![Trainee::new("a", 4).with_pathways(Pathway::NEURO)];
        build_year4(
            &mut roster,
            &CommitmentPolicy::standard(),
            &FacilityMap::standard(),
            &standard_filler(),
        );
        let t = &roster[0];
        let gnr = (1..=13).filter(|&b| t.block_codes(b) == vec!["Gnr"; 4]).count();
        let mnr = (1..=13).filter(|&b| t.block_codes(b) == vec!["Mnr"; 4]).count();
        assert_eq!(gnr + mnr, 6);
        assert!(mnr <= 1);
    }

    #[test]
    fn test_year4_research_pathway_skips_admin() {
        let mut roster = vec![Trainee::new("a", 4).with_pathways(Pathway::RESEARCH)];
        build_year4(
            &mut roster,
            &CommitmentPolicy::standard(),
            &FacilityMap::standard(),
            &standard_filler(),
        );
        assert!(!roster[0].calendar.values().any(|c| c == "Adm"));
    }

    #[test]
    fn test_year4_focus_contiguous() {
        // Nuclear maps to a code the top-up cycle never uses, so the
        // focus blocks are the only Mnuc blocks on the calendar.
        let mut roster = vec![{
            let mut t = Trainee::new("a", 4);
            t.focus_prefs = Some(FocusPrefs {
                specialties: vec!["Nuclear medicine".to_string()],
                contiguous: true,
            });
            t
        }];
        build_year4(
            &mut roster,
            &CommitmentPolicy::standard(),
            &FacilityMap::standard(),
            &standard_filler(),
        );
        let blocks: Vec<u32> = (1..=13)
            .filter(|&b| roster[0].block_codes(b) == vec!["Mnuc"; 4])
            .collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1], blocks[0] + 1);
    }
}
