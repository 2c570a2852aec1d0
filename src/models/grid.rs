//! The authoritative assignment store: base layer + duty overlay.
//!
//! The grid maps (person, week) to a rotation code twice over: the
//! *base* layer holds the rotation calendar built by the assignment
//! phases, the *overlay* holds recurring-duty codes layered on top
//! after the base calendar is frozen. The effective assignment checks
//! the overlay first. The layers are never merged: credit accounting
//! must keep reading the base layer even for weeks the overlay wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rotation::DutyType;

/// Two-layer (person, week) → rotation-code store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleGrid {
    base: BTreeMap<(String, u32), String>,
    overlay: BTreeMap<(String, u32), String>,
}

impl ScheduleGrid {
    /// Creates an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a base-layer assignment.
    pub fn assign(&mut self, person: &str, week: u32, code: impl Into<String>) {
        self.base.insert((person.to_string(), week), code.into());
    }

    /// Writes a duty assignment into the overlay.
    pub fn assign_duty(&mut self, person: &str, week: u32, duty: DutyType) {
        self.overlay
            .insert((person.to_string(), week), duty.code().to_string());
    }

    /// Base-layer assignment for a (person, week), ignoring the overlay.
    pub fn base(&self, person: &str, week: u32) -> Option<&str> {
        self.base
            .get(&(person.to_string(), week))
            .map(String::as_str)
    }

    /// Effective assignment: overlay if present, else base.
    pub fn effective(&self, person: &str, week: u32) -> Option<&str> {
        let key = (person.to_string(), week);
        self.overlay
            .get(&key)
            .or_else(|| self.base.get(&key))
            .map(String::as_str)
    }

    /// All effective assignments for one week, keyed by person.
    pub fn week_assignments(&self, week: u32) -> BTreeMap<&str, &str> {
        let mut result: BTreeMap<&str, &str> = BTreeMap::new();
        for ((person, w), code) in &self.base {
            if *w == week {
                result.insert(person, code);
            }
        }
        for ((person, w), code) in &self.overlay {
            if *w == week {
                result.insert(person, code);
            }
        }
        result
    }

    /// One person's full base calendar.
    pub fn base_schedule_of(&self, person: &str) -> BTreeMap<u32, String> {
        self.base
            .iter()
            .filter(|((p, _), _)| p == person)
            .map(|((_, w), code)| (*w, code.clone()))
            .collect()
    }

    /// One person's duty weeks from the overlay, in week order.
    pub fn duty_weeks_of(&self, person: &str) -> Vec<(u32, DutyType)> {
        self.overlay
            .iter()
            .filter(|((p, _), _)| p == person)
            .filter_map(|((_, w), code)| DutyType::from_code(code).map(|d| (*w, d)))
            .collect()
    }

    /// Weeks of base-layer assignment to `code` for one person.
    pub fn count_base_weeks(&self, person: &str, code: &str) -> u32 {
        self.base
            .iter()
            .filter(|((p, _), c)| p == person && c.as_str() == code)
            .count() as u32
    }

    /// Number of base-layer entries.
    pub fn base_len(&self) -> usize {
        self.base.len()
    }

    /// Number of overlay entries.
    pub fn overlay_len(&self) -> usize {
        self.overlay.len()
    }
}
