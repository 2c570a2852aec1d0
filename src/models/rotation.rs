//! Rotation codes, facility mapping, and duty codes.
//!
//! Rotation codes are plain strings. The facility a code belongs to is
//! derived, never stored: the first character of the code selects the
//! facility through a configurable prefix table, with per-code overrides
//! for the exceptions. Codes with no mapped prefix (administrative codes,
//! duty codes, placeholders) belong to no facility and never participate
//! in exclusivity conflicts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A physical/organizational site a rotation belongs to.
///
/// Two prefixes may map to the same facility: sites sharing one payroll
/// entity count as a single facility for exclusivity purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Facility {
    Main,
    General,
    Veterans,
}

impl Facility {
    /// Human-readable facility name.
    pub fn name(&self) -> &'static str {
        match self {
            Facility::Main => "Main campus",
            Facility::General => "General hospital",
            Facility::Veterans => "Veterans",
        }
    }
}

/// Rotation-code → facility derivation rules.
///
/// Immutable configuration injected into the filler and validator so
/// tests can substitute alternate site layouts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacilityMap {
    prefixes: BTreeMap<char, Facility>,
    overrides: BTreeMap<String, Facility>,
}

impl FacilityMap {
    /// Creates an empty map (every code is facility-less).
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard site layout: `M`/`P` → Main, `G` → General, `V` → Veterans.
    pub fn standard() -> Self {
        Self::new()
            .with_prefix('M', Facility::Main)
            .with_prefix('P', Facility::Main)
            .with_prefix('G', Facility::General)
            .with_prefix('V', Facility::Veterans)
    }

    /// Maps a code prefix to a facility.
    pub fn with_prefix(mut self, prefix: char, facility: Facility) -> Self {
        self.prefixes.insert(prefix, facility);
        self
    }

    /// Maps one exact code to a facility, bypassing the prefix rule.
    pub fn with_override(mut self, code: impl Into<String>, facility: Facility) -> Self {
        self.overrides.insert(code.into(), facility);
        self
    }

    /// The facility a rotation code belongs to, or `None` for
    /// administrative and duty codes.
    pub fn facility_of(&self, code: &str) -> Option<Facility> {
        if code.is_empty() {
            return None;
        }
        if let Some(&f) = self.overrides.get(code) {
            return Some(f);
        }
        code.chars().next().and_then(|c| self.prefixes.get(&c).copied())
    }
}

/// The two recurring night-duty types.
///
/// Eligibility is cohort-year based: year 2 may take only `First`,
/// year 4 only `Second`, year 3 either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DutyType {
    First,
    Second,
}

impl DutyType {
    /// The overlay rotation code written into the grid.
    pub fn code(&self) -> &'static str {
        match self {
            DutyType::First => "Nf1",
            DutyType::Second => "Nf2",
        }
    }

    /// Parses an overlay code back into a duty type.
    pub fn from_code(code: &str) -> Option<DutyType> {
        match code {
            "Nf1" => Some(DutyType::First),
            "Nf2" => Some(DutyType::Second),
            _ => None,
        }
    }
}
