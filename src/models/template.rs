//! Pre-built full-cycle rotation templates.
//!
//! A template is an ordered catalog entry assignable to one person per
//! slot. Entries are biweek-granular: each (block, biweek) pair carries
//! one rotation code, and expansion to the weekly calendar duplicates
//! the code across the biweek's two weeks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::calendar::{biweek_weeks, Biweek, BLOCKS_PER_CYCLE};

/// One template from the track catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationTemplate {
    /// Template number (1-based catalog position).
    pub number: u32,
    /// (block, biweek, rotation code) entries.
    entries: Vec<(u32, Biweek, String)>,
}

impl RotationTemplate {
    /// Creates an empty template.
    pub fn new(number: u32) -> Self {
        Self {
            number,
            entries: Vec::new(),
        }
    }

    /// Adds one biweek entry.
    pub fn with_entry(mut self, block: u32, biweek: Biweek, code: impl Into<String>) -> Self {
        self.entries.push((block, biweek, code.into()));
        self
    }

    /// Builds a template by rotating through a base sequence.
    ///
    /// Block `b` of template `n` carries
    /// `base[((n - 1) + (b - 1) * stride) % base.len()]` for both
    /// biweeks, so templates assigned to different people are guaranteed
    /// staggered coverage of the same underlying rotation sequence.
    pub fn staggered(number: u32, base: &[&str], stride: u32) -> Self {
        let mut template = Self::new(number);
        for block in 1..=BLOCKS_PER_CYCLE {
            let pos = ((number - 1) + (block - 1) * stride) as usize % base.len();
            template = template
                .with_entry(block, Biweek::A, base[pos])
                .with_entry(block, Biweek::B, base[pos]);
        }
        template
    }

    /// Raw entries.
    pub fn entries(&self) -> &[(u32, Biweek, String)] {
        &self.entries
    }

    /// Expands the template to a week → rotation-code calendar.
    pub fn to_weekly(&self) -> BTreeMap<u32, String> {
        let mut weekly = BTreeMap::new();
        for (block, biweek, code) in &self.entries {
            for week in biweek_weeks(*block, *biweek) {
                weekly.insert(week, code.clone());
            }
        }
        weekly
    }
}
