//! Cycle calendar: 4-week blocks, biweeks, and week arithmetic.
//!
//! An annual cycle is partitioned into 13 consecutive 4-week blocks.
//! Week numbering is 1-based and shared by every layer of the engine:
//! week 1 is the first week of block 1, and the recurring-duty roster
//! uses the same numbering as the rotation calendar.
//!
//! # Block boundaries
//! Blocks start on Sundays. The first block is anchored to the Sunday
//! nearest the cycle boundary (boundary on Mon-Wed snaps back to the
//! previous Sunday, Thu-Sat snaps forward, a Sunday boundary is kept
//! as-is). Blocks 1-12 are exactly 28 days; block 13 absorbs whatever
//! is left up to the fixed cycle end date.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Number of blocks in one annual cycle.
pub const BLOCKS_PER_CYCLE: u32 = 13;

/// Weeks per block.
pub const WEEKS_PER_BLOCK: u32 = 4;

/// Nominal weeks per cycle (block 13 may cover a few extra days).
pub const WEEKS_PER_CYCLE: u32 = BLOCKS_PER_CYCLE * WEEKS_PER_BLOCK;

/// One of the two 2-week halves of a block.
///
/// Facility exclusivity is enforced per biweek: two facilities in the
/// same block but different biweeks are legitimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biweek {
    /// Weeks 1-2 of the block.
    A,
    /// Weeks 3-4 of the block.
    B,
}

impl Biweek {
    /// Both halves, in order.
    pub const BOTH: [Biweek; 2] = [Biweek::A, Biweek::B];

    /// The half of its block a week falls into.
    pub fn of_week(week: u32) -> Biweek {
        if (week - 1) % WEEKS_PER_BLOCK < 2 {
            Biweek::A
        } else {
            Biweek::B
        }
    }

    /// Display label ("A" or "B").
    pub fn label(&self) -> &'static str {
        match self {
            Biweek::A => "A",
            Biweek::B => "B",
        }
    }
}

/// Block containing a 1-based week number.
#[inline]
pub fn week_to_block(week: u32) -> u32 {
    (week - 1) / WEEKS_PER_BLOCK + 1
}

/// The 4 consecutive week numbers of a block.
#[inline]
pub fn block_weeks(block: u32) -> std::ops::RangeInclusive<u32> {
    let start = (block - 1) * WEEKS_PER_BLOCK + 1;
    start..=start + WEEKS_PER_BLOCK - 1
}

/// The 2 week numbers of one biweek of a block.
#[inline]
pub fn biweek_weeks(block: u32, biweek: Biweek) -> [u32; 2] {
    let start = (block - 1) * WEEKS_PER_BLOCK + 1;
    match biweek {
        Biweek::A => [start, start + 1],
        Biweek::B => [start + 2, start + 3],
    }
}

/// A dated 4-week scheduling block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block number, 1-13.
    pub number: u32,
    /// First day (a Sunday).
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
}

impl Block {
    /// Number of calendar days covered, inclusive.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// The dated block layout of one annual cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockCalendar {
    blocks: Vec<Block>,
}

impl BlockCalendar {
    /// Computes the 13 blocks of the cycle starting July 1 of `start_year`.
    ///
    /// Block 1 is anchored to the Sunday nearest July 1 (see module docs);
    /// block 13 runs through June 30 of the following year.
    pub fn for_cycle_year(start_year: i32) -> Self {
        let boundary = NaiveDate::from_ymd_opt(start_year, 7, 1)
            .expect("July 1 is always a valid date");
        let cycle_end = NaiveDate::from_ymd_opt(start_year + 1, 6, 30)
            .expect("June 30 is always a valid date");
        Self::from_boundary(boundary, cycle_end)
    }

    /// Computes blocks from an explicit cycle boundary and end date.
    pub fn from_boundary(boundary: NaiveDate, cycle_end: NaiveDate) -> Self {
        // 0 = Monday .. 6 = Sunday
        let dow = boundary.weekday().num_days_from_monday();
        let start = match dow {
            0..=2 => boundary - Days::new((dow + 1) as u64),
            6 => boundary,
            _ => boundary + Days::new((6 - dow) as u64),
        };

        let mut blocks = Vec::with_capacity(BLOCKS_PER_CYCLE as usize);
        let mut current = start;
        for number in 1..=BLOCKS_PER_CYCLE {
            let end = if number < BLOCKS_PER_CYCLE {
                current + Days::new(27)
            } else {
                cycle_end
            };
            blocks.push(Block {
                number,
                start: current,
                end,
            });
            current = end + Days::new(1);
        }
        BlockCalendar { blocks }
    }

    /// All blocks in order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// First day of the cycle.
    pub fn start(&self) -> NaiveDate {
        self.blocks[0].start
    }

    /// Last day of the cycle, inclusive.
    pub fn end(&self) -> NaiveDate {
        self.blocks[BLOCKS_PER_CYCLE as usize - 1].end
    }

    /// The 1-based week number containing a date, if inside the cycle.
    ///
    /// Weeks run Sunday-Saturday starting from the cycle start. Days in
    /// block 13 beyond week 52 are clamped to week 52 so that the duty
    /// roster and the rotation calendar agree on 1..=52 numbering.
    pub fn week_of_date(&self, date: NaiveDate) -> Option<u32> {
        if date < self.start() || date > self.end() {
            return None;
        }
        let offset = (date - self.start()).num_days() as u32;
        Some((offset / 7 + 1).min(WEEKS_PER_CYCLE))
    }
}
