//! Scheduling domain models.
//!
//! Core data types for the cohort rotation engine: the block calendar,
//! the two-layer assignment grid, trainees with their preference
//! bundles, rotation/facility derivation, and the template catalog.

mod calendar;
mod grid;
mod person;
mod rotation;
mod template;

pub use calendar::{
    biweek_weeks, block_weeks, week_to_block, Biweek, Block, BlockCalendar, BLOCKS_PER_CYCLE,
    WEEKS_PER_BLOCK, WEEKS_PER_CYCLE,
};
pub use grid::ScheduleGrid;
pub use person::{
    BlockPrefs, CoursePrefs, FocusPrefs, Pathway, SamplerPrefs, TemplatePrefs, Trainee,
};
pub use rotation::{DutyType, Facility, FacilityMap};
pub use template::RotationTemplate;
