//! Cohort rotation scheduling engine.
//!
//! Assigns every member of a multi-year training cohort to a sequence
//! of 4-week rotation blocks: template matching by ranked preference,
//! greedy requirement filling under facility exclusivity, a recurring
//! night-duty roster solved as a boolean CP, and post-hoc validation of
//! staffing, credit, and exclusivity.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Trainee`, `ScheduleGrid`,
//!   `BlockCalendar`, `RotationTemplate`, `FacilityMap`
//! - **`policy`**: Injected policy catalogs — staffing minima, credit
//!   requirements, duty rules, fill policy
//! - **`solver`**: Boolean CP model, the exact branch-and-bound
//!   backend, and the matcher/duty formulations
//! - **`phases`**: The sequential assignment phases
//! - **`pipeline`**: Phase orchestration
//! - **`validation`**: Staffing, credit, and exclusivity checks
//!
//! # Phase order
//!
//! Calendar → templates (year 1, year 2) → year-3/year-4 builders →
//! recurring duty → sampler substitution → validation. Each phase's
//! output is frozen before the next begins; there is no cross-phase
//! backtracking.

pub mod error;
pub mod models;
pub mod phases;
pub mod pipeline;
pub mod policy;
pub mod solver;
pub mod validation;

pub use error::{EngineError, Result};
pub use models::{ScheduleGrid, Trainee};
pub use pipeline::{PipelineOutcome, SchedulePipeline, SchedulePolicies};
pub use validation::{ValidationReport, Validator};
