//! The sequential scheduling phases.
//!
//! Each phase reads the state the previous phases left behind and
//! writes its own weeks; `crate::pipeline` runs them in dependency
//! order.

mod duty;
mod filler;
mod sampler;
mod templates;

pub use duty::run_duty_phase;
pub use filler::{build_year3, build_year4, FillOutcome, GreedyFiller};
pub use sampler::substitute_sampler;
pub use templates::{apply_template, run_year1_templates, run_year2_templates};
