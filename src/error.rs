//! Pipeline input errors.
//!
//! Only genuine misuse of the engine surfaces as an error: infeasible
//! solves and unplaceable requirements are ordinary outcomes carried in
//! result structs, never errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A template-driven cohort is present but the catalog is empty.
    #[error("template catalog is empty but cohort year {0} requires templates")]
    EmptyTemplateCatalog(u8),

    /// Two roster entries share an id; the grid keys on it.
    #[error("duplicate trainee id '{0}' in roster")]
    DuplicateTrainee(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
