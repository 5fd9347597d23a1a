use thiserror::Error;

use crate::schedule::Pass;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// The candidate pass overlaps one or more active passes. Carries the
    /// full conflicting set so the caller can resolve manually.
    #[error("pass conflicts with {} active pass(es)", conflicts.len())]
    Conflict { conflicts: Vec<Pass> },

    /// An iterative search exceeded its iteration budget. This is a defect,
    /// never a value to round off.
    #[error("{what} did not converge after {iterations} iterations")]
    NoConvergence { what: &'static str, iterations: u32 },

    #[error("propagation error: {0}")]
    Propagation(String),
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }
}
