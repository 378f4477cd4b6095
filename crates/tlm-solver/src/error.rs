//! Error types for equation solving.

use thiserror::Error;

/// Errors that can occur while solving an equation system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Singular Jacobian at iteration {iteration}")]
    Singular { iteration: usize },

    #[error("Non-finite {what} at iteration {iteration}")]
    NonFinite { what: &'static str, iteration: usize },

    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    Dimension {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid solver setting: {what}")]
    InvalidSetting { what: &'static str },
}

pub type SolverResult<T> = Result<T, SolverError>;

