//! Error types for numerical primitives.

use thiserror::Error;

pub type NumericResult<T> = Result<T, NumericError>;

/// Errors raised when a primitive is configured with unusable coefficients.
///
/// Misuse such as updating before `initialize` is a programmer error and
/// panics instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericError {
    #[error("Coefficient is zero: {what}")]
    ZeroCoefficient { what: &'static str },

    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
