use thiserror::Error;

/// Errors raised by the numerical primitives.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    /// Invalid construction parameter (empty input, out-of-range index, ...)
    #[error("invalid value: {0}")]
    Value(String),

    /// Operand dimensions do not agree
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Decomposition did not converge or produced non-finite output
    #[error("numerical failure: {0}")]
    Numerical(String),
}
