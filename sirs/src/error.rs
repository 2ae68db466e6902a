use sirs_math::MathError;
use thiserror::Error;

/// Errors raised at the public boundary of the correction and fitting APIs.
#[derive(Error, Debug)]
pub enum SirsError {
    /// Missing, malformed, or mutually inconsistent calibration fields
    #[error("calibration format error: {0}")]
    Format(String),

    /// Cube or model dimensions do not agree
    #[error("shape error: {0}")]
    Shape(String),

    /// Invalid construction parameters
    #[error("invalid value: {0}")]
    Value(String),

    /// Pseudo-inverse or transform failure
    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MathError> for SirsError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::Value(msg) => SirsError::Value(msg),
            MathError::Shape(msg) => SirsError::Shape(msg),
            MathError::Numerical(msg) => SirsError::Numerical(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, SirsError>;
