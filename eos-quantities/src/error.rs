use thiserror::Error;

use crate::measurement::Dimension;

/// Arithmetic or conversion between incompatible dimensions.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("dimension mismatch: expected {expected}, got {actual}")]
pub struct DimensionMismatch {
    pub expected: Dimension,
    pub actual: Dimension,
}

#[derive(Debug, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    DimensionMismatch(#[from] DimensionMismatch),

    #[error("invalid measurement `{0}`, expected `<number> <unit>`")]
    InvalidMeasurement(String),

    #[error("unknown unit `{0}`")]
    UnknownUnit(String),

    #[error("{value} is out of range {range}")]
    OutOfRange { value: f64, range: &'static str },
}
