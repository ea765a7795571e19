//! Error types for the lab boundary. The numerical core itself never fails.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LabError {
    #[error("{name} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("no pendulum with index {0}")]
    InvalidPendulumIndex(usize),

    #[error("number of active pendula must be 1 or 2, got {0}")]
    InvalidActivePendula(usize),

    #[error("unknown body id '{0}'")]
    UnknownBody(String),
}

pub type Result<T> = std::result::Result<T, LabError>;
