//! Calculation errors
//!
//! Hard failures only. Clamps and out-of-range values are reported as
//! advisories alongside a successful result, never through this type.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CalcError {
    #[error("{field} must be a number > 0, got {value}")]
    InvalidArgument { field: &'static str, value: f64 },

    #[error("{0}")]
    MissingInput(Missing),
}

/// Which required input (or either/or pair) was not supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Missing {
    Diameter,
    SpeedPair,
    FeedPair,
    Flutes,
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Missing::Diameter => write!(f, "Tool diameter is required."),
            Missing::SpeedPair => write!(f, "Enter either cutting speed or RPM."),
            Missing::FeedPair => write!(f, "Enter either feed per rev (or chip load) or feed per minute."),
            Missing::Flutes => write!(f, "Flutes must be a whole number > 0."),
        }
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;

/// Reject zero, negative and non-finite inputs.
pub(crate) fn positive(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CalcError::InvalidArgument { field, value })
    }
}
