//! Typed errors raised by the core.
//!
//! Extraction never errors; it degrades to empty results. The two kinds of
//! failure callers can see are a broken dimension specification (fatal at
//! startup) and a coverage assertion falling short (the expected "red"
//! outcome of a measurement).

use thiserror::Error;

use crate::coverage::CoverageResult;

/// Tolerance allowed when checking that dimension weights sum to 1.0.
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// The dimension specification is not fit to score against.
#[derive(Debug, Error, PartialEq)]
pub enum SpecError {
    #[error("dimension specification has no dimensions")]
    Empty,

    #[error("dimension at position {0} has an empty name")]
    EmptyName(usize),

    #[error("dimension {0:?} is declared more than once")]
    DuplicateDimension(String),

    #[error("dimension {name:?} has invalid weight {weight} (must be finite and non-negative)")]
    InvalidWeight { name: String, weight: f64 },

    #[error("dimension {name:?} has invalid minimum coverage {minimum} (must be within 0.0..=1.0)")]
    InvalidMinimum { name: String, minimum: f64 },

    #[error("global minimum coverage {0} must be within 0.0..=1.0")]
    InvalidGlobalMinimum(f64),

    #[error("dimension weights sum to {sum:.4}, expected 1.0 (tolerance {tolerance})")]
    WeightSum { sum: f64, tolerance: f64 },

    #[error("weight override names unknown dimension {0:?}")]
    UnknownDimension(String),

    #[error("parsing dimension specification: {0}")]
    Parse(String),

    #[error("reading dimension specification: {0}")]
    Io(String),
}

/// A measurement fell below the required minimum.
#[derive(Debug, Error)]
pub enum CoverageFailure {
    #[error(
        "coverage {measured:.2} ({:.1}%) below minimum {minimum:.2} ({:.1}%)",
        .measured * 100.0,
        .minimum * 100.0
    )]
    BelowMinimum {
        measured: f64,
        minimum: f64,
        result: Box<CoverageResult>,
    },
}

impl CoverageFailure {
    /// The full result of the failing measurement.
    pub fn result(&self) -> &CoverageResult {
        match self {
            CoverageFailure::BelowMinimum { result, .. } => result,
        }
    }
}
