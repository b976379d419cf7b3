//! Error types for motioncore.

use thiserror::Error;

/// Motioncore error type.
///
/// Argument errors are raised at construction or call entry and are not
/// recoverable by retrying; [`Error::Unsatisfiable`] aborts profile
/// generation and means the constraint set must be relaxed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("distance must be positive, got {0}")]
    NonPositiveDistance(f64),

    #[error("segment size {segment_size} must lie in (0, {distance}]")]
    SegmentSize { segment_size: f64, distance: f64 },

    #[error("target velocity must be non-negative, got {0}")]
    NegativeTargetVelocity(f64),

    #[error("search tolerance must be positive, got {0}")]
    NonPositiveTolerance(f64),

    #[error("velocity bound at s = {s} is negative ({value})")]
    NegativeVelocityBound { s: f64, value: f64 },

    #[error("no admissible acceleration at zero velocity (segment {index}, s = {s})")]
    Unsatisfiable { index: usize, s: f64 },

    #[error("path length {path_length} and profile distance {profile_distance} disagree")]
    LengthMismatch {
        path_length: f64,
        profile_distance: f64,
    },

    #[error("expected {expected} motor bounds, got {got}")]
    MotorCount { expected: usize, got: usize },

    #[error("constraint bound must be positive, got {0}")]
    NonPositiveBound(f64),

    #[error("a drive model needs at least one wheel")]
    NoWheels,

    #[error("{name} must be positive, got {value}")]
    NonPositiveParameter { name: &'static str, value: f64 },

    #[error("a path needs at least one segment")]
    EmptyPath,

    #[error("drive matrix pseudo-inverse failed: {0}")]
    SingularDriveModel(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
