// rover_core/src/error.rs

use crate::messages::SensorKind;
use thiserror::Error;

/// Everything that can go wrong while linearizing a sensor around the filter state.
///
/// These are all caller contract violations. The engine is pure math, so there is
/// nothing to retry: the outer filter should drop the offending reading and move on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasurementError {
    #[error("flow batch has {depths} depths but {pixels} pixels")]
    DimensionMismatch { depths: usize, pixels: usize },

    #[error("feature {index} has non-positive depth {depth}")]
    NonPositiveDepth { index: usize, depth: f64 },

    #[error("feature {index} lies behind the camera (z = {z})")]
    PointBehindCamera { index: usize, z: f64 },

    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),

    #[error("camera intrinsic matrix is singular")]
    SingularIntrinsics,

    #[error("model '{model}' expects {expected} data but received {got}")]
    UnexpectedData {
        model: String,
        expected: SensorKind,
        got: SensorKind,
    },

    #[error("model '{model}' produced a non-finite prior")]
    NonFinite { model: String },

    #[error("model '{model}' observed {got} rows but predicted {expected}")]
    ObservationDimension {
        model: String,
        expected: usize,
        got: usize,
    },

    #[error("model '{model}' noise covariance is {got}x{got}, expected {expected}x{expected}")]
    NoiseDimension {
        model: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid sensor configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MeasurementError>;
