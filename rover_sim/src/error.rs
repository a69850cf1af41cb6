// rover_sim/src/error.rs

use rover_core::error::MeasurementError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to load scenario: {0}")]
    Config(#[from] figment::Error),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error(transparent)]
    Measurement(#[from] MeasurementError),

    #[error("failed to serialize report: {0}")]
    Report(#[from] toml::ser::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
