// rover_core/src/models/measurement/mod.rs

//! The measurement-model engine.
//!
//! Every sensor comes in two layers:
//! - a pure function (`*_measurement`) that maps a linearization point to a
//!   predicted measurement `z_prior` and its Jacobian `H` (`dim x 10`);
//! - a model object implementing [`MeasurementModel`], which owns the sensor's
//!   fixed parameters (noise, extrinsic, camera) and dispatches raw
//!   [`MeasurementData`] to the pure function.
//!
//! All of it is stateless. Any number of filters may call into it from any number
//! of threads.

use crate::error::{MeasurementError, Result};
use crate::messages::{MeasurementData, SensorKind};
use crate::state::layout::ERROR_STATE_DIM;
use crate::state::LinearizationPoint;
use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

pub mod flow;
pub mod gyro;
pub mod odometry;
pub mod reference;

pub use flow::{flow_feature_measurement, flow_odometry_measurement, FlowOdometryModel};
pub use gyro::{angular_rate_measurement, yaw_rate_measurement, GyroscopeModel, YawRateModel};
pub use odometry::{odometry_measurement, WheelOdometryModel};
pub use reference::{static_vector_measurement, ReferenceVectorModel};

/// Predicted measurement and its Jacobian w.r.t. the error state.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementPrior {
    /// `z_prior = h(x)`.
    pub z: DVector<f64>,
    /// `H = ∂h/∂δx`, shape `[z.len(), 10]`.
    pub h: DMatrix<f64>,
}

impl MeasurementPrior {
    /// A zero prior with `rows` measurement rows.
    pub fn zeros(rows: usize) -> Self {
        Self {
            z: DVector::zeros(rows),
            h: DMatrix::zeros(rows, ERROR_STATE_DIM),
        }
    }

    pub fn dim(&self) -> usize {
        self.z.len()
    }

    pub fn is_finite(&self) -> bool {
        self.z.iter().chain(self.h.iter()).all(|x| x.is_finite())
    }

    /// Rejects priors carrying `NaN`/`Inf`, which a filter must never fuse.
    pub fn ensure_finite(self, model: &str) -> Result<Self> {
        if self.is_finite() {
            Ok(self)
        } else {
            Err(MeasurementError::NonFinite {
                model: model.to_string(),
            })
        }
    }
}

// --- MEASUREMENT MODEL TRAIT ---
// Represents the mathematical model of a sensor. `z = h(x) + v`
pub trait MeasurementModel: DynClone + Debug + Send + Sync {
    /// Human-readable sensor name, unique within a filter.
    fn name(&self) -> &str;

    /// The kind of data this model consumes.
    fn kind(&self) -> SensorKind;

    /// Converts a raw reading into the measurement vector `z` that is compared
    /// against the prior.
    fn observe(&self, data: &MeasurementData) -> Result<DVector<f64>>;

    /// Predicts `z_prior = h(x)` and `H = ∂h/∂δx` for this reading.
    ///
    /// The reading is needed because some sensors (optical flow) are linearized
    /// around per-reading quantities such as feature pixels and depths.
    fn predict(
        &self,
        point: &LinearizationPoint,
        data: &MeasurementData,
    ) -> Result<MeasurementPrior>;

    /// Measurement noise covariance `R` for a reading of `dim` rows.
    fn noise_covariance(&self, dim: usize) -> DMatrix<f64>;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn MeasurementModel>`.
dyn_clone::clone_trait_object!(MeasurementModel);

/// Error for a model handed a reading of the wrong sensor kind.
pub(crate) fn unexpected_data(
    model: &dyn MeasurementModel,
    data: &MeasurementData,
) -> MeasurementError {
    MeasurementError::UnexpectedData {
        model: model.name().to_string(),
        expected: model.kind(),
        got: data.kind(),
    }
}

/// Diagonal covariance from per-axis standard deviations.
pub(crate) fn diagonal_covariance(stddevs: &[f64]) -> DMatrix<f64> {
    DMatrix::from_diagonal(&DVector::from_iterator(
        stddevs.len(),
        stddevs.iter().map(|s| s * s),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_prior_is_rejected() {
        let mut prior = MeasurementPrior::zeros(2);
        assert!(prior.clone().ensure_finite("odom").is_ok());

        prior.h[(1, 4)] = f64::INFINITY;
        assert_eq!(
            prior.ensure_finite("odom"),
            Err(MeasurementError::NonFinite {
                model: "odom".into()
            })
        );
    }

    #[test]
    fn diagonal_covariance_squares_stddevs() {
        let r = diagonal_covariance(&[0.5, 2.0]);
        assert_eq!(r, DMatrix::from_row_slice(2, 2, &[0.25, 0.0, 0.0, 4.0]));
    }
}
