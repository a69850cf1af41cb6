// rover_core/src/models/measurement/odometry.rs

use crate::error::Result;
use crate::messages::{MeasurementData, SensorKind};
use crate::models::measurement::{
    diagonal_covariance, unexpected_data, MeasurementModel, MeasurementPrior,
};
use crate::state::layout::{FORWARD_VELOCITY, YAW_RATE};
use crate::state::{ErrorState, LinearizationPoint};
use nalgebra::{DMatrix, DVector};

/// Wheel odometry observes forward velocity and yaw rate, which are themselves
/// states. The model is linear, so `H` is an exact selector:
/// `z = [x[3], x[9]]`, `H[0, 3] = H[1, 9] = 1`.
pub fn odometry_measurement(state: &ErrorState) -> MeasurementPrior {
    let mut prior = MeasurementPrior::zeros(2);
    prior.z[0] = state.forward_velocity();
    prior.z[1] = state.yaw_rate();
    prior.h[(0, FORWARD_VELOCITY)] = 1.0;
    prior.h[(1, YAW_RATE)] = 1.0;
    prior
}

/// Wheel encoder odometry reporting `[forward velocity, yaw rate]`.
#[derive(Debug, Clone)]
pub struct WheelOdometryModel {
    pub name: String,
    /// The 2x2 measurement noise covariance matrix, R.
    pub r_matrix: DMatrix<f64>,
}

impl WheelOdometryModel {
    pub fn new(name: impl Into<String>, velocity_stddev: f64, yaw_rate_stddev: f64) -> Self {
        Self {
            name: name.into(),
            r_matrix: diagonal_covariance(&[velocity_stddev, yaw_rate_stddev]),
        }
    }
}

impl MeasurementModel for WheelOdometryModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SensorKind {
        SensorKind::WheelOdometry
    }

    fn observe(&self, data: &MeasurementData) -> Result<DVector<f64>> {
        match data {
            MeasurementData::WheelOdometry { velocity, yaw_rate } => {
                Ok(DVector::from_column_slice(&[*velocity, *yaw_rate]))
            }
            _ => Err(unexpected_data(self, data)),
        }
    }

    fn predict(
        &self,
        point: &LinearizationPoint,
        data: &MeasurementData,
    ) -> Result<MeasurementPrior> {
        if data.kind() != SensorKind::WheelOdometry {
            return Err(unexpected_data(self, data));
        }
        Ok(odometry_measurement(&point.state))
    }

    fn noise_covariance(&self, _dim: usize) -> DMatrix<f64> {
        self.r_matrix.clone()
    }
}
