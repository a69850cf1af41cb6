// rover_core/src/models/measurement/gyro.rs

use crate::error::Result;
use crate::frames::{extrinsic_rotation, Extrinsic};
use crate::messages::{MeasurementData, SensorKind};
use crate::models::measurement::{
    diagonal_covariance, unexpected_data, MeasurementModel, MeasurementPrior,
};
use crate::state::layout::ANGULAR_RATE;
use crate::state::{ErrorState, LinearizationPoint};
use nalgebra::{DMatrix, DVector};

/// Three-axis angular rate in the sensor frame: `z = R_ext · ω`, `H[:, rate] = R_ext`.
///
/// Linear in the state, so the Jacobian is exact.
pub fn angular_rate_measurement(
    state: &ErrorState,
    extrinsic: Option<&Extrinsic>,
) -> MeasurementPrior {
    let rot_extrinsic = extrinsic_rotation(extrinsic);

    let mut prior = MeasurementPrior::zeros(3);
    prior.z.copy_from(&(rot_extrinsic * state.angular_rate()));
    for (k, &col) in ANGULAR_RATE.iter().enumerate() {
        prior
            .h
            .fixed_view_mut::<3, 1>(0, col)
            .copy_from(&rot_extrinsic.column(k));
    }
    prior
}

/// Single-axis rate about the sensor z axis, the last row of
/// [`angular_rate_measurement`]. With no extrinsic this is `z = x[9]`,
/// `H[0, 9] = 1`.
pub fn yaw_rate_measurement(state: &ErrorState, extrinsic: Option<&Extrinsic>) -> MeasurementPrior {
    let full = angular_rate_measurement(state, extrinsic);
    MeasurementPrior {
        z: full.z.rows(2, 1).into_owned(),
        h: full.h.rows(2, 1).into_owned(),
    }
}

/// A three-axis rate gyroscope.
#[derive(Debug, Clone)]
pub struct GyroscopeModel {
    pub name: String,
    pub extrinsic: Option<Extrinsic>,
    /// The 3x3 measurement noise covariance matrix, R.
    pub r_matrix: DMatrix<f64>,
}

impl GyroscopeModel {
    pub fn new(
        name: impl Into<String>,
        noise_stddev: [f64; 3],
        extrinsic: Option<Extrinsic>,
    ) -> Self {
        Self {
            name: name.into(),
            extrinsic,
            r_matrix: diagonal_covariance(&noise_stddev),
        }
    }
}

impl MeasurementModel for GyroscopeModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SensorKind {
        SensorKind::Gyroscope
    }

    fn observe(&self, data: &MeasurementData) -> Result<DVector<f64>> {
        match data {
            MeasurementData::AngularRate(w) => Ok(DVector::from_column_slice(w.as_slice())),
            _ => Err(unexpected_data(self, data)),
        }
    }

    fn predict(
        &self,
        point: &LinearizationPoint,
        data: &MeasurementData,
    ) -> Result<MeasurementPrior> {
        if data.kind() != SensorKind::Gyroscope {
            return Err(unexpected_data(self, data));
        }
        Ok(angular_rate_measurement(&point.state, self.extrinsic.as_ref()))
    }

    fn noise_covariance(&self, _dim: usize) -> DMatrix<f64> {
        self.r_matrix.clone()
    }
}

/// A single-axis yaw-rate gyro, as found on planar robots.
#[derive(Debug, Clone)]
pub struct YawRateModel {
    pub name: String,
    pub extrinsic: Option<Extrinsic>,
    /// The 1x1 measurement noise covariance matrix, R.
    pub r_matrix: DMatrix<f64>,
}

impl YawRateModel {
    pub fn new(name: impl Into<String>, noise_stddev: f64, extrinsic: Option<Extrinsic>) -> Self {
        Self {
            name: name.into(),
            extrinsic,
            r_matrix: diagonal_covariance(&[noise_stddev]),
        }
    }
}

impl MeasurementModel for YawRateModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SensorKind {
        SensorKind::YawRate
    }

    fn observe(&self, data: &MeasurementData) -> Result<DVector<f64>> {
        match data {
            MeasurementData::YawRate(w) => Ok(DVector::from_element(1, *w)),
            _ => Err(unexpected_data(self, data)),
        }
    }

    fn predict(
        &self,
        point: &LinearizationPoint,
        data: &MeasurementData,
    ) -> Result<MeasurementPrior> {
        if data.kind() != SensorKind::YawRate {
            return Err(unexpected_data(self, data));
        }
        Ok(yaw_rate_measurement(&point.state, self.extrinsic.as_ref()))
    }

    fn noise_covariance(&self, _dim: usize) -> DMatrix<f64> {
        self.r_matrix.clone()
    }
}
