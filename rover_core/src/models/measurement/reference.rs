// rover_core/src/models/measurement/reference.rs

use crate::error::Result;
use crate::frames::{extrinsic_rotation, Extrinsic};
use crate::geometry::{compose_attitude_error, quat_inverse, rotate_vector, skew_matrix};
use crate::messages::{MeasurementData, SensorKind};
use crate::models::measurement::{
    diagonal_covariance, unexpected_data, MeasurementModel, MeasurementPrior,
};
use crate::state::layout::ATTITUDE;
use crate::state::LinearizationPoint;
use nalgebra::{DMatrix, DVector, Vector3};
use tracing::trace;

/// Predicts how a known world vector (gravity, magnetic north) appears in the
/// sensor frame: `z = R_ext · R(q)ᵀ · vec`.
///
/// Under the right perturbation `q = q_center ⊗ Exp(δθ)`, rotating into the body
/// frame gives `z_body ≈ z_body + [z_body]× δθ`, so the attitude block of `H` is
/// `R_ext · [z_body]×`. Nothing else is observed.
pub fn static_vector_measurement(
    point: &LinearizationPoint,
    reference: &Vector3<f64>,
    extrinsic: Option<&Extrinsic>,
) -> MeasurementPrior {
    let q = compose_attitude_error(&point.q_center, &point.state.attitude_error());
    // Rotate the vector backwards, world to body.
    let z_body = rotate_vector(reference, &quat_inverse(&q));

    let rot_extrinsic = extrinsic_rotation(extrinsic);
    let z_sensor = rot_extrinsic * z_body;
    let d_attitude = rot_extrinsic * skew_matrix(&z_body);

    let mut prior = MeasurementPrior::zeros(3);
    prior.z.copy_from(&z_sensor);
    for (k, &col) in ATTITUDE.iter().enumerate() {
        prior.h.fixed_view_mut::<3, 1>(0, col).copy_from(&d_attitude.column(k));
    }
    trace!(z = ?z_sensor.as_slice(), "reference vector prior");
    prior
}

/// A sensor observing a fixed world vector: an accelerometer at rest (gravity)
/// or a magnetometer (magnetic field).
#[derive(Debug, Clone)]
pub struct ReferenceVectorModel {
    pub name: String,
    /// The "true" vector in the world frame.
    pub reference: Vector3<f64>,
    pub extrinsic: Option<Extrinsic>,
    /// The 3x3 measurement noise covariance matrix, R.
    pub r_matrix: DMatrix<f64>,
}

impl ReferenceVectorModel {
    pub fn new(
        name: impl Into<String>,
        reference: Vector3<f64>,
        noise_stddev: [f64; 3],
        extrinsic: Option<Extrinsic>,
    ) -> Self {
        Self {
            name: name.into(),
            reference,
            extrinsic,
            r_matrix: diagonal_covariance(&noise_stddev),
        }
    }
}

impl MeasurementModel for ReferenceVectorModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SensorKind {
        SensorKind::ReferenceVector
    }

    fn observe(&self, data: &MeasurementData) -> Result<DVector<f64>> {
        match data {
            MeasurementData::ReferenceVector(v) => Ok(DVector::from_column_slice(v.as_slice())),
            _ => Err(unexpected_data(self, data)),
        }
    }

    fn predict(
        &self,
        point: &LinearizationPoint,
        data: &MeasurementData,
    ) -> Result<MeasurementPrior> {
        if data.kind() != SensorKind::ReferenceVector {
            return Err(unexpected_data(self, data));
        }
        Ok(static_vector_measurement(
            point,
            &self.reference,
            self.extrinsic.as_ref(),
        ))
    }

    fn noise_covariance(&self, _dim: usize) -> DMatrix<f64> {
        self.r_matrix.clone()
    }
}
