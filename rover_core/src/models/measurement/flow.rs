// rover_core/src/models/measurement/flow.rs

//! Optical flow with depth rate.
//!
//! Each tracked feature is a static world point seen by a moving, rotating camera.
//! Given the feature's pixel and depth *now*, the model predicts where it was one
//! frame *earlier* and how much closer it was, under a constant-velocity motion
//! over `Δt`.
//!
//! Per feature, with `R = R_ext`, `v = [v_fwd, 0, 0]` and body rate `ω`:
//!
//! ```text
//! target    = depth · K⁻¹ [u, v, 1]
//! point_vel = −R v + target × (R ω)
//! source    = target − point_vel · Δt
//! z_flow    = K₂ₓ₃ · source / source_z − [u, v]
//! z_depth   = −point_vel_z · Δt
//! ```
//!
//! The Jacobian is the chain `K₂ₓ₂ · ∂proj/∂point_vel · ∂point_vel/∂[v, δθ, ω]`,
//! with the projection partials taken at `source`, so it is the exact derivative
//! of the prediction above at zero attitude error.
//!
//! Preconditions: `Δt` is small relative to the rotation rate (the linearization
//! over `Δt` is not checked). Depths must be positive, which is checked.

use crate::camera::PinholeCamera;
use crate::error::{MeasurementError, Result};
use crate::frames::{extrinsic_rotation, Extrinsic};
use crate::geometry::{exp_rotation, quat_inverse, rotate_vector, skew_matrix};
use crate::messages::{MeasurementData, SensorKind};
use crate::models::measurement::{unexpected_data, MeasurementModel, MeasurementPrior};
use crate::state::layout::{ANGULAR_RATE, ATTITUDE, ERROR_STATE_DIM, FORWARD_VELOCITY};
use crate::state::LinearizationPoint;
use nalgebra::{DMatrix, DVector, Matrix2x3, Matrix3, SMatrix, Vector2, Vector3};
use tracing::{debug, warn};

/// Residual rows per feature: two of pixel flow, one of depth rate.
pub const ROWS_PER_FEATURE: usize = 3;

/// Jacobian of the point velocity w.r.t. `[v_fwd, δθ (3), ω (3)]`.
type PointVelocityJacobian = SMatrix<f64, 3, 7>;

/// Predicted `[Δu, Δv, Δdepth]` and the 3x10 Jacobian for a single feature.
///
/// `index` only labels errors. See the module docs for the model.
pub fn flow_feature_measurement(
    point: &LinearizationPoint,
    dt: f64,
    depth: f64,
    pixel: &Vector2<f64>,
    camera: &PinholeCamera,
    extrinsic: Option<&Extrinsic>,
    index: usize,
) -> Result<(Vector3<f64>, SMatrix<f64, 3, ERROR_STATE_DIM>)> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(MeasurementError::InvalidTimeStep(dt));
    }
    if !(depth.is_finite() && depth > 0.0) {
        return Err(MeasurementError::NonPositiveDepth { index, depth });
    }

    // --- 1. Back-project the pixel to the camera frame ---
    let target = camera.back_project(pixel, depth);
    if target.z <= 0.0 {
        return Err(MeasurementError::PointBehindCamera { index, z: target.z });
    }

    // --- 2. Apparent velocity of the static point in the camera frame ---
    let state = &point.state;
    let rot_extrinsic = extrinsic_rotation(extrinsic);
    // The forward axis as seen from the perturbed body frame.
    let forward = rotate_vector(
        &Vector3::x(),
        &quat_inverse(&exp_rotation(&state.attitude_error())),
    );
    let vel_local = forward * state.forward_velocity();
    let rot_vel = rot_extrinsic * state.angular_rate();
    let point_vel = -(rot_extrinsic * vel_local) + target.cross(&rot_vel);

    let d_point_vel = point_velocity_jacobian(&rot_extrinsic, &forward, &vel_local, &target);

    // --- 3. Integrate backwards to the previous frame ---
    let source = target - point_vel * dt;
    if source.z <= 0.0 {
        return Err(MeasurementError::PointBehindCamera { index, z: source.z });
    }

    // --- 4. Re-project and form the residual prediction ---
    let source_pixel = camera.project(&source);
    let flow = source_pixel - pixel;
    let z_prior = Vector3::new(flow.x, flow.y, -point_vel.z * dt);

    // d(source / source_z) / d(point_vel), with source = target − point_vel·Δt.
    let inv_z = 1.0 / source.z;
    let d_projection = Matrix2x3::new(
        -dt * inv_z,
        0.0,
        dt * source.x * inv_z * inv_z,
        0.0,
        -dt * inv_z,
        dt * source.y * inv_z * inv_z,
    );
    let d_flow = camera.scale_block() * d_projection * d_point_vel; // [2, 7]
    let d_depth = d_point_vel.row(2) * -dt; // [1, 7]

    // --- 5. Scatter into the interleaved error-state columns ---
    let mut h = SMatrix::<f64, 3, ERROR_STATE_DIM>::zeros();
    h.fixed_view_mut::<2, 1>(0, FORWARD_VELOCITY)
        .copy_from(&d_flow.column(0));
    h[(2, FORWARD_VELOCITY)] = d_depth[0];
    for k in 0..3 {
        h.fixed_view_mut::<2, 1>(0, ATTITUDE[k])
            .copy_from(&d_flow.column(1 + k));
        h.fixed_view_mut::<2, 1>(0, ANGULAR_RATE[k])
            .copy_from(&d_flow.column(4 + k));
        h[(2, ATTITUDE[k])] = d_depth[1 + k];
        h[(2, ANGULAR_RATE[k])] = d_depth[4 + k];
    }

    Ok((z_prior, h))
}

/// `∂point_vel / ∂[v_fwd, δθ, ω]`.
///
/// - velocity: `−R · forward`
/// - attitude: `−R · [v_local]×`, a rotated body turns the translation direction
/// - rate: `[target]× · R`, a faster spin sweeps the point further
fn point_velocity_jacobian(
    rot_extrinsic: &Matrix3<f64>,
    forward: &Vector3<f64>,
    vel_local: &Vector3<f64>,
    target: &Vector3<f64>,
) -> PointVelocityJacobian {
    let mut jac = PointVelocityJacobian::zeros();
    jac.fixed_view_mut::<3, 1>(0, 0)
        .copy_from(&(-(rot_extrinsic * forward)));
    jac.fixed_view_mut::<3, 3>(0, 1)
        .copy_from(&(-(rot_extrinsic * skew_matrix(vel_local))));
    jac.fixed_view_mut::<3, 3>(0, 4)
        .copy_from(&(skew_matrix(target) * rot_extrinsic));
    jac
}

/// Batched flow prediction for `N` features.
///
/// Returns `z` of length `3N` and `H` of shape `3N x 10`, feature `i` owning rows
/// `3i..3i+3`. Features are independent; the result equals stacking `N`
/// single-feature calls in order.
pub fn flow_odometry_measurement(
    point: &LinearizationPoint,
    dt: f64,
    depths: &[f64],
    pixels: &[Vector2<f64>],
    camera: &PinholeCamera,
    extrinsic: Option<&Extrinsic>,
) -> Result<MeasurementPrior> {
    if depths.len() != pixels.len() {
        return Err(MeasurementError::DimensionMismatch {
            depths: depths.len(),
            pixels: pixels.len(),
        });
    }

    let mut prior = MeasurementPrior::zeros(ROWS_PER_FEATURE * depths.len());
    for (i, (depth, pixel)) in depths.iter().zip(pixels).enumerate() {
        let (z, h) = flow_feature_measurement(point, dt, *depth, pixel, camera, extrinsic, i)?;
        let row = ROWS_PER_FEATURE * i;
        prior.z.fixed_rows_mut::<ROWS_PER_FEATURE>(row).copy_from(&z);
        prior
            .h
            .fixed_view_mut::<ROWS_PER_FEATURE, ERROR_STATE_DIM>(row, 0)
            .copy_from(&h);
    }
    debug!(features = depths.len(), dt, "flow prior");
    Ok(prior)
}

/// A monocular depth camera producing tracked features.
#[derive(Debug, Clone)]
pub struct FlowOdometryModel {
    pub name: String,
    pub camera: PinholeCamera,
    pub extrinsic: Option<Extrinsic>,
    /// Noise standard deviation of each flow component, in pixels.
    pub pixel_stddev: f64,
    /// Noise standard deviation of the depth change, in meters.
    pub depth_stddev: f64,
}

impl FlowOdometryModel {
    pub fn new(
        name: impl Into<String>,
        camera: PinholeCamera,
        extrinsic: Option<Extrinsic>,
        pixel_stddev: f64,
        depth_stddev: f64,
    ) -> Self {
        Self {
            name: name.into(),
            camera,
            extrinsic,
            pixel_stddev,
            depth_stddev,
        }
    }
}

impl MeasurementModel for FlowOdometryModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SensorKind {
        SensorKind::Flow
    }

    fn observe(&self, data: &MeasurementData) -> Result<DVector<f64>> {
        match data {
            MeasurementData::Flow(frame) => Ok(frame.observation()),
            _ => Err(unexpected_data(self, data)),
        }
    }

    fn predict(
        &self,
        point: &LinearizationPoint,
        data: &MeasurementData,
    ) -> Result<MeasurementPrior> {
        let MeasurementData::Flow(frame) = data else {
            return Err(unexpected_data(self, data));
        };
        flow_odometry_measurement(
            point,
            frame.dt,
            &frame.depths(),
            &frame.pixels(),
            &self.camera,
            self.extrinsic.as_ref(),
        )
        .inspect_err(|e| warn!(model = %self.name, error = %e, "flow batch rejected"))
    }

    /// Block diagonal, one `diag(σ_px², σ_px², σ_depth²)` block per feature.
    fn noise_covariance(&self, dim: usize) -> DMatrix<f64> {
        let block = [
            self.pixel_stddev.powi(2),
            self.pixel_stddev.powi(2),
            self.depth_stddev.powi(2),
        ];
        DMatrix::from_diagonal(&DVector::from_iterator(
            dim,
            (0..dim).map(|i| block[i % ROWS_PER_FEATURE]),
        ))
    }
}
