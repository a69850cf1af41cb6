// rover_core/src/state.rs

use nalgebra::{SVector, UnitQuaternion, Vector3};

pub mod layout;

use layout::{ANGULAR_RATE, ATTITUDE, ERROR_STATE_DIM, FORWARD_VELOCITY, POSITION, YAW_RATE};

/// The filter's 10-dimensional error state.
///
/// See [`layout`] for the meaning of each index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorState(pub SVector<f64, ERROR_STATE_DIM>);

impl ErrorState {
    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    pub fn from_vector(vector: SVector<f64, ERROR_STATE_DIM>) -> Self {
        Self(vector)
    }

    pub fn as_vector(&self) -> &SVector<f64, ERROR_STATE_DIM> {
        &self.0
    }

    pub fn position(&self) -> Vector3<f64> {
        self.gather(POSITION)
    }

    pub fn set_position(&mut self, position: &Vector3<f64>) {
        self.scatter(POSITION, position);
    }

    pub fn forward_velocity(&self) -> f64 {
        self.0[FORWARD_VELOCITY]
    }

    pub fn set_forward_velocity(&mut self, velocity: f64) {
        self.0[FORWARD_VELOCITY] = velocity;
    }

    /// Attitude error δθ about the nominal orientation, body frame.
    pub fn attitude_error(&self) -> Vector3<f64> {
        self.gather(ATTITUDE)
    }

    pub fn set_attitude_error(&mut self, delta_theta: &Vector3<f64>) {
        self.scatter(ATTITUDE, delta_theta);
    }

    /// Body-frame angular rate ω.
    pub fn angular_rate(&self) -> Vector3<f64> {
        self.gather(ANGULAR_RATE)
    }

    pub fn set_angular_rate(&mut self, rate: &Vector3<f64>) {
        self.scatter(ANGULAR_RATE, rate);
    }

    pub fn yaw_rate(&self) -> f64 {
        self.0[YAW_RATE]
    }

    pub fn set_yaw_rate(&mut self, yaw_rate: f64) {
        self.0[YAW_RATE] = yaw_rate;
    }

    fn gather(&self, idx: [usize; 3]) -> Vector3<f64> {
        Vector3::new(self.0[idx[0]], self.0[idx[1]], self.0[idx[2]])
    }

    fn scatter(&mut self, idx: [usize; 3], v: &Vector3<f64>) {
        for (k, &i) in idx.iter().enumerate() {
            self.0[i] = v[k];
        }
    }
}

impl Default for ErrorState {
    fn default() -> Self {
        Self::zeros()
    }
}

impl From<SVector<f64, ERROR_STATE_DIM>> for ErrorState {
    fn from(vector: SVector<f64, ERROR_STATE_DIM>) -> Self {
        Self(vector)
    }
}

/// Everything a measurement model linearizes around: the error state and the
/// nominal orientation it perturbs.
///
/// The effective orientation is `q_center ⊗ Exp(δθ)`. Right after a filter reset
/// δθ is zero, which is where every analytic Jacobian in this crate is exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearizationPoint {
    pub state: ErrorState,
    /// Nominal orientation, body to world. Must be unit norm.
    pub q_center: UnitQuaternion<f64>,
}

impl LinearizationPoint {
    pub fn new(state: ErrorState, q_center: UnitQuaternion<f64>) -> Self {
        Self { state, q_center }
    }
}

impl Default for LinearizationPoint {
    fn default() -> Self {
        Self {
            state: ErrorState::zeros(),
            q_center: UnitQuaternion::identity(),
        }
    }
}
