// rover_sim/src/simulation/core/ground_truth.rs

use nalgebra::{UnitQuaternion, Vector3};
use rover_core::geometry::quaternion_from_yaw;
use rover_core::models::kinematics::{Twist2, UnicycleState};
use rover_core::state::{ErrorState, LinearizationPoint};

/// What the robot is actually doing during one simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTruthState {
    /// Simulation time at the end of the step.
    pub time: f64,
    /// Length of the step.
    pub dt: f64,
    /// Pose at the start of the step.
    pub previous_pose: UnicycleState,
    /// Pose at the end of the step.
    pub pose: UnicycleState,
    /// Velocity command held during the step.
    pub twist: Twist2,
    /// Command of the step before, zero on the first step.
    pub previous_twist: Twist2,
}

impl GroundTruthState {
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.pose.x, self.pose.y, 0.0)
    }

    /// Body to world orientation.
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        quaternion_from_yaw(self.pose.yaw)
    }

    /// Body-frame angular velocity. The robot only yaws.
    pub fn angular_velocity(&self) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, self.twist.w)
    }

    /// Body-frame acceleration `[dv/dt, v·ω, 0]` of a unicycle.
    pub fn body_acceleration(&self) -> Vector3<f64> {
        let dv = (self.twist.v - self.previous_twist.v) / self.dt;
        Vector3::new(dv, self.twist.v * self.twist.w, 0.0)
    }

    /// The state a perfect filter would hold right after a reset.
    pub fn linearization_point(&self) -> LinearizationPoint {
        let mut state = ErrorState::zeros();
        state.set_position(&self.position());
        state.set_forward_velocity(self.twist.v);
        state.set_angular_rate(&self.angular_velocity());
        LinearizationPoint::new(state, self.orientation())
    }
}
