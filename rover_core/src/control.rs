// rover_core/src/control.rs

use crate::models::kinematics::{wrap_angle, Twist2, UnicycleState};
use serde::{Deserialize, Serialize};

/// Steers a unicycle towards a point goal.
///
/// With `r` the squared distance to the goal and `α` the heading error:
///
/// ```text
/// v = v_max · tanh(r) · cos α
/// ω = w_max · α + tanh(r) · sin α · cos α / r      (r > eps_r)
/// ```
///
/// Speed fades out near the goal and the robot backs up when the goal is behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoToGoalController {
    pub v_max: f64,
    pub w_max: f64,
    /// Squared distance below which the curvature term is dropped.
    #[serde(default = "default_eps_r")]
    pub eps_r: f64,
    /// Distance at which a goal counts as reached, in meters.
    #[serde(default = "default_goal_tolerance")]
    pub goal_tolerance: f64,
}

fn default_eps_r() -> f64 {
    1e-3
}

fn default_goal_tolerance() -> f64 {
    0.2
}

impl Default for GoToGoalController {
    fn default() -> Self {
        Self {
            v_max: 2.0,
            w_max: 1.5,
            eps_r: default_eps_r(),
            goal_tolerance: default_goal_tolerance(),
        }
    }
}

impl GoToGoalController {
    pub fn new(v_max: f64, w_max: f64) -> Self {
        Self {
            v_max,
            w_max,
            ..Default::default()
        }
    }

    pub fn control(&self, state: &UnicycleState, goal_x: f64, goal_y: f64) -> Twist2 {
        let dx = goal_x - state.x;
        let dy = goal_y - state.y;
        let r = dx * dx + dy * dy;
        let alpha = wrap_angle(dy.atan2(dx) - state.yaw);

        let (sin_a, cos_a) = alpha.sin_cos();
        let v = self.v_max * r.tanh() * cos_a;
        let w = if r > self.eps_r {
            self.w_max * alpha + r.tanh() * sin_a * cos_a / r
        } else {
            self.w_max * alpha
        };
        Twist2::new(v, w)
    }

    pub fn goal_reached(&self, state: &UnicycleState, goal_x: f64, goal_y: f64) -> bool {
        state.distance_to(goal_x, goal_y) < self.goal_tolerance
    }
}
