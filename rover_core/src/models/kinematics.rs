// rover_core/src/models/kinematics.rs

//! Planar differential-drive kinematics.
//!
//! The measurement models above only need `(v, ω)` and an attitude. This module
//! is where those come from on a ground robot: a unicycle pose propagated under a
//! velocity command, and the inverse problem of recovering `(v, ω)` from two
//! successive poses.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Below this yaw rate the motion is integrated as a straight line.
pub const STRAIGHT_LINE_YAW_RATE: f64 = 1e-3;

/// Wraps an angle into `[-π, π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Velocity command for a unicycle: forward speed and yaw rate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist2 {
    /// Forward velocity, m/s.
    pub v: f64,
    /// Yaw rate, rad/s.
    pub w: f64,
}

impl Twist2 {
    pub fn new(v: f64, w: f64) -> Self {
        Self { v, w }
    }
}

/// Pose of a planar robot in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UnicycleState {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl UnicycleState {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    /// Advances the pose assuming `control` is held for `dt` seconds.
    ///
    /// For `|ω|` above [`STRAIGHT_LINE_YAW_RATE`] the robot follows the exact arc
    /// of radius `v / ω`; otherwise it moves in a straight line.
    pub fn propagate(&self, control: &Twist2, dt: f64) -> Self {
        let Twist2 { v, w } = *control;
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();

        if w.abs() > STRAIGHT_LINE_YAW_RATE {
            let rho = v / w;
            // Displacement in the body frame at the start of the step.
            let dx = rho * (w * dt).sin();
            let dy = rho * (1.0 - (w * dt).cos());
            Self {
                x: self.x + dx * cos_yaw - dy * sin_yaw,
                y: self.y + dx * sin_yaw + dy * cos_yaw,
                yaw: wrap_angle(self.yaw + w * dt),
            }
        } else {
            Self {
                x: self.x + v * dt * cos_yaw,
                y: self.y + v * dt * sin_yaw,
                yaw: self.yaw,
            }
        }
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (x - self.x).hypot(y - self.y)
    }
}

/// Forward velocity and yaw rate that take `prev` to `new` in `dt` seconds.
///
/// The velocity is the displacement projected onto the new heading, so it is
/// negative when the robot reverses. The yaw difference is wrapped before
/// dividing by `dt`.
pub fn body_velocities(prev: &UnicycleState, new: &UnicycleState, dt: f64) -> Twist2 {
    let w = wrap_angle(new.yaw - prev.yaw) / dt;

    let vx = (new.x - prev.x) / dt;
    let vy = (new.y - prev.y) / dt;
    let speed = vx.hypot(vy);
    let course = vy.atan2(vx);
    Twist2::new(speed * (course - new.yaw).cos(), w)
}

/// Keeps the last timestamped pose so that velocities can be derived from a
/// stream of pose fixes.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    last: Option<(f64, UnicycleState)>,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pose. Returns the body velocities since the previous pose, or
    /// `None` on the first call or when time did not advance.
    pub fn update(&mut self, timestamp: f64, pose: UnicycleState) -> Option<Twist2> {
        let twist = match self.last {
            Some((t_prev, prev)) if timestamp > t_prev => {
                Some(body_velocities(&prev, &pose, timestamp - t_prev))
            }
            _ => None,
        };
        self.last = Some((timestamp, pose));
        twist
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
