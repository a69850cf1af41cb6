// rover_sim/src/simulation/core/config.rs

use rover_core::config::SensorConfig;
use rover_core::control::GoToGoalController;
use rover_core::models::kinematics::UnicycleState;
use serde::{Deserialize, Serialize};

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # ScenarioConfig
/// The root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: SimulationSettings,

    #[serde(default)]
    pub robot: RobotConfig,

    #[serde(default)]
    pub world: WorldConfig,

    // The TOML has `[[sensors]]`, which becomes a Vec of SensorConfig enums.
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in the scenario file.
// =========================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSettings {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Duration of the simulation in seconds.
    pub duration_seconds: f64,
    /// Fixed simulation step in seconds. Every sensor samples once per step.
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Stop early once every goal has been reached.
    #[serde(default = "default_true")]
    pub stop_at_last_goal: bool,
}

fn default_dt() -> f64 {
    0.05
}

fn default_true() -> bool {
    true
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: None,
            duration_seconds: 60.0,
            dt: default_dt(),
            stop_at_last_goal: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RobotConfig {
    /// Starting pose `[x, y, yaw_deg]`.
    #[serde(default)]
    pub start: [f64; 3],
    /// Waypoints `[x, y]` visited in order.
    #[serde(default)]
    pub goals: Vec<[f64; 2]>,
    #[serde(default)]
    pub controller: GoToGoalController,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            start: [0.0; 3],
            goals: vec![[5.0, 0.0], [5.0, 5.0], [0.0, 5.0], [0.0, 0.0]],
            controller: GoToGoalController::default(),
        }
    }
}

impl RobotConfig {
    pub fn start_pose(&self) -> UnicycleState {
        let [x, y, yaw_deg] = self.start;
        UnicycleState::new(x, y, yaw_deg.to_radians())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorldConfig {
    /// Specific force felt by a body at rest, in m/s^2, world frame (z up).
    /// A reference-vector sensor configured with this vector is simulated as an
    /// accelerometer and also feels the robot's own acceleration.
    pub gravity: [f64; 3],
    /// Fixed landmarks the camera can track.
    #[serde(default)]
    pub landmarks: Vec<[f64; 3]>,
    /// Extra landmarks sampled at startup from the scenario PRNG.
    #[serde(default)]
    pub scatter: Option<ScatterConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0, 9.81],
            landmarks: Vec::new(),
            scatter: None,
        }
    }
}

/// Landmarks uniformly scattered in a box around the origin.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScatterConfig {
    pub count: usize,
    /// Half-width of the box in x and y, in meters.
    pub half_extent: f64,
    /// Landmark heights are drawn from `[0, max_height]`.
    #[serde(default = "default_max_height")]
    pub max_height: f64,
}

fn default_max_height() -> f64 {
    2.0
}
