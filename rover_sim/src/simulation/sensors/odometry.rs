// rover_sim/src/simulation/sensors/odometry.rs

use rand_distr::{Distribution, Normal};
use rover_core::config::OdometryConfig;
use rover_core::messages::MeasurementData;
use rover_core::models::kinematics::{UnicycleState, VelocityTracker};
use rover_core::models::measurement::{MeasurementModel, WheelOdometryModel};

use super::{gaussian, SensorSimulator};
use crate::error::Result;
use crate::simulation::core::ground_truth::GroundTruthState;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::world::World;

/// Wheel encoders: velocities are recovered from successive true poses, the
/// same way a robot would difference its own pose fixes.
pub struct WheelOdometrySim {
    model: WheelOdometryModel,
    tracker: VelocityTracker,
    velocity_noise: Normal<f64>,
    yaw_rate_noise: Normal<f64>,
}

impl WheelOdometrySim {
    pub fn new(config: &OdometryConfig, start: &UnicycleState) -> Result<Self> {
        let mut tracker = VelocityTracker::new();
        tracker.update(0.0, *start);
        Ok(Self {
            model: WheelOdometryModel::new(
                &config.name,
                config.velocity_noise_stddev,
                config.yaw_rate_noise_stddev,
            ),
            tracker,
            velocity_noise: gaussian(config.velocity_noise_stddev, &config.name)?,
            yaw_rate_noise: gaussian(config.yaw_rate_noise_stddev, &config.name)?,
        })
    }
}

impl SensorSimulator for WheelOdometrySim {
    fn model(&self) -> &dyn MeasurementModel {
        &self.model
    }

    fn sample(
        &mut self,
        truth: &GroundTruthState,
        _world: &World,
        rng: &mut SimulationRng,
    ) -> Option<MeasurementData> {
        let twist = self.tracker.update(truth.time, truth.pose)?;
        Some(MeasurementData::WheelOdometry {
            velocity: twist.v + self.velocity_noise.sample(&mut rng.0),
            yaw_rate: twist.w + self.yaw_rate_noise.sample(&mut rng.0),
        })
    }
}
