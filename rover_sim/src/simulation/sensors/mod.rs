// rover_sim/src/simulation/sensors/mod.rs

//! Synthetic sensors.
//!
//! Each simulator pairs a `rover_core` measurement model with a way of producing
//! noisy readings from the ground truth. The model is the one under audit; the
//! readings are generated from the simulated physics, independently of the
//! model's own prediction.

pub mod camera;
pub mod imu;
pub mod odometry;

use rand_distr::Normal;
use rover_core::config::SensorConfig;
use rover_core::messages::MeasurementData;
use rover_core::models::kinematics::UnicycleState;
use rover_core::models::measurement::MeasurementModel;

use crate::error::{Result, SimError};
use crate::simulation::core::ground_truth::GroundTruthState;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::world::World;

pub use camera::FlowCameraSim;
pub use imu::{GyroscopeSim, ReferenceVectorSim, YawRateSim};
pub use odometry::WheelOdometrySim;

pub trait SensorSimulator: Send {
    /// The measurement model the readings are checked against.
    fn model(&self) -> &dyn MeasurementModel;

    /// Produces a reading for the step described by `truth`, or `None` when the
    /// sensor has nothing to report this step.
    fn sample(
        &mut self,
        truth: &GroundTruthState,
        world: &World,
        rng: &mut SimulationRng,
    ) -> Option<MeasurementData>;
}

/// Builds the simulator for one `[[sensors]]` entry.
pub fn build_simulator(
    config: &SensorConfig,
    start: &UnicycleState,
    world: &World,
) -> Result<Box<dyn SensorSimulator>> {
    let simulator: Box<dyn SensorSimulator> = match config {
        SensorConfig::Odometry(c) => Box::new(WheelOdometrySim::new(c, start)?),
        SensorConfig::ReferenceVector(c) => Box::new(ReferenceVectorSim::new(c, world)?),
        SensorConfig::Gyroscope(c) => Box::new(GyroscopeSim::new(c)?),
        SensorConfig::YawRate(c) => Box::new(YawRateSim::new(c)?),
        SensorConfig::Flow(c) => Box::new(FlowCameraSim::new(c)?),
    };
    Ok(simulator)
}

/// Zero-mean Gaussian noise source.
pub(crate) fn gaussian(stddev: f64, sensor: &str) -> Result<Normal<f64>> {
    if !(stddev.is_finite() && stddev >= 0.0) {
        return Err(SimError::InvalidScenario(format!(
            "sensor '{sensor}': noise stddev must be finite and non-negative, got {stddev}"
        )));
    }
    Normal::new(0.0, stddev)
        .map_err(|e| SimError::InvalidScenario(format!("sensor '{sensor}': {e}")))
}

pub(crate) fn gaussian3(stddevs: [f64; 3], sensor: &str) -> Result<[Normal<f64>; 3]> {
    Ok([
        gaussian(stddevs[0], sensor)?,
        gaussian(stddevs[1], sensor)?,
        gaussian(stddevs[2], sensor)?,
    ])
}
