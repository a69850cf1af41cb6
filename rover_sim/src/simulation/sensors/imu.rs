// rover_sim/src/simulation/sensors/imu.rs

use nalgebra::{Matrix3, Vector3};
use rand_distr::{Distribution, Normal};
use rover_core::config::{ExtrinsicConfig, GyroscopeConfig, ReferenceVectorConfig, YawRateConfig};
use rover_core::frames::{extrinsic_rotation, Extrinsic};
use rover_core::messages::MeasurementData;
use rover_core::models::measurement::{
    GyroscopeModel, MeasurementModel, ReferenceVectorModel, YawRateModel,
};

use super::{gaussian, gaussian3, SensorSimulator};
use crate::error::Result;
use crate::simulation::core::ground_truth::GroundTruthState;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::world::World;

fn mounting(config: &Option<ExtrinsicConfig>) -> Result<Option<Extrinsic>> {
    Ok(config.as_ref().map(ExtrinsicConfig::to_extrinsic).transpose()?)
}

fn add_noise(v: Vector3<f64>, noise: &[Normal<f64>; 3], rng: &mut SimulationRng) -> Vector3<f64> {
    Vector3::new(
        v.x + noise[0].sample(&mut rng.0),
        v.y + noise[1].sample(&mut rng.0),
        v.z + noise[2].sample(&mut rng.0),
    )
}

// =========================================================================
// == Gyroscopes ==
// =========================================================================

pub struct GyroscopeSim {
    model: GyroscopeModel,
    rot_sensor_from_body: Matrix3<f64>,
    noise: [Normal<f64>; 3],
}

impl GyroscopeSim {
    pub fn new(config: &GyroscopeConfig) -> Result<Self> {
        let extrinsic = mounting(&config.extrinsic)?;
        Ok(Self {
            rot_sensor_from_body: extrinsic_rotation(extrinsic.as_ref()),
            model: GyroscopeModel::new(&config.name, config.noise_stddev, extrinsic),
            noise: gaussian3(config.noise_stddev, &config.name)?,
        })
    }
}

impl SensorSimulator for GyroscopeSim {
    fn model(&self) -> &dyn MeasurementModel {
        &self.model
    }

    fn sample(
        &mut self,
        truth: &GroundTruthState,
        _world: &World,
        rng: &mut SimulationRng,
    ) -> Option<MeasurementData> {
        let perfect = self.rot_sensor_from_body * truth.angular_velocity();
        Some(MeasurementData::AngularRate(add_noise(perfect, &self.noise, rng)))
    }
}

pub struct YawRateSim {
    model: YawRateModel,
    rot_sensor_from_body: Matrix3<f64>,
    noise: Normal<f64>,
}

impl YawRateSim {
    pub fn new(config: &YawRateConfig) -> Result<Self> {
        let extrinsic = mounting(&config.extrinsic)?;
        Ok(Self {
            rot_sensor_from_body: extrinsic_rotation(extrinsic.as_ref()),
            model: YawRateModel::new(&config.name, config.noise_stddev, extrinsic),
            noise: gaussian(config.noise_stddev, &config.name)?,
        })
    }
}

impl SensorSimulator for YawRateSim {
    fn model(&self) -> &dyn MeasurementModel {
        &self.model
    }

    fn sample(
        &mut self,
        truth: &GroundTruthState,
        _world: &World,
        rng: &mut SimulationRng,
    ) -> Option<MeasurementData> {
        let perfect = (self.rot_sensor_from_body * truth.angular_velocity()).z;
        Some(MeasurementData::YawRate(perfect + self.noise.sample(&mut rng.0)))
    }
}

// =========================================================================
// == Reference Vectors ==
// =========================================================================

/// A sensor reading a fixed world vector.
///
/// When the vector is the world's gravity the sensor is an accelerometer: the
/// reading also contains the robot's own acceleration, which the measurement
/// model does not account for and which shows up in the residuals.
pub struct ReferenceVectorSim {
    model: ReferenceVectorModel,
    rot_sensor_from_body: Matrix3<f64>,
    is_accelerometer: bool,
    noise: [Normal<f64>; 3],
}

impl ReferenceVectorSim {
    pub fn new(config: &ReferenceVectorConfig, world: &World) -> Result<Self> {
        let extrinsic = mounting(&config.extrinsic)?;
        let reference = Vector3::from(config.reference);
        Ok(Self {
            rot_sensor_from_body: extrinsic_rotation(extrinsic.as_ref()),
            is_accelerometer: (reference - world.gravity).norm() < 1e-9,
            model: ReferenceVectorModel::new(
                &config.name,
                reference,
                config.noise_stddev,
                extrinsic,
            ),
            noise: gaussian3(config.noise_stddev, &config.name)?,
        })
    }
}

impl SensorSimulator for ReferenceVectorSim {
    fn model(&self) -> &dyn MeasurementModel {
        &self.model
    }

    fn sample(
        &mut self,
        truth: &GroundTruthState,
        _world: &World,
        rng: &mut SimulationRng,
    ) -> Option<MeasurementData> {
        let mut body = truth
            .orientation()
            .inverse_transform_vector(&self.model.reference);
        if self.is_accelerometer {
            body += truth.body_acceleration();
        }
        let perfect = self.rot_sensor_from_body * body;
        Some(MeasurementData::ReferenceVector(add_noise(perfect, &self.noise, rng)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::core::config::WorldConfig;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rover_core::models::kinematics::{Twist2, UnicycleState};

    fn truth(twist: Twist2) -> GroundTruthState {
        let previous_pose = UnicycleState::new(0.0, 0.0, 1.0);
        GroundTruthState {
            time: 0.05,
            dt: 0.05,
            previous_pose,
            pose: previous_pose.propagate(&twist, 0.05),
            twist,
            previous_twist: twist,
        }
    }

    fn world() -> World {
        World::from_config(&WorldConfig::default(), &mut SimulationRng::new(Some(0)).0)
    }

    #[test]
    fn noiseless_gyro_reads_true_rate() {
        let config = GyroscopeConfig {
            name: "gyro".into(),
            noise_stddev: [0.0; 3],
            extrinsic: None,
        };
        let mut sim = GyroscopeSim::new(&config).unwrap();
        let mut rng = SimulationRng::new(Some(1));
        let reading = sim.sample(&truth(Twist2::new(1.0, 0.7)), &world(), &mut rng);
        assert_eq!(
            reading,
            Some(MeasurementData::AngularRate(Vector3::new(0.0, 0.0, 0.7)))
        );
    }

    #[test]
    fn accelerometer_feels_centripetal_acceleration() {
        let config = ReferenceVectorConfig {
            name: "accel".into(),
            reference: [0.0, 0.0, 9.81],
            noise_stddev: [0.0; 3],
            extrinsic: None,
        };
        let world = world();
        let mut sim = ReferenceVectorSim::new(&config, &world).unwrap();
        let mut rng = SimulationRng::new(Some(1));
        let Some(MeasurementData::ReferenceVector(z)) =
            sim.sample(&truth(Twist2::new(2.0, 0.5)), &world, &mut rng)
        else {
            panic!("accelerometer produced no reading");
        };
        assert_relative_eq!(z, Vector3::new(0.0, 1.0, 9.81), epsilon = 1e-12);
    }

    #[test]
    fn negative_noise_is_rejected() {
        let config = YawRateConfig {
            name: "yaw".into(),
            noise_stddev: -1.0,
            extrinsic: None,
        };
        assert!(YawRateSim::new(&config).is_err());
    }
}
