// rover_sim/src/simulation/sensors/camera.rs

use nalgebra::{Vector2, Vector3};
use rand_distr::{Distribution, Normal};
use rover_core::camera::PinholeCamera;
use rover_core::config::{CameraConfig, FlowConfig};
use rover_core::frames::Extrinsic;
use rover_core::geometry::quaternion_from_yaw;
use rover_core::messages::{FeatureTrack, FlowFrame, MeasurementData};
use rover_core::models::kinematics::UnicycleState;
use rover_core::models::measurement::{FlowOdometryModel, MeasurementModel};
use tracing::debug;

use super::{gaussian, SensorSimulator};
use crate::error::Result;
use crate::simulation::core::ground_truth::GroundTruthState;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::world::World;

/// Landmarks closer than this to the image plane are not tracked.
const MIN_TRACK_DEPTH: f64 = 0.3;

/// A depth camera tracking world landmarks between consecutive steps.
///
/// The current pixel and depth are exact, as they are the inputs the flow model
/// linearizes around. Noise goes on the previous-frame pixel and depth, which
/// form the observation.
pub struct FlowCameraSim {
    model: FlowOdometryModel,
    image: CameraConfig,
    mounting: Extrinsic,
    max_features: usize,
    pixel_noise: Normal<f64>,
    depth_noise: Normal<f64>,
}

impl FlowCameraSim {
    pub fn new(config: &FlowConfig) -> Result<Self> {
        let extrinsic = config
            .extrinsic
            .as_ref()
            .map(|e| e.to_extrinsic())
            .transpose()?;
        let camera = config.camera.to_camera()?;
        Ok(Self {
            model: FlowOdometryModel::new(
                &config.name,
                camera,
                extrinsic,
                config.pixel_noise_stddev,
                config.depth_noise_stddev,
            ),
            image: config.camera,
            mounting: extrinsic.unwrap_or_default(),
            max_features: config.max_features,
            pixel_noise: gaussian(config.pixel_noise_stddev, &config.name)?,
            depth_noise: gaussian(config.depth_noise_stddev, &config.name)?,
        })
    }

    fn camera(&self) -> &PinholeCamera {
        &self.model.camera
    }

    /// Landmark position in the camera frame for a robot at `pose`.
    fn to_camera_frame(&self, pose: &UnicycleState, landmark: &Vector3<f64>) -> Vector3<f64> {
        let body = quaternion_from_yaw(pose.yaw)
            .inverse_transform_vector(&(landmark - Vector3::new(pose.x, pose.y, 0.0)));
        self.mounting.rotation() * body + self.mounting.translation()
    }

    /// Pixel and depth of a landmark if it is in view.
    fn observe(
        &self,
        pose: &UnicycleState,
        landmark: &Vector3<f64>,
    ) -> Option<(Vector2<f64>, f64)> {
        let p = self.to_camera_frame(pose, landmark);
        if p.z < MIN_TRACK_DEPTH {
            return None;
        }
        let pixel = self.camera().project(&p);
        self.image.contains(pixel.x, pixel.y).then_some((pixel, p.z))
    }

    /// Tracks of every landmark visible in both frames, nearest first.
    pub fn track(&self, truth: &GroundTruthState, world: &World) -> Vec<FeatureTrack> {
        let mut tracks: Vec<FeatureTrack> = world
            .landmarks
            .iter()
            .filter_map(|landmark| {
                let (pixel, depth) = self.observe(&truth.pose, landmark)?;
                let (previous_pixel, previous_depth) =
                    self.observe(&truth.previous_pose, landmark)?;
                Some(FeatureTrack {
                    pixel,
                    depth,
                    previous_pixel,
                    previous_depth,
                })
            })
            .collect();
        tracks.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        tracks.truncate(self.max_features);
        tracks
    }
}

impl SensorSimulator for FlowCameraSim {
    fn model(&self) -> &dyn MeasurementModel {
        &self.model
    }

    fn sample(
        &mut self,
        truth: &GroundTruthState,
        world: &World,
        rng: &mut SimulationRng,
    ) -> Option<MeasurementData> {
        let mut tracks = self.track(truth, world);
        for track in &mut tracks {
            track.previous_pixel.x += self.pixel_noise.sample(&mut rng.0);
            track.previous_pixel.y += self.pixel_noise.sample(&mut rng.0);
            track.previous_depth += self.depth_noise.sample(&mut rng.0);
        }

        let mut frame = FlowFrame::new(truth.dt, tracks);
        let dropped = frame.retain_valid();
        if dropped > 0 {
            debug!(sensor = %self.model.name, dropped, "dropped degenerate tracks");
        }
        (!frame.is_empty()).then_some(MeasurementData::Flow(frame))
    }
}
