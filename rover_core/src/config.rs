// rover_core/src/config.rs

//! Deserializable sensor descriptions.
//!
//! These structs carry no I/O: callers load them from whatever source they like
//! (the simulator uses figment over TOML) and call [`SensorConfig::build`] to get
//! a ready-to-use [`MeasurementModel`].

use crate::camera::PinholeCamera;
use crate::error::{MeasurementError, Result};
use crate::frames::Extrinsic;
use crate::models::measurement::{
    FlowOdometryModel, GyroscopeModel, MeasurementModel, ReferenceVectorModel, WheelOdometryModel,
    YawRateModel,
};
use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// =========================================================================
// == Mounting ==
// =========================================================================

/// Sensor mounting on the body.
///
/// The rotation maps body vectors into the sensor frame. It is given either as
/// roll/pitch/yaw in degrees or as a full row-major 3x3 matrix; the matrix wins
/// when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtrinsicConfig {
    #[serde(default)]
    pub translation: [f64; 3],
    #[serde(default)]
    pub rotation_rpy_deg: [f64; 3],
    #[serde(default)]
    pub rotation_matrix: Option<[[f64; 3]; 3]>,
}

impl ExtrinsicConfig {
    pub fn to_extrinsic(&self) -> Result<Extrinsic> {
        let rotation = match self.rotation_matrix {
            Some(rows) => {
                let m = Matrix3::from_fn(|r, c| rows[r][c]);
                // A mounting must be a proper rotation.
                let orthogonality = (m * m.transpose() - Matrix3::identity()).norm();
                if orthogonality > 1e-6 || m.determinant() < 0.0 {
                    return Err(MeasurementError::Config(
                        "extrinsic rotation_matrix is not a proper rotation".into(),
                    ));
                }
                m
            }
            None => {
                let [roll, pitch, yaw] = self.rotation_rpy_deg.map(f64::to_radians);
                UnitQuaternion::from_euler_angles(roll, pitch, yaw)
                    .to_rotation_matrix()
                    .into_inner()
            }
        };
        Ok(Extrinsic::from_parts(
            &rotation,
            &Vector3::from(self.translation),
        ))
    }
}

fn optional_extrinsic(config: &Option<ExtrinsicConfig>) -> Result<Option<Extrinsic>> {
    config.as_ref().map(ExtrinsicConfig::to_extrinsic).transpose()
}

// =========================================================================
// == Camera ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraConfig {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub skew: f64,
    /// Image size in pixels. Only used to decide which features are visible.
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

impl CameraConfig {
    pub fn to_camera(&self) -> Result<PinholeCamera> {
        PinholeCamera::new(self.fx, self.fy, self.cx, self.cy, self.skew)
    }

    /// Whether a pixel falls on the image.
    pub fn contains(&self, u: f64, v: f64) -> bool {
        (0.0..self.width as f64).contains(&u) && (0.0..self.height as f64).contains(&v)
    }
}

// =========================================================================
// == Sensors ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OdometryConfig {
    pub name: String,
    pub velocity_noise_stddev: f64,
    pub yaw_rate_noise_stddev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceVectorConfig {
    pub name: String,
    /// The world-frame vector, e.g. gravity `[0, 0, 9.81]`.
    pub reference: [f64; 3],
    pub noise_stddev: [f64; 3],
    #[serde(default)]
    pub extrinsic: Option<ExtrinsicConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GyroscopeConfig {
    pub name: String,
    pub noise_stddev: [f64; 3],
    #[serde(default)]
    pub extrinsic: Option<ExtrinsicConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YawRateConfig {
    pub name: String,
    pub noise_stddev: f64,
    #[serde(default)]
    pub extrinsic: Option<ExtrinsicConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowConfig {
    pub name: String,
    pub camera: CameraConfig,
    #[serde(default)]
    pub extrinsic: Option<ExtrinsicConfig>,
    pub pixel_noise_stddev: f64,
    pub depth_noise_stddev: f64,
    /// Upper bound on tracks kept per frame.
    #[serde(default = "default_max_features")]
    pub max_features: usize,
}

fn default_max_features() -> usize {
    64
}

// The `kind` field in each `[[sensors]]` table picks the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
#[serde(rename_all = "PascalCase")]
pub enum SensorConfig {
    Odometry(OdometryConfig),
    ReferenceVector(ReferenceVectorConfig),
    Gyroscope(GyroscopeConfig),
    YawRate(YawRateConfig),
    Flow(FlowConfig),
}

/// Noise standard deviations must be finite and non-negative.
fn check_stddev(sensor: &str, field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MeasurementError::Config(format!(
            "sensor '{sensor}': {field} must be finite and non-negative, got {value}"
        )))
    }
}

impl SensorConfig {
    pub fn name(&self) -> &str {
        match self {
            SensorConfig::Odometry(c) => &c.name,
            SensorConfig::ReferenceVector(c) => &c.name,
            SensorConfig::Gyroscope(c) => &c.name,
            SensorConfig::YawRate(c) => &c.name,
            SensorConfig::Flow(c) => &c.name,
        }
    }

    /// Checks the noise settings of this entry.
    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        match self {
            SensorConfig::Odometry(c) => {
                check_stddev(name, "velocity_noise_stddev", c.velocity_noise_stddev)?;
                check_stddev(name, "yaw_rate_noise_stddev", c.yaw_rate_noise_stddev)?;
            }
            SensorConfig::ReferenceVector(ReferenceVectorConfig { noise_stddev, .. })
            | SensorConfig::Gyroscope(GyroscopeConfig { noise_stddev, .. }) => {
                for &stddev in noise_stddev {
                    check_stddev(name, "noise_stddev", stddev)?;
                }
            }
            SensorConfig::YawRate(c) => check_stddev(name, "noise_stddev", c.noise_stddev)?,
            SensorConfig::Flow(c) => {
                check_stddev(name, "pixel_noise_stddev", c.pixel_noise_stddev)?;
                check_stddev(name, "depth_noise_stddev", c.depth_noise_stddev)?;
            }
        }
        Ok(())
    }

    /// Builds the measurement model described by this entry.
    pub fn build(&self) -> Result<Box<dyn MeasurementModel>> {
        self.validate()?;
        let model: Box<dyn MeasurementModel> = match self {
            SensorConfig::Odometry(c) => Box::new(WheelOdometryModel::new(
                &c.name,
                c.velocity_noise_stddev,
                c.yaw_rate_noise_stddev,
            )),
            SensorConfig::ReferenceVector(c) => Box::new(ReferenceVectorModel::new(
                &c.name,
                Vector3::from(c.reference),
                c.noise_stddev,
                optional_extrinsic(&c.extrinsic)?,
            )),
            SensorConfig::Gyroscope(c) => Box::new(GyroscopeModel::new(
                &c.name,
                c.noise_stddev,
                optional_extrinsic(&c.extrinsic)?,
            )),
            SensorConfig::YawRate(c) => Box::new(YawRateModel::new(
                &c.name,
                c.noise_stddev,
                optional_extrinsic(&c.extrinsic)?,
            )),
            SensorConfig::Flow(c) => Box::new(FlowOdometryModel::new(
                &c.name,
                c.camera.to_camera()?,
                optional_extrinsic(&c.extrinsic)?,
                c.pixel_noise_stddev,
                c.depth_noise_stddev,
            )),
        };
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::SensorKind;
    use approx::assert_relative_eq;

    #[test]
    fn default_extrinsic_is_identity() {
        let ext = ExtrinsicConfig::default().to_extrinsic().unwrap();
        assert_eq!(ext, Extrinsic::identity());
    }

    #[test]
    fn rpy_rotation_matches_nalgebra() {
        let config = ExtrinsicConfig {
            translation: [0.1, 0.0, 0.3],
            rotation_rpy_deg: [0.0, 0.0, 90.0],
            rotation_matrix: None,
        };
        let ext = config.to_extrinsic().unwrap();
        assert_relative_eq!(
            ext.rotation() * Vector3::x(),
            Vector3::y(),
            epsilon = 1e-12
        );
        assert_eq!(ext.translation(), Vector3::new(0.1, 0.0, 0.3));
    }

    #[test]
    fn explicit_matrix_wins_and_is_validated() {
        let forward_camera = ExtrinsicConfig {
            rotation_rpy_deg: [45.0, 0.0, 0.0],
            rotation_matrix: Some([[0.0, -1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]]),
            ..Default::default()
        };
        let ext = forward_camera.to_extrinsic().unwrap();
        assert_eq!(ext.rotation() * Vector3::x(), Vector3::z());

        let reflection = ExtrinsicConfig {
            rotation_matrix: Some([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]]),
            ..Default::default()
        };
        assert!(matches!(
            reflection.to_extrinsic(),
            Err(MeasurementError::Config(_))
        ));
    }

    #[test]
    fn build_produces_model_of_matching_kind() {
        let sensors = [
            SensorConfig::Odometry(OdometryConfig {
                name: "wheels".into(),
                velocity_noise_stddev: 0.05,
                yaw_rate_noise_stddev: 0.02,
            }),
            SensorConfig::YawRate(YawRateConfig {
                name: "z_gyro".into(),
                noise_stddev: 0.01,
                extrinsic: None,
            }),
        ];
        let kinds: Vec<_> = sensors
            .iter()
            .map(|s| s.build().unwrap().kind())
            .collect();
        assert_eq!(kinds, vec![SensorKind::WheelOdometry, SensorKind::YawRate]);
        assert_eq!(sensors[1].name(), "z_gyro");
    }

    #[test]
    fn negative_or_nan_noise_fails_to_build() {
        let yaw = SensorConfig::YawRate(YawRateConfig {
            name: "z_gyro".into(),
            noise_stddev: -0.5,
            extrinsic: None,
        });
        assert!(matches!(yaw.build(), Err(MeasurementError::Config(_))));

        let gyro = SensorConfig::Gyroscope(GyroscopeConfig {
            name: "gyro".into(),
            noise_stddev: [0.01, f64::NAN, 0.01],
            extrinsic: None,
        });
        assert!(matches!(gyro.validate(), Err(MeasurementError::Config(_))));

        let noiseless = SensorConfig::Odometry(OdometryConfig {
            name: "wheels".into(),
            velocity_noise_stddev: 0.0,
            yaw_rate_noise_stddev: 0.0,
        });
        assert!(noiseless.validate().is_ok());
    }

    #[test]
    fn singular_camera_fails_to_build() {
        let flow = SensorConfig::Flow(FlowConfig {
            name: "cam".into(),
            camera: CameraConfig {
                fx: 0.0,
                fy: 500.0,
                cx: 320.0,
                cy: 240.0,
                skew: 0.0,
                width: 640,
                height: 480,
            },
            extrinsic: None,
            pixel_noise_stddev: 1.0,
            depth_noise_stddev: 0.05,
            max_features: 10,
        });
        assert_eq!(flow.build().unwrap_err(), MeasurementError::SingularIntrinsics);
    }

    #[test]
    fn camera_contains_checks_image_bounds() {
        let camera = CameraConfig {
            fx: 500.0,
            fy: 500.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
            width: 640,
            height: 480,
        };
        assert!(camera.contains(320.0, 240.0));
        assert!(!camera.contains(640.0, 10.0));
        assert!(!camera.contains(10.0, -0.5));
    }
}
