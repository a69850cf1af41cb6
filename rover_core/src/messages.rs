// rover_core/src/messages.rs

use nalgebra::{DVector, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

// =========================================================================
// == Sensor Kinds ==
// =========================================================================

/// The sensor families the measurement engine knows how to model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    WheelOdometry,
    ReferenceVector,
    Gyroscope,
    YawRate,
    Flow,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::WheelOdometry => "wheel odometry",
            SensorKind::ReferenceVector => "reference vector",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::YawRate => "yaw rate",
            SensorKind::Flow => "optical flow",
        };
        f.write_str(name)
    }
}

// =========================================================================
// == Optical Flow Data ==
// =========================================================================

/// One feature tracked between the previous and the current camera frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureTrack {
    /// Pixel coordinates in the current frame.
    pub pixel: Vector2<f64>,
    /// Depth along the optical axis in the current frame.
    pub depth: f64,
    /// Where the same feature was seen in the previous frame.
    pub previous_pixel: Vector2<f64>,
    pub previous_depth: f64,
}

impl FeatureTrack {
    /// The measured flow and depth change, `[Δu, Δv, Δdepth]`, looking backwards in time.
    pub fn observation(&self) -> Vector3<f64> {
        let flow = self.previous_pixel - self.pixel;
        Vector3::new(flow.x, flow.y, self.previous_depth - self.depth)
    }
}

/// A batch of feature tracks from one camera frame pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowFrame {
    /// Time between the previous and current frame, in seconds.
    pub dt: f64,
    pub tracks: Vec<FeatureTrack>,
}

impl FlowFrame {
    pub fn new(dt: f64, tracks: Vec<FeatureTrack>) -> Self {
        Self { dt, tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn depths(&self) -> Vec<f64> {
        self.tracks.iter().map(|t| t.depth).collect()
    }

    pub fn pixels(&self) -> Vec<Vector2<f64>> {
        self.tracks.iter().map(|t| t.pixel).collect()
    }

    /// Drops tracks with a non-positive or non-finite depth in either frame.
    /// Returns how many were removed.
    pub fn retain_valid(&mut self) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|t| {
            t.depth.is_finite()
                && t.depth > 0.0
                && t.previous_depth.is_finite()
                && t.previous_depth > 0.0
        });
        before - self.tracks.len()
    }

    /// Stacked observation vector, 3 rows per track in track order.
    pub fn observation(&self) -> DVector<f64> {
        let mut z = DVector::zeros(3 * self.tracks.len());
        for (i, track) in self.tracks.iter().enumerate() {
            z.fixed_rows_mut::<3>(3 * i).copy_from(&track.observation());
        }
        z
    }
}

// =========================================================================
// == Core Message and Data Enums ==
// =========================================================================

/// A self-describing container for raw sensor readings.
#[derive(Clone, Debug, PartialEq)]
pub enum MeasurementData {
    /// Forward velocity and yaw rate reported by the wheel encoders.
    WheelOdometry { velocity: f64, yaw_rate: f64 },
    /// A known world vector (gravity, magnetic field) observed in the sensor frame.
    ReferenceVector(Vector3<f64>),
    /// Three-axis angular rate in the sensor frame.
    AngularRate(Vector3<f64>),
    /// Single-axis rate about the sensor z axis.
    YawRate(f64),
    Flow(FlowFrame),
}

impl MeasurementData {
    pub fn kind(&self) -> SensorKind {
        match self {
            MeasurementData::WheelOdometry { .. } => SensorKind::WheelOdometry,
            MeasurementData::ReferenceVector(_) => SensorKind::ReferenceVector,
            MeasurementData::AngularRate(_) => SensorKind::Gyroscope,
            MeasurementData::YawRate(_) => SensorKind::YawRate,
            MeasurementData::Flow(_) => SensorKind::Flow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(pixel: (f64, f64), depth: f64, prev: (f64, f64), prev_depth: f64) -> FeatureTrack {
        FeatureTrack {
            pixel: Vector2::new(pixel.0, pixel.1),
            depth,
            previous_pixel: Vector2::new(prev.0, prev.1),
            previous_depth: prev_depth,
        }
    }

    #[test]
    fn observation_is_previous_minus_current() {
        let t = track((100.0, 50.0), 2.0, (103.0, 49.0), 2.25);
        assert_eq!(t.observation(), Vector3::new(3.0, -1.0, 0.25));
    }

    #[test]
    fn frame_observation_stacks_in_track_order() {
        let frame = FlowFrame::new(
            0.1,
            vec![
                track((0.0, 0.0), 1.0, (1.0, 2.0), 1.5),
                track((5.0, 5.0), 3.0, (4.0, 4.0), 2.0),
            ],
        );
        let z = frame.observation();
        assert_eq!(z.len(), 6);
        assert_eq!(z.as_slice(), &[1.0, 2.0, 0.5, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn retain_valid_drops_degenerate_depths() {
        let mut frame = FlowFrame::new(
            0.1,
            vec![
                track((0.0, 0.0), 1.0, (0.0, 0.0), 1.0),
                track((0.0, 0.0), 0.0, (0.0, 0.0), 1.0),
                track((0.0, 0.0), -2.0, (0.0, 0.0), 1.0),
                track((0.0, 0.0), 2.0, (0.0, 0.0), f64::NAN),
            ],
        );
        assert_eq!(frame.retain_valid(), 3);
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn data_reports_its_kind() {
        assert_eq!(
            MeasurementData::AngularRate(Vector3::zeros()).kind(),
            SensorKind::Gyroscope
        );
        assert_eq!(MeasurementData::YawRate(0.0).kind().to_string(), "yaw rate");
    }
}
