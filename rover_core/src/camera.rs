// rover_core/src/camera.rs

use crate::error::{MeasurementError, Result};
use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

/// Pinhole intrinsics together with their inverse.
///
/// The inverse is computed once at construction, so the flow model can back-project
/// every feature without inverting `K` per call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    k: Matrix3<f64>,
    k_inv: Matrix3<f64>,
}

impl PinholeCamera {
    /// Builds `K = [[fx, skew, cx], [0, fy, cy], [0, 0, 1]]`.
    #[rustfmt::skip]
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, skew: f64) -> Result<Self> {
        let k = Matrix3::new(
            fx, skew, cx,
            0.0, fy, cy,
            0.0, 0.0, 1.0,
        );
        Self::from_matrix(k)
    }

    pub fn from_matrix(k: Matrix3<f64>) -> Result<Self> {
        let k_inv = k.try_inverse().ok_or(MeasurementError::SingularIntrinsics)?;
        Ok(Self { k, k_inv })
    }

    /// Uses a caller-supplied inverse as is. The pair is not cross-checked.
    pub fn from_matrices(k: Matrix3<f64>, k_inv: Matrix3<f64>) -> Self {
        Self { k, k_inv }
    }

    pub fn intrinsics(&self) -> &Matrix3<f64> {
        &self.k
    }

    pub fn intrinsics_inverse(&self) -> &Matrix3<f64> {
        &self.k_inv
    }

    /// Top-left 2x2 scale/skew block of `K`, the Jacobian of pixel w.r.t.
    /// normalized image coordinates.
    pub fn scale_block(&self) -> Matrix2<f64> {
        self.k.fixed_view::<2, 2>(0, 0).into_owned()
    }

    /// Back-projects a pixel at the given depth: `depth * K⁻¹ [u, v, 1]`.
    pub fn back_project(&self, pixel: &Vector2<f64>, depth: f64) -> Vector3<f64> {
        self.k_inv * Vector3::new(pixel.x, pixel.y, 1.0) * depth
    }

    /// Projects a camera-frame point. The caller guarantees `point.z > 0`.
    pub fn project(&self, point: &Vector3<f64>) -> Vector2<f64> {
        let normalized = Vector3::new(point.x / point.z, point.y / point.z, 1.0);
        self.k.fixed_rows::<2>(0) * normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> PinholeCamera {
        PinholeCamera::new(500.0, 500.0, 320.0, 240.0, 0.0).unwrap()
    }

    #[test]
    fn principal_point_back_projects_onto_optical_axis() {
        let p = camera().back_project(&Vector2::new(320.0, 240.0), 2.0);
        assert_relative_eq!(p, Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn project_inverts_back_project() {
        let cam = camera();
        let pixel = Vector2::new(101.5, 377.25);
        let point = cam.back_project(&pixel, 3.7);
        assert_relative_eq!(point.z, 3.7, epsilon = 1e-12);
        assert_relative_eq!(cam.project(&point), pixel, epsilon = 1e-9);
    }

    #[test]
    fn singular_intrinsics_are_rejected() {
        let err = PinholeCamera::new(0.0, 500.0, 320.0, 240.0, 0.0).unwrap_err();
        assert_eq!(err, MeasurementError::SingularIntrinsics);
    }

    #[test]
    fn scale_block_keeps_skew() {
        let cam = PinholeCamera::new(400.0, 410.0, 1.0, 2.0, 3.0).unwrap();
        assert_eq!(cam.scale_block(), Matrix2::new(400.0, 3.0, 0.0, 410.0));
    }
}
