// rover_core/src/frames.rs

use nalgebra::{Isometry3, Matrix3, Matrix3x4, Translation3, UnitQuaternion, Vector3};

/// Fixed rigid mounting of a sensor on the robot body.
///
/// Stored as a 3x4 `[R | t]` matrix. `R` maps body-frame vectors into the sensor
/// frame (`v_sensor = R * v_body`). The measurement models only ever consult the
/// rotation block; the translation is carried for completeness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrinsic {
    matrix: Matrix3x4<f64>,
}

impl Extrinsic {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3x4::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix3x4<f64>) -> Self {
        Self { matrix }
    }

    pub fn from_parts(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut matrix = Matrix3x4::zeros();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Self { matrix }
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self::from_parts(
            iso.rotation.to_rotation_matrix().matrix(),
            &iso.translation.vector,
        )
    }

    pub fn matrix(&self) -> &Matrix3x4<f64> {
        &self.matrix
    }

    /// The 3x3 rotation block.
    pub fn rotation(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        let rotation = UnitQuaternion::from_matrix(&self.rotation());
        Isometry3::from_parts(Translation3::from(self.translation()), rotation)
    }
}

impl Default for Extrinsic {
    fn default() -> Self {
        Self::identity()
    }
}

/// Rotation block of an optional extrinsic. An absent extrinsic is the identity
/// rotation, never a zero rotation.
#[inline]
pub fn extrinsic_rotation(extrinsic: Option<&Extrinsic>) -> Matrix3<f64> {
    extrinsic.map_or_else(Matrix3::identity, Extrinsic::rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn absent_extrinsic_is_identity_rotation() {
        assert_eq!(extrinsic_rotation(None), Matrix3::identity());
        assert_eq!(
            extrinsic_rotation(Some(&Extrinsic::identity())),
            Matrix3::identity()
        );
    }

    #[test]
    fn parts_land_in_the_right_blocks() {
        let rotation = Matrix3::new(0.0, -1.0, 0.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0);
        let translation = Vector3::new(0.1, 0.2, 0.3);
        let ext = Extrinsic::from_parts(&rotation, &translation);
        assert_eq!(ext.rotation(), rotation);
        assert_eq!(ext.translation(), translation);
        assert_eq!(ext.matrix()[(2, 0)], 1.0);
        assert_eq!(ext.matrix()[(2, 3)], 0.3);
    }

    #[test]
    fn isometry_round_trip() {
        let iso = Isometry3::from_parts(
            Translation3::new(1.0, -2.0, 0.5),
            UnitQuaternion::from_euler_angles(0.1, -0.4, 1.3),
        );
        let back = Extrinsic::from_isometry(&iso).to_isometry();
        assert_relative_eq!(back.translation.vector, iso.translation.vector, epsilon = 1e-12);
        assert!(back.rotation.angle_to(&iso.rotation) < 1e-9);
    }
}
