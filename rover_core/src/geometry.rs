// rover_core/src/geometry.rs

//! Small rotation helpers shared by every measurement model.
//!
//! Quaternions passed in here are assumed to be unit norm already. Nothing in this
//! module renormalizes; keeping `q_center` on the unit sphere is the filter's job.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

/// Inverse of a unit quaternion, i.e. its conjugate.
#[inline]
pub fn quat_inverse(q: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    q.conjugate()
}

/// Rotates `v` by `q` with the sandwich product `q * [0, v] * q⁻¹`.
#[inline]
pub fn rotate_vector(v: &Vector3<f64>, q: &UnitQuaternion<f64>) -> Vector3<f64> {
    q.transform_vector(v)
}

/// Constructs the skew-symmetric matrix [v]× such that [v]× w = v × w.
///
/// ```text
/// [v]× = |  0   -v_z   v_y |
///        |  v_z   0   -v_x |
///        | -v_y  v_x    0  |
/// ```
#[inline]
#[rustfmt::skip]
pub fn skew_matrix(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y,
        v.z, 0.0, -v.x,
        -v.y, v.x, 0.0,
    )
}

/// Exponential map from a rotation vector to a unit quaternion.
#[inline]
pub fn exp_rotation(delta_theta: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_scaled_axis(*delta_theta)
}

/// Injects an attitude error into the nominal orientation: `q ⊗ Exp(δθ)`.
///
/// The error is a body-frame (right) perturbation. This is the same convention the
/// measurement Jacobians are derived under, so a filter that resets with this
/// function stays consistent with them.
pub fn compose_attitude_error(
    q_center: &UnitQuaternion<f64>,
    delta_theta: &Vector3<f64>,
) -> UnitQuaternion<f64> {
    q_center * exp_rotation(delta_theta)
}

/// Heading (rotation about world z) of an orientation, in radians.
pub fn yaw_from_quaternion(q: &UnitQuaternion<f64>) -> f64 {
    let q = q.quaternion();
    let t3 = 2.0 * (q.w * q.k + q.i * q.j);
    let t4 = 1.0 - 2.0 * (q.j * q.j + q.k * q.k);
    t3.atan2(t4)
}

/// Pure heading rotation about world z.
pub fn quaternion_from_yaw(yaw: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_unit_quaternion(rng: &mut ChaCha8Rng) -> UnitQuaternion<f64> {
        let axis_angle = Vector3::new(
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-3.0..3.0),
        );
        UnitQuaternion::from_scaled_axis(axis_angle)
    }

    #[test]
    fn rotation_round_trip_through_inverse() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let q = random_unit_quaternion(&mut rng);
            let v = Vector3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            let back = rotate_vector(&rotate_vector(&v, &q), &quat_inverse(&q));
            assert_relative_eq!(back, v, epsilon = 1e-9);
        }
    }

    #[test]
    fn inverse_negates_imaginary_part() {
        let q = UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1);
        let inv = quat_inverse(&q);
        assert_eq!(inv.w, q.w);
        assert_eq!(inv.i, -q.i);
        assert_eq!(inv.j, -q.j);
        assert_eq!(inv.k, -q.k);
    }

    #[test]
    fn identity_rotation_leaves_vector_untouched() {
        let v = Vector3::new(1.25, -3.5, 0.125);
        assert_eq!(rotate_vector(&v, &UnitQuaternion::identity()), v);
    }

    #[test]
    fn rotation_matches_matrix_form() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        let rotated = rotate_vector(&Vector3::x(), &q);
        assert_relative_eq!(rotated, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn skew_matrix_is_cross_product() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let w = Vector3::new(4.0, 5.0, 6.0);
        assert_relative_eq!(skew_matrix(&v) * w, v.cross(&w), epsilon = 1e-12);
    }

    #[test]
    fn skew_matrix_is_antisymmetric_and_annihilates_its_vector() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let v = Vector3::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            );
            let m = skew_matrix(&v);
            assert_eq!(m, -m.transpose());
            assert_abs_diff_eq!(m * v, Vector3::zeros(), epsilon = 1e-12);
        }
    }

    #[test]
    fn small_attitude_error_acts_like_skew_matrix() {
        // Exp(δθ)ᵀ v ≈ v + [v]× δθ for small δθ.
        let v = Vector3::new(0.0, 0.0, 9.81);
        let delta = Vector3::new(1e-6, -2e-6, 3e-6);
        let rotated = rotate_vector(&v, &quat_inverse(&exp_rotation(&delta)));
        let linear = v + skew_matrix(&v) * delta;
        assert_relative_eq!(rotated, linear, epsilon = 1e-10);
    }

    #[test]
    fn compose_with_zero_error_is_noop() {
        let q = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let composed = compose_attitude_error(&q, &Vector3::zeros());
        assert_relative_eq!(composed, q, epsilon = 1e-15);
    }

    #[test]
    fn yaw_round_trip() {
        for yaw in [-3.0, -1.2, 0.0, 0.4, 2.9] {
            assert_relative_eq!(
                yaw_from_quaternion(&quaternion_from_yaw(yaw)),
                yaw,
                epsilon = 1e-12
            );
        }
    }
}
