// rover_sim/src/simulation/world.rs

use nalgebra::Vector3;
use rand::Rng;
use tracing::info;

use crate::simulation::core::config::WorldConfig;

/// The static environment the robot drives through.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub gravity: Vector3<f64>,
    /// Static points in the world frame that cameras can track.
    pub landmarks: Vec<Vector3<f64>>,
}

impl World {
    /// Builds the world from its config, drawing scattered landmarks from `rng`.
    pub fn from_config<R: Rng>(config: &WorldConfig, rng: &mut R) -> Self {
        let mut landmarks: Vec<_> = config.landmarks.iter().map(|&l| Vector3::from(l)).collect();
        if let Some(scatter) = &config.scatter {
            let h = scatter.half_extent.abs();
            landmarks.extend((0..scatter.count).map(|_| {
                Vector3::new(
                    rng.gen_range(-h..=h),
                    rng.gen_range(-h..=h),
                    rng.gen_range(0.0..=scatter.max_height.max(0.0)),
                )
            }));
        }
        info!(landmarks = landmarks.len(), "world built");

        Self {
            gravity: Vector3::from(config.gravity),
            landmarks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::core::config::ScatterConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn scatter_adds_landmarks_inside_the_box() {
        let config = WorldConfig {
            landmarks: vec![[1.0, 2.0, 0.5]],
            scatter: Some(ScatterConfig {
                count: 50,
                half_extent: 10.0,
                max_height: 1.0,
            }),
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let world = World::from_config(&config, &mut rng);

        assert_eq!(world.landmarks.len(), 51);
        assert_eq!(world.landmarks[0], Vector3::new(1.0, 2.0, 0.5));
        assert!(world.landmarks.iter().all(|l| {
            l.x.abs() <= 10.0 && l.y.abs() <= 10.0 && (0.0..=1.0).contains(&l.z)
        }));
    }

    #[test]
    fn same_seed_same_world() {
        let config = WorldConfig {
            scatter: Some(ScatterConfig {
                count: 5,
                half_extent: 3.0,
                max_height: 2.0,
            }),
            ..Default::default()
        };
        let a = World::from_config(&config, &mut ChaCha8Rng::seed_from_u64(9));
        let b = World::from_config(&config, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
