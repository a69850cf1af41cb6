// rover_sim/src/simulation/report.rs

use rover_core::estimation::StackedBlock;
use rover_core::models::kinematics::UnicycleState;
use rover_core::state::layout::{index_of, StateVariable};
use serde::Serialize;

/// Running statistics of one sensor's innovations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResidualStats {
    /// Readings that produced a block.
    pub accepted: usize,
    /// Readings the model refused.
    pub rejected: usize,
    /// Total residual rows seen.
    pub rows: usize,
    sum_squares: f64,
    /// Largest absolute residual component.
    pub max_abs: f64,
    /// Rows of the blocks whose `R` could be inverted.
    pub nis_rows: usize,
    sum_nis: f64,
    /// Error-state entries any accepted block depended on.
    pub observed_states: Vec<StateVariable>,
}

impl ResidualStats {
    pub fn record(&mut self, block: &StackedBlock) {
        self.accepted += 1;
        self.rows += block.dim();
        self.sum_squares += block.residual.norm_squared();
        self.max_abs = self.max_abs.max(block.residual.amax());
        if let Some(nis) = block.normalized_residual() {
            self.nis_rows += block.dim();
            self.sum_nis += nis;
        }
        for var in block.observed_states() {
            if !self.observed_states.contains(&var) {
                self.observed_states.push(var);
            }
        }
        self.observed_states.sort_by_key(|&var| index_of(var));
    }

    pub fn reject(&mut self) {
        self.rejected += 1;
    }

    /// Root mean square over every residual row.
    pub fn rms(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            (self.sum_squares / self.rows as f64).sqrt()
        }
    }

    /// Mean of `yᵀR⁻¹y / rows` over the readings with an invertible `R`. Close
    /// to one when the configured noise matches the residuals; `None` when no
    /// such reading was seen, e.g. for a noiseless sensor.
    pub fn mean_nis_per_row(&self) -> Option<f64> {
        (self.nis_rows > 0).then(|| self.sum_nis / self.nis_rows as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReport {
    pub name: String,
    pub kind: String,
    pub accepted: usize,
    pub rejected: usize,
    pub rms: f64,
    pub max_abs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_nis_per_row: Option<f64>,
    pub observed_states: Vec<StateVariable>,
}

impl SensorReport {
    pub fn new(name: &str, kind: &str, stats: &ResidualStats) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            accepted: stats.accepted,
            rejected: stats.rejected,
            rms: stats.rms(),
            max_abs: stats.max_abs,
            mean_nis_per_row: stats.mean_nis_per_row(),
            observed_states: stats.observed_states.clone(),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub seed: Option<u64>,
    pub steps: usize,
    pub simulated_seconds: f64,
    pub goals_reached: usize,
    pub goals_total: usize,
    /// Final pose `[x, y, yaw_rad]`.
    pub final_pose: [f64; 3],
    pub sensors: Vec<SensorReport>,
}

impl RunReport {
    pub fn set_final_pose(&mut self, pose: &UnicycleState) {
        self.final_pose = [pose.x, pose.y, pose.yaw];
    }

    pub fn sensor(&self, name: &str) -> Option<&SensorReport> {
        self.sensors.iter().find(|s| s.name == name)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    fn block(residual: &[f64], variance: f64) -> StackedBlock {
        let n = residual.len();
        StackedBlock {
            model: "s".into(),
            residual: DVector::from_column_slice(residual),
            h: DMatrix::zeros(n, 10),
            r: DMatrix::identity(n, n) * variance,
        }
    }

    #[test]
    fn stats_accumulate_rms_and_max() {
        let mut stats = ResidualStats::default();
        stats.record(&block(&[3.0, -4.0], 1.0));
        stats.record(&block(&[0.0, 0.0], 1.0));
        stats.reject();

        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.rows, 4);
        assert_relative_eq!(stats.rms(), (25.0_f64 / 4.0).sqrt());
        assert_eq!(stats.max_abs, 4.0);
        assert_relative_eq!(stats.mean_nis_per_row().unwrap(), 25.0 / 4.0);
    }

    #[test]
    fn singular_noise_is_left_out_of_nis() {
        let mut stats = ResidualStats::default();
        stats.record(&block(&[1.0, 1.0], 0.0));
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.mean_nis_per_row(), None);

        stats.record(&block(&[2.0], 1.0));
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.nis_rows, 1);
        assert_relative_eq!(stats.mean_nis_per_row().unwrap(), 4.0);
    }

    #[test]
    fn observed_states_are_merged_in_layout_order() {
        let mut wz = block(&[0.0], 1.0);
        wz.h[(0, 9)] = 1.0;
        let mut velocity = block(&[0.0], 1.0);
        velocity.h[(0, 3)] = 1.0;

        let mut stats = ResidualStats::default();
        stats.record(&wz);
        stats.record(&velocity);
        stats.record(&wz);
        assert_eq!(
            stats.observed_states,
            vec![StateVariable::ForwardVelocity, StateVariable::Wz]
        );
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = ResidualStats::default();
        assert_eq!(stats.rms(), 0.0);
        assert_eq!(stats.mean_nis_per_row(), None);
    }

    #[test]
    fn report_serializes_to_toml() {
        let mut stats = ResidualStats::default();
        stats.record(&block(&[0.5], 0.25));
        let report = RunReport {
            seed: Some(7),
            steps: 10,
            simulated_seconds: 0.5,
            goals_reached: 1,
            goals_total: 2,
            final_pose: [1.0, 2.0, 0.0],
            sensors: vec![SensorReport::new("wheels", "wheel odometry", &stats)],
        };
        let text = report.to_toml().unwrap();
        assert!(text.contains("goals_reached = 1"));
        assert!(text.contains("[[sensors]]"));
        assert!(text.contains("name = \"wheels\""));
        assert_eq!(report.sensor("wheels").unwrap().mean_nis_per_row, Some(1.0));
    }
}
