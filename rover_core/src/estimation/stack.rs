// rover_core/src/estimation/stack.rs

use crate::error::{MeasurementError, Result};
use crate::messages::MeasurementData;
use crate::models::measurement::{MeasurementModel, MeasurementPrior};
use crate::state::layout::{error_state_layout, index_of, StateVariable, ERROR_STATE_DIM};
use crate::state::LinearizationPoint;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

/// One sensor's contribution to a filter tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedBlock {
    /// Name of the model that produced the block.
    pub model: String,
    /// Innovation `y = z − z_prior`.
    pub residual: DVector<f64>,
    /// Jacobian `H`, `[rows, 10]`.
    pub h: DMatrix<f64>,
    /// Noise covariance `R`, `[rows, rows]`.
    pub r: DMatrix<f64>,
}

impl StackedBlock {
    pub fn dim(&self) -> usize {
        self.residual.len()
    }

    /// Whether any row of `H` depends on `var`.
    pub fn observes(&self, var: StateVariable) -> bool {
        self.h.column(index_of(var)).iter().any(|&x| x != 0.0)
    }

    /// The error-state entries this block constrains, in layout order.
    pub fn observed_states(&self) -> Vec<StateVariable> {
        error_state_layout()
            .into_iter()
            .filter(|&var| self.observes(var))
            .collect()
    }

    /// Normalized innovation ignoring state uncertainty, `yᵀ R⁻¹ y`.
    ///
    /// Useful as a sanity check on a sensor's noise model. Returns `None` when `R`
    /// is singular.
    pub fn normalized_residual(&self) -> Option<f64> {
        let r_inv = self.r.clone().try_inverse()?;
        Some((self.residual.transpose() * r_inv * &self.residual)[(0, 0)])
    }
}

/// Collects every sensor block for one filter tick.
///
/// The stacked `y`, `H` and `R` feed straight into the standard EKF correction
/// `S = H P Hᵀ + R`, `K = P Hᵀ S⁻¹`. Blocks are kept in push order.
#[derive(Debug, Clone, Default)]
pub struct MeasurementStack {
    blocks: Vec<StackedBlock>,
}

impl MeasurementStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Linearizes `model` for `data` at `point` and appends the block.
    ///
    /// Nothing is appended on error; a block with a non-finite prior is rejected
    /// so that a degenerate feature cannot poison the whole update.
    pub fn push(
        &mut self,
        model: &dyn MeasurementModel,
        point: &LinearizationPoint,
        data: &MeasurementData,
    ) -> Result<()> {
        let z = model.observe(data)?;
        let prior = model.predict(point, data)?;
        let r = model.noise_covariance(prior.dim());
        self.push_prior(model.name(), z, prior, r)
    }

    /// Appends an already computed prior.
    pub fn push_prior(
        &mut self,
        model: &str,
        z: DVector<f64>,
        prior: MeasurementPrior,
        r: DMatrix<f64>,
    ) -> Result<()> {
        let prior = prior
            .ensure_finite(model)
            .inspect_err(|_| warn!(model, "dropping non-finite measurement block"))?;
        let rows = prior.dim();
        if z.len() != rows {
            return Err(MeasurementError::ObservationDimension {
                model: model.to_string(),
                expected: rows,
                got: z.len(),
            });
        }
        if r.shape() != (rows, rows) {
            return Err(MeasurementError::NoiseDimension {
                model: model.to_string(),
                expected: rows,
                got: r.nrows(),
            });
        }

        let block = StackedBlock {
            model: model.to_string(),
            residual: z - prior.z,
            h: prior.h,
            r,
        };
        debug!(model, rows, states = ?block.observed_states(), "stacked measurement block");
        self.blocks.push(block);
        Ok(())
    }

    pub fn blocks(&self) -> &[StackedBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total number of measurement rows.
    pub fn dim(&self) -> usize {
        self.blocks.iter().map(StackedBlock::dim).sum()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Stacked innovation `y`, length `M`.
    pub fn innovation(&self) -> DVector<f64> {
        let mut y = DVector::zeros(self.dim());
        let mut row = 0;
        for block in &self.blocks {
            y.rows_mut(row, block.dim()).copy_from(&block.residual);
            row += block.dim();
        }
        y
    }

    /// Stacked Jacobian `H`, shape `[M, 10]`.
    pub fn jacobian(&self) -> DMatrix<f64> {
        let mut h = DMatrix::zeros(self.dim(), ERROR_STATE_DIM);
        let mut row = 0;
        for block in &self.blocks {
            h.rows_mut(row, block.dim()).copy_from(&block.h);
            row += block.dim();
        }
        h
    }

    /// Block-diagonal noise covariance `R`, shape `[M, M]`.
    pub fn noise_covariance(&self) -> DMatrix<f64> {
        let m = self.dim();
        let mut r = DMatrix::zeros(m, m);
        let mut row = 0;
        for block in &self.blocks {
            let n = block.dim();
            r.view_mut((row, row), (n, n)).copy_from(&block.r);
            row += n;
        }
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::measurement::{GyroscopeModel, WheelOdometryModel};
    use crate::state::ErrorState;
    use nalgebra::{UnitQuaternion, Vector3};

    fn point() -> LinearizationPoint {
        let mut state = ErrorState::zeros();
        state.set_forward_velocity(1.0);
        state.set_angular_rate(&Vector3::new(0.0, 0.0, 0.5));
        LinearizationPoint::new(state, UnitQuaternion::identity())
    }

    #[test]
    fn blocks_stack_in_push_order() {
        let wheels = WheelOdometryModel::new("wheels", 0.1, 0.2);
        let gyro = GyroscopeModel::new("gyro", [0.01, 0.01, 0.01], None);

        let mut stack = MeasurementStack::new();
        stack
            .push(
                &wheels,
                &point(),
                &MeasurementData::WheelOdometry {
                    velocity: 1.25,
                    yaw_rate: 0.5,
                },
            )
            .unwrap();
        stack
            .push(
                &gyro,
                &point(),
                &MeasurementData::AngularRate(Vector3::new(0.0, 0.0, 0.25)),
            )
            .unwrap();

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.dim(), 5);
        assert_eq!(stack.innovation().as_slice(), &[0.25, 0.0, 0.0, 0.0, -0.25]);

        let h = stack.jacobian();
        assert_eq!(h.shape(), (5, 10));
        assert_eq!(h[(0, 3)], 1.0);
        assert_eq!(h[(1, 9)], 1.0);
        assert_eq!(h[(4, 9)], 1.0);

        let r = stack.noise_covariance();
        assert_eq!(r.shape(), (5, 5));
        assert_eq!(r[(1, 1)], 0.2 * 0.2);
        assert_eq!(r[(2, 2)], 0.01 * 0.01);
        assert_eq!(r[(1, 2)], 0.0);
    }

    #[test]
    fn failed_push_leaves_stack_untouched() {
        let wheels = WheelOdometryModel::new("wheels", 0.1, 0.2);
        let mut stack = MeasurementStack::new();
        assert!(stack
            .push(&wheels, &point(), &MeasurementData::YawRate(0.0))
            .is_err());
        assert!(stack.is_empty());
    }

    #[test]
    fn non_finite_prior_is_dropped() {
        let mut stack = MeasurementStack::new();
        let mut prior = MeasurementPrior::zeros(1);
        prior.z[0] = f64::NAN;
        let err = stack
            .push_prior("bad", DVector::zeros(1), prior, DMatrix::identity(1, 1))
            .unwrap_err();
        assert_eq!(err, MeasurementError::NonFinite { model: "bad".into() });
        assert!(stack.is_empty());
    }

    #[test]
    fn observation_length_must_match_prior() {
        let mut stack = MeasurementStack::new();
        let err = stack
            .push_prior(
                "short",
                DVector::zeros(1),
                MeasurementPrior::zeros(2),
                DMatrix::identity(2, 2),
            )
            .unwrap_err();
        assert_eq!(
            err,
            MeasurementError::ObservationDimension {
                model: "short".into(),
                expected: 2,
                got: 1,
            }
        );
        assert!(err.to_string().contains("observed 1 rows"));

        let err = stack
            .push_prior(
                "wide",
                DVector::zeros(2),
                MeasurementPrior::zeros(2),
                DMatrix::identity(3, 3),
            )
            .unwrap_err();
        assert!(matches!(err, MeasurementError::NoiseDimension { got: 3, .. }));
        assert!(stack.is_empty());
    }

    #[test]
    fn blocks_name_the_states_they_observe() {
        let wheels = WheelOdometryModel::new("wheels", 0.1, 0.2);
        let mut stack = MeasurementStack::new();
        stack
            .push(
                &wheels,
                &point(),
                &MeasurementData::WheelOdometry {
                    velocity: 1.0,
                    yaw_rate: 0.5,
                },
            )
            .unwrap();

        let block = &stack.blocks()[0];
        assert!(block.observes(StateVariable::ForwardVelocity));
        assert!(!block.observes(StateVariable::AttitudeZ));
        assert_eq!(
            block.observed_states(),
            vec![StateVariable::ForwardVelocity, StateVariable::Wz]
        );
    }

    #[test]
    fn normalized_residual_uses_noise() {
        let block = StackedBlock {
            model: "m".into(),
            residual: DVector::from_column_slice(&[2.0, 0.0]),
            h: DMatrix::zeros(2, 10),
            r: DMatrix::from_diagonal(&DVector::from_column_slice(&[4.0, 1.0])),
        };
        assert_eq!(block.normalized_residual(), Some(1.0));
    }
}
