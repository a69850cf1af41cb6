// rover_core/src/state/layout.rs

//! Index layout of the 10-dimensional error state.
//!
//! Attitude-error and angular-rate entries are interleaved (even/odd), so the
//! three attitude columns and the three rate columns are each a stride-2 slice.
//! Always address them through the constants below rather than raw numbers.

/// Dimension of the error state.
pub const ERROR_STATE_DIM: usize = 10;

/// World-frame position, indices 0-2.
pub const POSITION: [usize; 3] = [0, 1, 2];
/// Forward (body-longitudinal) velocity.
pub const FORWARD_VELOCITY: usize = 3;
/// Attitude error about body x, y, z.
pub const ATTITUDE: [usize; 3] = [4, 6, 8];
/// Body-frame angular rate about x, y, z.
pub const ANGULAR_RATE: [usize; 3] = [5, 7, 9];
/// Yaw rate, the z component of [`ANGULAR_RATE`].
pub const YAW_RATE: usize = ANGULAR_RATE[2];

use serde::{Deserialize, Serialize};

/// Semantic name of every entry of the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateVariable {
    // --- Position (World Frame) ---
    Px,
    Py,
    Pz,
    // --- Velocity along the body x axis ---
    ForwardVelocity,
    // --- Attitude error (Body Frame) ---
    AttitudeX,
    AttitudeY,
    AttitudeZ,
    // --- Angular rate (Body Frame) ---
    Wx,
    Wy,
    Wz,
}

/// Returns the error-state layout, where position `i` of the returned array
/// describes entry `i` of the state vector.
pub fn error_state_layout() -> [StateVariable; ERROR_STATE_DIM] {
    [
        // --- Position --- indices 0-2
        StateVariable::Px,
        StateVariable::Py,
        StateVariable::Pz,
        // --- Forward velocity --- index 3
        StateVariable::ForwardVelocity,
        // --- Attitude error and angular rate, interleaved --- indices 4-9
        StateVariable::AttitudeX,
        StateVariable::Wx,
        StateVariable::AttitudeY,
        StateVariable::Wy,
        StateVariable::AttitudeZ,
        StateVariable::Wz,
    ]
}

/// Finds the index of a variable in the error-state layout.
pub fn index_of(var: StateVariable) -> usize {
    match var {
        StateVariable::Px => POSITION[0],
        StateVariable::Py => POSITION[1],
        StateVariable::Pz => POSITION[2],
        StateVariable::ForwardVelocity => FORWARD_VELOCITY,
        StateVariable::AttitudeX => ATTITUDE[0],
        StateVariable::AttitudeY => ATTITUDE[1],
        StateVariable::AttitudeZ => ATTITUDE[2],
        StateVariable::Wx => ANGULAR_RATE[0],
        StateVariable::Wy => ANGULAR_RATE[1],
        StateVariable::Wz => ANGULAR_RATE[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_and_index_agree() {
        for (i, var) in error_state_layout().iter().enumerate() {
            assert_eq!(index_of(*var), i, "{var:?}");
        }
    }

    #[test]
    fn attitude_and_rate_are_interleaved() {
        for k in 0..3 {
            assert_eq!(ATTITUDE[k], 4 + 2 * k);
            assert_eq!(ANGULAR_RATE[k], 5 + 2 * k);
        }
        assert_eq!(YAW_RATE, 9);
    }
}
