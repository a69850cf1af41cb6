// rover_sim/src/prelude.rs

// Re-export the rover_core prelude so the pure types are one import away.
pub use rover_core::prelude::*;

// Common simulation-specific types.
pub use crate::error::{Result as SimResult, SimError};
pub use crate::simulation::config::{load_scenario, parse_scenario};
pub use crate::simulation::core::config::*;
pub use crate::simulation::core::ground_truth::GroundTruthState;
pub use crate::simulation::core::prng::SimulationRng;
pub use crate::simulation::report::{ResidualStats, RunReport, SensorReport};
pub use crate::simulation::runner::{run_scenario, ScenarioRunner};
