// rover_sim/src/simulation/core/mod.rs

pub mod config;
pub mod ground_truth;
pub mod prng;
