// rover_core/src/estimation/mod.rs

//! Glue between the measurement engine and an outer error-state EKF.
//!
//! The filter itself (covariance propagation, gain, injection) lives outside this
//! crate. What is provided here is the per-tick bookkeeping a filter needs before
//! it can run the standard correction: collecting `(z, z_prior, H, R)` from every
//! active sensor into one stacked system.

pub mod stack;

pub use stack::{MeasurementStack, StackedBlock};
