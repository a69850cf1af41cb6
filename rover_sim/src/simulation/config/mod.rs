// rover_sim/src/simulation/config/mod.rs

//! Loading and validating scenario files.
//!
//! A scenario is a TOML file merged with `ROVER_`-prefixed environment variables,
//! nested keys separated by a double underscore
//! (`ROVER_SIMULATION__SEED=7`).

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::{Result, SimError};
use crate::simulation::core::config::ScenarioConfig;

fn env_overrides() -> Env {
    Env::prefixed("ROVER_").split("__")
}

/// Reads a scenario file, applies environment overrides and validates the result.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    info!("Loading scenario from: {}", path.display());
    let config: ScenarioConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(env_overrides())
        .extract()?;
    validate(&config)?;
    Ok(config)
}

/// Parses a scenario from a TOML string. Environment overrides are not applied.
pub fn parse_scenario(toml: &str) -> Result<ScenarioConfig> {
    let config: ScenarioConfig = Figment::new().merge(Toml::string(toml)).extract()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ScenarioConfig) -> Result<()> {
    let sim = &config.simulation;
    if !(sim.dt.is_finite() && sim.dt > 0.0) {
        return Err(SimError::InvalidScenario(format!(
            "simulation.dt must be positive, got {}",
            sim.dt
        )));
    }
    if !(sim.duration_seconds.is_finite() && sim.duration_seconds >= 0.0) {
        return Err(SimError::InvalidScenario(format!(
            "simulation.duration_seconds must be non-negative, got {}",
            sim.duration_seconds
        )));
    }

    let mut names = HashSet::new();
    for sensor in &config.sensors {
        sensor.validate()?;
        if !names.insert(sensor.name()) {
            return Err(SimError::InvalidScenario(format!(
                "duplicate sensor name '{}'",
                sensor.name()
            )));
        }
    }
    Ok(())
}
