// rover_sim/src/main.rs

//! Headless scenario runner.
//!
//! `cargo run -p rover_sim -- --scenario assets/scenarios/00_square_loop.toml`
//!
//! Log verbosity follows `RUST_LOG`; `RUST_LOG=rover_core=debug` shows every
//! stacked measurement block.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rover_sim::cli::Cli;
use rover_sim::error::Result;
use rover_sim::simulation::config::load_scenario;
use rover_sim::simulation::report::RunReport;
use rover_sim::simulation::runner::run_scenario;

const DEFAULT_LOG_FILTER: &str = "info";

fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(report) => {
            log_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunReport> {
    // --- 1. Load Simulation Configuration ---
    let mut config = load_scenario(&cli.scenario)?;
    if let Some(seed) = cli.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(duration) = cli.duration {
        config.simulation.duration_seconds = duration;
    }

    // --- 2. Run ---
    let report = run_scenario(config)?;

    // --- 3. Persist the report if asked ---
    if let Some(path) = &cli.report {
        std::fs::write(path, report.to_toml()?)?;
        info!("Report written to: {}", path.display());
    }
    Ok(report)
}

fn log_summary(report: &RunReport) {
    info!(
        steps = report.steps,
        seconds = report.simulated_seconds,
        "Reached {}/{} goals, final pose x={:.2} y={:.2} yaw={:.2}",
        report.goals_reached,
        report.goals_total,
        report.final_pose[0],
        report.final_pose[1],
        report.final_pose[2],
    );
    for sensor in &report.sensors {
        let nis = sensor
            .mean_nis_per_row
            .map_or_else(|| "n/a".to_string(), |nis| format!("{nis:.3}"));
        info!(
            "  {:<16} {:<16} accepted={:<6} rejected={:<4} rms={:.4} max={:.4} nis/row={}",
            sensor.name,
            sensor.kind,
            sensor.accepted,
            sensor.rejected,
            sensor.rms,
            sensor.max_abs,
            nis,
        );
    }
}
