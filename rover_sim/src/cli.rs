use clap::Parser;
use std::path::PathBuf;

/// Rover: a headless scenario runner that audits measurement models against
/// simulated sensors.
///
/// This struct defines the command-line arguments accepted by the `rover_sim`
/// binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/00_square_loop.toml")]
    pub scenario: PathBuf,

    /// Override the scenario's PRNG seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the scenario's duration, in seconds.
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Write the run report as TOML to this path.
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}
