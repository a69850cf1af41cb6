// rover_sim/src/simulation/runner.rs

use rover_core::config::SensorConfig;
use rover_core::control::GoToGoalController;
use rover_core::estimation::MeasurementStack;
use rover_core::models::kinematics::{Twist2, UnicycleState};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::simulation::core::config::ScenarioConfig;
use crate::simulation::core::ground_truth::GroundTruthState;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::report::{ResidualStats, RunReport, SensorReport};
use crate::simulation::sensors::{build_simulator, SensorSimulator};
use crate::simulation::world::World;

/// Drives the robot through its goals and audits every sensor model.
///
/// Each step the controller picks a command, the true pose is propagated, every
/// sensor produces a noisy reading and the reading is compared with the model's
/// prediction at the true state. No estimation happens here: the residuals
/// measure how well each model explains the simulated physics.
pub struct ScenarioRunner {
    config: ScenarioConfig,
    world: World,
    sensors: Vec<Box<dyn SensorSimulator>>,
    stats: Vec<ResidualStats>,
    rng: SimulationRng,
    controller: GoToGoalController,
    goals: Vec<[f64; 2]>,
}

impl ScenarioRunner {
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        let mut rng = SimulationRng::new(config.simulation.seed);
        let world = World::from_config(&config.world, &mut rng.0);
        let start = config.robot.start_pose();

        let sensors = config
            .sensors
            .iter()
            .map(|sensor| {
                info!("  -> Adding {} sensor '{}'", sensor_kind(sensor), sensor.name());
                build_simulator(sensor, &start, &world)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            stats: vec![ResidualStats::default(); sensors.len()],
            controller: config.robot.controller,
            goals: config.robot.goals.clone(),
            config,
            world,
            sensors,
            rng,
        })
    }

    pub fn run(mut self) -> Result<RunReport> {
        let sim = &self.config.simulation;
        let dt = sim.dt;
        let max_steps = (sim.duration_seconds / dt).round() as usize;
        let stop_at_last_goal = sim.stop_at_last_goal;

        let mut pose = self.config.robot.start_pose();
        let mut previous_twist = Twist2::default();
        let mut goal_index = 0;
        let mut stack = MeasurementStack::new();
        let mut steps = 0;

        info!(
            max_steps,
            dt,
            sensors = self.sensors.len(),
            goals = self.goals.len(),
            "starting scenario"
        );

        while steps < max_steps {
            // --- 1. Goal bookkeeping ---
            while let Some(&[gx, gy]) = self.goals.get(goal_index) {
                if !self.controller.goal_reached(&pose, gx, gy) {
                    break;
                }
                info!(goal = goal_index, x = gx, y = gy, "goal reached");
                goal_index += 1;
            }
            if goal_index == self.goals.len() && stop_at_last_goal {
                break;
            }

            // --- 2. Control and ground truth ---
            let twist = match self.goals.get(goal_index) {
                Some(&[gx, gy]) => self.controller.control(&pose, gx, gy),
                None => Twist2::default(),
            };
            let previous_pose = pose;
            pose = pose.propagate(&twist, dt);
            steps += 1;

            let truth = GroundTruthState {
                time: steps as f64 * dt,
                dt,
                previous_pose,
                pose,
                twist,
                previous_twist,
            };
            previous_twist = twist;

            // --- 3. Sense and compare ---
            let point = truth.linearization_point();
            stack.clear();
            for (sensor, stats) in self.sensors.iter_mut().zip(&mut self.stats) {
                let Some(data) = sensor.sample(&truth, &self.world, &mut self.rng) else {
                    continue;
                };
                match stack.push(sensor.model(), &point, &data) {
                    Ok(()) => {
                        if let Some(block) = stack.blocks().last() {
                            stats.record(block);
                        }
                    }
                    Err(e) => {
                        warn!(sensor = sensor.model().name(), error = %e, "reading rejected");
                        stats.reject();
                    }
                }
            }
            debug!(step = steps, rows = stack.dim(), "step complete");
        }

        let report = self.finish(steps, goal_index, &pose);
        Ok(report)
    }

    fn finish(&self, steps: usize, goals_reached: usize, pose: &UnicycleState) -> RunReport {
        let sensors = self
            .sensors
            .iter()
            .zip(&self.stats)
            .map(|(sensor, stats)| {
                let model = sensor.model();
                SensorReport::new(model.name(), &model.kind().to_string(), stats)
            })
            .collect();

        let mut report = RunReport {
            seed: self.config.simulation.seed,
            steps,
            simulated_seconds: steps as f64 * self.config.simulation.dt,
            goals_reached,
            goals_total: self.goals.len(),
            final_pose: [0.0; 3],
            sensors,
        };
        report.set_final_pose(pose);
        report
    }
}

fn sensor_kind(sensor: &SensorConfig) -> &'static str {
    match sensor {
        SensorConfig::Odometry(_) => "Odometry",
        SensorConfig::ReferenceVector(_) => "ReferenceVector",
        SensorConfig::Gyroscope(_) => "Gyroscope",
        SensorConfig::YawRate(_) => "YawRate",
        SensorConfig::Flow(_) => "Flow",
    }
}

/// Builds and runs a scenario in one go.
pub fn run_scenario(config: ScenarioConfig) -> Result<RunReport> {
    ScenarioRunner::new(config)?.run()
}
