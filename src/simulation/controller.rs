//! Cycle controller: run state machine and the per-cycle algorithm.
//!
//! One call to [`Simulation::step`] executes a full cycle:
//! 1) random permanent failures
//! 2) coverage optimization over the surviving sensors
//! 3) shortest routes from every usable sensor to the sink
//! 4) one delivery attempt per selected, reachable sensor
//! 5) on/off bookkeeping and sleep charges
//! 6) coverage measurement and the termination check
//!
//! The controller is synchronous and owns all simulation state. Scheduling
//! between cycles is left to the caller (the embassy driver task in GUI mode,
//! a plain loop in headless mode and tests).

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::fmt;

use crate::common::config::{ConfigError, SimulationConfig};

use super::geometry::{Topology, TopologyError, covers};
use super::optimizer::{BinarySolver, GoodLpSolver, select_sensors};
use super::routing::{PathMap, paths_to_sink};
use super::transmission::{EnergyCosts, TransmissionOutcome, chance, transmit};
use super::types::{FinalClass, Point, SensorClass, SensorIndex, SensorRole};

/// Consecutive below-target cycles tolerated before the run terminates.
pub const LOW_COVERAGE_LIMIT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimulationState {
    Idle,
    Running,
    Paused,
    Terminated,
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimulationState::Idle => "Idle",
            SimulationState::Running => "Running",
            SimulationState::Paused => "Paused",
            SimulationState::Terminated => "Terminated",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum ControllerError {
    /// No configuration has been loaded yet.
    Unconfigured,
    /// The run has terminated; reset before starting again.
    Terminated,
    /// The configuration was rejected.
    Config(ConfigError),
    /// The topology could not be generated from the configuration.
    Topology(TopologyError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Unconfigured => write!(f, "No configuration loaded"),
            ControllerError::Terminated => write!(f, "Simulation has terminated, reset to run again"),
            ControllerError::Config(e) => write!(f, "{}", e),
            ControllerError::Topology(e) => write!(f, "Topology generation failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<TopologyError> for ControllerError {
    fn from(e: TopologyError) -> Self {
        ControllerError::Topology(e)
    }
}

/// Outcome of one executed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub selected: usize,
    pub sent: u64,
    pub delivered: u64,
    pub lost: u64,
    pub coverage_percent: f64,
    pub active: usize,
    pub on: usize,
    pub failed: usize,
    pub terminated: bool,
}

/// Per-sensor view for presentation.
#[derive(Debug, Clone)]
pub struct SensorView {
    pub index: SensorIndex,
    pub role: SensorRole,
    pub position: Point,
    pub energy: f64,
    pub is_on: bool,
    pub is_failed: bool,
    pub class: SensorClass,
    /// Frozen at termination; `None` while the run is live.
    pub final_class: Option<FinalClass>,
    pub neighbors: Vec<SensorIndex>,
}

impl SensorView {
    pub fn label(&self) -> String {
        self.role.to_string()
    }
}

/// Everything the UI needs to draw the current state.
#[derive(Debug, Clone)]
pub struct SimulationSnapshot {
    pub state: SimulationState,
    pub cycle: u64,
    pub field_width: f64,
    pub field_height: f64,
    pub coverage_radius: f64,
    pub min_coverage_percent: f64,
    pub points: Vec<Point>,
    pub sensors: Vec<SensorView>,
    pub sink: Option<SensorIndex>,
    pub coverage_percent: f64,
    pub active: usize,
    pub on: usize,
    pub failed: usize,
    pub sent: u64,
    pub delivered: u64,
    pub lost: u64,
    pub pdr_percent: f64,
    pub mean_latency: f64,
    pub paths: PathMap,
}

/// One sensor line of the run log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorRecord {
    pub label: String,
    /// `None` for the sink, whose energy is unlimited.
    pub final_energy: Option<f64>,
    pub final_class: FinalClass,
    pub neighbors: Vec<String>,
}

/// Final statistics written to the run log when a run terminates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_cycles: u64,
    pub packets_sent: u64,
    pub packets_delivered: u64,
    pub packets_lost: u64,
    pub pdr_percent: f64,
    pub mean_latency_hops: f64,
    pub sensors: Vec<SensorRecord>,
}

/// Running packet counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct DeliveryStats {
    sent: u64,
    delivered: u64,
    lost: u64,
    total_hops: u64,
}

impl DeliveryStats {
    fn pdr_percent(&self) -> f64 {
        if self.sent == 0 { 0.0 } else { self.delivered as f64 / self.sent as f64 * 100.0 }
    }

    fn mean_latency(&self) -> f64 {
        if self.delivered == 0 { 0.0 } else { self.total_hops as f64 / self.delivered as f64 }
    }
}

/// Metrics measured at the end of the latest cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CycleMetrics {
    coverage_percent: f64,
    active: usize,
    on: usize,
    failed: usize,
}

fn rng_for(config: &SimulationConfig) -> StdRng {
    match config.fixed_seed() {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Simulation run: configuration, topology, counters and the state machine.
pub struct Simulation {
    config: Option<SimulationConfig>,
    topology: Option<Topology>,
    state: SimulationState,
    rng: StdRng,
    solver: Box<dyn BinarySolver + Send>,
    cycle: u64,
    low_coverage_streak: u32,
    stats: DeliveryStats,
    metrics: CycleMetrics,
    paths: PathMap,
    final_classes: Option<Vec<FinalClass>>,
    summary: Option<RunSummary>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(Box::new(GoodLpSolver))
    }
}

impl Simulation {
    pub fn new(solver: Box<dyn BinarySolver + Send>) -> Self {
        Self {
            config: None,
            topology: None,
            state: SimulationState::Idle,
            rng: StdRng::from_entropy(),
            solver,
            cycle: 0,
            low_coverage_streak: 0,
            stats: DeliveryStats::default(),
            metrics: CycleMetrics::default(),
            paths: PathMap::new(),
            final_classes: None,
            summary: None,
        }
    }

    /// Controller over a hand-built topology; the RNG is seeded from `config`.
    #[cfg(test)]
    pub(crate) fn with_topology(config: SimulationConfig, topology: Topology, solver: Box<dyn BinarySolver + Send>) -> Self {
        let mut sim = Self::new(solver);
        sim.rng = rng_for(&config);
        sim.metrics = initial_metrics(&topology);
        sim.config = Some(config);
        sim.topology = Some(topology);
        sim
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn config(&self) -> Option<&SimulationConfig> {
        self.config.as_ref()
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Summary of the terminated run, if any.
    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Install a new configuration and rebuild the topology.
    ///
    /// The configuration is validated first. On any error the previous
    /// configuration and topology stay in effect.
    pub fn configure(&mut self, config: SimulationConfig) -> Result<(), ControllerError> {
        config
            .validate()
            .map_err(|e| ControllerError::Config(ConfigError::ValidationError(e)))?;

        let mut rng = rng_for(&config);
        let topology = Topology::generate(&config, &mut rng)?;

        self.config = Some(config);
        self.install(topology, rng);
        Ok(())
    }

    /// Discard the run and regenerate the topology from the current configuration.
    ///
    /// Reseeds the RNG, so a fixed `SEED` reproduces the same run. Without a
    /// configuration everything is cleared.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        let Some(config) = self.config.as_ref() else {
            self.topology = None;
            self.install_empty();
            return Ok(());
        };

        let mut rng = rng_for(config);
        let topology = Topology::generate(config, &mut rng)?;
        self.install(topology, rng);
        log::info!("Simulation reset");
        Ok(())
    }

    fn install(&mut self, topology: Topology, rng: StdRng) {
        self.metrics = initial_metrics(&topology);
        self.topology = Some(topology);
        self.rng = rng;
        self.install_empty();
    }

    fn install_empty(&mut self) {
        self.state = SimulationState::Idle;
        self.cycle = 0;
        self.low_coverage_streak = 0;
        self.stats = DeliveryStats::default();
        self.paths.clear();
        self.final_classes = None;
        self.summary = None;
        if self.topology.is_none() {
            self.metrics = CycleMetrics::default();
        }
    }

    /// `Idle → Running`, or resume from `Paused`.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        if self.config.is_none() || self.topology.is_none() {
            return Err(ControllerError::Unconfigured);
        }
        match self.state {
            SimulationState::Idle | SimulationState::Paused => {
                self.state = SimulationState::Running;
                log::info!("Simulation running");
                Ok(())
            }
            SimulationState::Running => Ok(()),
            SimulationState::Terminated => Err(ControllerError::Terminated),
        }
    }

    /// `Running → Paused`; ignored in any other state.
    pub fn pause(&mut self) {
        if self.state == SimulationState::Running {
            self.state = SimulationState::Paused;
            log::info!("Simulation paused at cycle {}", self.cycle);
        }
    }

    /// `Paused → Running`; ignored in any other state.
    pub fn resume(&mut self) {
        if self.state == SimulationState::Paused {
            self.state = SimulationState::Running;
            log::info!("Simulation resumed at cycle {}", self.cycle);
        }
    }

    /// Execute one cycle.
    ///
    /// # Returns
    ///
    /// `Ok(Some(report))` when a cycle ran, `Ok(None)` when the controller is
    /// not running, `Err(Unconfigured)` when no configuration is loaded.
    pub fn step(&mut self) -> Result<Option<CycleReport>, ControllerError> {
        let Some(config) = self.config.clone() else {
            return Err(ControllerError::Unconfigured);
        };
        if self.state != SimulationState::Running {
            return Ok(None);
        }
        let Some(topology) = self.topology.as_mut() else {
            return Err(ControllerError::Unconfigured);
        };

        self.cycle += 1;
        let cycle = self.cycle;

        for sensor in topology.sensors.iter_mut().filter(|s| !s.is_sink() && !s.is_failed) {
            if chance(config.failure_prob, &mut self.rng) {
                sensor.fail();
                log::debug!("[{}] Sensor {} failed", cycle, sensor.role);
            }
        }

        let required = config.required_points(topology.points.len());
        let selected = select_sensors(
            &topology.points,
            &topology.sensors,
            config.coverage_radius,
            required,
            self.solver.as_ref(),
        );
        self.paths = paths_to_sink(topology.sink, &topology.sensors);

        let costs = EnergyCosts::from(&config);
        let mut active = vec![false; topology.sensors.len()];
        let mut covered = vec![false; topology.points.len()];
        let (mut sent, mut delivered, mut lost) = (0u64, 0u64, 0u64);

        for &source in &selected {
            if topology.sensors[source].is_failed {
                continue;
            }
            // Unrouted packets count as sent but neither delivered nor lost.
            sent += 1;
            let Some(path) = self.paths.get(&source) else {
                log::debug!("[{}] Sensor {} has no route to the sink", cycle, topology.sensors[source].role);
                continue;
            };

            match transmit(path, &mut topology.sensors, &costs, config.packet_loss_prob, &mut self.rng) {
                TransmissionOutcome::Delivered { hops } => {
                    delivered += 1;
                    self.stats.total_hops += hops as u64;
                    for &n in path.iter().filter(|&&n| n != topology.sink) {
                        active[n] = true;
                    }
                    let sensor = &topology.sensors[source];
                    for (i, point) in topology.points.iter().enumerate() {
                        if covers(sensor, point, config.coverage_radius) {
                            covered[i] = true;
                        }
                    }
                }
                TransmissionOutcome::Lost(reason) => {
                    lost += 1;
                    log::debug!("[{}] Packet from sensor {} lost: {:?}", cycle, topology.sensors[source].role, reason);
                }
            }
        }

        self.stats.sent += sent;
        self.stats.delivered += delivered;
        self.stats.lost += lost;

        for (i, sensor) in topology.sensors.iter_mut().enumerate() {
            if sensor.is_sink() || sensor.is_failed {
                continue;
            }
            if active[i] {
                sensor.is_on = true;
            } else {
                sensor.is_on = false;
                sensor.drain(costs.sleep);
            }
        }

        let covered_count = covered.iter().filter(|&&c| c).count();
        let coverage_percent = if topology.points.is_empty() {
            0.0
        } else {
            covered_count as f64 / topology.points.len() as f64 * 100.0
        };
        self.metrics = CycleMetrics {
            coverage_percent,
            ..initial_metrics(topology)
        };

        log::info!(
            "[{}] Selected {}, delivered {}/{}, coverage {:.2}%, active {}, on {}, failed {}",
            cycle,
            selected.len(),
            delivered,
            sent,
            coverage_percent,
            self.metrics.active,
            self.metrics.on,
            self.metrics.failed
        );

        let terminated = self.low_coverage_streak >= LOW_COVERAGE_LIMIT || self.metrics.active == 0;
        if terminated {
            self.terminate();
        } else if coverage_percent < config.min_coverage_percent {
            self.low_coverage_streak += 1;
        } else {
            self.low_coverage_streak = 0;
        }

        Ok(Some(CycleReport {
            cycle,
            selected: selected.len(),
            sent,
            delivered,
            lost,
            coverage_percent,
            active: self.metrics.active,
            on: self.metrics.on,
            failed: self.metrics.failed,
            terminated,
        }))
    }

    fn terminate(&mut self) {
        self.state = SimulationState::Terminated;
        let Some(topology) = self.topology.as_ref() else {
            return;
        };

        let classes: Vec<FinalClass> = topology.sensors.iter().map(|s| s.final_class()).collect();
        let records = topology
            .sensors
            .iter()
            .zip(&classes)
            .map(|(sensor, class)| SensorRecord {
                label: sensor.role.to_string(),
                final_energy: if sensor.is_sink() { None } else { Some(sensor.energy) },
                final_class: *class,
                neighbors: sensor.neighbors.iter().map(|&n| topology.sensors[n].role.to_string()).collect(),
            })
            .collect();

        let summary = RunSummary {
            total_cycles: self.cycle,
            packets_sent: self.stats.sent,
            packets_delivered: self.stats.delivered,
            packets_lost: self.stats.lost,
            pdr_percent: self.stats.pdr_percent(),
            mean_latency_hops: self.stats.mean_latency(),
            sensors: records,
        };
        log::info!(
            "[{}] Simulation terminated: PDR {:.2}%, mean latency {:.2} hops",
            self.cycle,
            summary.pdr_percent,
            summary.mean_latency_hops
        );

        self.final_classes = Some(classes);
        self.summary = Some(summary);
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        let (field_width, field_height, coverage_radius, min_coverage_percent) = match &self.config {
            Some(c) => (c.field_width as f64, c.field_height as f64, c.coverage_radius, c.min_coverage_percent),
            None => (0.0, 0.0, 0.0, 0.0),
        };

        let (points, sensors, sink) = match &self.topology {
            Some(topology) => {
                let views = topology
                    .sensors
                    .iter()
                    .enumerate()
                    .map(|(index, s)| SensorView {
                        index,
                        role: s.role,
                        position: s.position,
                        energy: s.energy,
                        is_on: s.is_on,
                        is_failed: s.is_failed,
                        class: s.class(),
                        final_class: self.final_classes.as_ref().and_then(|c| c.get(index).copied()),
                        neighbors: s.neighbors.clone(),
                    })
                    .collect();
                (topology.points.clone(), views, Some(topology.sink))
            }
            None => (Vec::new(), Vec::new(), None),
        };

        SimulationSnapshot {
            state: self.state,
            cycle: self.cycle,
            field_width,
            field_height,
            coverage_radius,
            min_coverage_percent,
            points,
            sensors,
            sink,
            coverage_percent: self.metrics.coverage_percent,
            active: self.metrics.active,
            on: self.metrics.on,
            failed: self.metrics.failed,
            sent: self.stats.sent,
            delivered: self.stats.delivered,
            lost: self.stats.lost,
            pdr_percent: self.stats.pdr_percent(),
            mean_latency: self.stats.mean_latency(),
            paths: self.paths.clone(),
        }
    }
}

/// Sensor counts for a topology with zero coverage.
fn initial_metrics(topology: &Topology) -> CycleMetrics {
    let field = || topology.sensors.iter().filter(|s| !s.is_sink());
    CycleMetrics {
        coverage_percent: 0.0,
        active: field().filter(|s| s.energy > 0.0).count(),
        on: field().filter(|s| s.is_on && s.is_usable()).count(),
        failed: field().filter(|s| s.is_failed).count(),
    }
}
