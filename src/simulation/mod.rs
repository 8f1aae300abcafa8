//! Sensor network simulation core.
//!
//! Integrates the stages of one simulation cycle:
//! - Topology generation (points, grid sensors, sink, neighbor graph)
//! - Energy-aware coverage optimization through an integer program
//! - Shortest-hop routing to the sink
//! - Lossy multi-hop delivery with per-hop energy charges
//! - The cycle controller tying them together
//!
//! ## Module Organization
//!
//! - `types`: Core data structures (points, sensors, classifications)
//! - `geometry`: Distances, sampling, grid layout and neighbor graph
//! - `optimizer`: Coverage program and the pluggable solver boundary
//! - `routing`: Breadth-first routes from every usable sensor to the sink
//! - `transmission`: Packet loss and radio energy accounting
//! - `controller`: Run state machine and the per-cycle algorithm
//! - `simulation_task`: Embassy task driving the controller for the UI
//! - `headless`: Synchronous runner without UI
//! - `log_capture`: Tee logger feeding the UI event log

pub mod controller;
pub mod geometry;
pub mod headless;
pub mod log_capture;
pub mod optimizer;
pub mod routing;
pub mod simulation_task;
pub mod transmission;
pub mod types;

pub use controller::{RunSummary, Simulation, SimulationSnapshot, SimulationState};
pub use simulation_task::simulation_task;
