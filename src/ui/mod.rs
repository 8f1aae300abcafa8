// UI module for the WSN coverage simulator
//
// This module organizes the UI into separate components:
// - `top_panel`: Run metrics and simulation controls
// - `right_panel`: Sensor inspector, sensor table and event log
// - `map`: Central field view with points, sensors, coverage and routes
// - `settings`: Parameter editor window
// - `app_state`: Application state management and main update loop

pub mod app_state;
pub mod map;
pub mod right_panel;
pub mod settings;
pub mod top_panel;

use std::path::PathBuf;

use crate::common::config::SimulationConfig;
use crate::simulation::{RunSummary, SimulationSnapshot};

pub use app_state::AppState;

/// Messages from the simulation task to the UI.
#[derive(Debug)]
pub enum UIRefreshState {
    Alert(String),
    /// A new configuration is in effect (loaded or applied).
    ConfigurationChanged(SimulationConfig),
    SnapshotUpdated(SimulationSnapshot),
    SimulationFinished(RunSummary),
}

/// Commands from the UI to the simulation task.
#[derive(Debug)]
pub enum UICommand {
    LoadConfig(PathBuf),
    /// Install edited settings; resets the run.
    ApplySettings(SimulationConfig),
    /// Start, or resume after a pause.
    Start,
    Pause,
    Reset,
    SaveConfig(PathBuf),
}
