//! Driver task owning the cycle controller in GUI mode.
//!
//! High-level flow each loop iteration:
//! 1) Pick a deadline: the next scheduled cycle while running, otherwise a
//!    periodic idle tick so the loop stays responsive.
//! 2) `select` waits for either a UI command or the deadline.
//! 3) Commands mutate the controller and publish a fresh snapshot.
//! 4) A reached deadline runs one cycle, publishes the snapshot and schedules
//!    the next cycle `FREQUENCY` ms later. A terminating cycle appends the run
//!    log and publishes the summary.

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};
use std::path::{Path, PathBuf};

use crate::common::config::SimulationConfig;
use crate::common::run_log;
use crate::ui::{UICommand, UIRefreshState};
use crate::{UICommandQueueReceiver, UIRefreshQueueSender};

use super::controller::{Simulation, SimulationState};

/// Poll interval while no cycle is scheduled.
const IDLE_TICK: Duration = Duration::from_millis(100);

async fn publish_snapshot(simulation: &Simulation, ui_refresh_tx: &UIRefreshQueueSender) {
    ui_refresh_tx.send(UIRefreshState::SnapshotUpdated(simulation.snapshot())).await;
}

async fn alert(message: String, ui_refresh_tx: &UIRefreshQueueSender) {
    log::error!("{}", message);
    ui_refresh_tx.send(UIRefreshState::Alert(message)).await;
}

/// Install `config` and report the outcome to the UI.
async fn apply_config(simulation: &mut Simulation, config: SimulationConfig, ui_refresh_tx: &UIRefreshQueueSender) {
    match simulation.configure(config.clone()) {
        Ok(()) => {
            log::info!(
                "Configuration applied: {}x{} field, {} points, {} sensors",
                config.field_width,
                config.field_height,
                config.num_points,
                config.max_sensors
            );
            ui_refresh_tx.send(UIRefreshState::ConfigurationChanged(config)).await;
        }
        Err(e) => alert(format!("Configuration rejected: {}", e), ui_refresh_tx).await,
    }
}

/// Load a configuration file and install it.
async fn load_config(simulation: &mut Simulation, path: &Path, ui_refresh_tx: &UIRefreshQueueSender) {
    match SimulationConfig::load(path) {
        Ok(config) => {
            log::info!("Loaded configuration file: {}", path.display());
            apply_config(simulation, config, ui_refresh_tx).await;
        }
        Err(e) => alert(format!("{}", e), ui_refresh_tx).await,
    }
}

/// Handle one UI command.
///
/// # Returns
///
/// `true` when the simulation just started running and the first cycle should
/// be scheduled immediately.
async fn handle_command(command: UICommand, simulation: &mut Simulation, ui_refresh_tx: &UIRefreshQueueSender) -> bool {
    let mut started = false;
    match command {
        UICommand::LoadConfig(path) => load_config(simulation, &path, ui_refresh_tx).await,
        UICommand::ApplySettings(config) => apply_config(simulation, config, ui_refresh_tx).await,
        UICommand::Start => match simulation.state() {
            SimulationState::Running => {}
            SimulationState::Paused => {
                simulation.resume();
                started = true;
            }
            _ => match simulation.start() {
                Ok(()) => started = true,
                Err(e) => alert(format!("Cannot start: {}", e), ui_refresh_tx).await,
            },
        },
        UICommand::Pause => simulation.pause(),
        UICommand::Reset => {
            if let Err(e) = simulation.reset() {
                alert(format!("Reset failed: {}", e), ui_refresh_tx).await;
            }
        }
        UICommand::SaveConfig(path) => match simulation.config() {
            Some(config) => match config.save(&path) {
                Ok(()) => log::info!("Configuration saved to {}", path.display()),
                Err(e) => alert(format!("{:#}", e), ui_refresh_tx).await,
            },
            None => alert("No configuration loaded".to_string(), ui_refresh_tx).await,
        },
    }
    publish_snapshot(simulation, ui_refresh_tx).await;
    started
}

/// Run one cycle and publish its results.
async fn run_cycle(simulation: &mut Simulation, run_log_path: &Path, ui_refresh_tx: &UIRefreshQueueSender) {
    match simulation.step() {
        Ok(Some(report)) => {
            publish_snapshot(simulation, ui_refresh_tx).await;
            if report.terminated {
                if let Some(summary) = simulation.summary().cloned() {
                    if let Err(e) = run_log::append_summary(run_log_path, &summary) {
                        alert(format!("{:#}", e), ui_refresh_tx).await;
                    }
                    ui_refresh_tx.send(UIRefreshState::SimulationFinished(summary)).await;
                }
            }
        }
        Ok(None) => {}
        Err(e) => alert(format!("{}", e), ui_refresh_tx).await,
    }
}

/// Embassy task owning the controller for the lifetime of the GUI.
///
/// # Parameters
///
/// * `ui_refresh_tx` - Channel for snapshots, alerts and summaries
/// * `ui_command_rx` - Channel for commands from the UI
/// * `config_path` - Optional configuration file loaded at startup
/// * `run_log_path` - File that terminated runs are appended to
#[embassy_executor::task]
pub async fn simulation_task(
    ui_refresh_tx: UIRefreshQueueSender,
    ui_command_rx: UICommandQueueReceiver,
    config_path: Option<PathBuf>,
    run_log_path: PathBuf,
) {
    let mut simulation = Simulation::default();
    if let Some(path) = config_path {
        load_config(&mut simulation, &path, &ui_refresh_tx).await;
        publish_snapshot(&simulation, &ui_refresh_tx).await;
    }

    let mut next_cycle = Instant::now();

    loop {
        let running = simulation.state() == SimulationState::Running;
        let deadline = if running { next_cycle } else { Instant::now() + IDLE_TICK };

        match select(ui_command_rx.receive(), Timer::at(deadline)).await {
            Either::First(command) => {
                if handle_command(command, &mut simulation, &ui_refresh_tx).await {
                    next_cycle = Instant::now();
                }
            }
            Either::Second(_) => {
                if !running || simulation.state() != SimulationState::Running {
                    continue;
                }
                run_cycle(&mut simulation, &run_log_path, &ui_refresh_tx).await;
                let frequency = simulation.config().map(|c| c.frequency).unwrap_or(0);
                next_cycle = Instant::now() + Duration::from_millis(frequency);
            }
        }
    }
}
