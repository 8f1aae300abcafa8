//! # Application State Management
//!
//! This module implements the central `AppState` struct which manages all UI state
//! and coordinates the rendering of all UI components. It implements the `eframe::App`
//! trait to integrate with the egui application framework.
//!
//! ## Responsibilities
//!
//! - Holds the latest simulation snapshot, configuration and run summary
//! - Processes incoming messages from the simulation via `ui_refresh_rx`
//! - Sends user commands to the simulation via `ui_command_tx`
//! - Collects captured cycle logs for the event log tab
//! - Coordinates rendering of all UI panels (top, right, map, settings)
//! - Persists user settings (last directory, panel width) across sessions

use eframe::egui;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;

use super::settings::SettingsWindow;
use super::{UICommand, UIRefreshState};
use crate::common::config::SimulationConfig;
use crate::simulation::log_capture::{CapturedLogEntry, drain_captured_logs};
use crate::simulation::types::SensorIndex;
use crate::simulation::{RunSummary, SimulationSnapshot};

/// Maximum number of captured log lines kept for the event log tab.
pub const EVENT_LOG_CAPACITY: usize = 5000;

/// Currently selected tab in the right panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InspectorTab {
    #[default]
    Sensors,
    EventLog,
}

/// Central application state managing all UI components and simulation coordination.
pub struct AppState {
    /// Optional alert message to display in a modal dialog.
    pub alert: Option<String>,
    /// Receiver for UI refresh messages from the simulation.
    pub ui_refresh_rx: crate::UIRefreshQueueReceiver,
    /// Sender for commands from the UI to the simulation.
    pub ui_command_tx: crate::UICommandQueueSender,

    /// Latest state published by the simulation task.
    pub snapshot: Option<SimulationSnapshot>,
    /// Configuration currently in effect.
    pub config: Option<SimulationConfig>,
    /// Summary of the last terminated run.
    pub summary: Option<RunSummary>,

    /// Arena index of the sensor shown in the inspector.
    pub selected: Option<SensorIndex>,
    pub inspector_tab: InspectorTab,
    /// Captured cycle logs, oldest first.
    pub event_log: VecDeque<CapturedLogEntry>,
    /// Filter string for the event log tab.
    pub log_filter: String,

    // Map display options
    pub show_paths: bool,
    pub show_coverage: bool,

    pub settings: SettingsWindow,

    /// Last directory used by the configuration file pickers.
    pub last_open_dir: Option<String>,
    /// Width of the right inspector panel in pixels.
    pub right_panel_width: f32,
}

/// Settings persisted across application sessions.
#[derive(Default, Serialize, Deserialize)]
struct PersistedSettings {
    last_open_dir: Option<String>,
    right_panel_width: Option<f32>,
    show_paths: Option<bool>,
    show_coverage: Option<bool>,
}

impl AppState {
    /// Create a new AppState, loading persisted settings if available.
    ///
    /// # Parameters
    ///
    /// * `rx` - Receiver for UI refresh messages from the simulation
    /// * `tx` - Sender for commands to the simulation
    /// * `storage` - Optional persistent storage for loading saved settings
    pub fn new(rx: crate::UIRefreshQueueReceiver, tx: crate::UICommandQueueSender, storage: Option<&dyn eframe::Storage>) -> Self {
        let persisted: PersistedSettings = storage.and_then(|s| eframe::get_value(s, "app_settings")).unwrap_or_default();

        Self {
            alert: None,
            ui_refresh_rx: rx,
            ui_command_tx: tx,
            snapshot: None,
            config: None,
            summary: None,
            selected: None,
            inspector_tab: InspectorTab::default(),
            event_log: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
            log_filter: String::new(),
            show_paths: persisted.show_paths.unwrap_or(true),
            show_coverage: persisted.show_coverage.unwrap_or(true),
            settings: SettingsWindow::default(),
            last_open_dir: persisted.last_open_dir,
            right_panel_width: persisted.right_panel_width.unwrap_or(420.0),
        }
    }

    /// Queue a command for the simulation task; a full queue is reported as an alert.
    pub fn send(&mut self, command: UICommand) {
        if self.ui_command_tx.try_send(command).is_err() {
            self.alert = Some("Simulation is busy, try again".to_string());
        }
    }

    fn file_dialog(&self) -> rfd::FileDialog {
        let mut dialog = rfd::FileDialog::new().add_filter("Configuration", &["toml"]);
        if let Some(dir) = &self.last_open_dir {
            dialog = dialog.set_directory(dir);
        }
        dialog
    }

    fn remember_dir(&mut self, file: &std::path::Path) {
        if let Some(parent) = file.parent() {
            self.last_open_dir = Some(parent.to_string_lossy().to_string());
        }
    }

    /// Open a native file picker and load the chosen configuration.
    pub fn open_config_picker(&mut self) {
        if let Some(file) = self.file_dialog().pick_file() {
            self.remember_dir(&file);
            self.send(UICommand::LoadConfig(file));
        }
    }

    /// Open a native save dialog and write the configuration in effect.
    pub fn save_config_picker(&mut self) -> Option<PathBuf> {
        let file = self.file_dialog().set_file_name("scenario.toml").save_file()?;
        self.remember_dir(&file);
        self.send(UICommand::SaveConfig(file.clone()));
        Some(file)
    }

    /// Fold one message from the simulation into the UI state.
    pub fn apply_refresh(&mut self, msg: UIRefreshState) {
        match msg {
            UIRefreshState::Alert(alert_msg) => {
                self.alert = Some(alert_msg);
            }
            UIRefreshState::ConfigurationChanged(config) => {
                self.settings.load(&config);
                self.config = Some(config);
                self.summary = None;
                self.selected = None;
            }
            UIRefreshState::SnapshotUpdated(snapshot) => {
                if self.selected.is_some_and(|i| i >= snapshot.sensors.len()) {
                    self.selected = None;
                }
                if snapshot.cycle == 0 {
                    self.summary = None;
                }
                self.snapshot = Some(snapshot);
            }
            UIRefreshState::SimulationFinished(summary) => {
                self.summary = Some(summary);
            }
        }
    }

    fn collect_logs(&mut self) {
        for entry in drain_captured_logs() {
            if self.event_log.len() >= EVENT_LOG_CAPACITY {
                self.event_log.pop_front();
            }
            self.event_log.push_back(entry);
        }
    }
}

impl eframe::App for AppState {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings {
            last_open_dir: self.last_open_dir.clone(),
            right_panel_width: Some(self.right_panel_width),
            show_paths: Some(self.show_paths),
            show_coverage: Some(self.show_coverage),
        };
        eframe::set_value(storage, "app_settings", &settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Repaint periodically so background updates are visible without input
        ctx.request_repaint_after(std::time::Duration::from_millis(20));

        while let Ok(msg) = self.ui_refresh_rx.try_receive() {
            self.apply_refresh(msg);
        }
        self.collect_logs();

        if let Some(alert_msg) = self.alert.clone() {
            egui::Window::new("Alert")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.label(alert_msg);
                        ui.add_space(20.0);

                        if ui.button("OK").clicked() {
                            self.alert = None;
                        }
                        ui.add_space(10.0);
                    });
                });
        }

        super::settings::render(ctx, self);

        // Panels layout: top (fixed), right (fixed), map fills the remaining using CentralPanel
        super::top_panel::render(ctx, self);
        super::right_panel::render(ctx, self);
        super::map::render(ctx, self);
    }
}
