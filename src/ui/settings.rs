//! # Settings Window
//!
//! Editable text fields for every configuration parameter. Edits stay local
//! until "Apply" parses and validates them; a rejected form shows the error
//! inline and leaves the configuration in effect untouched. Applying sends
//! `ApplySettings`, which resets the run with the new parameters.

use eframe::egui;

use crate::common::config::{SettingsForm, SimulationConfig};
use crate::ui::{AppState, UICommand};

/// State of the settings window between frames.
#[derive(Debug, Clone)]
pub struct SettingsWindow {
    pub open: bool,
    pub form: SettingsForm,
    /// Parse or validation error from the last apply attempt.
    pub error: Option<String>,
}

impl Default for SettingsWindow {
    fn default() -> Self {
        Self {
            open: false,
            form: SettingsForm { fields: Vec::new() },
            error: None,
        }
    }
}

impl SettingsWindow {
    /// Refill the form from the configuration now in effect.
    pub fn load(&mut self, config: &SimulationConfig) {
        self.form = SettingsForm::from_config(config);
        self.error = None;
    }

    /// Parse the form.
    ///
    /// # Returns
    ///
    /// The validated configuration, or `None` with `error` set.
    pub fn submit(&mut self) -> Option<SimulationConfig> {
        match self.form.parse() {
            Ok(config) => {
                self.error = None;
                Some(config)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                None
            }
        }
    }
}

/// Render the settings window when it is open.
///
/// # Parameters
///
/// * `ctx` - egui context
/// * `state` - Mutable application state holding the form
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    if !state.settings.open {
        return;
    }

    let mut open = true;
    let mut apply = false;
    let mut save_as = false;
    let mut revert = false;

    egui::Window::new("Settings")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            if state.settings.form.fields.is_empty() {
                ui.label("Load a configuration first.");
                return;
            }

            egui::Grid::new("settings_grid").num_columns(2).striped(true).show(ui, |ui| {
                for (name, value) in state.settings.form.fields.iter_mut() {
                    ui.label(*name);
                    ui.add(egui::TextEdit::singleline(value).desired_width(140.0));
                    ui.end_row();
                }
            });

            if let Some(error) = &state.settings.error {
                ui.separator();
                ui.label(egui::RichText::new(error).color(egui::Color32::RED));
            }

            ui.separator();
            ui.horizontal(|ui| {
                apply = ui.button("Apply").on_hover_text("Validate and restart with these settings").clicked();
                revert = ui.button("Revert").clicked();
                save_as = ui.button("Save as…").on_hover_text("Write the configuration in effect to a file").clicked();
            });
        });

    if apply {
        if let Some(config) = state.settings.submit() {
            state.send(UICommand::ApplySettings(config));
        }
    }
    if revert {
        if let Some(config) = state.config.clone() {
            state.settings.load(&config);
        }
    }
    if save_as {
        state.save_config_picker();
    }
    state.settings.open = open;
}
