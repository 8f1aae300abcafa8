//! # Top Panel - Run Metrics and Controls
//!
//! This module renders the fixed-height top panel displaying:
//! - Column 1: Network metrics (cycle, coverage, active/on/failed sensors)
//! - Column 2: Delivery metrics (sent, delivered, lost, PDR, mean latency)
//! - Column 3: Controls (load, start/pause, reset, settings, overlays)

use eframe::egui;

use crate::simulation::SimulationState;
use crate::ui::{AppState, UICommand};

/// Render the top panel with metrics and controls.
///
/// # Parameters
///
/// * `ctx` - egui context
/// * `state` - Mutable application state for reading metrics and updating controls
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    egui::TopBottomPanel::top("top_metrics").exact_height(130.0).show(ctx, |ui| {
        ui.columns(3, |cols| {
            cols[0].vertical(|ui| {
                render_network_metrics(ui, state);
            });
            cols[1].vertical(|ui| {
                render_delivery_metrics(ui, state);
            });
            cols[2].vertical(|ui| {
                render_controls(ui, state);
            });
        });
    });
}

fn metric(ui: &mut egui::Ui, label: &str, value: String) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.label(egui::RichText::new(value).monospace().strong());
    });
}

fn render_network_metrics(ui: &mut egui::Ui, state: &AppState) {
    ui.heading("Network");
    ui.separator();

    let Some(snapshot) = &state.snapshot else {
        ui.label("No configuration loaded");
        return;
    };

    let coverage_color = if snapshot.cycle > 0 && snapshot.coverage_percent < snapshot.min_coverage_percent {
        egui::Color32::from_rgb(255, 120, 80)
    } else {
        ui.visuals().strong_text_color()
    };

    metric(ui, "Cycle:", format!("{:<8}", snapshot.cycle));
    ui.horizontal(|ui| {
        ui.label("Coverage:");
        ui.label(
            egui::RichText::new(format!("{:.2}%", snapshot.coverage_percent))
                .monospace()
                .strong()
                .color(coverage_color),
        );
        ui.label(format!("(target {:.0}%)", snapshot.min_coverage_percent));
    });
    let field_sensors = snapshot.sensors.len().saturating_sub(1);
    metric(ui, "Active sensors:", format!("{} / {}", snapshot.active, field_sensors));
    ui.horizontal(|ui| {
        ui.label("On:");
        ui.label(egui::RichText::new(snapshot.on.to_string()).strong());
        ui.label("  Failed:");
        ui.label(egui::RichText::new(snapshot.failed.to_string()).strong());
    });
}

fn render_delivery_metrics(ui: &mut egui::Ui, state: &AppState) {
    ui.heading("Delivery");
    ui.separator();

    let Some(snapshot) = &state.snapshot else {
        return;
    };

    ui.horizontal(|ui| {
        ui.label("Sent:");
        ui.label(egui::RichText::new(snapshot.sent.to_string()).strong());
        ui.label("  Delivered:");
        ui.label(egui::RichText::new(snapshot.delivered.to_string()).strong());
        ui.label("  Lost:");
        ui.label(egui::RichText::new(snapshot.lost.to_string()).strong());
    });
    metric(ui, "PDR:", format!("{:.2}%", snapshot.pdr_percent));
    metric(ui, "Mean latency:", format!("{:.2} hops", snapshot.mean_latency));

    if let Some(summary) = &state.summary {
        ui.label(
            egui::RichText::new(format!("Finished after {} cycles, run log written", summary.total_cycles))
                .color(egui::Color32::LIGHT_GREEN),
        );
    }
}

/// Render the controls column.
///
/// Start doubles as resume while paused. Reset regenerates the topology from
/// the configuration in effect.
fn render_controls(ui: &mut egui::Ui, state: &mut AppState) {
    ui.heading("Controls");
    ui.separator();

    let run_state = state.snapshot.as_ref().map(|s| s.state);
    let configured = state.config.is_some();

    ui.horizontal(|ui| {
        ui.label("State:");
        let text = run_state.map(|s| s.to_string()).unwrap_or_else(|| "Unconfigured".to_string());
        ui.label(egui::RichText::new(text).strong());
    });

    ui.horizontal(|ui| {
        if ui.button("Load configuration…").clicked() {
            state.open_config_picker();
        }
        if ui.add_enabled(configured, egui::Button::new("Settings")).clicked() {
            state.settings.open = true;
        }
    });

    ui.horizontal(|ui| {
        ui.add_enabled_ui(configured, |ui| {
            match run_state {
                Some(SimulationState::Running) => {
                    if ui.button("Pause").clicked() {
                        state.send(UICommand::Pause);
                    }
                }
                Some(SimulationState::Paused) => {
                    if ui.button("Resume").clicked() {
                        state.send(UICommand::Start);
                    }
                }
                _ => {
                    let can_start = run_state != Some(SimulationState::Terminated);
                    if ui
                        .add_enabled(can_start, egui::Button::new("Start"))
                        .on_disabled_hover_text("Reset to run again")
                        .clicked()
                    {
                        state.send(UICommand::Start);
                    }
                }
            }
            if ui.button("Reset").clicked() {
                state.send(UICommand::Reset);
            }
        });
    });

    ui.horizontal(|ui| {
        ui.checkbox(&mut state.show_paths, "Show routes");
        ui.checkbox(&mut state.show_coverage, "Show coverage");
    });
}
