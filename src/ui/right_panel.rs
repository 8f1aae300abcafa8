//! # Right Panel - Sensor Inspector, Sensor Table and Event Log
//!
//! This module renders the right side panel:
//! - Inspector for the sensor selected on the map (label, position, energy,
//!   state, route and neighbors)
//! - "Sensors" tab: every sensor in a virtualized `egui_extras::TableBuilder`
//!   table; clicking a row selects the sensor
//! - "Event log" tab: cycle logs captured from the simulation, newest first,
//!   with a substring filter

use eframe::egui;
use egui::Color32;
use log::Level;

use crate::simulation::SimulationSnapshot;
use crate::simulation::controller::SensorView;
use crate::simulation::types::SensorRole;
use crate::ui::app_state::InspectorTab;
use crate::ui::map::sensor_color;
use crate::ui::AppState;

/// Render the right inspector panel.
///
/// # Parameters
///
/// * `ctx` - egui context
/// * `state` - Mutable application state
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    let panel = egui::SidePanel::right("inspector_right")
        .resizable(true)
        .default_width(state.right_panel_width)
        .show(ctx, |ui| {
            ui.heading("Inspector");
            ui.separator();

            match (&state.snapshot, state.selected) {
                (Some(snapshot), Some(index)) => match snapshot.sensors.get(index) {
                    Some(sensor) => render_inspector(ui, snapshot, sensor),
                    None => {
                        ui.label("Select a sensor on the map");
                    }
                },
                _ => {
                    ui.label("Select a sensor on the map");
                }
            }

            ui.separator();
            ui.horizontal(|ui| {
                ui.selectable_value(&mut state.inspector_tab, InspectorTab::Sensors, "Sensors");
                ui.selectable_value(&mut state.inspector_tab, InspectorTab::EventLog, "Event log");
            });
            ui.add_space(4.0);

            match state.inspector_tab {
                InspectorTab::Sensors => render_sensor_table(ui, state),
                InspectorTab::EventLog => render_event_log(ui, state),
            }
        });
    state.right_panel_width = panel.response.rect.width();
}

fn energy_text(energy: f64) -> String {
    if energy.is_infinite() { "∞".to_string() } else { format!("{:.2}", energy) }
}

fn class_text(sensor: &SensorView) -> String {
    match sensor.final_class {
        Some(final_class) => format!("{} (final)", final_class),
        None => format!("{:?}", sensor.class),
    }
}

fn render_inspector(ui: &mut egui::Ui, snapshot: &SimulationSnapshot, sensor: &SensorView) {
    let label = |i: usize| snapshot.sensors.get(i).map(|s| s.label()).unwrap_or_default();

    ui.horizontal(|ui| {
        ui.label("Selected sensor:");
        ui.label(egui::RichText::new(sensor.label()).strong().color(Color32::from_rgb(0, 128, 255)));
    });
    ui.horizontal(|ui| {
        ui.label("Position: (");
        ui.label(egui::RichText::new(format!("{:.2}", sensor.position.x)).strong());
        ui.label(",");
        ui.label(egui::RichText::new(format!("{:.2}", sensor.position.y)).strong());
        ui.label(")");
    });
    ui.horizontal(|ui| {
        ui.label("Energy:");
        ui.label(egui::RichText::new(energy_text(sensor.energy)).strong());
        ui.label("  State:");
        ui.label(
            egui::RichText::new(class_text(sensor))
                .strong()
                .color(sensor_color(sensor.class, sensor.final_class)),
        );
    });

    if sensor.role != SensorRole::Sink {
        ui.horizontal(|ui| {
            ui.label("Radio:");
            ui.label(egui::RichText::new(if sensor.is_on { "on" } else { "sleeping" }).strong());
            if sensor.is_failed {
                ui.label(egui::RichText::new("permanently failed").strong().color(Color32::GRAY));
            }
        });
    }

    let route = match snapshot.paths.get(&sensor.index) {
        Some(path) => path.iter().map(|&i| label(i)).collect::<Vec<_>>().join(" → "),
        None if sensor.role == SensorRole::Sink => "-".to_string(),
        None => "unreachable".to_string(),
    };
    ui.horizontal_wrapped(|ui| {
        ui.label("Route:");
        ui.label(egui::RichText::new(route).monospace());
    });

    let neighbors = sensor.neighbors.iter().map(|&i| label(i)).collect::<Vec<_>>().join(", ");
    ui.horizontal_wrapped(|ui| {
        ui.label(format!("Neighbors ({}):", sensor.neighbors.len()));
        ui.label(egui::RichText::new(neighbors).monospace());
    });
}

/// Virtualized table of every sensor; clicking a row selects it.
fn render_sensor_table(ui: &mut egui::Ui, state: &mut AppState) {
    use egui_extras::{Column, TableBuilder};

    let Some(snapshot) = &state.snapshot else {
        return;
    };

    let row_height = ui.text_style_height(&egui::TextStyle::Body) * 1.3;
    let mut clicked: Option<usize> = None;

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(true)
        .sense(egui::Sense::click())
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::initial(50.0).at_least(40.0)) // Label
        .column(Column::initial(110.0).at_least(80.0)) // Position
        .column(Column::initial(70.0).at_least(50.0)) // Energy
        .column(Column::initial(50.0).at_least(40.0)) // Hops
        .column(Column::remainder()) // State
        .header(row_height, |mut header| {
            header.col(|ui| {
                ui.strong("Sensor");
            });
            header.col(|ui| {
                ui.strong("Position");
            });
            header.col(|ui| {
                ui.strong("Energy");
            });
            header.col(|ui| {
                ui.strong("Hops");
            });
            header.col(|ui| {
                ui.strong("State");
            });
        })
        .body(|body| {
            body.rows(row_height, snapshot.sensors.len(), |mut row| {
                let sensor = &snapshot.sensors[row.index()];
                row.set_selected(state.selected == Some(sensor.index));
                let color = sensor_color(sensor.class, sensor.final_class);
                let hops = snapshot
                    .paths
                    .get(&sensor.index)
                    .map(|p| (p.len() - 1).to_string())
                    .unwrap_or_else(|| "-".to_string());

                row.col(|ui| {
                    ui.colored_label(color, sensor.label());
                });
                row.col(|ui| {
                    ui.label(format!("({:.1}, {:.1})", sensor.position.x, sensor.position.y));
                });
                row.col(|ui| {
                    ui.label(energy_text(sensor.energy));
                });
                row.col(|ui| {
                    ui.label(hops);
                });
                row.col(|ui| {
                    ui.colored_label(color, class_text(sensor));
                });

                if row.response().clicked() {
                    clicked = Some(sensor.index);
                }
            });
        });

    if let Some(index) = clicked {
        state.selected = Some(index);
    }
}

/// Captured cycle logs, newest first, filtered by substring.
fn render_event_log(ui: &mut egui::Ui, state: &mut AppState) {
    use egui_extras::{Column, TableBuilder};

    ui.horizontal(|ui| {
        ui.label("Filter:");
        ui.text_edit_singleline(&mut state.log_filter);
        if ui.button("Clear").clicked() {
            state.event_log.clear();
        }
    });

    let filter = state.log_filter.to_lowercase();
    let lines: Vec<_> = state
        .event_log
        .iter()
        .rev()
        .filter(|entry| filter.is_empty() || entry.content.to_lowercase().contains(&filter))
        .collect();

    let row_height = ui.text_style_height(&egui::TextStyle::Body) * 1.3;
    TableBuilder::new(ui)
        .striped(true)
        .vscroll(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::initial(70.0).at_least(50.0)) // Time
        .column(Column::initial(50.0).at_least(40.0)) // Cycle
        .column(Column::remainder()) // Log content
        .header(row_height, |mut header| {
            header.col(|ui| {
                ui.strong("Time");
            });
            header.col(|ui| {
                ui.strong("Cycle");
            });
            header.col(|ui| {
                ui.strong("Event");
            });
        })
        .body(|body| {
            body.rows(row_height, lines.len(), |mut row| {
                let entry = lines[row.index()];
                let color = match entry.level {
                    Level::Error => Color32::RED,
                    Level::Warn => Color32::YELLOW,
                    Level::Info => Color32::WHITE,
                    Level::Debug | Level::Trace => Color32::GRAY,
                };
                row.col(|ui| {
                    ui.colored_label(color, entry.timestamp.format("%H:%M:%S").to_string());
                });
                row.col(|ui| {
                    ui.colored_label(color, entry.cycle.to_string());
                });
                row.col(|ui| {
                    ui.colored_label(color, &entry.content);
                });
            });
        });
}
