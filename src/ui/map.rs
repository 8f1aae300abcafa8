//! # Central Map Visualization
//!
//! This module renders the main 2D field view showing:
//! - The field boundary with a light coordinate grid
//! - Measurement points
//! - Coverage rings around every field sensor, filled for sensors that are on
//! - Routes from on sensors to the sink as arrows
//! - Sensors as colored circles, the selected one highlighted
//!
//! ## Coordinate Mapping
//!
//! Field coordinates `[0, width] × [0, height]` are linearly mapped to screen
//! pixels with `egui::lerp`, keeping the aspect ratio by fitting the field
//! centered in the available space.
//!
//! ## Sensor Colors
//!
//! Sink yellow, failed gray, drained red, on green, off blue. After the run
//! terminates the frozen final classification is shown instead (surviving
//! sensors are drawn blue like sleeping ones).

use eframe::egui;
use egui::Color32;

use crate::simulation::SimulationSnapshot;
use crate::simulation::controller::SensorView;
use crate::simulation::types::{FinalClass, Point, SensorClass, SensorRole};
use crate::ui::AppState;

const SENSOR_RADIUS: f32 = 5.0;
const POINT_RADIUS: f32 = 1.5;
const ON_COLOR: Color32 = Color32::from_rgb(0, 220, 0);
const OFF_COLOR: Color32 = Color32::from_rgb(40, 120, 255);

/// Color of a sensor on the map.
pub fn sensor_color(class: SensorClass, final_class: Option<FinalClass>) -> Color32 {
    if let Some(final_class) = final_class {
        return match final_class {
            FinalClass::Sink => Color32::YELLOW,
            FinalClass::Failed => Color32::GRAY,
            FinalClass::Drained => Color32::RED,
            FinalClass::Surviving => OFF_COLOR,
        };
    }
    match class {
        SensorClass::Sink => Color32::YELLOW,
        SensorClass::Failed => Color32::GRAY,
        SensorClass::Drained => Color32::RED,
        SensorClass::On => ON_COLOR,
        SensorClass::Off => OFF_COLOR,
    }
}

/// Field-to-screen transform for one frame.
#[derive(Debug, Clone, Copy)]
struct FieldView {
    rect: egui::Rect,
    width: f64,
    height: f64,
}

impl FieldView {
    fn to_screen(&self, p: &Point) -> egui::Pos2 {
        egui::pos2(
            egui::lerp(self.rect.left()..=self.rect.right(), (p.x / self.width) as f32),
            egui::lerp(self.rect.top()..=self.rect.bottom(), (p.y / self.height) as f32),
        )
    }

    fn pixels_per_unit(&self) -> f32 {
        let x = self.rect.width() / self.width as f32;
        let y = self.rect.height() / self.height as f32;
        (x + y) / 2.0
    }
}

/// Index of the position closest to `click`, if any.
pub fn nearest(positions: impl Iterator<Item = (usize, egui::Pos2)>, click: egui::Pos2) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, pos) in positions {
        let d2 = pos.distance_sq(click);
        if best.is_none_or(|(_, bd)| d2 < bd) {
            best = Some((i, d2));
        }
    }
    best.map(|(i, _)| i)
}

/// Render the central map panel.
///
/// # Parameters
///
/// * `ctx` - egui context for rendering
/// * `state` - Mutable application state for updating selection
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading("Field");
        ui.separator();

        let Some(snapshot) = &state.snapshot else {
            ui.centered_and_justified(|ui| {
                ui.label("Load a configuration to begin");
            });
            return;
        };
        if snapshot.field_width <= 0.0 || snapshot.field_height <= 0.0 {
            return;
        }

        let aspect_ratio = (snapshot.field_width / snapshot.field_height) as f32;

        // Reserve a drawing area with proper aspect ratio, centered in available space
        let avail_rect = ui.available_rect_before_wrap();
        let (map_width, map_height) = if avail_rect.width() / avail_rect.height() > aspect_ratio {
            (avail_rect.height() * aspect_ratio, avail_rect.height())
        } else {
            (avail_rect.width(), avail_rect.width() / aspect_ratio)
        };
        let x = avail_rect.center().x - map_width / 2.0;
        let y = avail_rect.center().y - map_height / 2.0;
        let rect = egui::Rect::from_min_size(egui::pos2(x, y), egui::vec2(map_width, map_height));
        let response = ui.interact(rect, egui::Id::new("map_canvas"), egui::Sense::click());
        let painter = ui.painter_at(rect);

        let view = FieldView {
            rect,
            width: snapshot.field_width,
            height: snapshot.field_height,
        };

        painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);
        draw_grid(&painter, rect);

        for p in &snapshot.points {
            painter.circle_filled(view.to_screen(p), POINT_RADIUS, Color32::from_gray(170));
        }

        if state.show_coverage {
            draw_coverage(&painter, &view, snapshot);
        }
        if state.show_paths {
            draw_routes(&painter, &view, snapshot);
        }
        draw_sensors(&painter, &view, snapshot, state.selected);

        if response.clicked() {
            if let Some(click_pos) = response.interact_pointer_pos() {
                let positions = snapshot.sensors.iter().map(|s| (s.index, view.to_screen(&s.position)));
                let new_selected = nearest(positions, click_pos);
                state.selected = if new_selected == state.selected { None } else { new_selected };
            }
        }
    });
}

/// Ten-by-ten grid over the field.
fn draw_grid(painter: &egui::Painter, rect: egui::Rect) {
    let grid_stroke = egui::Stroke::new(1.0, Color32::from_rgb(0, 0, 100));
    for i in 0..=10 {
        let t = i as f32 / 10.0;
        let sx = egui::lerp(rect.left()..=rect.right(), t);
        let sy = egui::lerp(rect.top()..=rect.bottom(), t);
        painter.line_segment([egui::pos2(sx, rect.top()), egui::pos2(sx, rect.bottom())], grid_stroke);
        painter.line_segment([egui::pos2(rect.left(), sy), egui::pos2(rect.right(), sy)], grid_stroke);
    }
}

/// Whether `sensor` gets a coverage ring. The sink senses nothing.
fn has_coverage_ring(sensor: &SensorView) -> bool {
    sensor.role != SensorRole::Sink
}

/// Coverage ring around every field sensor; sensors that were on last cycle are filled.
fn draw_coverage(painter: &egui::Painter, view: &FieldView, snapshot: &SimulationSnapshot) {
    let radius = snapshot.coverage_radius as f32 * view.pixels_per_unit();
    let fill = Color32::from_rgba_unmultiplied(0, 200, 0, 25);
    let stroke = egui::Stroke::new(1.0, Color32::from_gray(110));
    for sensor in snapshot.sensors.iter().filter(|s| has_coverage_ring(s)) {
        let center = view.to_screen(&sensor.position);
        if sensor.class == SensorClass::On {
            painter.circle_filled(center, radius, fill);
        }
        painter.circle_stroke(center, radius, stroke);
    }
}

/// Route of every sensor that was on last cycle, drawn hop by hop.
fn draw_routes(painter: &egui::Painter, view: &FieldView, snapshot: &SimulationSnapshot) {
    let stroke = egui::Stroke::new(1.2, Color32::from_rgba_unmultiplied(255, 200, 0, 160));
    for sensor in snapshot.sensors.iter().filter(|s| s.class == SensorClass::On) {
        let Some(path) = snapshot.paths.get(&sensor.index) else {
            continue;
        };
        for hop in path.windows(2) {
            let (Some(from), Some(to)) = (snapshot.sensors.get(hop[0]), snapshot.sensors.get(hop[1])) else {
                continue;
            };
            let a = view.to_screen(&from.position);
            let b = view.to_screen(&to.position);
            if a.distance_sq(b) > 1.0 {
                painter.arrow(a, b - a, stroke);
            }
        }
    }
}

fn draw_sensors(painter: &egui::Painter, view: &FieldView, snapshot: &SimulationSnapshot, selected: Option<usize>) {
    for sensor in &snapshot.sensors {
        let pos = view.to_screen(&sensor.position);
        let color = sensor_color(sensor.class, sensor.final_class);
        if sensor.class == SensorClass::Sink {
            let half = SENSOR_RADIUS + 2.0;
            painter.rect_filled(egui::Rect::from_center_size(pos, egui::vec2(half * 2.0, half * 2.0)), 1.0, color);
        } else {
            painter.circle_filled(pos, SENSOR_RADIUS, color);
        }
        if selected == Some(sensor.index) {
            painter.circle_stroke(pos, SENSOR_RADIUS + 4.0, egui::Stroke::new(2.0, Color32::WHITE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_classes_override_live_colors() {
        assert_eq!(sensor_color(SensorClass::On, None), ON_COLOR);
        assert_eq!(sensor_color(SensorClass::Off, None), OFF_COLOR);
        assert_eq!(sensor_color(SensorClass::Sink, None), Color32::YELLOW);
        assert_eq!(sensor_color(SensorClass::On, Some(FinalClass::Surviving)), OFF_COLOR);
        assert_eq!(sensor_color(SensorClass::Drained, Some(FinalClass::Drained)), Color32::RED);
    }

    #[test]
    fn every_field_sensor_has_a_coverage_ring() {
        let view = |role: SensorRole, class: SensorClass| SensorView {
            index: 0,
            role,
            position: Point::new(0.0, 0.0),
            energy: 1.0,
            is_on: class == SensorClass::On,
            is_failed: class == SensorClass::Failed,
            class,
            final_class: None,
            neighbors: Vec::new(),
        };
        assert!(has_coverage_ring(&view(SensorRole::Field(0), SensorClass::On)));
        assert!(has_coverage_ring(&view(SensorRole::Field(1), SensorClass::Off)));
        assert!(has_coverage_ring(&view(SensorRole::Field(2), SensorClass::Failed)));
        assert!(!has_coverage_ring(&view(SensorRole::Sink, SensorClass::Sink)));
    }

    #[test]
    fn click_selects_the_nearest_sensor() {
        let positions = vec![(0, egui::pos2(0.0, 0.0)), (1, egui::pos2(10.0, 0.0)), (2, egui::pos2(0.0, 10.0))];
        assert_eq!(nearest(positions.clone().into_iter(), egui::pos2(8.0, 1.0)), Some(1));
        assert_eq!(nearest(positions.into_iter(), egui::pos2(1.0, 7.0)), Some(2));
        assert_eq!(nearest(std::iter::empty(), egui::pos2(1.0, 1.0)), None);
    }

    #[test]
    fn field_corners_map_to_the_rect_corners() {
        let view = FieldView {
            rect: egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(200.0, 100.0)),
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(view.to_screen(&Point::new(0.0, 0.0)), egui::pos2(10.0, 20.0));
        assert_eq!(view.to_screen(&Point::new(100.0, 50.0)), egui::pos2(210.0, 120.0));
        assert_eq!(view.pixels_per_unit(), 2.0);
    }
}
