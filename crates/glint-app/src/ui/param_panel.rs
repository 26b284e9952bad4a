use egui::{Context, Ui};

use crate::params::VariableRegistry;

/// Top-left corner of the variables window, in points.
pub const WINDOW_POS: [f32; 2] = [5.0, 5.0];

/// Drag speed giving roughly 200 steps across the range.
fn drag_speed(min: f32, max: f32) -> f64 {
    (((max - min) / 200.0) as f64).max(1e-4)
}

/// Draw the "Variables" window: one drag control per parameter that
/// `in_use` reports as referenced by the active stages.
pub fn draw_variables_window(
    ctx: &Context,
    registry: &mut VariableRegistry,
    in_use: impl Fn(&str) -> bool,
) {
    egui::Window::new("Variables")
        .fixed_pos(WINDOW_POS)
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| draw_param_panel(ui, registry, &in_use));
}

pub fn draw_param_panel(ui: &mut Ui, registry: &mut VariableRegistry, in_use: &dyn Fn(&str) -> bool) {
    let visible: Vec<(String, f32, f32, f32)> = registry
        .iter()
        .filter(|p| in_use(&p.name))
        .map(|p| (p.name.clone(), p.min, p.max, p.value))
        .collect();

    if visible.is_empty() {
        ui.label("No variables in use");
        return;
    }

    for (name, min, max, current) in visible {
        let mut val = current;
        ui.horizontal(|ui| {
            ui.add(
                egui::DragValue::new(&mut val)
                    .range(min..=max)
                    .speed(drag_speed(min, max))
                    .max_decimals(4),
            );
            ui.label(&name);
        });
        if val != current {
            registry.set_value(&name, val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_speed_scales_with_range() {
        assert!((drag_speed(0.0, 2.0) - 0.01).abs() < 1e-9);
        assert_eq!(drag_speed(1.0, 1.0), 1e-4);
    }
}
