use egui::{Color32, Context, RichText, ScrollArea, Ui};
use glam::{Vec2, Vec3};

use crate::math::SURFACE_PRESETS;
use crate::renderer::{CameraMode, Material};
use crate::ui::state::{AppState, MAX_RESOLUTION, MESH_SCALE_RANGE};
use crate::ui::theme::*;

#[derive(Default)]
pub struct UiActions {
    pub reload_shader: bool,
    pub reset_camera: bool,
}

/// Per-frame facts the panel shows but does not edit.
pub struct PanelInfo<'a> {
    pub fps: f32,
    pub surface_vertices: u32,
    pub surface_indices: u32,
    pub wireframe_available: bool,
    pub shader_error: Option<&'a str>,
}

pub fn draw_side_panel(ctx: &Context, state: &mut AppState, info: &PanelInfo) -> UiActions {
    let mut actions = UiActions::default();

    egui::SidePanel::right("control_panel")
        .min_width(300.0)
        .max_width(420.0)
        .default_width(340.0)
        .frame(egui::Frame::default().fill(BG_PANEL).inner_margin(14.0))
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading(RichText::new("Parametric Surfaces").strong());
                ui.label(
                    RichText::new(format!("{:.0} fps", info.fps))
                        .color(TEXT_MUTED)
                        .size(11.0),
                );
                ui.add_space(12.0);

                surface_section(ui, state, info);
                ui.separator();
                lighting_section(ui, state);
                ui.separator();
                material_section(ui, "SURFACE MATERIAL", "surface_mat", &mut state.surface_material);
                material_section(ui, "MESH MATERIAL", "mesh_mat", &mut state.mesh_material);
                ui.separator();
                path_section(ui, state);
                ui.separator();
                view_section(ui, state, info, &mut actions);
            });
        });

    actions
}

fn section_header(ui: &mut Ui, text: &str) {
    ui.add_space(6.0);
    ui.label(RichText::new(text).color(TEXT_MUTED).size(11.0).strong());
    ui.add_space(4.0);
}

fn surface_section(ui: &mut Ui, state: &mut AppState, info: &PanelInfo) {
    section_header(ui, "SURFACE");

    let selected = SURFACE_PRESETS
        .get(state.surface_preset)
        .map_or("Select...", |p| p.name);
    egui::ComboBox::from_id_salt("surface_presets")
        .selected_text(selected)
        .width(ui.available_width())
        .show_ui(ui, |ui| {
            for (i, preset) in SURFACE_PRESETS.iter().enumerate() {
                if ui
                    .selectable_label(state.surface_preset == i, preset.name)
                    .clicked()
                    && state.surface_preset != i
                {
                    state.surface_preset = i;
                    state.needs_retessellate = true;
                }
            }
        });
    if let Some(preset) = SURFACE_PRESETS.get(state.surface_preset) {
        ui.label(RichText::new(preset.description).color(TEXT_MUTED).size(11.0).italics());
    }

    ui.add_space(6.0);
    egui::Grid::new("resolution").num_columns(2).show(ui, |ui| {
        ui.label("Resolution u");
        if ui
            .add(egui::Slider::new(&mut state.resolution_u, 1..=MAX_RESOLUTION))
            .changed()
        {
            state.needs_retessellate = true;
        }
        ui.end_row();

        ui.label("Resolution v");
        if ui
            .add(egui::Slider::new(&mut state.resolution_v, 1..=MAX_RESOLUTION))
            .changed()
        {
            state.needs_retessellate = true;
        }
        ui.end_row();
    });

    ui.label(
        RichText::new(format!(
            "{} vertices, {} triangles",
            info.surface_vertices,
            info.surface_indices / 3
        ))
        .color(TEXT_MUTED)
        .size(11.0),
    );
}

fn lighting_section(ui: &mut Ui, state: &mut AppState) {
    section_header(ui, "LIGHT");
    let lighting = &mut state.lighting;

    ui.checkbox(&mut lighting.follow_camera, "Follow camera");

    let mut xz = Vec2::new(lighting.position.x, lighting.position.z);
    let mut moved = false;
    egui::Grid::new("light_position").num_columns(2).show(ui, |ui| {
        ui.label("Light X");
        moved |= ui.add(egui::Slider::new(&mut xz.x, -1.0..=1.0)).changed();
        ui.end_row();
        ui.label("Light Z");
        moved |= ui.add(egui::Slider::new(&mut xz.y, -1.0..=1.0)).changed();
        ui.end_row();
        ui.label("Light Y");
        ui.label(format!("{:.3}", lighting.position.y));
        ui.end_row();
    });
    if moved {
        lighting.set_xz(xz);
    }

    ui.add_space(4.0);
    ui.horizontal(|ui| {
        color_button(ui, "La", &mut lighting.la);
        color_button(ui, "Ld", &mut lighting.ld);
        color_button(ui, "Ls", &mut lighting.ls);
    });

    ui.add_space(4.0);
    ui.label(RichText::new("Attenuation").color(TEXT_MUTED).size(11.0));
    ui.horizontal(|ui| {
        ui.add(
            egui::DragValue::new(&mut lighting.constant_attenuation)
                .speed(0.01)
                .range(0.0..=10.0)
                .prefix("c "),
        );
        ui.add(
            egui::DragValue::new(&mut lighting.linear_attenuation)
                .speed(0.005)
                .range(0.0..=5.0)
                .prefix("l "),
        );
        ui.add(
            egui::DragValue::new(&mut lighting.quadratic_attenuation)
                .speed(0.001)
                .range(0.0..=5.0)
                .prefix("q "),
        );
    });
}

fn material_section(ui: &mut Ui, title: &str, id: &str, material: &mut Material) {
    section_header(ui, title);

    egui::Grid::new(id).num_columns(2).show(ui, |ui| {
        ui.label("Shininess");
        ui.add(
            egui::DragValue::new(&mut material.shininess)
                .speed(0.1)
                .range(0.1..=512.0),
        );
        ui.end_row();

        for (label, channel) in [
            ("Ka", &mut material.ka),
            ("Kd", &mut material.kd),
            ("Ks", &mut material.ks),
        ] {
            ui.label(label);
            let mut k = channel.x;
            if ui.add(egui::Slider::new(&mut k, 0.0..=1.0)).changed() {
                *channel = Vec3::splat(k);
            }
            ui.end_row();
        }
    });
}

fn path_section(ui: &mut Ui, state: &mut AppState) {
    section_header(ui, "PATH");
    let path = &mut state.path;

    let max_t = path.max_t();
    ui.horizontal(|ui| {
        ui.label("t");
        ui.add(egui::Slider::new(&mut path.t, 0.0..=max_t));
    });
    ui.horizontal(|ui| {
        ui.label("Mesh scale");
        ui.add(egui::Slider::new(&mut state.mesh_scale, MESH_SCALE_RANGE));
    });

    ui.add_space(4.0);
    let count = path.points.len();
    let mut remove = None;
    egui::Grid::new("control_points").num_columns(5).show(ui, |ui| {
        for (i, point) in path.points.iter_mut().enumerate() {
            let color = match i {
                0 => ACCENT_OK,
                i if i + 1 == count => Color32::from_rgb(235, 70, 50),
                _ => ACCENT_WARM,
            };
            ui.label(RichText::new(format!("P{}", i)).color(color));
            ui.add(egui::DragValue::new(&mut point.x).speed(0.05).prefix("x "));
            ui.add(egui::DragValue::new(&mut point.y).speed(0.05).prefix("y "));
            ui.add(egui::DragValue::new(&mut point.z).speed(0.05).prefix("z "));
            if ui.small_button("x").on_hover_text("Remove point").clicked() {
                remove = Some(i);
            }
            ui.end_row();
        }
    });

    if let Some(i) = remove {
        path.remove_point(i);
    }
    if ui.button("Add point").clicked() {
        path.push_point();
    }
}

fn view_section(ui: &mut Ui, state: &mut AppState, info: &PanelInfo, actions: &mut UiActions) {
    section_header(ui, "VIEW");

    ui.horizontal(|ui| {
        ui.label("Camera:");
        if ui
            .selectable_label(state.camera_mode == CameraMode::Orbital, "Orbital")
            .clicked()
        {
            state.camera_mode = CameraMode::Orbital;
        }
        if ui
            .selectable_label(state.camera_mode == CameraMode::Free, "Free")
            .clicked()
        {
            state.camera_mode = CameraMode::Free;
        }
        if ui.button("Reset").clicked() {
            actions.reset_camera = true;
        }
    });

    ui.horizontal(|ui| {
        ui.checkbox(&mut state.vsync_enabled, "VSync");
        ui.add_enabled(
            info.wireframe_available,
            egui::Checkbox::new(&mut state.wireframe, "Wireframe (F1)"),
        );
    });
    ui.horizontal(|ui| {
        ui.checkbox(&mut state.show_gizmos, "Markers");
        ui.checkbox(&mut state.show_help, "Help");
    });

    ui.add_space(6.0);
    if ui
        .add(
            egui::Button::new(RichText::new("Reload shader (Ctrl+F5)").color(TEXT_PRIMARY))
                .fill(BG_WIDGET)
                .min_size(egui::vec2(ui.available_width(), 28.0)),
        )
        .clicked()
    {
        actions.reload_shader = true;
    }

    if let Some(err) = info.shader_error {
        ui.add_space(6.0);
        egui::Frame::default()
            .fill(Color32::from_rgb(40, 15, 15))
            .stroke(egui::Stroke::new(1.0, Color32::from_rgb(200, 60, 60)))
            .rounding(4.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.label(RichText::new(err).color(Color32::from_rgb(230, 110, 110)).size(11.0));
            });
    }
}

fn color_button(ui: &mut Ui, label: &str, color: &mut Vec3) {
    ui.label(label);
    let mut rgb = color.to_array();
    if ui.color_edit_button_rgb(&mut rgb).changed() {
        *color = Vec3::from_array(rgb);
    }
}

pub fn draw_help_overlay(ctx: &Context, eye: Vec3, mode: CameraMode) {
    egui::Area::new(egui::Id::new("help_overlay"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(BG_OVERLAY)
                .rounding(6.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.style_mut().override_font_id =
                        Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));
                    let controls = match mode {
                        CameraMode::Orbital => "RMB+Drag - Orbit | Scroll - Zoom",
                        CameraMode::Free => "WASD - Move | RMB+Drag - Look | Scroll - Speed",
                    };
                    ui.label(RichText::new(controls).color(TEXT_MUTED));
                    ui.label(RichText::new("F1 - Wireframe | Ctrl+F5 - Reload shader").color(TEXT_MUTED));
                    ui.label(
                        RichText::new(format!("Eye: ({:.2}, {:.2}, {:.2})", eye.x, eye.y, eye.z))
                            .color(TEXT_MUTED),
                    );
                });
        });
}
