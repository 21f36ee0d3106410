use std::ops::RangeInclusive;

use glam::Vec3;

use crate::config::SceneConfig;
use crate::math::ControlPath;
use crate::math::presets::preset_by_name;
use crate::renderer::{CameraMode, Lighting, Material};

pub const MAX_RESOLUTION: u32 = 256;
pub const MESH_SCALE_RANGE: RangeInclusive<f32> = 0.05..=3.0;

/// Everything the panel edits and the composer reads each frame.
#[derive(Clone, Debug)]
pub struct AppState {
    pub lighting: Lighting,
    pub surface_material: Material,
    pub mesh_material: Material,

    pub path: ControlPath,
    pub mesh_scale: f32,

    pub surface_preset: usize,
    pub surface_position: Vec3,
    pub resolution_u: u32,
    pub resolution_v: u32,
    pub needs_retessellate: bool,

    pub camera_mode: CameraMode,
    pub vsync_enabled: bool,
    pub wireframe: bool,
    pub show_gizmos: bool,
    pub show_help: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            lighting: Lighting::default(),
            surface_material: Material::default(),
            mesh_material: Material {
                ka: Vec3::splat(0.6),
                kd: Vec3::new(0.9, 0.75, 0.5),
                ks: Vec3::splat(0.8),
                shininess: 32.0,
            },

            path: ControlPath::default(),
            mesh_scale: 0.6,

            surface_preset: 0,
            surface_position: Vec3::ZERO,
            resolution_u: 64,
            resolution_v: 32,
            needs_retessellate: false,

            camera_mode: CameraMode::Orbital,
            vsync_enabled: true,
            wireframe: false,
            show_gizmos: true,
            show_help: true,
        }
    }
}

impl AppState {
    pub fn from_config(scene: &SceneConfig, vsync: bool) -> Self {
        let surface_preset = preset_by_name(&scene.surface_preset).unwrap_or_else(|| {
            log::warn!("unknown surface preset {:?}, using the first one", scene.surface_preset);
            0
        });

        Self {
            path: ControlPath::new(scene.control_points.iter().map(|p| Vec3::from_array(*p)).collect()),
            mesh_scale: clamp_mesh_scale(scene.mesh_scale),
            surface_preset,
            surface_position: Vec3::from_array(scene.surface_position),
            resolution_u: scene.resolution_u.clamp(1, MAX_RESOLUTION),
            resolution_v: scene.resolution_v.clamp(1, MAX_RESOLUTION),
            vsync_enabled: vsync,
            ..Self::default()
        }
    }
}

/// Keeps the imported mesh scale inside the panel's range. Zero would make
/// the world matrix singular and a negative scale flips the winding.
fn clamp_mesh_scale(scale: f32) -> f32 {
    let (min, max) = (*MESH_SCALE_RANGE.start(), *MESH_SCALE_RANGE.end());
    let clamped = if scale.is_nan() { 1.0 } else { scale.clamp(min, max) };
    if clamped != scale {
        log::warn!("mesh scale {} out of range, using {}", scale, clamped);
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::SceneComposer;
    use crate::renderer::scene::{DrawKind, FrameRecorder, MeshSlot};

    #[test]
    fn config_overrides_scene_fields() {
        let scene = SceneConfig {
            surface_preset: "wave".to_string(),
            resolution_u: 0,
            resolution_v: 10_000,
            control_points: vec![[0.0, 1.0, 0.0]],
            ..SceneConfig::default()
        };
        let state = AppState::from_config(&scene, false);

        assert_eq!(state.surface_preset, 3);
        assert_eq!(state.resolution_u, 1);
        assert_eq!(state.resolution_v, MAX_RESOLUTION);
        assert_eq!(state.path.points, vec![Vec3::Y]);
        assert!(!state.vsync_enabled);
    }

    #[test]
    fn unknown_preset_falls_back() {
        let scene = SceneConfig {
            surface_preset: "klein bottle".to_string(),
            ..SceneConfig::default()
        };
        assert_eq!(AppState::from_config(&scene, true).surface_preset, 0);
    }

    #[test]
    fn mesh_scale_is_clamped_to_panel_range() {
        for (input, expected) in [(0.0, 0.05), (-2.0, 0.05), (10.0, 3.0), (f32::NAN, 1.0), (0.6, 0.6)] {
            let scene = SceneConfig {
                mesh_scale: input,
                ..SceneConfig::default()
            };
            assert_eq!(AppState::from_config(&scene, true).mesh_scale, expected);
        }
    }

    #[test]
    fn zero_mesh_scale_keeps_normal_matrix_finite() {
        let scene = SceneConfig {
            mesh_scale: 0.0,
            ..SceneConfig::default()
        };
        let state = AppState::from_config(&scene, true);

        let mut recorder = FrameRecorder::default();
        SceneComposer::default().compose(&state, Vec3::new(0.0, 7.0, 7.0), &mut recorder);

        let imported = recorder
            .commands()
            .iter()
            .find(|c| c.kind == DrawKind::Lit && c.mesh == MeshSlot::Imported)
            .unwrap();
        assert!(imported.uniforms.world_it().is_finite());
    }
}
