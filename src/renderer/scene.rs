use glam::{Mat4, Vec3};

use crate::renderer::uniforms::{DrawUniforms, Material};
use crate::ui::AppState;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DepthCompare {
    Less,
    LessEqual,
}

/// Depth-test configuration in effect for subsequent draws.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DepthState {
    pub test_enabled: bool,
    pub compare: DepthCompare,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enabled: true,
            compare: DepthCompare::Less,
        }
    }
}

impl DepthState {
    pub fn with_compare(self, compare: DepthCompare) -> Self {
        Self { compare, ..self }
    }

    pub fn with_test(self, test_enabled: bool) -> Self {
        Self {
            test_enabled,
            ..self
        }
    }

    pub fn compare_function(&self) -> wgpu::CompareFunction {
        if !self.test_enabled {
            return wgpu::CompareFunction::Always;
        }
        match self.compare {
            DepthCompare::Less => wgpu::CompareFunction::Less,
            DepthCompare::LessEqual => wgpu::CompareFunction::LessEqual,
        }
    }
}

/// Shader entry points a draw is routed through.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DrawKind {
    Lit,
    Skybox,
    Gizmo,
}

/// GPU meshes owned by the backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MeshSlot {
    Surface,
    Imported,
    Skybox,
    Gizmo,
}

#[derive(Clone, Copy, Debug)]
pub struct DrawCommand {
    pub kind: DrawKind,
    pub mesh: MeshSlot,
    pub depth: DepthState,
    pub uniforms: DrawUniforms,
}

/// Receiver of draw calls. Owns the current depth state, which applies to
/// every draw issued until it is changed again.
pub trait DrawSink {
    fn depth_state(&self) -> DepthState;
    fn set_depth_state(&mut self, state: DepthState);
    fn draw(&mut self, kind: DrawKind, mesh: MeshSlot, uniforms: DrawUniforms);
}

/// Runs `f` with `state` applied and restores the previous depth state
/// afterwards.
pub fn with_depth_state<S, R>(sink: &mut S, state: DepthState, f: impl FnOnce(&mut S) -> R) -> R
where
    S: DrawSink + ?Sized,
{
    let saved = sink.depth_state();
    sink.set_depth_state(state);
    let result = f(sink);
    sink.set_depth_state(saved);
    result
}

/// Sink that stores draws for later replay by the GPU backend.
#[derive(Default)]
pub struct FrameRecorder {
    depth: DepthState,
    commands: Vec<DrawCommand>,
}

impl FrameRecorder {
    pub fn new(depth: DepthState) -> Self {
        Self {
            depth,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}

impl DrawSink for FrameRecorder {
    fn depth_state(&self) -> DepthState {
        self.depth
    }

    fn set_depth_state(&mut self, state: DepthState) {
        self.depth = state;
    }

    fn draw(&mut self, kind: DrawKind, mesh: MeshSlot, uniforms: DrawUniforms) {
        self.commands.push(DrawCommand {
            kind,
            mesh,
            depth: self.depth,
            uniforms,
        });
    }
}

const START_MARKER: Vec3 = Vec3::new(0.2, 0.9, 0.3);
const END_MARKER: Vec3 = Vec3::new(0.95, 0.25, 0.2);
const INNER_MARKER: Vec3 = Vec3::new(0.95, 0.8, 0.2);

pub struct SceneComposer {
    pub gizmo_radius: f32,
    pub skybox_extent: f32,
}

impl Default for SceneComposer {
    fn default() -> Self {
        Self {
            gizmo_radius: 0.15,
            skybox_extent: 1.0,
        }
    }
}

impl SceneComposer {
    /// Issues the frame's draws in order: surface, imported mesh, skybox,
    /// control-point markers. Leaves `sink`'s depth state as it found it.
    pub fn compose(&self, state: &AppState, eye: Vec3, sink: &mut impl DrawSink) {
        let surface_world = Mat4::from_translation(state.surface_position);
        sink.draw(
            DrawKind::Lit,
            MeshSlot::Surface,
            DrawUniforms::new(surface_world, &state.surface_material),
        );

        let frame = state.path.frame();
        let mesh_world = Mat4::from_translation(state.path.position())
            * Mat4::from_mat3(frame.rotation())
            * Mat4::from_scale(Vec3::splat(state.mesh_scale));
        sink.draw(
            DrawKind::Lit,
            MeshSlot::Imported,
            DrawUniforms::new(mesh_world, &state.mesh_material),
        );

        let skybox_world =
            Mat4::from_translation(eye) * Mat4::from_scale(Vec3::splat(self.skybox_extent));
        let skybox_depth = sink.depth_state().with_compare(DepthCompare::LessEqual);
        with_depth_state(sink, skybox_depth, |sink| {
            sink.draw(
                DrawKind::Skybox,
                MeshSlot::Skybox,
                DrawUniforms::new(skybox_world, &Material::default()),
            );
        });

        if !state.show_gizmos {
            return;
        }

        let points = &state.path.points;
        let gizmo_depth = sink.depth_state().with_test(false);
        with_depth_state(sink, gizmo_depth, |sink| {
            for (i, point) in points.iter().enumerate() {
                let color = match i {
                    0 => START_MARKER,
                    i if i + 1 == points.len() => END_MARKER,
                    _ => INNER_MARKER,
                };
                let radius = if i == 0 || i + 1 == points.len() {
                    self.gizmo_radius
                } else {
                    self.gizmo_radius * 0.6
                };
                let world = Mat4::from_translation(*point) * Mat4::from_scale(Vec3::splat(radius));
                sink.draw(
                    DrawKind::Gizmo,
                    MeshSlot::Gizmo,
                    DrawUniforms::new(world, &Material::emissive(color)),
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ALL_DEPTH_STATES: [DepthState; 4] = [
        DepthState {
            test_enabled: true,
            compare: DepthCompare::Less,
        },
        DepthState {
            test_enabled: true,
            compare: DepthCompare::LessEqual,
        },
        DepthState {
            test_enabled: false,
            compare: DepthCompare::Less,
        },
        DepthState {
            test_enabled: false,
            compare: DepthCompare::LessEqual,
        },
    ];

    fn compose(state: &AppState, initial: DepthState) -> FrameRecorder {
        let mut recorder = FrameRecorder::new(initial);
        SceneComposer::default().compose(state, Vec3::new(0.0, 7.0, 7.0), &mut recorder);
        recorder
    }

    #[test]
    fn draws_in_fixed_order() {
        let recorder = compose(&AppState::default(), DepthState::default());
        let slots: Vec<_> = recorder.commands().iter().map(|c| c.mesh).collect();
        assert_eq!(
            slots,
            [
                MeshSlot::Surface,
                MeshSlot::Imported,
                MeshSlot::Skybox,
                MeshSlot::Gizmo,
                MeshSlot::Gizmo
            ]
        );
    }

    #[test]
    fn depth_state_restored_for_every_initial_state() {
        let state = AppState::default();
        for initial in ALL_DEPTH_STATES {
            let recorder = compose(&state, initial);
            assert_eq!(recorder.depth_state(), initial);
        }
    }

    #[test]
    fn overrides_apply_only_to_their_draws() {
        let recorder = compose(&AppState::default(), DepthState::default());
        for command in recorder.commands() {
            match command.kind {
                DrawKind::Lit => assert_eq!(command.depth, DepthState::default()),
                DrawKind::Skybox => {
                    assert!(command.depth.test_enabled);
                    assert_eq!(command.depth.compare, DepthCompare::LessEqual);
                }
                DrawKind::Gizmo => assert!(!command.depth.test_enabled),
            }
        }
    }

    #[test]
    fn hidden_gizmos_still_restore_state() {
        let state = AppState {
            show_gizmos: false,
            ..AppState::default()
        };
        for initial in ALL_DEPTH_STATES {
            let recorder = compose(&state, initial);
            assert_eq!(recorder.commands().len(), 3);
            assert_eq!(recorder.depth_state(), initial);
        }
    }

    #[test]
    fn mesh_follows_path() {
        let mut state = AppState::default();
        state.path.t = 0.5;
        let recorder = compose(&state, DepthState::default());

        let mesh = recorder.commands()[1];
        let origin = mesh.uniforms.world().transform_point3(Vec3::ZERO);
        assert_abs_diff_eq!(origin, state.path.position(), epsilon = 1e-5);

        let forward = mesh.uniforms.world().transform_vector3(Vec3::Z).normalize();
        assert_abs_diff_eq!(forward, state.path.tangent(), epsilon = 1e-5);
    }

    #[test]
    fn gizmos_mark_each_control_point() {
        let mut state = AppState::default();
        state.path.push_point();
        let recorder = compose(&state, DepthState::default());

        let centres: Vec<_> = recorder
            .commands()
            .iter()
            .filter(|c| c.kind == DrawKind::Gizmo)
            .map(|c| c.uniforms.world().transform_point3(Vec3::ZERO))
            .collect();
        assert_eq!(centres.len(), state.path.points.len());
        for (centre, point) in centres.iter().zip(&state.path.points) {
            assert_abs_diff_eq!(*centre, *point, epsilon = 1e-5);
        }
    }

    #[test]
    fn nested_overrides_unwind() {
        let mut recorder = FrameRecorder::default();
        let outer = DepthState::default().with_test(false);
        with_depth_state(&mut recorder, outer, |sink| {
            let inner = sink.depth_state().with_compare(DepthCompare::LessEqual);
            with_depth_state(sink, inner, |sink| {
                assert_eq!(sink.depth_state(), inner);
            });
            assert_eq!(sink.depth_state(), outer);
        });
        assert_eq!(recorder.depth_state(), DepthState::default());
    }

    #[test]
    fn disabled_test_maps_to_always() {
        let state = DepthState::default().with_test(false);
        assert_eq!(state.compare_function(), wgpu::CompareFunction::Always);
        assert_eq!(
            DepthState::default().with_compare(DepthCompare::LessEqual).compare_function(),
            wgpu::CompareFunction::LessEqual
        );
    }
}
