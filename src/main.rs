use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};

use glam::{Vec2, Vec3};

mod assets;
mod config;
mod math;
mod renderer;
mod ui;

use config::DemoConfig;
use math::{Mesh, SURFACE_PRESETS, Surface, primitives, tessellate};
use renderer::gpu::EMBEDDED_SHADER;
use renderer::{Camera, FrameRecorder, FrameUniforms, GpuState, SceneAssets, SceneComposer};
use ui::{AppState, PanelInfo, UiActions, apply_theme, draw_help_overlay, draw_side_panel};

struct InputState {
    forward: f32,
    right: f32,
    up: f32,
    mouse_captured: bool,
    mouse_delta: Vec2,
    modifiers: ModifiersState,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            forward: 0.0,
            right: 0.0,
            up: 0.0,
            mouse_captured: false,
            mouse_delta: Vec2::ZERO,
            modifiers: ModifiersState::empty(),
        }
    }
}

struct App {
    config: DemoConfig,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    camera: Camera,
    composer: SceneComposer,
    state: AppState,
    input: InputState,

    last_frame: Instant,
    frame_count: u32,
    fps_timer: Instant,
    fps: f32,

    last_vsync_state: bool,
    shader_error: Option<String>,
    exit_requested: bool,
}

impl App {
    fn new(config: DemoConfig) -> Self {
        let state = AppState::from_config(&config.scene, config.window.vsync);
        let camera = initial_camera(&config);

        Self {
            window: None,
            gpu: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            camera,
            composer: SceneComposer::default(),
            last_vsync_state: state.vsync_enabled,
            state,
            input: InputState::default(),

            last_frame: Instant::now(),
            frame_count: 0,
            fps_timer: Instant::now(),
            fps: 0.0,

            shader_error: None,
            exit_requested: false,
            config,
        }
    }

    fn build_surface(&self) -> Result<Mesh> {
        let preset = SURFACE_PRESETS
            .get(self.state.surface_preset)
            .context("surface preset index out of range")?;
        let surface = preset.build()?;
        let mesh = tessellate(&surface, self.state.resolution_u, self.state.resolution_v)?;

        log::info!(
            "tessellated {} at {}x{}: {} vertices, {} triangles",
            preset.name,
            self.state.resolution_u,
            self.state.resolution_v,
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    fn load_scene_assets(&self) -> Result<SceneAssets> {
        let assets_config = &self.config.assets;

        let imported = assets::load_obj(&assets_config.mesh).unwrap_or_else(|e| {
            log::warn!("{:#}; placing a cube on the path instead", e);
            primitives::cube(0.5)
        });

        Ok(SceneAssets {
            surface: self.build_surface()?,
            imported,
            skybox: primitives::cube(1.0),
            gizmo: tessellate(&Surface::unit_sphere(), 12, 8)?,
            diffuse: assets::load_diffuse_or_fallback(&assets_config.diffuse_texture),
            skybox_faces: assets::load_cubemap_or_fallback(
                &assets_config.skybox_dir,
                &assets_config.skybox_extension,
            ),
        })
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let scene_assets = self.load_scene_assets()?;
        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            self.state.vsync_enabled,
            scene_assets,
        ))?;

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        let size = window.inner_size();
        self.camera.set_aspect(size.width as f32, size.height as f32);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);
        Ok(())
    }

    fn retessellate(&mut self) {
        self.state.needs_retessellate = false;

        match self.build_surface() {
            Ok(mesh) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.replace_surface_mesh(&mesh);
                }
            }
            Err(e) => log::warn!("surface not rebuilt: {:#}", e),
        }
    }

    fn reload_shader(&mut self) {
        let Some(gpu) = &mut self.gpu else { return };

        let source = match &self.config.assets.shader {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read shader {}", path.display())),
            None => Ok(EMBEDDED_SHADER.to_string()),
        };

        let result = source.and_then(|source| gpu.reload_shader(&source));
        match result {
            Ok(()) => self.shader_error = None,
            Err(e) => {
                log::error!("{:#}", e);
                self.shader_error = Some(format!("{:#}", e));
            }
        }
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.frame_count += 1;
        if self.fps_timer.elapsed().as_secs_f32() >= 1.0 {
            self.fps = self.frame_count as f32 / self.fps_timer.elapsed().as_secs_f32();
            self.frame_count = 0;
            self.fps_timer = Instant::now();
        }

        self.camera.set_mode(self.state.camera_mode);
        self.camera
            .process_keyboard(self.input.forward, self.input.right, self.input.up, dt);

        if self.input.mouse_captured {
            self.camera.process_mouse_movement(self.input.mouse_delta);
        }
        self.input.mouse_delta = Vec2::ZERO;

        self.state.lighting.track_camera(self.camera.eye());

        if self.state.needs_retessellate {
            self.retessellate();
        }
    }

    fn render(&mut self) {
        let (Some(window), Some(egui_state), Some(gpu)) =
            (&self.window, &mut self.egui_state, &self.gpu)
        else {
            return;
        };

        let raw_input = egui_state.take_egui_input(window);

        let (surface_vertices, surface_indices) = gpu.surface_counts();
        let info = PanelInfo {
            fps: self.fps,
            surface_vertices,
            surface_indices,
            wireframe_available: gpu.supports_wireframe(),
            shader_error: self.shader_error.as_deref(),
        };
        let eye = self.camera.eye();
        let camera_mode = self.camera.mode;

        let mut ui_actions = UiActions::default();

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = draw_side_panel(ctx, &mut self.state, &info);

            if self.state.show_help {
                draw_help_overlay(ctx, eye, camera_mode);
            }
        });

        self.handle_ui_actions(ui_actions);

        let Some(gpu) = &mut self.gpu else { return };
        let Some(window) = &self.window else { return };
        let Some(egui_state) = &mut self.egui_state else {
            return;
        };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return;
        };

        egui_state.handle_platform_output(window, full_output.platform_output);

        if self.state.vsync_enabled != self.last_vsync_state {
            gpu.set_vsync(self.state.vsync_enabled);
            self.last_vsync_state = self.state.vsync_enabled;
        }

        if self.state.wireframe != gpu.wireframe() {
            self.state.wireframe = gpu.set_wireframe(self.state.wireframe);
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.size);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory, shutting down");
                self.exit_requested = true;
                return;
            }
            Err(e) => {
                log::warn!("skipping frame: {}", e);
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut recorder = FrameRecorder::default();
        self.composer
            .compose(&self.state, self.camera.eye(), &mut recorder);
        let frame_uniforms = FrameUniforms::new(&self.camera, &self.state.lighting);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        gpu.render_scene(&view, &mut encoder, &frame_uniforms, recorder.commands());

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        window.request_redraw();
    }

    fn handle_ui_actions(&mut self, actions: UiActions) {
        if actions.reload_shader {
            self.reload_shader();
        }

        if actions.reset_camera {
            let aspect = self.camera.aspect;
            self.camera = initial_camera(&self.config);
            self.camera.aspect = aspect;
            self.state.camera_mode = self.camera.mode;
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        let value = if pressed { 1.0 } else { 0.0 };

        match key {
            KeyCode::KeyW => self.input.forward = value,
            KeyCode::KeyS => self.input.forward = -value,
            KeyCode::KeyA => self.input.right = -value,
            KeyCode::KeyD => self.input.right = value,
            KeyCode::Space => self.input.up = value,
            KeyCode::ShiftLeft => self.input.up = -value,
            KeyCode::F1 if pressed => {
                self.state.wireframe = !self.state.wireframe;
            }
            KeyCode::F5 if pressed && self.input.modifiers.control_key() => {
                self.reload_shader();
            }
            KeyCode::Escape if pressed => {
                self.release_mouse();
            }
            _ => {}
        }
    }

    fn release_mouse(&mut self) {
        self.input.mouse_captured = false;
        if let Some(window) = &self.window {
            let _ = window.set_cursor_grab(winit::window::CursorGrabMode::None);
            window.set_cursor_visible(true);
        }
    }
}

fn initial_camera(config: &DemoConfig) -> Camera {
    Camera::looking_at(
        Vec3::from_array(config.scene.camera_eye),
        Vec3::from_array(config.scene.camera_target),
    )
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = self.init_gpu(window) {
            log::error!("failed to initialise renderer: {:#}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let (Some(egui_state), Some(window)) = (&mut self.egui_state, &self.window) {
            let response = egui_state.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                    self.camera
                        .set_aspect(size.width as f32, size.height as f32);
                }
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                self.input.modifiers = modifiers.state();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.handle_key(key, event.state == ElementState::Pressed);
                }
            }

            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state,
                ..
            } => {
                if state == ElementState::Pressed {
                    self.input.mouse_captured = true;
                    if let Some(window) = &self.window {
                        let _ = window.set_cursor_grab(winit::window::CursorGrabMode::Confined);
                        window.set_cursor_visible(false);
                    }
                } else {
                    self.release_mouse();
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => y,
                    winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.camera.process_scroll(scroll);
            }

            WindowEvent::RedrawRequested => {
                self.update();
                self.render();
            }

            _ => {}
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: winit::event::DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.input.mouse_captured {
                self.input.mouse_delta.x += delta.0 as f32;
                self.input.mouse_delta.y += delta.1 as f32;
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Warn)
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = DemoConfig::load(config_path.as_deref())?;

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("event loop terminated abnormally")?;
    Ok(())
}
