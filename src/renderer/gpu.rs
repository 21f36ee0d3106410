use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use winit::window::Window;

use crate::assets::ImageData;
use crate::math::Mesh;
use crate::renderer::mesh::{GpuMesh, vertex_layout};
use crate::renderer::scene::{DepthState, DrawCommand, DrawKind, MeshSlot};
use crate::renderer::texture::{DEPTH_FORMAT, Texture, create_depth_view};
use crate::renderer::uniforms::{DrawUniforms, FrameUniforms};

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.125,
    g: 0.25,
    b: 0.5,
    a: 1.0,
};

const MAX_DRAWS_PER_FRAME: u64 = 256;

pub const EMBEDDED_SHADER: &str = include_str!("shaders.wgsl");

/// Rounds `size` up to the next multiple of `alignment`.
pub fn uniform_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

/// CPU-side inputs for the scene's GPU resources.
pub struct SceneAssets {
    pub surface: Mesh,
    pub imported: Mesh,
    pub skybox: Mesh,
    pub gizmo: Mesh,
    pub diffuse: ImageData,
    pub skybox_faces: [ImageData; 6],
}

struct SceneMeshes {
    surface: GpuMesh,
    imported: GpuMesh,
    skybox: GpuMesh,
    gizmo: GpuMesh,
}

impl SceneMeshes {
    fn get(&self, slot: MeshSlot) -> &GpuMesh {
        match slot {
            MeshSlot::Surface => &self.surface,
            MeshSlot::Imported => &self.imported,
            MeshSlot::Skybox => &self.skybox,
            MeshSlot::Gizmo => &self.gizmo,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct PipelineKey {
    kind: DrawKind,
    depth: DepthState,
    wireframe: bool,
}

pub struct GpuState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,

    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_stride: u64,
    texture_bind_group: wgpu::BindGroup,
    _diffuse: Texture,
    _skybox: Texture,

    meshes: SceneMeshes,
    depth_texture: wgpu::TextureView,

    supports_wireframe: bool,
    wireframe: bool,
}

impl GpuState {
    pub async fn new(window: Arc<Window>, vsync: bool, assets: SceneAssets) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter found")?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let supports_wireframe = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if supports_wireframe {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features,
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .context("failed to open GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&fallback_format) = surface_caps.formats.first() else {
            bail!("surface reports no supported formats");
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(fallback_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(EMBEDDED_SHADER.into()),
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let draw_size = std::mem::size_of::<DrawUniforms>() as u64;
        let draw_stride = uniform_stride(
            draw_size,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let draw_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer"),
            size: draw_stride * MAX_DRAWS_PER_FRAME,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let draw_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(draw_size),
                    },
                    count: None,
                }],
            });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Texture Bind Group Layout"),
                entries: &[
                    texture_entry(0, wgpu::TextureViewDimension::D2),
                    sampler_entry(1),
                    texture_entry(2, wgpu::TextureViewDimension::Cube),
                    sampler_entry(3),
                ],
            });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout: &draw_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &draw_buffer,
                    offset: 0,
                    size: NonZeroU64::new(draw_size),
                }),
            }],
        });

        let diffuse = Texture::from_image(&device, &queue, &assets.diffuse, "Diffuse Texture");
        let skybox = Texture::cubemap(&device, &queue, &assets.skybox_faces, "Skybox Cubemap");

        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Bind Group"),
            layout: &texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&skybox.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&skybox.sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[
                &frame_bind_group_layout,
                &draw_bind_group_layout,
                &texture_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let meshes = SceneMeshes {
            surface: GpuMesh::compile(&device, &assets.surface, "Surface"),
            imported: GpuMesh::compile(&device, &assets.imported, "Imported Mesh"),
            skybox: GpuMesh::compile(&device, &assets.skybox, "Skybox"),
            gizmo: GpuMesh::compile(&device, &assets.gizmo, "Gizmo"),
        };

        let depth_texture = create_depth_view(&device, config.width, config.height);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            shader,
            pipeline_layout,
            pipelines: HashMap::new(),
            frame_buffer,
            frame_bind_group,
            draw_buffer,
            draw_bind_group,
            draw_stride,
            texture_bind_group,
            _diffuse: diffuse,
            _skybox: skybox,
            meshes,
            depth_texture,
            supports_wireframe,
            wireframe: false,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture =
                create_depth_view(&self.device, self.config.width, self.config.height);
        }
    }

    pub fn set_vsync(&mut self, enabled: bool) {
        self.config.present_mode = present_mode(enabled);
        self.surface.configure(&self.device, &self.config);
    }

    pub fn supports_wireframe(&self) -> bool {
        self.supports_wireframe
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    /// Returns the mode actually in effect.
    pub fn set_wireframe(&mut self, enabled: bool) -> bool {
        if enabled && !self.supports_wireframe {
            log::warn!("adapter does not support line polygon mode, wireframe unavailable");
            return self.wireframe;
        }
        self.wireframe = enabled;
        self.wireframe
    }

    /// Vertex and index counts of the surface mesh currently on the GPU.
    pub fn surface_counts(&self) -> (u32, u32) {
        (self.meshes.surface.vertex_count, self.meshes.surface.index_count)
    }

    pub fn replace_surface_mesh(&mut self, mesh: &Mesh) {
        self.meshes.surface = GpuMesh::compile(&self.device, mesh, "Surface");
    }

    /// Compiles `source` and rebuilds every cached pipeline from it. On any
    /// validation error the previous shader and pipelines stay in use.
    pub fn reload_shader(&mut self, source: &str) -> Result<()> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Scene Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let rebuilt: HashMap<_, _> = self
            .pipelines
            .keys()
            .map(|&key| (key, self.create_pipeline(&shader, key)))
            .collect();

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            bail!("shader reload rejected: {}", error);
        }

        log::info!("shader reloaded, {} pipelines rebuilt", rebuilt.len());
        self.shader = shader;
        self.pipelines = rebuilt;
        Ok(())
    }

    fn pipeline_key(&self, command: &DrawCommand) -> PipelineKey {
        PipelineKey {
            kind: command.kind,
            depth: command.depth,
            wireframe: self.wireframe && command.kind == DrawKind::Lit,
        }
    }

    fn create_pipeline(&self, shader: &wgpu::ShaderModule, key: PipelineKey) -> wgpu::RenderPipeline {
        let (vs, fs, cull_mode) = match key.kind {
            DrawKind::Lit => ("vs_lit", "fs_lit", Some(wgpu::Face::Back)),
            DrawKind::Skybox => ("vs_skybox", "fs_skybox", None),
            DrawKind::Gizmo => ("vs_lit", "fs_gizmo", Some(wgpu::Face::Back)),
        };

        let depth_write_enabled = key.depth.test_enabled && key.kind != DrawKind::Skybox;
        let polygon_mode = if key.wireframe {
            wgpu::PolygonMode::Line
        } else {
            wgpu::PolygonMode::Fill
        };

        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{:?} Pipeline", key.kind)),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some(vs),
                    buffers: &[vertex_layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some(fs),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    polygon_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled,
                    depth_compare: key.depth.compare_function(),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
    }

    /// Clears the target and replays `commands` in order.
    pub fn render_scene(
        &mut self,
        view: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameUniforms,
        commands: &[DrawCommand],
    ) {
        let commands = if commands.len() as u64 > MAX_DRAWS_PER_FRAME {
            log::warn!(
                "{} draws requested, only the first {} are rendered",
                commands.len(),
                MAX_DRAWS_PER_FRAME
            );
            &commands[..MAX_DRAWS_PER_FRAME as usize]
        } else {
            commands
        };

        for command in commands {
            let key = self.pipeline_key(command);
            if !self.pipelines.contains_key(&key) {
                log::debug!("building pipeline {:?}", key);
                let pipeline = self.create_pipeline(&self.shader, key);
                self.pipelines.insert(key, pipeline);
            }
        }

        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(frame));

        let stride = self.draw_stride as usize;
        let mut staging = vec![0u8; stride * commands.len()];
        for (chunk, command) in staging.chunks_exact_mut(stride).zip(commands) {
            let bytes = bytemuck::bytes_of(&command.uniforms);
            chunk[..bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            self.queue.write_buffer(&self.draw_buffer, 0, &staging);
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        render_pass.set_bind_group(2, &self.texture_bind_group, &[]);

        for (i, command) in commands.iter().enumerate() {
            let Some(pipeline) = self.pipelines.get(&self.pipeline_key(command)) else {
                continue;
            };
            let offset = (i as u64 * self.draw_stride) as wgpu::DynamicOffset;

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(1, &self.draw_bind_group, &[offset]);
            self.meshes.get(command.mesh).draw(&mut render_pass);
        }
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_respects_alignment() {
        assert_eq!(uniform_stride(192, 256), 256);
        assert_eq!(uniform_stride(256, 256), 256);
        assert_eq!(uniform_stride(300, 256), 512);
        assert_eq!(uniform_stride(192, 64), 192);
        assert_eq!(uniform_stride(10, 0), 10);
    }

    #[test]
    fn embedded_shader_has_every_entry_point() {
        for entry in ["vs_lit", "fs_lit", "vs_skybox", "fs_skybox", "fs_gizmo"] {
            assert!(
                EMBEDDED_SHADER.contains(&format!("fn {}(", entry)),
                "missing entry point {}",
                entry
            );
        }
    }
}
