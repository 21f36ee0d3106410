use std::mem::{offset_of, size_of};

use wgpu::util::DeviceExt;

use crate::math::{Mesh, Vertex};

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        offset: offset_of!(Vertex, position) as wgpu::BufferAddress,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3,
    },
    wgpu::VertexAttribute {
        offset: offset_of!(Vertex, normal) as wgpu::BufferAddress,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32x3,
    },
    wgpu::VertexAttribute {
        offset: offset_of!(Vertex, texcoord) as wgpu::BufferAddress,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32x2,
    },
];

pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// Byte-level staging form of a [`Mesh`].
pub struct MeshUpload {
    pub vertex_bytes: Vec<u8>,
    pub index_bytes: Vec<u8>,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl MeshUpload {
    pub fn from_mesh(mesh: &Mesh) -> Self {
        Self {
            vertex_bytes: bytemuck::cast_slice(mesh.vertices()).to_vec(),
            index_bytes: bytemuck::cast_slice(mesh.indices()).to_vec(),
            vertex_count: mesh.vertex_count() as u32,
            index_count: mesh.index_count() as u32,
        }
    }
}

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn compile(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        let upload = MeshUpload::from_mesh(mesh);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: &upload.vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: &upload.index_bytes,
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "compiled {}: {} vertices, {} indices",
            label,
            upload.vertex_count,
            upload.index_count
        );

        Self {
            vertex_buffer,
            index_buffer,
            vertex_count: upload.vertex_count,
            index_count: upload.index_count,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}
