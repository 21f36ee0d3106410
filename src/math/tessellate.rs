use glam::Vec2;

use crate::math::GeometryError;
use crate::math::mesh::{Mesh, Vertex};
use crate::math::surface::Surface;

/// Samples `surface` on a `(resolution_u + 1) x (resolution_v + 1)` grid
/// covering `[0, 1]^2` and triangulates every cell.
///
/// Texture coordinates are `(u, v)` unchanged. wgpu samples with a top-left
/// origin, so `v = 0` maps to the first image row.
///
/// Triangles wind counter-clockwise when viewed against the surface normal
/// (`dP/du x dP/dv`), so back-face culling keeps the outside.
pub fn tessellate(
    surface: &Surface,
    resolution_u: u32,
    resolution_v: u32,
) -> Result<Mesh, GeometryError> {
    if resolution_u == 0 || resolution_v == 0 {
        return Err(GeometryError::InvalidResolution {
            u: resolution_u,
            v: resolution_v,
        });
    }

    let columns = resolution_u + 1;
    let rows = resolution_v + 1;

    let mut vertices = Vec::with_capacity((columns * rows) as usize);
    for j in 0..rows {
        let v = j as f32 / resolution_v as f32;
        for i in 0..columns {
            let u = i as f32 / resolution_u as f32;
            let point = surface.evaluate(u, v);
            vertices.push(Vertex::new(point.position, point.normal, Vec2::new(u, v)));
        }
    }

    let index = |i: u32, j: u32| j * columns + i;

    let mut indices = Vec::with_capacity((resolution_u * resolution_v * 6) as usize);
    for j in 0..resolution_v {
        for i in 0..resolution_u {
            let a = index(i, j);
            let b = index(i + 1, j);
            let c = index(i, j + 1);
            let d = index(i + 1, j + 1);

            indices.extend_from_slice(&[a, b, c]);
            indices.extend_from_slice(&[b, d, c]);
        }
    }

    Mesh::new(vertices, indices)
}
