use glam::{Vec2, Vec3};

use crate::math::mesh::{Mesh, Vertex};

/// Axis-aligned cube centred on the origin, four vertices per face so each
/// face keeps its own normal. Faces wind CCW seen from outside.
pub fn cube(half_extent: f32) -> Mesh {
    // (normal, u axis, v axis), chosen so that u x v == normal
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, u_axis, v_axis) in FACES {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = (normal + u_axis * su + v_axis * sv) * half_extent;
            let texcoord = Vec2::new((su + 1.0) * 0.5, (1.0 - sv) * 0.5);
            vertices.push(Vertex::new(position, normal, texcoord));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    // indices are generated in range above
    Mesh::new(vertices, indices).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_six_quads() {
        let mesh = cube(1.0);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn cube_faces_wind_outward() {
        let mesh = cube(2.0);
        for [a, b, c] in mesh.triangles() {
            let face = (b.position() - a.position()).cross(c.position() - a.position());
            assert!(face.dot(a.normal()) > 0.0);
            assert!(a.position().abs().max_element() <= 2.0 + 1e-6);
        }
    }
}
