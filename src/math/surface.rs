use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::math::bezier::BezierPatch;

/// Normal substituted where a surface has no well-defined tangent plane.
pub const FALLBACK_NORMAL: Vec3 = Vec3::Y;

const DEGENERATE_EPSILON: f32 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePoint {
    pub position: Vec3,
    pub normal: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Surface {
    Sphere { radius: f32 },
    Bezier(BezierPatch),
}

impl Surface {
    pub fn unit_sphere() -> Self {
        Surface::Sphere { radius: 1.0 }
    }

    /// Evaluates the surface at `(u, v)` in `[0, 1]^2`.
    ///
    /// Both variants are oriented so that `dP/du x dP/dv` points along the
    /// returned normal; the tessellator relies on this for its winding.
    pub fn evaluate(&self, u: f32, v: f32) -> SurfacePoint {
        match self {
            Surface::Sphere { radius } => sphere_point(*radius, u, v),
            Surface::Bezier(patch) => {
                let (du, dv) = patch.tangents(u, v);
                SurfacePoint {
                    position: patch.evaluate(u, v),
                    normal: normal_from_tangents(du, dv),
                }
            }
        }
    }
}

fn sphere_point(radius: f32, u: f32, v: f32) -> SurfacePoint {
    let theta = TAU * u;
    let phi = PI * v;

    let dir = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());

    SurfacePoint {
        position: dir * radius,
        normal: dir.try_normalize().unwrap_or(FALLBACK_NORMAL),
    }
}

/// `normalize(du x dv)`, or [`FALLBACK_NORMAL`] when the partials are
/// parallel or vanish.
pub fn normal_from_tangents(du: Vec3, dv: Vec3) -> Vec3 {
    let n = du.cross(dv);
    if n.length_squared() <= DEGENERATE_EPSILON {
        return FALLBACK_NORMAL;
    }
    n.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn sphere_normal_points_outward() {
        let sphere = Surface::Sphere { radius: 2.5 };
        for &(u, v) in &[(0.0, 0.5), (0.25, 0.3), (0.7, 0.9)] {
            let p = sphere.evaluate(u, v);
            assert_abs_diff_eq!(p.position.length(), 2.5, epsilon = 1e-5);
            assert_abs_diff_eq!(p.normal, p.position / 2.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn sphere_parametrisation_is_outward_oriented() {
        let sphere = Surface::unit_sphere();
        let h = 1e-3;
        let (u, v) = (0.3, 0.4);

        let pu = sphere.evaluate(u + h, v).position - sphere.evaluate(u - h, v).position;
        let pv = sphere.evaluate(u, v + h).position - sphere.evaluate(u, v - h).position;

        assert!(pu.cross(pv).dot(sphere.evaluate(u, v).normal) > 0.0);
    }

    #[test]
    fn sphere_poles() {
        let sphere = Surface::unit_sphere();
        assert_abs_diff_eq!(sphere.evaluate(0.4, 0.0).position, Vec3::Y, epsilon = 1e-6);
        assert_abs_diff_eq!(sphere.evaluate(0.4, 1.0).position, -Vec3::Y, epsilon = 1e-6);
    }

    #[test]
    fn flat_patch_normal() {
        let patch = BezierPatch::from_rows(&[
            &[[0.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            &[[1.0, 0.0, 0.0], [1.0, 0.0, 1.0]],
        ])
        .unwrap();

        // du = +X, dv = +Z, so du x dv = -Y
        let p = Surface::Bezier(patch).evaluate(0.5, 0.5);
        assert_abs_diff_eq!(p.normal, -Vec3::Y, epsilon = 1e-6);
    }

    #[test]
    fn collapsed_edge_uses_fallback_normal() {
        // first row collapses to a single point, so dP/dv vanishes at u = 0
        let patch = BezierPatch::from_rows(&[
            &[[0.0, 1.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            &[[-1.0, 0.0, -1.0], [0.0, 0.0, 0.0], [1.0, 0.0, 1.0]],
        ])
        .unwrap();

        let p = Surface::Bezier(patch).evaluate(0.0, 0.5);
        assert_eq!(p.normal, FALLBACK_NORMAL);
        assert_eq!(p.position, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn parallel_tangents_fall_back() {
        assert_eq!(normal_from_tangents(Vec3::X, Vec3::X * 3.0), FALLBACK_NORMAL);
        assert_eq!(normal_from_tangents(Vec3::ZERO, Vec3::Z), FALLBACK_NORMAL);
        assert_eq!(normal_from_tangents(Vec3::Z, Vec3::X), Vec3::Y);
    }
}
