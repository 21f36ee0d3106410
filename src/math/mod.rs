pub mod bezier;
pub mod error;
pub mod mesh;
pub mod path;
pub mod presets;
pub mod primitives;
pub mod surface;
pub mod tessellate;

use glam::Vec3;

pub use error::GeometryError;
pub use mesh::{Mesh, Vertex};
pub use path::ControlPath;
pub use presets::SURFACE_PRESETS;
pub use surface::Surface;
pub use tessellate::tessellate;

/// Weighted lerp; exact at `t = 0` and `t = 1`.
#[inline]
pub(crate) fn mix(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}
