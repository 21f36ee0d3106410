use crate::math::GeometryError;
use crate::math::bezier::BezierPatch;
use crate::math::surface::Surface;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SurfaceKind {
    Sphere,
    Bezier,
}

pub struct SurfacePreset {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: SurfaceKind,
    /// Bézier control rows, running along `u`. Unused for spheres.
    pub control_rows: &'static [&'static [[f32; 3]]],
    pub radius: f32,
}

impl SurfacePreset {
    pub fn build(&self) -> Result<Surface, GeometryError> {
        match self.kind {
            SurfaceKind::Sphere => Ok(Surface::Sphere {
                radius: self.radius,
            }),
            SurfaceKind::Bezier => Ok(Surface::Bezier(BezierPatch::from_rows(
                self.control_rows,
            )?)),
        }
    }
}

pub fn preset_by_name(name: &str) -> Option<usize> {
    SURFACE_PRESETS
        .iter()
        .position(|p| p.name.eq_ignore_ascii_case(name))
}

// Rows advance along +Z and columns along +X so that dP/du x dP/dv faces +Y.
pub const SURFACE_PRESETS: &[SurfacePreset] = &[
    SurfacePreset {
        name: "Sphere",
        description: "Unit sphere, seam at u = 0",
        kind: SurfaceKind::Sphere,
        control_rows: &[],
        radius: 1.0,
    },
    SurfacePreset {
        name: "Hill",
        description: "Bicubic patch with a raised centre",
        kind: SurfaceKind::Bezier,
        control_rows: &[
            &[[-1.5, 0.0, -1.5], [-0.5, 0.0, -1.5], [0.5, 0.0, -1.5], [1.5, 0.0, -1.5]],
            &[[-1.5, 0.0, -0.5], [-0.5, 1.5, -0.5], [0.5, 1.5, -0.5], [1.5, 0.0, -0.5]],
            &[[-1.5, 0.0, 0.5], [-0.5, 1.5, 0.5], [0.5, 1.5, 0.5], [1.5, 0.0, 0.5]],
            &[[-1.5, 0.0, 1.5], [-0.5, 0.0, 1.5], [0.5, 0.0, 1.5], [1.5, 0.0, 1.5]],
        ],
        radius: 0.0,
    },
    SurfacePreset {
        name: "Saddle",
        description: "Quadratic patch with a flat middle row",
        kind: SurfaceKind::Bezier,
        control_rows: &[
            &[[-1.5, 1.0, -1.5], [0.0, -0.5, -1.5], [1.5, 1.0, -1.5]],
            &[[-1.5, 0.0, 0.0], [0.0, 0.0, 0.0], [1.5, 0.0, 0.0]],
            &[[-1.5, 1.0, 1.5], [0.0, -0.5, 1.5], [1.5, 1.0, 1.5]],
        ],
        radius: 0.0,
    },
    SurfacePreset {
        name: "Wave",
        description: "3x5 patch rippling along x",
        kind: SurfaceKind::Bezier,
        control_rows: &[
            &[[-2.0, 0.0, -1.0], [-1.0, 0.8, -1.0], [0.0, -0.8, -1.0], [1.0, 0.8, -1.0], [2.0, 0.0, -1.0]],
            &[[-2.0, 0.2, 0.0], [-1.0, 1.0, 0.0], [0.0, -0.6, 0.0], [1.0, 1.0, 0.0], [2.0, 0.2, 0.0]],
            &[[-2.0, 0.0, 1.0], [-1.0, 0.8, 1.0], [0.0, -0.8, 1.0], [1.0, 0.8, 1.0], [2.0, 0.0, 1.0]],
        ],
        radius: 0.0,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_builds() {
        for preset in SURFACE_PRESETS {
            assert!(preset.build().is_ok(), "{} failed to build", preset.name);
        }
    }

    #[test]
    fn bezier_presets_face_up() {
        for preset in SURFACE_PRESETS.iter().filter(|p| p.kind == SurfaceKind::Bezier) {
            let normal = preset.build().unwrap().evaluate(0.5, 0.5).normal;
            assert!(normal.y > 0.0, "{} faces down", preset.name);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(preset_by_name("saddle"), Some(2));
        assert_eq!(preset_by_name("torus"), None);
    }
}
