use std::path::Path;

use anyhow::{Context, Result, bail};
use glam::{Vec2, Vec3};
use image::imageops::FilterType;

use crate::math::{Mesh, Vertex};

pub const CUBEMAP_FACES: [&str; 6] = ["xpos", "xneg", "ypos", "yneg", "zpos", "zneg"];

/// Decoded RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub fn load_image(path: &Path) -> Result<ImageData> {
    let img = image::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .into_rgba8();

    Ok(ImageData {
        width: img.width(),
        height: img.height(),
        pixels: img.into_raw(),
    })
}

pub fn checkerboard(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> ImageData {
    let cell = (size / cells.max(1)).max(1);
    let pixels = (0..size)
        .flat_map(|y| (0..size).map(move |x| (x / cell + y / cell) % 2 == 0))
        .flat_map(|even| if even { a } else { b })
        .collect();

    ImageData {
        width: size,
        height: size,
        pixels,
    }
}

/// Number of levels in a full mip chain down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Base image followed by every smaller level, each filtered down from the
/// base with a triangle kernel.
pub fn mip_chain(image: &ImageData) -> Vec<ImageData> {
    let Some(base) = image::RgbaImage::from_raw(image.width, image.height, image.pixels.clone())
    else {
        log::warn!(
            "{}x{} image has {} bytes, skipping mipmaps",
            image.width,
            image.height,
            image.pixels.len()
        );
        return vec![image.clone()];
    };

    let mut levels = vec![image.clone()];
    for level in 1..mip_level_count(image.width, image.height) {
        let width = (image.width >> level).max(1);
        let height = (image.height >> level).max(1);
        let scaled = image::imageops::resize(&base, width, height, FilterType::Triangle);
        levels.push(ImageData {
            width,
            height,
            pixels: scaled.into_raw(),
        });
    }
    levels
}

/// Vertical sky gradient, used when the cubemap faces cannot be loaded.
fn gradient_face(size: u32, face: usize) -> ImageData {
    let (top, bottom) = match face {
        2 => ([150, 190, 240], [150, 190, 240]),
        3 => ([40, 45, 55], [40, 45, 55]),
        _ => ([120, 165, 230], [225, 225, 215]),
    };

    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        let t = y as f32 / (size - 1).max(1) as f32;
        let row = [0, 1, 2].map(|c| (top[c] as f32 * (1.0 - t) + bottom[c] as f32 * t) as u8);
        for _ in 0..size {
            pixels.extend_from_slice(&[row[0], row[1], row[2], 255]);
        }
    }

    ImageData {
        width: size,
        height: size,
        pixels,
    }
}

pub fn load_diffuse_or_fallback(path: &Path) -> ImageData {
    load_image(path).unwrap_or_else(|e| {
        log::warn!("{:#}; using generated checkerboard", e);
        checkerboard(256, 8, [230, 230, 230, 255], [200, 40, 40, 255])
    })
}

/// Loads the six faces in `+X, -X, +Y, -Y, +Z, -Z` order. All faces must
/// share one square size.
pub fn load_cubemap(dir: &Path, extension: &str) -> Result<[ImageData; 6]> {
    let mut faces = Vec::with_capacity(6);
    for name in CUBEMAP_FACES {
        let path = dir.join(format!("{}.{}", name, extension));
        faces.push(load_image(&path)?);
    }

    let size = faces[0].width;
    if faces.iter().any(|f| f.width != size || f.height != size) {
        bail!("skybox faces in {} differ in size or are not square", dir.display());
    }

    faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected six cubemap faces"))
}

pub fn load_cubemap_or_fallback(dir: &Path, extension: &str) -> [ImageData; 6] {
    load_cubemap(dir, extension).unwrap_or_else(|e| {
        log::warn!("{:#}; using generated sky", e);
        std::array::from_fn(|face| gradient_face(64, face))
    })
}

/// Loads every model of an OBJ file into a single indexed mesh.
///
/// Missing normals are rebuilt from face geometry; missing texture
/// coordinates become zero. OBJ `v` runs bottom-up, so it is flipped.
pub fn load_obj(path: &Path) -> Result<Mesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("failed to parse OBJ {}", path.display()))?;

    if models.is_empty() {
        bail!("no models found in {}", path.display());
    }
    if models.len() > 1 {
        log::info!("merging {} models from {}", models.len(), path.display());
    }

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for model in models {
        let base = vertices.len() as u32;
        indices.extend(model.mesh.indices.iter().map(|i| i + base));
        vertices.extend(model_vertices(&model.mesh));
    }

    Mesh::new(vertices, indices)
        .with_context(|| format!("OBJ {} has an inconsistent index buffer", path.display()))
}

fn model_vertices(mesh: &tobj::Mesh) -> Vec<Vertex> {
    let positions: Vec<Vec3> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| Vec3::new(p[0], p[1], p[2]))
        .collect();

    let normals: Vec<Vec3> = if mesh.normals.len() == mesh.positions.len() {
        mesh.normals
            .chunks_exact(3)
            .map(|n| Vec3::new(n[0], n[1], n[2]))
            .collect()
    } else {
        smooth_normals(&positions, &mesh.indices)
    };

    let texcoords: Vec<Vec2> = if mesh.texcoords.len() / 2 == positions.len() {
        mesh.texcoords
            .chunks_exact(2)
            .map(|t| Vec2::new(t[0], 1.0 - t[1]))
            .collect()
    } else {
        vec![Vec2::ZERO; positions.len()]
    };

    positions
        .iter()
        .zip(&normals)
        .zip(&texcoords)
        .map(|((p, n), t)| Vertex::new(*p, *n, *t))
        .collect()
}

/// Area-weighted vertex normals.
fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a.max(b).max(c) >= positions.len() {
            continue;
        }
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn checkerboard_alternates() {
        let img = checkerboard(4, 2, [255; 4], [0, 0, 0, 255]);
        assert_eq!(img.pixels.len(), 4 * 4 * 4);
        assert_eq!(&img.pixels[0..4], &[255; 4]);
        // pixel (2, 0) lies in the second cell
        assert_eq!(&img.pixels[8..12], &[0, 0, 0, 255]);
    }

    #[test]
    fn mip_level_counts() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(300, 17), 9);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn mip_chain_halves_down_to_one_pixel() {
        let image = ImageData {
            width: 8,
            height: 2,
            pixels: vec![200; 8 * 2 * 4],
        };
        let levels = mip_chain(&image);

        let sizes: Vec<_> = levels.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
        for level in &levels {
            assert_eq!(level.pixels.len(), (level.width * level.height * 4) as usize);
        }
        let total: usize = levels.iter().map(|l| l.pixels.len()).sum();
        assert_eq!(total, (16 + 4 + 2 + 1) * 4);
        // a flat colour stays flat after filtering
        assert!(levels[3].pixels.iter().all(|&b| b == 200));
    }

    #[test]
    fn smooth_normals_of_flat_quad() {
        let positions = [
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        let normals = smooth_normals(&positions, &[0, 1, 2, 0, 2, 3]);
        for n in normals {
            assert_abs_diff_eq!(n, Vec3::Y, epsilon = 1e-6);
        }
    }

    #[test]
    fn missing_obj_is_an_error() {
        assert!(load_obj(Path::new("does/not/exist.obj")).is_err());
    }

    #[test]
    fn obj_models_are_merged() {
        let path = std::env::temp_dir().join(format!("surfdemo-two-models-{}.obj", std::process::id()));
        std::fs::write(
            &path,
            "o first\nv 0 0 0\nv 1 0 0\nv 0 0 -1\nf 1 2 3\n\
             o second\nv 0 1 0\nv 1 1 0\nv 0 1 -1\nf 4 5 6\n",
        )
        .unwrap();

        let mesh = load_obj(&path);
        std::fs::remove_file(&path).unwrap();
        let mesh = mesh.unwrap();

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangle_count(), 2);
        let heights: Vec<f32> = mesh.triangles().map(|[a, _, _]| a.position().y).collect();
        assert_eq!(heights, vec![0.0, 1.0]);
    }

    #[test]
    fn missing_skybox_falls_back() {
        let faces = load_cubemap_or_fallback(Path::new("does/not/exist"), "png");
        assert!(faces.iter().all(|f| f.width == 64 && f.height == 64));
    }
}
