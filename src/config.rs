use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "surfdemo.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub assets: AssetConfig,
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Parametric Surfaces".to_string(),
            width: 1600,
            height: 900,
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub diffuse_texture: PathBuf,
    /// Directory holding `xpos/xneg/ypos/yneg/zpos/zneg` face images.
    pub skybox_dir: PathBuf,
    pub skybox_extension: String,
    pub mesh: PathBuf,
    /// WGSL file read on shader reload. The embedded copy is used when absent.
    pub shader: Option<PathBuf>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            diffuse_texture: PathBuf::from("assets/color_checkerboard.png"),
            skybox_dir: PathBuf::from("assets/skybox"),
            skybox_extension: "png".to_string(),
            mesh: PathBuf::from("assets/suzanne.obj"),
            shader: Some(PathBuf::from("src/renderer/shaders.wgsl")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub surface_preset: String,
    pub resolution_u: u32,
    pub resolution_v: u32,
    pub surface_position: [f32; 3],
    pub mesh_scale: f32,
    pub control_points: Vec<[f32; 3]>,
    pub camera_eye: [f32; 3],
    pub camera_target: [f32; 3],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            surface_preset: "Sphere".to_string(),
            resolution_u: 64,
            resolution_v: 32,
            surface_position: [0.0, 0.0, 0.0],
            mesh_scale: 0.6,
            control_points: vec![[-3.0, 0.0, 2.0], [3.0, 0.0, 2.0]],
            camera_eye: [0.0, 7.0, 7.0],
            camera_target: [0.0, 0.0, 0.0],
        }
    }
}

impl DemoConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid demo config")
    }

    /// Reads `path` if given, else `surfdemo.toml` when present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    log::info!("no {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = DemoConfig::from_toml("").unwrap();
        assert_eq!(config.window.width, 1600);
        assert_eq!(config.scene.control_points.len(), 2);
        assert_eq!(config.scene.camera_eye, [0.0, 7.0, 7.0]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = DemoConfig::from_toml(
            r#"
            [scene]
            surface_preset = "Hill"
            resolution_u = 8
            control_points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0]]

            [assets]
            mesh = "models/teapot.obj"
            "#,
        )
        .unwrap();

        assert_eq!(config.scene.surface_preset, "Hill");
        assert_eq!(config.scene.resolution_u, 8);
        assert_eq!(config.scene.resolution_v, 32);
        assert_eq!(config.scene.control_points.len(), 3);
        assert_eq!(config.assets.mesh, PathBuf::from("models/teapot.obj"));
        assert_eq!(config.window.title, "Parametric Surfaces");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(DemoConfig::from_toml("[scene\nresolution_u = ").is_err());
    }
}
