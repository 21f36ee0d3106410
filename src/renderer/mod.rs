pub mod camera;
pub mod gpu;
pub mod mesh;
pub mod scene;
pub mod texture;
pub mod uniforms;

pub use camera::{Camera, CameraMode};
pub use gpu::{GpuState, SceneAssets};
pub use scene::{FrameRecorder, SceneComposer};
pub use uniforms::{FrameUniforms, Lighting, Material};
