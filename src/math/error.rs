use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("tessellation resolution must be at least 1 in both directions, got {u}x{v}")]
    InvalidResolution { u: u32, v: u32 },

    #[error("bezier patch needs at least 2x2 control points, got {rows}x{cols}")]
    InvalidPatch { rows: usize, cols: usize },

    #[error("bezier patch has {got} control points, expected {rows}x{cols}")]
    PatchSizeMismatch { rows: usize, cols: usize, got: usize },

    #[error("index {index} out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds { index: u32, vertex_count: usize },

    #[error("index count {0} is not a multiple of 3")]
    NotTriangleList(usize),
}
