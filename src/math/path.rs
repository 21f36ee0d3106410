use glam::{Mat3, Vec3};

use crate::math::mix;

pub const WORLD_UP: Vec3 = Vec3::Y;

/// Tangent used when the path has no usable segment.
pub const DEFAULT_TANGENT: Vec3 = Vec3::X;

/// Moving frame at a point on the path.
///
/// `side = normalize(forward x WORLD_UP)` and `up = forward x side`, so with
/// a level `forward` the `up` vector points away from `WORLD_UP`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub forward: Vec3,
    pub side: Vec3,
    pub up: Vec3,
}

impl Frame {
    pub fn from_forward(forward: Vec3) -> Self {
        let forward = forward.try_normalize().unwrap_or(DEFAULT_TANGENT);

        let side = forward
            .cross(WORLD_UP)
            .try_normalize()
            .or_else(|| forward.cross(Vec3::Z).try_normalize())
            .unwrap_or(Vec3::Z);
        let up = forward.cross(side);

        Self { forward, side, up }
    }

    /// Object-to-world rotation: model `+Z` runs along `forward` and model
    /// `+Y` leans towards `WORLD_UP`.
    pub fn rotation(&self) -> Mat3 {
        Mat3::from_cols(-self.side, -self.up, self.forward)
    }
}

/// Segment index and local parameter for `t`, both clamped to the path.
fn locate(count: usize, t: f32) -> (usize, f32) {
    let t = if t.is_nan() { 0.0 } else { t };
    let last_segment = count.saturating_sub(2);

    let segment = (t.floor().max(0.0) as usize).min(last_segment);
    let local = (t - segment as f32).clamp(0.0, 1.0);

    (segment, local)
}

pub fn position_at(points: &[Vec3], t: f32) -> Vec3 {
    match points {
        [] => Vec3::ZERO,
        [only] => *only,
        _ => {
            let (segment, local) = locate(points.len(), t);
            mix(points[segment], points[segment + 1], local)
        }
    }
}

/// Direction of the segment containing `t`; constant along each segment.
pub fn tangent_at(points: &[Vec3], t: f32) -> Vec3 {
    if points.len() < 2 {
        return DEFAULT_TANGENT;
    }

    let (segment, _) = locate(points.len(), t);
    (points[segment + 1] - points[segment])
        .try_normalize()
        .unwrap_or(DEFAULT_TANGENT)
}

pub fn frame_at(points: &[Vec3], t: f32) -> Frame {
    Frame::from_forward(tangent_at(points, t))
}

/// Editable polyline plus the parameter that selects a point on it.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlPath {
    pub points: Vec<Vec3>,
    pub t: f32,
}

impl ControlPath {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points, t: 0.0 }
    }

    /// Largest meaningful value of `t`.
    pub fn max_t(&self) -> f32 {
        self.points.len().saturating_sub(1) as f32
    }

    pub fn position(&self) -> Vec3 {
        position_at(&self.points, self.t)
    }

    pub fn tangent(&self) -> Vec3 {
        tangent_at(&self.points, self.t)
    }

    pub fn frame(&self) -> Frame {
        frame_at(&self.points, self.t)
    }

    /// Appends a point one step past the current end, continuing the last
    /// segment's direction.
    pub fn push_point(&mut self) {
        let next = match self.points.as_slice() {
            [] => Vec3::ZERO,
            [only] => *only + DEFAULT_TANGENT,
            [.., a, b] => *b + (*b - *a),
        };
        self.points.push(next);
    }

    pub fn remove_point(&mut self, index: usize) {
        if index < self.points.len() {
            self.points.remove(index);
        }
        self.t = self.t.clamp(0.0, self.max_t());
    }
}

impl Default for ControlPath {
    fn default() -> Self {
        Self::new(vec![Vec3::new(-3.0, 0.0, 2.0), Vec3::new(3.0, 0.0, 2.0)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const P0: Vec3 = Vec3::new(1.0, 2.0, 3.0);
    const P1: Vec3 = Vec3::new(5.0, 2.0, -1.0);
    const P2: Vec3 = Vec3::new(5.0, 6.0, -1.0);

    #[test]
    fn empty_path_falls_back_to_origin() {
        for t in [-1.0, 0.0, 0.5, 10.0] {
            assert_eq!(position_at(&[], t), Vec3::ZERO);
            assert_eq!(tangent_at(&[], t), Vec3::X);
        }
    }

    #[test]
    fn single_point_is_stationary() {
        for t in [-3.0, 0.0, 0.7, 4.0] {
            assert_eq!(position_at(&[P0], t), P0);
            assert_eq!(tangent_at(&[P0], t), Vec3::X);
        }
        assert_eq!(frame_at(&[P0], 0.0).forward, Vec3::X);
    }

    #[test]
    fn two_point_interpolation() {
        let pts = [P0, P1];
        assert_eq!(position_at(&pts, 0.0), P0);
        assert_eq!(position_at(&pts, 1.0), P1);
        assert_abs_diff_eq!(position_at(&pts, 0.5), (P0 + P1) * 0.5, epsilon = 1e-6);
    }

    #[test]
    fn parameter_is_clamped() {
        let pts = [P0, P1, P2];
        assert_eq!(position_at(&pts, -0.5), position_at(&pts, 0.0));
        assert_eq!(position_at(&pts, -100.0), P0);
        assert_eq!(position_at(&pts, 2.0), P2);
        assert_eq!(position_at(&pts, 7.5), P2);
        assert_eq!(position_at(&pts, f32::INFINITY), P2);
        assert_eq!(position_at(&pts, f32::NAN), P0);
    }

    #[test]
    fn tangent_is_piecewise_constant() {
        let pts = [P0, P1, P2];
        let first = (P1 - P0).normalize();
        let second = (P2 - P1).normalize();

        assert_abs_diff_eq!(tangent_at(&pts, 0.1), first, epsilon = 1e-6);
        assert_abs_diff_eq!(tangent_at(&pts, 0.9), first, epsilon = 1e-6);
        assert_abs_diff_eq!(tangent_at(&pts, 1.0), second, epsilon = 1e-6);
        assert_abs_diff_eq!(tangent_at(&pts, 5.0), second, epsilon = 1e-6);
        assert_relative_eq!(tangent_at(&pts, 1.5).length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn zero_length_segment_uses_default_tangent() {
        assert_eq!(tangent_at(&[P0, P0], 0.5), Vec3::X);
    }

    #[test]
    fn frame_is_orthonormal() {
        for forward in [Vec3::X, Vec3::new(1.0, 0.5, -2.0), Vec3::new(0.0, -1.0, 0.3)] {
            let f = Frame::from_forward(forward);
            assert_relative_eq!(f.forward.length(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(f.side.length(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(f.up.length(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(f.forward.dot(f.side), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(f.forward.dot(f.up), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(f.side.dot(f.up), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn vertical_forward_uses_fallback_side() {
        for forward in [Vec3::Y, -Vec3::Y] {
            let f = Frame::from_forward(forward);
            assert!(f.side.is_finite());
            assert_relative_eq!(f.side.length(), 1.0, epsilon = 1e-6);
            assert_abs_diff_eq!(f.forward.dot(f.side), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn rotation_is_proper_and_keeps_model_up() {
        let f = Frame::from_forward(Vec3::X);
        let r = f.rotation();

        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(r * Vec3::Z, Vec3::X, epsilon = 1e-6);
        assert_abs_diff_eq!(r * Vec3::Y, Vec3::Y, epsilon = 1e-6);
    }

    #[test]
    fn editing_points_keeps_t_in_range() {
        let mut path = ControlPath::new(vec![P0, P1, P2]);
        path.t = 2.0;
        path.remove_point(2);
        assert_eq!(path.t, 1.0);

        path.push_point();
        assert_eq!(path.points.len(), 3);
        assert_abs_diff_eq!(path.points[2], P1 + (P1 - P0), epsilon = 1e-6);

        path.remove_point(10);
        assert_eq!(path.points.len(), 3);
    }
}
