use glam::Vec3;

use crate::math::{GeometryError, mix};

/// Tensor-product Bézier patch over a `rows x cols` control grid.
///
/// Rows run along `u` (degree `rows - 1`), columns along `v`
/// (degree `cols - 1`). Points are stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct BezierPatch {
    rows: usize,
    cols: usize,
    points: Vec<Vec3>,
}

impl BezierPatch {
    pub fn new(rows: usize, cols: usize, points: Vec<Vec3>) -> Result<Self, GeometryError> {
        if rows < 2 || cols < 2 {
            return Err(GeometryError::InvalidPatch { rows, cols });
        }
        if points.len() != rows * cols {
            return Err(GeometryError::PatchSizeMismatch {
                rows,
                cols,
                got: points.len(),
            });
        }

        Ok(Self { rows, cols, points })
    }

    pub fn from_rows(rows: &[&[[f32; 3]]]) -> Result<Self, GeometryError> {
        let cols = rows.first().map_or(0, |r| r.len());
        let points: Vec<Vec3> = rows
            .iter()
            .flat_map(|row| row.iter().map(|p| Vec3::from_array(*p)))
            .collect();

        Self::new(rows.len(), cols, points)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn control_point(&self, row: usize, col: usize) -> Vec3 {
        self.points[row * self.cols + col]
    }

    fn row(&self, row: usize) -> &[Vec3] {
        &self.points[row * self.cols..(row + 1) * self.cols]
    }

    pub fn evaluate(&self, u: f32, v: f32) -> Vec3 {
        let (u, v) = (u.clamp(0.0, 1.0), v.clamp(0.0, 1.0));

        let column: Vec<Vec3> = (0..self.rows)
            .map(|r| de_casteljau(self.row(r), v).0)
            .collect();

        de_casteljau(&column, u).0
    }

    /// Partial derivatives `(dP/du, dP/dv)` at `(u, v)`.
    pub fn tangents(&self, u: f32, v: f32) -> (Vec3, Vec3) {
        let (u, v) = (u.clamp(0.0, 1.0), v.clamp(0.0, 1.0));

        let (positions, v_derivs): (Vec<Vec3>, Vec<Vec3>) =
            (0..self.rows).map(|r| de_casteljau(self.row(r), v)).unzip();

        let (_, du) = de_casteljau(&positions, u);
        let (dv, _) = de_casteljau(&v_derivs, u);

        (du, dv)
    }
}

/// Evaluates a Bézier curve and its first derivative by repeated lerps.
///
/// The derivative comes from the two points left before the last step:
/// `n * (b1 - b0)`.
fn de_casteljau(points: &[Vec3], t: f32) -> (Vec3, Vec3) {
    let degree = points.len().saturating_sub(1);
    if degree == 0 {
        return (points.first().copied().unwrap_or(Vec3::ZERO), Vec3::ZERO);
    }

    let mut work = points.to_vec();
    for level in (2..=degree).rev() {
        for i in 0..level {
            work[i] = mix(work[i], work[i + 1], t);
        }
    }

    let (b0, b1) = (work[0], work[1]);
    (mix(b0, b1, t), (b1 - b0) * degree as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn hill() -> BezierPatch {
        BezierPatch::from_rows(&[
            &[[-1.0, 0.0, -1.0], [0.0, 0.3, -1.0], [1.0, 0.1, -1.0]],
            &[[-1.0, 0.5, 0.0], [0.0, 2.0, 0.0], [1.0, 0.2, 0.0]],
            &[[-1.0, 0.0, 1.0], [0.0, -0.4, 1.0], [1.0, 0.7, 1.0]],
            &[[-1.5, 0.2, 2.0], [0.0, 0.0, 2.0], [1.5, 0.1, 2.0]],
        ])
        .unwrap()
    }

    #[test]
    fn corners_are_interpolated_exactly() {
        let patch = hill();
        let last_r = patch.rows() - 1;
        let last_c = patch.cols() - 1;

        assert_eq!(patch.evaluate(0.0, 0.0), patch.control_point(0, 0));
        assert_eq!(patch.evaluate(0.0, 1.0), patch.control_point(0, last_c));
        assert_eq!(patch.evaluate(1.0, 0.0), patch.control_point(last_r, 0));
        assert_eq!(patch.evaluate(1.0, 1.0), patch.control_point(last_r, last_c));
    }

    #[test]
    fn bilinear_patch_matches_lerp() {
        let patch = BezierPatch::from_rows(&[
            &[[0.0, 0.0, 0.0], [0.0, 0.0, 2.0]],
            &[[2.0, 0.0, 0.0], [2.0, 1.0, 2.0]],
        ])
        .unwrap();

        let p = patch.evaluate(0.5, 0.5);
        assert_abs_diff_eq!(p, Vec3::new(1.0, 0.25, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn tangents_match_finite_differences() {
        let patch = hill();
        let h = 1e-3;

        for &(u, v) in &[(0.3, 0.6), (0.5, 0.5), (0.8, 0.1)] {
            let (du, dv) = patch.tangents(u, v);
            let fd_u = (patch.evaluate(u + h, v) - patch.evaluate(u - h, v)) / (2.0 * h);
            let fd_v = (patch.evaluate(u, v + h) - patch.evaluate(u, v - h)) / (2.0 * h);

            assert_abs_diff_eq!(du, fd_u, epsilon = 1e-2);
            assert_abs_diff_eq!(dv, fd_v, epsilon = 1e-2);
        }
    }

    #[test]
    fn cubic_curve_derivative_at_ends() {
        let pts = [
            Vec3::ZERO,
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ];

        let (p0, d0) = de_casteljau(&pts, 0.0);
        let (p1, d1) = de_casteljau(&pts, 1.0);

        assert_eq!(p0, pts[0]);
        assert_eq!(p1, pts[3]);
        assert_abs_diff_eq!(d0, (pts[1] - pts[0]) * 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(d1, (pts[3] - pts[2]) * 3.0, epsilon = 1e-6);
    }

    #[test]
    fn rejects_degenerate_grids() {
        assert_eq!(
            BezierPatch::new(1, 3, vec![Vec3::ZERO; 3]),
            Err(GeometryError::InvalidPatch { rows: 1, cols: 3 })
        );
        assert_eq!(
            BezierPatch::new(2, 2, vec![Vec3::ZERO; 3]),
            Err(GeometryError::PatchSizeMismatch {
                rows: 2,
                cols: 2,
                got: 3
            })
        );
    }
}
