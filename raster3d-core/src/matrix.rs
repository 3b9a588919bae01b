/// Homogeneous transform and projection matrices
///
/// Matrices are row-major and used with row vectors: a point `p` is
/// transformed as `p' = p · M`, so translation terms live in the last row
/// and `A.multiply(B)` applies `A` first, then `B`.
use rayon::prelude::*;
use std::ops::{Index, IndexMut};

use crate::error::{Error, Result};
use crate::geometry::Edge;

/// Cardinal axis used by rotations, reflections and orthographic projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Coordinate index of the axis (0 for X, 1 for Y, 2 for Z)
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// A dense rows×cols matrix of `f32`
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Allocate a rows×cols matrix filled with 0.0
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// The 4×4 identity
    pub fn identity() -> Self {
        let mut m = Self::zeros(4, 4);
        for i in 0..4 {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Build a matrix from a slice of equally sized rows
    pub fn from_rows<const C: usize>(rows: &[[f32; C]]) -> Self {
        Self {
            rows: rows.len(),
            cols: C,
            data: rows.iter().flatten().copied().collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Perspective divide by the constant `k`: `w' = w - z / k`
    pub fn perspective(k: f32) -> Result<Self> {
        if k == 0.0 {
            return Err(Error::domain("perspective constant k must be non-zero"));
        }
        Ok(Self::perspective_unchecked(k))
    }

    pub(crate) fn perspective_unchecked(k: f32) -> Self {
        let mut m = Self::identity();
        m[(2, 3)] = -1.0 / k;
        m
    }

    /// Identity with the first column of `axis`'s row cleared.
    ///
    /// Only `Axis::X` changes the result (it removes x from the projected
    /// x coordinate). Point-level orthographic projection drops the
    /// coordinate directly, see `Point::to_orthographic`.
    pub fn orthographic(axis: Axis) -> Self {
        let mut m = Self::identity();
        m[(axis.index(), 0)] = 0.0;
        m
    }

    /// Fixed parallel projection built from two 45° angles
    pub fn isometric() -> Self {
        let phi = std::f32::consts::FRAC_PI_4;
        let psi = std::f32::consts::FRAC_PI_4;
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_psi, cos_psi) = psi.sin_cos();
        Self::from_rows(&[
            [cos_phi, sin_phi * sin_psi, 0.0, 0.0],
            [0.0, cos_phi, 0.0, 0.0],
            [sin_psi, -sin_phi * cos_psi, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn translation(tx: f32, ty: f32, tz: f32) -> Self {
        let mut m = Self::identity();
        m[(3, 0)] = tx;
        m[(3, 1)] = ty;
        m[(3, 2)] = tz;
        m
    }

    /// Right-handed rotation about a cardinal axis, angle in degrees.
    ///
    /// Only axis-aligned rotations are encoded as matrices. Rotation about an
    /// arbitrary line is done per point by `Transformable::rotate_about`.
    pub fn rotation(angle_degrees: f32, axis: Axis) -> Self {
        Self::rotation_with_reference(angle_degrees, axis, None)
    }

    /// `rotation` taking the optional reference line of the rotate operation.
    ///
    /// The line does not change the matrix: it always encodes the cardinal
    /// rotation. Callers wanting rotation about the line itself go through
    /// `Transformable::rotate_with_reference` or `rotate_about`.
    pub fn rotation_with_reference(
        angle_degrees: f32,
        axis: Axis,
        _reference_line: Option<&Edge>,
    ) -> Self {
        let (sin, cos) = angle_degrees.to_radians().sin_cos();
        match axis {
            Axis::X => Self::from_rows(&[
                [1.0, 0.0, 0.0, 0.0],
                [0.0, cos, sin, 0.0],
                [0.0, -sin, cos, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]),
            Axis::Y => Self::from_rows(&[
                [cos, 0.0, -sin, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [sin, 0.0, cos, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]),
            Axis::Z => Self::from_rows(&[
                [cos, sin, 0.0, 0.0],
                [-sin, cos, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ]),
        }
    }

    pub fn scaling(sx: f32, sy: f32, sz: f32) -> Self {
        let mut m = Self::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        m
    }

    /// Matrix product `self · other`.
    ///
    /// Output rows are computed independently on the rayon pool and joined
    /// before returning.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(Error::Dimension {
                left: (self.rows, self.cols),
                right: (other.rows, other.cols),
            });
        }

        let mut result = Matrix::zeros(self.rows, other.cols);
        if other.cols == 0 {
            return Ok(result);
        }

        result
            .data
            .par_chunks_mut(other.cols)
            .enumerate()
            .for_each(|(i, out)| {
                let a = self.row(i);
                for (j, cell) in out.iter_mut().enumerate() {
                    *cell = a
                        .iter()
                        .enumerate()
                        .map(|(k, a_ik)| a_ik * other.data[k * other.cols + j])
                        .sum();
                }
            });

        Ok(result)
    }

    /// Elementwise scale, row-parallel like `multiply`
    pub fn multiply_scalar(&self, s: f32) -> Matrix {
        let mut result = self.clone();
        if self.cols == 0 {
            return result;
        }
        result
            .data
            .par_chunks_mut(self.cols)
            .for_each(|row| row.iter_mut().for_each(|v| *v *= s));
        result
    }

    /// Multiply a homogeneous row vector by this matrix, which must be 4×4
    pub fn transform_row(&self, v: [f32; 4]) -> Result<[f32; 4]> {
        self.ensure_homogeneous()?;
        Ok(self.transform_row_unchecked(v))
    }

    /// `Dimension` error unless this is a 4×4 homogeneous transform
    pub fn ensure_homogeneous(&self) -> Result<()> {
        if self.rows != 4 || self.cols != 4 {
            return Err(Error::Dimension {
                left: (1, 4),
                right: (self.rows, self.cols),
            });
        }
        Ok(())
    }

    /// Row product for matrices already known to be 4×4
    pub(crate) fn transform_row_unchecked(&self, v: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0; 4];
        for (j, o) in out.iter_mut().enumerate() {
            *o = (0..4).map(|k| v[k] * self.data[k * 4 + j]).sum();
        }
        out
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, (r, c): (usize, usize)) -> &f32 {
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f32 {
        &mut self.data[r * self.cols + c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_matrix_eq(a: &Matrix, b: &Matrix) {
        assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
        for r in 0..a.rows() {
            for c in 0..a.cols() {
                assert_abs_diff_eq!(a[(r, c)], b[(r, c)], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_zeros() {
        let m = Matrix::zeros(2, 3);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert!(m.row(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_multiply_identity() {
        let a = Matrix::from_rows(&[
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
        ]);
        let product = a.multiply(&Matrix::identity()).unwrap();
        assert_eq!(product, a);
    }

    #[test]
    fn test_multiply_rectangular() {
        let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let b = Matrix::from_rows(&[[1.0, 0.0, 2.0], [0.0, 1.0, 3.0]]);
        let product = a.multiply(&b).unwrap();
        let expected = Matrix::from_rows(&[[1.0, 2.0, 8.0], [3.0, 4.0, 18.0], [5.0, 6.0, 28.0]]);
        assert_eq!(product, expected);
    }

    #[test]
    fn test_multiply_dimension_mismatch() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 2);
        match a.multiply(&b) {
            Err(Error::Dimension { left, right }) => {
                assert_eq!(left, (2, 3));
                assert_eq!(right, (2, 2));
            }
            other => panic!("expected dimension error, got {:?}", other),
        }
    }

    #[test]
    fn test_multiply_scalar() {
        let m = Matrix::identity().multiply_scalar(2.5);
        assert_eq!(m[(0, 0)], 2.5);
        assert_eq!(m[(3, 3)], 2.5);
        assert_eq!(m[(0, 1)], 0.0);
    }

    #[test]
    fn test_perspective() {
        let m = Matrix::perspective(4.0).unwrap();
        assert_eq!(m[(2, 3)], -0.25);
        assert_eq!(m[(2, 2)], 1.0);
        assert!(matches!(Matrix::perspective(0.0), Err(Error::Domain(_))));
    }

    #[test]
    fn test_translation_last_row() {
        let m = Matrix::translation(1.0, 2.0, 3.0);
        assert_eq!(m.row(3), &[1.0, 2.0, 3.0, 1.0]);
        assert_eq!(m.transform_row([0.0, 0.0, 0.0, 1.0]).unwrap(), [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        for axis in Axis::ALL {
            assert_matrix_eq(&Matrix::rotation(0.0, axis), &Matrix::identity());
        }
    }

    #[test]
    fn test_rotation_inverse() {
        for axis in Axis::ALL {
            for angle in [15.0, 90.0, 137.5, -220.0] {
                let there = Matrix::rotation(angle, axis);
                let back = Matrix::rotation(-angle, axis);
                assert_matrix_eq(&there.multiply(&back).unwrap(), &Matrix::identity());
            }
        }
    }

    #[test]
    fn test_rotation_z_quarter_turn() {
        let v = Matrix::rotation(90.0, Axis::Z)
            .transform_row([1.0, 0.0, 0.0, 1.0])
            .unwrap();
        assert_abs_diff_eq!(v[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(v[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_orthographic_clears_column() {
        let m = Matrix::orthographic(Axis::X);
        assert_eq!(m[(0, 0)], 0.0);
        assert_eq!(m[(1, 1)], 1.0);
        assert_matrix_eq(&Matrix::orthographic(Axis::Z), &Matrix::identity());
    }

    #[test]
    fn test_isometric_is_deterministic() {
        let m = Matrix::isometric();
        assert_eq!(m, Matrix::isometric());
        assert_abs_diff_eq!(m[(0, 1)], 0.5, epsilon = 1e-6);
        assert_eq!(m[(3, 3)], 1.0);
    }

    #[test]
    fn test_transform_row_rejects_non_square() {
        let mut wide = Matrix::zeros(4, 5);
        for r in 0..4 {
            wide[(r, r)] = 1.0;
        }
        match wide.transform_row([0.0, 0.0, 0.0, 1.0]) {
            Err(Error::Dimension { left, right }) => {
                assert_eq!(left, (1, 4));
                assert_eq!(right, (4, 5));
            }
            other => panic!("expected dimension error, got {:?}", other),
        }
        let small = Matrix::from_rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(
            small.transform_row([1.0, 2.0, 3.0, 1.0]),
            Err(Error::Dimension { .. })
        ));
    }

    #[test]
    fn test_rotation_reference_line_keeps_matrix() {
        let line = Edge::new(
            crate::point::Point::new(1.0, 0.0, 0.0),
            crate::point::Point::new(1.0, 0.0, 1.0),
        );
        assert_eq!(
            Matrix::rotation_with_reference(30.0, Axis::Z, Some(&line)),
            Matrix::rotation(30.0, Axis::Z)
        );
    }
}
