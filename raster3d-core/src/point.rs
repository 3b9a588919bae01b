/// Points in 3D space and the transform contract shared by every primitive
use nalgebra::{Point2, Point3, Rotation3, Unit, Vector3};
use std::ops::Sub;

use crate::error::{Error, Result};
use crate::geometry::Edge;
use crate::matrix::{Axis, Matrix};
use crate::projection::Camera;

/// Smallest homogeneous `w` accepted by the perspective divide
pub const W_EPSILON: f32 = 1e-4;

/// A point (or vector) with the illumination assigned to it by shading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub position: Point3<f32>,
    pub illumination: f32,
}

impl Point {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            illumination: 0.0,
        }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn z(&self) -> f32 {
        self.position.z
    }

    pub fn coords(&self) -> Vector3<f32> {
        self.position.coords
    }

    /// Row-vector product `[x y z 1] · m`, followed by the homogeneous divide
    /// when `m` is projective. `m` must be 4×4.
    pub fn apply(&self, m: &Matrix) -> Result<Self> {
        m.ensure_homogeneous()?;
        Ok(self.apply_unchecked(m))
    }

    pub(crate) fn apply_unchecked(&self, m: &Matrix) -> Self {
        let [x, y, z, w] = m.transform_row_unchecked([self.x(), self.y(), self.z(), 1.0]);
        let position = if w != 1.0 && w.abs() > W_EPSILON {
            Point3::new(x / w, y / w, z / w)
        } else {
            Point3::new(x, y, z)
        };
        Self {
            position,
            illumination: self.illumination,
        }
    }

    /// Perspective-projected 3D point, or `None` at or behind the eye
    pub fn perspective(&self, camera: &Camera) -> Option<Self> {
        let [x, y, z, w] = camera
            .perspective_matrix()
            .transform_row_unchecked([self.x(), self.y(), self.z(), 1.0]);
        if w <= W_EPSILON {
            return None;
        }
        Some(Self {
            position: Point3::new(x / w, y / w, z / w),
            illumination: self.illumination,
        })
    }

    /// Projection-plane coordinates after the perspective divide
    pub fn to_perspective(&self, camera: &Camera) -> Option<Point2<f32>> {
        self.perspective(camera).map(|p| Point2::new(p.x(), p.y()))
    }

    /// Drop the coordinate of `axis`, keeping the other two in X, Y, Z order
    pub fn to_orthographic(&self, axis: Axis) -> Point2<f32> {
        match axis {
            Axis::X => Point2::new(self.y(), self.z()),
            Axis::Y => Point2::new(self.x(), self.z()),
            Axis::Z => Point2::new(self.x(), self.y()),
        }
    }

    pub fn to_isometric(&self) -> Point2<f32> {
        let p = self.apply_unchecked(&Matrix::isometric());
        Point2::new(p.x(), p.y())
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::origin()
    }
}

impl From<Point3<f32>> for Point {
    fn from(position: Point3<f32>) -> Self {
        Self {
            position,
            illumination: 0.0,
        }
    }
}

impl Sub for Point {
    type Output = Vector3<f32>;

    fn sub(self, other: Point) -> Vector3<f32> {
        self.position - other.position
    }
}

/// Value-semantic transforms: every operation returns a transformed copy.
///
/// Implementors only provide `map_points`; the operations below apply the
/// same mapping to each point they own.
pub trait Transformable: Sized {
    fn map_points<F: FnMut(&Point) -> Point>(&self, f: F) -> Self;

    /// Apply an arbitrary matrix; `Dimension` error unless it is 4×4
    fn transform(&self, m: &Matrix) -> Result<Self> {
        m.ensure_homogeneous()?;
        Ok(self.map_points(|p| p.apply_unchecked(m)))
    }

    fn translate(&self, dx: f32, dy: f32, dz: f32) -> Self {
        let m = Matrix::translation(dx, dy, dz);
        self.map_points(|p| p.apply_unchecked(&m))
    }

    /// Rotate about a cardinal axis through the origin, angle in degrees
    fn rotate(&self, angle_degrees: f32, axis: Axis) -> Self {
        let m = Matrix::rotation(angle_degrees, axis);
        self.map_points(|p| p.apply_unchecked(&m))
    }

    /// Rotate about `reference_line` when given, otherwise about `axis`
    fn rotate_with_reference(
        &self,
        angle_degrees: f32,
        axis: Axis,
        reference_line: Option<&Edge>,
    ) -> Result<Self> {
        match reference_line {
            Some(line) => self.rotate_about(angle_degrees, line),
            None => Ok(self.rotate(angle_degrees, axis)),
        }
    }

    /// Rotate about the line through `line.start` and `line.end`, angle in degrees
    fn rotate_about(&self, angle_degrees: f32, line: &Edge) -> Result<Self> {
        let axis = Unit::try_new(line.end - line.start, f32::EPSILON)
            .ok_or_else(|| Error::domain("reference line for rotation has zero length"))?;
        let rotation = Rotation3::from_axis_angle(&axis, angle_degrees.to_radians());
        let origin = line.start.position;
        Ok(self.map_points(|p| Point {
            position: origin + rotation * (p.position - origin),
            illumination: p.illumination,
        }))
    }

    fn scale(&self, sx: f32, sy: f32, sz: f32) -> Self {
        let m = Matrix::scaling(sx, sy, sz);
        self.map_points(|p| p.apply_unchecked(&m))
    }

    /// Negate the coordinate of `axis`
    fn reflect(&self, axis: Axis) -> Self {
        self.map_points(|p| {
            let mut q = *p;
            q.position[axis.index()] = -q.position[axis.index()];
            q
        })
    }

    fn reflect_x(&self) -> Self {
        self.reflect(Axis::X)
    }

    fn reflect_y(&self) -> Self {
        self.reflect(Axis::Y)
    }

    fn reflect_z(&self) -> Self {
        self.reflect(Axis::Z)
    }
}

impl Transformable for Point {
    fn map_points<F: FnMut(&Point) -> Point>(&self, mut f: F) -> Self {
        f(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_point_eq(p: &Point, x: f32, y: f32, z: f32) {
        assert_abs_diff_eq!(p.x(), x, epsilon = 1e-4);
        assert_abs_diff_eq!(p.y(), y, epsilon = 1e-4);
        assert_abs_diff_eq!(p.z(), z, epsilon = 1e-4);
    }

    #[test]
    fn test_translate_then_reflect() {
        let p = Point::origin().translate(1.0, 0.0, 0.0);
        assert_point_eq(&p, 1.0, 0.0, 0.0);
        let p = p.reflect_x();
        assert_point_eq(&p, -1.0, 0.0, 0.0);
    }

    #[test]
    fn test_transforms_return_new_values() {
        let p = Point::new(1.0, 2.0, 3.0);
        let _moved = p.translate(5.0, 5.0, 5.0);
        assert_point_eq(&p, 1.0, 2.0, 3.0);
    }

    #[test]
    fn test_zero_rotation_keeps_point() {
        let p = Point::new(0.3, -1.2, 4.5);
        for axis in Axis::ALL {
            assert_point_eq(&p.rotate(0.0, axis), 0.3, -1.2, 4.5);
        }
    }

    #[test]
    fn test_rotation_round_trip() {
        let p = Point::new(0.3, -1.2, 4.5);
        for axis in Axis::ALL {
            for angle in [1.0, 45.0, 90.0, 181.0, -75.5, 359.0] {
                let back = p.rotate(angle, axis).rotate(-angle, axis);
                assert_point_eq(&back, 0.3, -1.2, 4.5);
            }
        }
    }

    #[test]
    fn test_rotate_about_line() {
        // Line parallel to Z through (1, 0, 0)
        let line = Edge::new(Point::new(1.0, 0.0, 0.0), Point::new(1.0, 0.0, 1.0));
        let p = Point::new(2.0, 0.0, 5.0).rotate_about(90.0, &line).unwrap();
        assert_point_eq(&p, 1.0, 1.0, 5.0);
    }

    #[test]
    fn test_rotate_about_axis_line_matches_matrix() {
        let line = Edge::new(Point::origin(), Point::new(0.0, 1.0, 0.0));
        let p = Point::new(1.0, 2.0, 3.0);
        let a = p.rotate_about(30.0, &line).unwrap();
        let b = p.rotate(30.0, Axis::Y);
        assert_point_eq(&a, b.x(), b.y(), b.z());
    }

    #[test]
    fn test_rotate_about_degenerate_line() {
        let line = Edge::new(Point::origin(), Point::origin());
        assert!(matches!(
            Point::new(1.0, 0.0, 0.0).rotate_about(10.0, &line),
            Err(Error::Domain(_))
        ));
    }

    #[test]
    fn test_scale() {
        let p = Point::new(1.0, 2.0, 3.0).scale(2.0, -1.0, 0.5);
        assert_point_eq(&p, 2.0, -2.0, 1.5);
    }

    #[test]
    fn test_sub_and_cross() {
        let a = Point::new(1.0, 0.0, 0.0);
        let b = Point::new(0.0, 1.0, 0.0);
        let n = (a - Point::origin()).cross(&(b - Point::origin()));
        assert_abs_diff_eq!(n, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_orthographic_drops_axis() {
        let p = Point::new(1.0, 2.0, 3.0);
        assert_eq!(p.to_orthographic(Axis::X), Point2::new(2.0, 3.0));
        assert_eq!(p.to_orthographic(Axis::Y), Point2::new(1.0, 3.0));
        assert_eq!(p.to_orthographic(Axis::Z), Point2::new(1.0, 2.0));
    }

    #[test]
    fn test_perspective_divides_by_depth() {
        let camera = Camera::new(100, 100);
        let k = camera.k();
        let near = Point::new(1.0, 1.0, 0.0).to_perspective(&camera).unwrap();
        assert_abs_diff_eq!(near.x, 1.0, epsilon = 1e-6);
        // One k further away halves the projected size
        let far = Point::new(1.0, 1.0, -k).to_perspective(&camera).unwrap();
        assert_abs_diff_eq!(far.x, 0.5, epsilon = 1e-6);
        assert!(Point::new(0.0, 0.0, k).to_perspective(&camera).is_none());
        assert!(Point::new(0.0, 0.0, 2.0 * k).to_perspective(&camera).is_none());
    }

    #[test]
    fn test_isometric_origin() {
        assert_eq!(Point::origin().to_isometric(), Point2::new(0.0, 0.0));
    }

    #[test]
    fn test_transform_with_4x4_matrix() {
        let p = Point::origin()
            .transform(&Matrix::translation(1.0, 2.0, 3.0))
            .unwrap();
        assert_point_eq(&p, 1.0, 2.0, 3.0);
    }

    #[test]
    fn test_transform_rejects_non_4x4() {
        // Leading 4×4 block is a valid translation, the extra column is not
        let mut wide = Matrix::zeros(4, 5);
        for r in 0..4 {
            for c in 0..4 {
                wide[(r, c)] = Matrix::translation(1.0, 2.0, 3.0)[(r, c)];
            }
        }
        assert!(matches!(
            Point::origin().transform(&wide),
            Err(Error::Dimension { .. })
        ));

        let small = Matrix::from_rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(
            Point::new(1.0, 2.0, 3.0).apply(&small),
            Err(Error::Dimension { .. })
        ));
    }

    #[test]
    fn test_rotate_with_reference() {
        let p = Point::new(2.0, 0.0, 5.0);
        let line = Edge::new(Point::new(1.0, 0.0, 0.0), Point::new(1.0, 0.0, 1.0));
        let about_line = p.rotate_with_reference(90.0, Axis::Z, Some(&line)).unwrap();
        assert_point_eq(&about_line, 1.0, 1.0, 5.0);
        let about_axis = p.rotate_with_reference(90.0, Axis::Z, None).unwrap();
        assert_point_eq(&about_axis, 0.0, 2.0, 5.0);
    }
}
