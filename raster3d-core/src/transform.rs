/// Accumulated object transforms
use nalgebra::{Point3, Vector3};

use crate::error::Result;
use crate::matrix::{Axis, Matrix};

/// A single recorded transform step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    Translate(Vector3<f32>),
    /// Degrees about X, then Y, then Z
    Rotate(Vector3<f32>),
    Scale(Vector3<f32>),
}

impl TransformOp {
    pub fn matrix(&self) -> Result<Matrix> {
        match *self {
            TransformOp::Translate(v) => Ok(Matrix::translation(v.x, v.y, v.z)),
            TransformOp::Rotate(v) => Matrix::rotation(v.x, Axis::X)
                .multiply(&Matrix::rotation(v.y, Axis::Y))?
                .multiply(&Matrix::rotation(v.z, Axis::Z)),
            TransformOp::Scale(v) => Ok(Matrix::scaling(v.x, v.y, v.z)),
        }
    }
}

/// Ordered list of transform steps applied to a primitive.
///
/// Steps are only recorded here; `matrix` folds them into one 4×4 matrix
/// when an instance is baked for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transform {
    ops: Vec<TransformOp>,
}

impl Transform {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    pub fn push(&mut self, op: TransformOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn translate(&mut self, v: Vector3<f32>) -> &mut Self {
        self.push(TransformOp::Translate(v))
    }

    pub fn rotate(&mut self, degrees: Vector3<f32>) -> &mut Self {
        self.push(TransformOp::Rotate(degrees))
    }

    pub fn scale(&mut self, v: Vector3<f32>) -> &mut Self {
        self.push(TransformOp::Scale(v))
    }

    /// Compose every recorded step, first step applied first
    pub fn matrix(&self) -> Result<Matrix> {
        self.ops
            .iter()
            .try_fold(Matrix::identity(), |acc, op| acc.multiply(&op.matrix()?))
    }

    /// Where the local origin ends up
    pub fn position(&self) -> Result<Point3<f32>> {
        let m = self.matrix()?;
        Ok(Point3::new(m[(3, 0)], m[(3, 1)], m[(3, 2)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_transform() {
        let transform = Transform::identity();
        assert_eq!(transform.matrix().unwrap(), Matrix::identity());
        assert_eq!(transform.position().unwrap(), Point3::origin());
    }

    #[test]
    fn test_steps_apply_in_order() {
        let mut transform = Transform::identity();
        transform
            .translate(Vector3::new(1.0, 0.0, 0.0))
            .rotate(Vector3::new(0.0, 0.0, 90.0));
        // Translated to (1, 0, 0) first, then swung onto the Y axis
        let p = transform.position().unwrap();
        assert_abs_diff_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
        assert_eq!(transform.ops().len(), 2);
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        let mut transform = Transform::identity();
        transform.rotate(Vector3::zeros());
        let m = transform.matrix().unwrap();
        for r in 0..4 {
            for c in 0..4 {
                assert_abs_diff_eq!(m[(r, c)], Matrix::identity()[(r, c)], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_scale_does_not_move_origin() {
        let mut transform = Transform::identity();
        transform.scale(Vector3::new(3.0, 3.0, 3.0));
        assert_eq!(transform.position().unwrap(), Point3::origin());
    }
}
