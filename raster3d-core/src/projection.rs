/// Camera and projection utilities
use nalgebra::{Point2, Point3, Vector3};

use crate::error::{Error, Result};
use crate::matrix::{Axis, Matrix};
use crate::transform::Transform;

pub const DEFAULT_K: f32 = 10.0;
pub const DEFAULT_SCALE: f32 = 100.0;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Isometric,
    /// Parallel projection dropping the given axis
    Orthographic(Axis),
}

/// Camera intrinsics plus the accumulated view transform.
///
/// Projection math always assumes the eye at `(0, 0, k)` looking along
/// `forward`; moving or rotating the camera only changes `view`, which the
/// scene applies to every object at render time.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vector3<f32>,
    rotation: Vector3<f32>,
    forward: Vector3<f32>,
    width: u32,
    height: u32,
    k: f32,
    scale: f32,
    perspective: Matrix,
    view: Transform,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            forward: Vector3::new(0.0, 0.0, -1.0),
            width,
            height,
            k: DEFAULT_K,
            scale: DEFAULT_SCALE,
            perspective: Matrix::perspective_unchecked(DEFAULT_K),
            view: Transform::identity(),
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    /// Accumulated rotation in degrees about X, Y and Z
    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn k(&self) -> f32 {
        self.k
    }

    /// Pixels per world unit on the projection plane
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn perspective_matrix(&self) -> &Matrix {
        &self.perspective
    }

    pub fn view(&self) -> &Transform {
        &self.view
    }

    pub fn set_k(&mut self, k: f32) -> Result<()> {
        self.perspective = Matrix::perspective(k)?;
        self.k = k;
        Ok(())
    }

    pub fn set_forward(&mut self, forward: Vector3<f32>) -> Result<()> {
        if forward.norm() < f32::EPSILON {
            return Err(Error::domain("camera forward vector has zero length"));
        }
        self.forward = forward;
        Ok(())
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Move the viewpoint; the scene sees the opposite translation
    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.position += delta;
        self.view.translate(-delta);
    }

    /// Rotate the viewpoint (degrees); the scene sees the opposite rotation
    pub fn rotate(&mut self, delta: Vector3<f32>) {
        self.rotation += delta;
        // Undo Z, then Y, then X
        self.view
            .rotate(Vector3::new(0.0, 0.0, -delta.z))
            .rotate(Vector3::new(0.0, -delta.y, 0.0))
            .rotate(Vector3::new(-delta.x, 0.0, 0.0));
    }

    /// Map projection-plane coordinates to pixel coordinates (y down)
    pub fn to_screen(&self, p: Point2<f32>) -> Point2<f32> {
        Point2::new(
            self.width as f32 / 2.0 + p.x * self.scale,
            self.height as f32 / 2.0 - p.y * self.scale,
        )
    }

    /// Distance of a camera-relative point from the eye along the view axis
    pub fn depth(&self, p: &Point3<f32>) -> f32 {
        self.k - p.z
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
