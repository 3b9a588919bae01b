/// Geometry primitives for 3D rendering
use nalgebra::{Point2, Point3, Vector3};
use std::ops::Index;

use crate::error::{Error, Result};
use crate::matrix::Axis;
use crate::point::{Point, Transformable};
use crate::projection::{Camera, Projection};

/// Normals shorter than this are treated as degenerate
pub const NORMAL_EPSILON: f32 = 1e-8;

/// A triangle face defined by three points.
///
/// Point order is significant: the normal is `(p1 - p0) × (p2 - p0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    points: [Point; 3],
    visible: bool,
}

impl Triangle {
    pub fn new(p0: Point, p1: Point, p2: Point) -> Self {
        Self {
            points: [p0, p1, p2],
            visible: true,
        }
    }

    pub fn points(&self) -> &[Point; 3] {
        &self.points
    }

    /// Result of the last `compute_visibility` call (true before any)
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Unit face normal
    pub fn normal(&self) -> Result<Vector3<f32>> {
        let n = (self.points[1] - self.points[0]).cross(&(self.points[2] - self.points[0]));
        let length = n.norm();
        if length < NORMAL_EPSILON {
            return Err(Error::domain("degenerate triangle has no normal"));
        }
        Ok(n / length)
    }

    pub fn center(&self) -> Point {
        let sum = self.points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords());
        Point::from(Point3::from(sum / 3.0))
    }

    pub fn isometric(&self) -> [Point2<f32>; 3] {
        self.points.map(|p| p.to_isometric())
    }

    pub fn orthographic(&self, axis: Axis) -> [Point2<f32>; 3] {
        self.points.map(|p| p.to_orthographic(axis))
    }

    /// `None` when any point is at or behind the eye
    pub fn perspective(&self, camera: &Camera) -> Option<[Point2<f32>; 3]> {
        let [a, b, c] = &self.points;
        Some([
            a.to_perspective(camera)?,
            b.to_perspective(camera)?,
            c.to_perspective(camera)?,
        ])
    }

    /// Pixel coordinates of the points under `projection`, in source winding
    pub fn projected(&self, projection: Projection, camera: &Camera) -> Option<[Point2<f32>; 3]> {
        let plane = match projection {
            Projection::Perspective => self.perspective(camera)?,
            Projection::Isometric => self.isometric(),
            Projection::Orthographic(axis) => self.orthographic(axis),
        };
        Some(plane.map(|p| camera.to_screen(p)))
    }

    /// Recompute the visibility flag from the angle between the
    /// perspective-space normal and the camera's forward vector.
    ///
    /// The triangle is marked visible when that angle exceeds 90°. Triangles
    /// reaching behind the eye are marked invisible.
    pub fn compute_visibility(&mut self, camera: &Camera) -> Result<bool> {
        let forward = camera.forward();
        let forward_length = forward.norm();
        if forward_length < NORMAL_EPSILON {
            return Err(Error::domain("camera forward vector has zero length"));
        }

        let [a, b, c] = &self.points;
        let projected = a
            .perspective(camera)
            .zip(b.perspective(camera))
            .zip(c.perspective(camera));
        let Some(((p0, p1), p2)) = projected else {
            self.visible = false;
            return Ok(false);
        };

        let normal = (p1 - p0).cross(&(p2 - p0));
        let length = normal.norm();
        if length < NORMAL_EPSILON {
            return Err(Error::domain("degenerate triangle has no projected normal"));
        }
        let normal = normal / length;

        let cos = normal.dot(&forward) / forward_length;
        let angle = cos.clamp(-1.0, 1.0).acos().to_degrees();
        self.visible = angle > 90.0;
        Ok(self.visible)
    }

    /// Lambert illumination for each point, lit by a point light at `light`
    pub fn apply_lambert(&mut self, light: &Point3<f32>) -> Result<()> {
        let normal = self.normal()?;
        for p in &mut self.points {
            let to_surface = p.position - light;
            let distance = to_surface.norm();
            p.illumination = if distance < NORMAL_EPSILON {
                1.0
            } else {
                (-normal.dot(&to_surface) / distance).clamp(0.0, 1.0)
            };
        }
        Ok(())
    }
}

impl Index<usize> for Triangle {
    type Output = Point;

    fn index(&self, i: usize) -> &Point {
        &self.points[i]
    }
}

impl Transformable for Triangle {
    fn map_points<F: FnMut(&Point) -> Point>(&self, mut f: F) -> Self {
        let [a, b, c] = &self.points;
        Self {
            points: [f(a), f(b), f(c)],
            visible: self.visible,
        }
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Refresh every triangle's visibility flag for this frame.
    ///
    /// Degenerate triangles are marked invisible; only a zero-length camera
    /// forward vector is an error.
    pub fn compute_visibility(&mut self, camera: &Camera) -> Result<()> {
        if camera.forward().norm() < NORMAL_EPSILON {
            return Err(Error::domain("camera forward vector has zero length"));
        }
        for triangle in &mut self.triangles {
            if triangle.compute_visibility(camera).is_err() {
                log::debug!("degenerate triangle marked invisible");
                triangle.visible = false;
            }
        }
        Ok(())
    }

    /// Assign Lambert illumination to every point. Degenerate triangles are
    /// left unlit.
    pub fn apply_lambert(&mut self, light: &Point3<f32>) {
        for triangle in &mut self.triangles {
            if triangle.apply_lambert(light).is_err() {
                log::debug!("degenerate triangle left unlit");
                for p in &mut triangle.points {
                    p.illumination = 0.0;
                }
            }
        }
    }

    /// Create a cube centred on the origin with outward-facing triangles
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let corner = |x: f32, y: f32, z: f32| Point::new(x * h, y * h, z * h);
        // Each face as four corners in counter-clockwise order seen from outside
        let faces = [
            [(-1., -1., 1.), (1., -1., 1.), (1., 1., 1.), (-1., 1., 1.)],
            [(-1., -1., -1.), (-1., 1., -1.), (1., 1., -1.), (1., -1., -1.)],
            [(-1., 1., -1.), (-1., 1., 1.), (1., 1., 1.), (1., 1., -1.)],
            [(-1., -1., -1.), (1., -1., -1.), (1., -1., 1.), (-1., -1., 1.)],
            [(1., -1., -1.), (1., 1., -1.), (1., 1., 1.), (1., -1., 1.)],
            [(-1., -1., -1.), (-1., -1., 1.), (-1., 1., 1.), (-1., 1., -1.)],
        ];

        let mut mesh = Self::with_capacity(12);
        for face in faces {
            let [a, b, c, d] = face.map(|(x, y, z)| corner(x, y, z));
            mesh.add_triangle(Triangle::new(a, b, c));
            mesh.add_triangle(Triangle::new(a, c, d));
        }
        mesh
    }

    /// Triangulate the surface `z = f(x, y)` over `[x0, x1] × [y0, y1]`.
    ///
    /// The grid has `steps + 1` samples per side and is centred on the
    /// origin. Returns the mesh and the offset that moves it back to where
    /// it was sampled.
    pub fn function_surface<F>(
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        steps: u32,
        f: F,
    ) -> Result<(Self, Vector3<f32>)>
    where
        F: Fn(f32, f32) -> f32,
    {
        if steps == 0 {
            return Err(Error::domain("function surface needs at least one step"));
        }

        let step_x = (x1 - x0) / steps as f32;
        let step_y = (y1 - y0) / steps as f32;
        let dx = -(x0 + x1) / 2.0;
        let dy = -(y0 + y1) / 2.0;

        let mut min_z = f32::INFINITY;
        let mut max_z = f32::NEG_INFINITY;
        let mut rows: Vec<Vec<Point>> = Vec::with_capacity(steps as usize + 1);
        for xi in 0..=steps {
            let x = x0 + xi as f32 * step_x;
            let row = (0..=steps)
                .map(|yi| {
                    let y = y0 + yi as f32 * step_y;
                    let z = f(x, y);
                    min_z = min_z.min(z);
                    max_z = max_z.max(z);
                    Point::new(x + dx, y + dy, z)
                })
                .collect();
            rows.push(row);
        }

        let mut mesh = Self::with_capacity(2 * (steps * steps) as usize);
        for pair in rows.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            for i in 1..cur.len() {
                mesh.add_triangle(Triangle::new(prev[i - 1], cur[i - 1], cur[i]));
                mesh.add_triangle(Triangle::new(prev[i - 1], cur[i], prev[i]));
            }
        }

        let mid_z = (min_z + max_z) / 2.0;
        Ok((mesh.translate(0.0, 0.0, -mid_z), Vector3::new(-dx, -dy, mid_z)))
    }
}

impl Transformable for Mesh {
    fn map_points<F: FnMut(&Point) -> Point>(&self, mut f: F) -> Self {
        Self {
            triangles: self.triangles.iter().map(|t| t.map_points(&mut f)).collect(),
        }
    }
}

/// A line segment, used for axis indicators and the rotation axis
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub start: Point,
    pub end: Point,
    pub color: [u8; 3],
}

impl Edge {
    pub fn new(start: Point, end: Point) -> Self {
        Self::with_color(start, end, [0, 0, 0])
    }

    pub fn with_color(start: Point, end: Point, color: [u8; 3]) -> Self {
        Self { start, end, color }
    }
}

impl Transformable for Edge {
    fn map_points<F: FnMut(&Point) -> Point>(&self, mut f: F) -> Self {
        Self {
            start: f(&self.start),
            end: f(&self.end),
            color: self.color,
        }
    }
}

/// A point light source
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Light {
    pub position: Point,
}

impl Light {
    pub fn new(position: Point) -> Self {
        Self { position }
    }
}

impl Transformable for Light {
    fn map_points<F: FnMut(&Point) -> Point>(&self, mut f: F) -> Self {
        Self {
            position: f(&self.position),
        }
    }
}

/// Every kind of geometry a scene object can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Triangle(Triangle),
    Mesh(Mesh),
    Edge(Edge),
    Light(Light),
}

impl Primitive {
    pub fn is_light(&self) -> bool {
        matches!(self, Primitive::Light(_))
    }
}

impl Transformable for Primitive {
    fn map_points<F: FnMut(&Point) -> Point>(&self, f: F) -> Self {
        match self {
            Primitive::Triangle(t) => Primitive::Triangle(t.map_points(f)),
            Primitive::Mesh(m) => Primitive::Mesh(m.map_points(f)),
            Primitive::Edge(e) => Primitive::Edge(e.map_points(f)),
            Primitive::Light(l) => Primitive::Light(l.map_points(f)),
        }
    }
}

impl From<Triangle> for Primitive {
    fn from(t: Triangle) -> Self {
        Primitive::Triangle(t)
    }
}

impl From<Mesh> for Primitive {
    fn from(m: Mesh) -> Self {
        Primitive::Mesh(m)
    }
}

impl From<Edge> for Primitive {
    fn from(e: Edge) -> Self {
        Primitive::Edge(e)
    }
}

impl From<Light> for Primitive {
    fn from(l: Light) -> Self {
        Primitive::Light(l)
    }
}
