/// Z-buffered triangle rasterizer with flat depth and Lambert shading modes
use image::{Rgb, RgbImage};
use nalgebra::{Point2, Point3, Vector2};

use crate::error::Result;
use crate::geometry::{Mesh, Triangle};
use crate::point::Point;
use crate::projection::Camera;

/// Colour of pixels no geometry reaches
pub const BACKGROUND: Rgb<u8> = Rgb([211, 211, 211]);

/// Grey level of the nearest and farthest depth in a frame
const NEAREST_GREY: f32 = 128.0;
const FARTHEST_GREY: f32 = 1.0;

#[derive(Debug, Clone, Copy, Default)]
struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
    illumination: f32,
}

/// Per-pixel nearest depth and the illumination of the surface owning it.
///
/// Each cell is a point at the pixel centre whose `z` is the eye depth,
/// `f32::INFINITY` where nothing has been drawn.
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    width: usize,
    height: usize,
    cells: Vec<Point>,
}

impl DepthBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let mut buffer = Self {
            width,
            height,
            cells: vec![Point::origin(); width * height],
        };
        buffer.clear();
        buffer
    }

    pub fn clear(&mut self) {
        let width = self.width;
        for (i, cell) in self.cells.iter_mut().enumerate() {
            let (x, y) = (i % width, i / width);
            *cell = Point::new(x as f32 + 0.5, y as f32 + 0.5, f32::INFINITY);
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[Point] {
        &self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Point> {
        if x < self.width && y < self.height {
            self.cells.get(y * self.width + x)
        } else {
            None
        }
    }

    pub fn is_covered(&self, x: usize, y: usize) -> bool {
        self.get(x, y).map_or(false, |cell| cell.z().is_finite())
    }

    /// Nearest and farthest depth drawn this frame
    pub fn depth_range(&self) -> Option<(f32, f32)> {
        self.cells
            .iter()
            .map(|cell| cell.z())
            .filter(|z| z.is_finite())
            .fold(None, |range, z| match range {
                None => Some((z, z)),
                Some((min, max)) => Some((min.min(z), max.max(z))),
            })
    }

    /// Scan-fill one camera-relative triangle, keeping the nearer depth per
    /// pixel. Depth and illumination are written together.
    ///
    /// Returns the number of pixels written. Triangles reaching behind the
    /// eye, degenerate on screen, or entirely off-screen write nothing.
    pub fn rasterize_triangle(&mut self, triangle: &Triangle, camera: &Camera) -> usize {
        let mut vertices = [ScreenVertex::default(); 3];
        for (v, p) in vertices.iter_mut().zip(triangle.points()) {
            let Some(projected) = p.to_perspective(camera) else {
                log::trace!("triangle reaches behind the eye, skipped");
                return 0;
            };
            let screen = camera.to_screen(projected);
            if !(screen.x.is_finite() && screen.y.is_finite()) {
                return 0;
            }
            *v = ScreenVertex {
                x: screen.x,
                y: screen.y,
                depth: camera.depth(&p.position),
                illumination: p.illumination,
            };
        }
        let [v0, v1, v2] = vertices;

        // Bounding box, clipped to the buffer
        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0);
        let max_x = v0.x.max(v1.x).max(v2.x).ceil().min(self.width as f32 - 1.0);
        let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0);
        let max_y = v0.y.max(v1.y).max(v2.y).ceil().min(self.height as f32 - 1.0);
        if min_x > max_x || min_y > max_y {
            return 0;
        }

        let corners = [
            Point2::new(v0.x, v0.y),
            Point2::new(v1.x, v1.y),
            Point2::new(v2.x, v2.y),
        ];
        let mut written = 0;
        for y in min_y as usize..=max_y as usize {
            for x in min_x as usize..=max_x as usize {
                let p = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
                let Some((w0, w1, w2)) = barycentric(&corners, p) else {
                    log::trace!("triangle degenerate on screen, skipped");
                    return written;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                let cell = &mut self.cells[y * self.width + x];
                if depth < cell.position.z {
                    cell.position.z = depth;
                    cell.illumination =
                        w0 * v0.illumination + w1 * v1.illumination + w2 * v2.illumination;
                    written += 1;
                }
            }
        }
        written
    }

    /// Grey levels from the depth range of this frame: nearest 128, farthest 1
    pub fn to_depth_image(&self) -> RgbImage {
        let range = self.depth_range();
        self.to_image(|cell| {
            let Some((min, max)) = range else {
                return BACKGROUND;
            };
            let grey = interpolate(min, NEAREST_GREY, max, FARTHEST_GREY, cell.z())
                .round()
                .clamp(FARTHEST_GREY, NEAREST_GREY) as u8;
            Rgb([grey, grey, grey])
        })
    }

    /// Red channel scaled by the stored illumination
    pub fn to_shaded_image(&self) -> RgbImage {
        self.to_image(|cell| Rgb([(255.0 * cell.illumination.clamp(0.0, 1.0)) as u8, 0, 0]))
    }

    fn to_image<F: Fn(&Point) -> Rgb<u8>>(&self, color: F) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width as u32, self.height as u32, BACKGROUND);
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.z().is_finite() {
                let (x, y) = (i % self.width, i / self.width);
                image.put_pixel(x as u32, y as u32, color(cell));
            }
        }
        image
    }
}

/// Full-frame renderer owning one depth buffer
#[derive(Debug, Clone)]
pub struct Rasterizer {
    buffer: DepthBuffer,
    cull_backfaces: bool,
}

impl Rasterizer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: DepthBuffer::new(width, height),
            cull_backfaces: false,
        }
    }

    pub fn for_camera(camera: &Camera) -> Self {
        Self::new(camera.width() as usize, camera.height() as usize)
    }

    /// Skip triangles whose visibility flag is cleared this frame
    pub fn with_backface_culling(mut self, enabled: bool) -> Self {
        self.cull_backfaces = enabled;
        self
    }

    pub fn buffer(&self) -> &DepthBuffer {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Refresh visibility and composite every triangle of `mesh` into the
    /// depth buffer. Returns the number of pixels written.
    pub fn render_mesh(&mut self, mesh: &mut Mesh, camera: &Camera) -> Result<usize> {
        mesh.compute_visibility(camera)?;
        let mut written = 0;
        for triangle in &mesh.triangles {
            if self.cull_backfaces && !triangle.is_visible() {
                continue;
            }
            written += self.buffer.rasterize_triangle(triangle, camera);
        }
        Ok(written)
    }

    /// Depth visualisation of camera-relative meshes
    pub fn render_depth(&mut self, meshes: &mut [Mesh], camera: &Camera) -> Result<RgbImage> {
        self.composite(meshes, camera)?;
        Ok(self.buffer.to_depth_image())
    }

    /// Lambert-shaded render of camera-relative meshes lit from `light`
    pub fn render_shaded(
        &mut self,
        meshes: &mut [Mesh],
        light: &Point3<f32>,
        camera: &Camera,
    ) -> Result<RgbImage> {
        for mesh in meshes.iter_mut() {
            mesh.apply_lambert(light);
        }
        self.composite(meshes, camera)?;
        Ok(self.buffer.to_shaded_image())
    }

    fn composite(&mut self, meshes: &mut [Mesh], camera: &Camera) -> Result<()> {
        self.clear();
        let mut written = 0;
        for mesh in meshes.iter_mut() {
            written += self.render_mesh(mesh, camera)?;
        }
        log::debug!(
            "rasterized {} meshes, {} pixel writes, depth range {:?}",
            meshes.len(),
            written,
            self.buffer.depth_range()
        );
        Ok(())
    }
}

fn interpolate(x0: f32, y0: f32, x1: f32, y1: f32, x: f32) -> f32 {
    if (x0 - x1).abs() < 1e-5 {
        return (y0 + y1) / 2.0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(v: &[Point2<f32>; 3], p: Point2<f32>) -> Option<(f32, f32, f32)> {
    let [v0, v1, v2] = v;
    let denom = (v1.y - v2.y) * (v0.x - v2.x) + (v2.x - v1.x) * (v0.y - v2.y);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.y - v2.y) * (p.x - v2.x) + (v2.x - v1.x) * (p.y - v2.y)) / denom;
    let w1 = ((v2.y - v0.y) * (p.x - v2.x) + (v0.x - v2.x) * (p.y - v2.y)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

/// Draw a segment, clipped to the image
pub fn draw_line(image: &mut RgbImage, a: Point2<f32>, b: Point2<f32>, color: Rgb<u8>) {
    let (width, height) = (image.width() as f32, image.height() as f32);
    let Some((a, b)) = clip_segment(a, b, width - 1.0, height - 1.0) else {
        return;
    };

    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let x = (a.x + dx * t).round();
        let y = (a.y + dy * t).round();
        if x >= 0.0 && y >= 0.0 && x < width && y < height {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Draw a closed outline through `points`
pub fn draw_polygon(image: &mut RgbImage, points: &[Point2<f32>], color: Rgb<u8>) {
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        draw_line(image, *a, b, color);
    }
}

/// Small cross centred on `at`
pub fn draw_marker(image: &mut RgbImage, at: Point2<f32>, color: Rgb<u8>) {
    const ARM: f32 = 3.0;
    let (h, v) = (Vector2::new(ARM, 0.0), Vector2::new(0.0, ARM));
    draw_line(image, at - h, at + h, color);
    draw_line(image, at - v, at + v, color);
}

/// Liang-Barsky clip against `[0, max_x] × [0, max_y]`
fn clip_segment(
    a: Point2<f32>,
    b: Point2<f32>,
    max_x: f32,
    max_y: f32,
) -> Option<(Point2<f32>, Point2<f32>)> {
    if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return None;
    }
    if max_x < 0.0 || max_y < 0.0 {
        return None;
    }

    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    for (p, q) in [(-dx, a.x), (dx, max_x - a.x), (-dy, a.y), (dy, max_y - a.y)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    Some((
        Point2::new(a.x + t0 * dx, a.y + t0 * dy),
        Point2::new(a.x + t1 * dx, a.y + t1 * dy),
    ))
}
