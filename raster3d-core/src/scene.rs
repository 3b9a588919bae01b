/// Scene objects, the camera-relative frame, and frame rendering
use image::{Rgb, RgbImage};
use nalgebra::{Point3, Vector3};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::geometry::{Edge, Light, Mesh, Primitive};
use crate::matrix::Matrix;
use crate::point::{Point, Transformable};
use crate::projection::{Camera, Projection};
use crate::raster::{self, Rasterizer};
use crate::transform::Transform;

const OUTLINE_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const LIGHT_COLOR: Rgb<u8> = Rgb([255, 165, 0]);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named primitive with its accumulated transform.
///
/// `local` is fixed at construction and never modified by rendering;
/// renders work on instances baked from it. The name is only changed
/// through `Scene`, which keeps names unique.
#[derive(Debug, Clone)]
pub struct SceneObject {
    id: ObjectId,
    name: String,
    local: Primitive,
    pub transform: Transform,
}

impl SceneObject {
    pub fn new(local: impl Into<Primitive>, name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::next(),
            name: name.into(),
            local: local.into(),
            transform: Transform::identity(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local(&self) -> &Primitive {
        &self.local
    }

    /// A copy of `local` with the object transform applied
    pub fn transformed(&self) -> Result<Primitive> {
        self.local.transform(&self.transform.matrix()?)
    }

    /// A copy of `local` with the object transform, then `view`, applied
    pub fn transformed_with(&self, view: &Matrix) -> Result<Primitive> {
        let m = self.transform.matrix()?.multiply(view)?;
        self.local.transform(&m)
    }
}

/// User objects, axis indicators, a light and the camera
#[derive(Debug, Clone)]
pub struct Scene {
    system_objects: Vec<SceneObject>,
    objects: Vec<SceneObject>,
    light: Option<ObjectId>,
    camera: Camera,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        let origin = Point::origin();
        let system_objects = vec![
            SceneObject::new(
                Edge::with_color(origin, Point::new(2.0, 0.0, 0.0), [255, 0, 0]),
                "axisLineX",
            ),
            SceneObject::new(
                Edge::with_color(origin, Point::new(0.0, 2.0, 0.0), [0, 128, 0]),
                "axisLineY",
            ),
            SceneObject::new(
                Edge::with_color(origin, Point::new(0.0, 0.0, -2.0), [0, 0, 255]),
                "axisLineZ",
            ),
            SceneObject::new(Edge::with_color(origin, origin, [128, 0, 128]), "axisLineRotation"),
        ];

        Self {
            system_objects,
            objects: Vec::new(),
            light: None,
            camera,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn system_objects(&self) -> &[SceneObject] {
        &self.system_objects
    }

    /// User objects in insertion order
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|obj| obj.id == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|obj| obj.id == id)
    }

    /// The active light object, if any
    pub fn light(&self) -> Option<&SceneObject> {
        self.light.and_then(|id| self.object(id))
    }

    /// Register `obj`, renaming it `name1`, `name2`, ... if its name is
    /// taken. A light becomes the scene's active light.
    pub fn add_object(&mut self, mut obj: SceneObject) -> ObjectId {
        obj.name = self.unique_name(&obj.name, None);

        let id = obj.id;
        if obj.local.is_light() {
            self.light = Some(id);
        }
        log::trace!("added object {} '{}'", id, obj.name);
        self.objects.push(obj);
        id
    }

    /// Rename object `id`, suffixed like `add_object` if the name is taken
    /// by another object. Returns the name given, `None` for an unknown id.
    pub fn rename_object(&mut self, id: ObjectId, name: &str) -> Option<&str> {
        let index = self.objects.iter().position(|obj| obj.id == id)?;
        let name = self.unique_name(name, Some(id));
        let obj = &mut self.objects[index];
        obj.name = name;
        Some(&obj.name)
    }

    fn unique_name(&self, base: &str, skip: Option<ObjectId>) -> String {
        let taken = |name: &str| {
            self.objects
                .iter()
                .any(|other| Some(other.id) != skip && other.name == name)
        };
        let mut name = base.to_string();
        let mut suffix = 1;
        while taken(&name) {
            name = format!("{}{}", base, suffix);
            suffix += 1;
        }
        name
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.objects.iter().position(|obj| obj.id == id)?;
        let removed = self.objects.remove(index);
        if self.light == Some(id) {
            self.light = self.latest_light();
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.light = None;
    }

    fn latest_light(&self) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|obj| obj.local.is_light())
            .map(|obj| obj.id)
    }

    /// Place the rotation-axis indicator
    pub fn set_rotation_axis(&mut self, line: Edge) {
        if let Some(axis) = self.system_objects.last_mut() {
            if let Primitive::Edge(edge) = &mut axis.local {
                edge.start = line.start;
                edge.end = line.end;
            }
        }
    }

    /// Move the viewpoint by `delta`. Objects are left untouched; the
    /// inverse movement is applied through the camera's view at render time.
    pub fn move_camera(&mut self, delta: Vector3<f32>) {
        self.camera.translate(delta);
    }

    /// Rotate the viewpoint by `delta` degrees about X, Y and Z
    pub fn rotate_camera(&mut self, delta: Vector3<f32>) {
        self.camera.rotate(delta);
    }

    /// Wireframe preview of every object, system objects first
    pub fn render_outline(&self, projection: Projection) -> Result<RgbImage> {
        let mut image = RgbImage::from_pixel(
            self.camera.width(),
            self.camera.height(),
            OUTLINE_BACKGROUND,
        );
        let view = self.camera.view().matrix()?;
        for obj in self.system_objects.iter().chain(&self.objects) {
            let instance = obj.transformed_with(&view)?;
            self.draw_outline(&mut image, &instance, projection);
        }
        Ok(image)
    }

    fn draw_outline(&self, image: &mut RgbImage, primitive: &Primitive, projection: Projection) {
        let camera = &self.camera;
        match primitive {
            Primitive::Triangle(t) => {
                if let Some(points) = t.projected(projection, camera) {
                    raster::draw_polygon(image, &points, OUTLINE_COLOR);
                }
            }
            Primitive::Mesh(m) => {
                for t in &m.triangles {
                    if let Some(points) = t.projected(projection, camera) {
                        raster::draw_polygon(image, &points, OUTLINE_COLOR);
                    }
                }
            }
            Primitive::Edge(e) => {
                let start = project(&e.start, projection, camera);
                let end = project(&e.end, projection, camera);
                if let (Some(a), Some(b)) = (start, end) {
                    raster::draw_line(image, a, b, Rgb(e.color));
                }
            }
            Primitive::Light(l) => {
                if let Some(at) = project(&l.position, projection, camera) {
                    raster::draw_marker(image, at, LIGHT_COLOR);
                }
            }
        }
    }

    /// Depth visualisation of all mesh and triangle objects
    pub fn render_depth(&self) -> Result<RgbImage> {
        let mut meshes = self.view_meshes()?;
        Rasterizer::for_camera(&self.camera).render_depth(&mut meshes, &self.camera)
    }

    /// Lambert-shaded render lit by the active light, or by a head-light at
    /// the eye when the scene has none
    pub fn render_shaded(&self) -> Result<RgbImage> {
        let light = match self.light() {
            Some(obj) => match obj.transformed_with(&self.camera.view().matrix()?)? {
                Primitive::Light(Light { position }) => position.position,
                _ => {
                    log::warn!("active light {} is not a light, using a head-light", obj.id);
                    Point3::new(0.0, 0.0, self.camera.k())
                }
            },
            None => {
                log::warn!("shaded render without a light, using a head-light");
                Point3::new(0.0, 0.0, self.camera.k())
            }
        };
        let mut meshes = self.view_meshes()?;
        Rasterizer::for_camera(&self.camera).render_shaded(&mut meshes, &light, &self.camera)
    }

    /// Camera-relative instances of every object that can be rasterized
    fn view_meshes(&self) -> Result<Vec<Mesh>> {
        let view = self.camera.view().matrix()?;
        let mut meshes = Vec::new();
        for obj in &self.objects {
            match obj.transformed_with(&view)? {
                Primitive::Mesh(m) => meshes.push(m),
                Primitive::Triangle(t) => meshes.push(Mesh { triangles: vec![t] }),
                Primitive::Edge(_) | Primitive::Light(_) => {}
            }
        }
        Ok(meshes)
    }
}

fn project(p: &Point, projection: Projection, camera: &Camera) -> Option<nalgebra::Point2<f32>> {
    let plane = match projection {
        Projection::Perspective => p.to_perspective(camera)?,
        Projection::Isometric => p.to_isometric(),
        Projection::Orthographic(axis) => p.to_orthographic(axis),
    };
    Some(camera.to_screen(plane))
}
