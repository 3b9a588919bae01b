/// raster3d core library - software 3D scene rendering
///
/// Builds homogeneous transform and projection matrices, transforms points,
/// triangles and meshes, and rasterizes camera-relative meshes into an RGB
/// image with depth testing and Lambert shading.

pub mod error;
pub mod geometry;
pub mod matrix;
pub mod point;
pub mod projection;
pub mod raster;
pub mod scene;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use error::{Error, Result};
pub use geometry::{Edge, Light, Mesh, Primitive, Triangle};
pub use matrix::{Axis, Matrix};
pub use point::{Point, Transformable};
pub use projection::{Camera, Projection};
pub use raster::{DepthBuffer, Rasterizer};
pub use scene::{ObjectId, Scene, SceneObject};
pub use transform::{Transform, TransformOp};
