/// Command-line front end: build a scene around one mesh, render a frame,
/// save it and show it in the terminal
use image::RgbImage;
use nalgebra::{Point3, Vector3};
use raster3d_core::{stl, Axis, Camera, Light, Mesh, Projection, Result, Scene, SceneObject};
use std::io::{self, stdout, Write};
use std::path::PathBuf;

pub mod renderer;

pub use renderer::TerminalPainter;

/// Radius, in world units, that loaded meshes are scaled to
const FIT_RADIUS: f32 = 1.5;

pub const USAGE: &str = "Usage: raster3d [MESH.stl] [--mode wire|depth|shaded] \
[--projection persp|iso|ortho-x|ortho-y|ortho-z] [--size WxH] [--output FILE.png] \
[--no-terminal] [--surface] [--verbose|--quiet]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Wire,
    Depth,
    Shaded,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub mesh_path: Option<PathBuf>,
    pub mode: RenderMode,
    pub projection: Projection,
    pub width: u32,
    pub height: u32,
    pub output: Option<PathBuf>,
    pub terminal: bool,
    pub surface: bool,
    pub log_level: log::LevelFilter,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mesh_path: None,
            mode: RenderMode::Shaded,
            projection: Projection::Perspective,
            width: 160,
            height: 96,
            output: None,
            terminal: true,
            surface: false,
            log_level: log::LevelFilter::Warn,
        }
    }
}

impl Options {
    /// Parse arguments, program name excluded
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> std::result::Result<Self, String> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| format!("Missing value for {}", flag))
            };
            match arg.as_str() {
                "--mode" => {
                    options.mode = match value("--mode")?.as_str() {
                        "wire" => RenderMode::Wire,
                        "depth" => RenderMode::Depth,
                        "shaded" => RenderMode::Shaded,
                        other => return Err(format!("Unknown mode '{}'", other)),
                    }
                }
                "--projection" => {
                    options.projection = match value("--projection")?.as_str() {
                        "persp" => Projection::Perspective,
                        "iso" => Projection::Isometric,
                        "ortho-x" => Projection::Orthographic(Axis::X),
                        "ortho-y" => Projection::Orthographic(Axis::Y),
                        "ortho-z" => Projection::Orthographic(Axis::Z),
                        other => return Err(format!("Unknown projection '{}'", other)),
                    }
                }
                "--size" => {
                    let size = value("--size")?;
                    let (w, h): (u32, u32) = size
                        .split_once('x')
                        .and_then(|(w, h)| Some((w.parse().ok()?, h.parse().ok()?)))
                        .ok_or_else(|| format!("Invalid size '{}', expected WxH", size))?;
                    if w == 0 || h == 0 {
                        return Err(format!("Invalid size '{}'", size));
                    }
                    options.width = w;
                    options.height = h;
                }
                "--output" | "-o" => options.output = Some(PathBuf::from(value("--output")?)),
                "--no-terminal" => options.terminal = false,
                "--surface" => options.surface = true,
                "--verbose" | "-v" => options.log_level = log::LevelFilter::Debug,
                "--quiet" | "-q" => options.log_level = log::LevelFilter::Error,
                flag if flag.starts_with('-') => return Err(format!("Unknown option '{}'", flag)),
                path => {
                    if options.mesh_path.is_some() {
                        return Err(format!("Unexpected argument '{}'", path));
                    }
                    options.mesh_path = Some(PathBuf::from(path));
                }
            }
        }
        Ok(options)
    }
}

/// The mesh to show: a loaded file, a sampled surface, or the demo cube
pub fn load_mesh(options: &Options) -> Result<Mesh> {
    if let Some(path) = &options.mesh_path {
        return stl::load_stl(path);
    }
    if options.surface {
        let (mesh, _) = Mesh::function_surface(-3.0, -3.0, 3.0, 3.0, 24, |x, y| {
            (x * x + y * y).sqrt().sin() * 0.6
        })?;
        return Ok(mesh);
    }
    Ok(Mesh::cube(2.0))
}

/// Object transform that centres `mesh`, scales it to `FIT_RADIUS` and
/// tilts it toward the viewer
pub fn fitted_object(mesh: Mesh, name: &str) -> SceneObject {
    let points: Vec<Point3<f32>> = mesh
        .triangles
        .iter()
        .flat_map(|t| t.points().iter().map(|p| p.position))
        .collect();
    let center = if points.is_empty() {
        Vector3::zeros()
    } else {
        points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / points.len() as f32
    };
    let radius = points
        .iter()
        .map(|p| (p.coords - center).norm())
        .fold(0.0f32, f32::max);

    let mut obj = SceneObject::new(mesh, name);
    obj.transform.translate(-center);
    if radius > f32::EPSILON {
        let s = FIT_RADIUS / radius;
        obj.transform.scale(Vector3::new(s, s, s));
    }
    obj.transform.rotate(Vector3::new(25.0, -35.0, 0.0));
    obj
}

/// Scene with the mesh and a light above and in front of it
pub fn build_scene(mesh: Mesh, options: &Options) -> Scene {
    let mut camera = Camera::new(options.width, options.height);
    camera.set_scale(options.height.min(options.width) as f32 / 5.0);
    let mut scene = Scene::new(camera);

    let name = options
        .mesh_path
        .as_ref()
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("Mesh"));
    scene.add_object(fitted_object(mesh, &name));

    let mut light = SceneObject::new(Light::default(), "Light");
    light.transform.translate(Vector3::new(3.0, 4.0, 6.0));
    scene.add_object(light);

    // Step back so the whole fitted mesh is in front of the eye
    scene.move_camera(Vector3::new(0.0, 0.0, 2.0));
    scene
}

/// Render one frame as requested by `options`
pub fn run(options: &Options) -> Result<()> {
    let mesh = load_mesh(options)?;
    log::info!("rendering {} triangles", mesh.len());
    let scene = build_scene(mesh, options);

    let image = match options.mode {
        RenderMode::Wire => scene.render_outline(options.projection)?,
        RenderMode::Depth => scene.render_depth()?,
        RenderMode::Shaded => scene.render_shaded()?,
    };

    if let Some(path) = &options.output {
        image.save(path)?;
        log::info!("wrote {}", path.display());
    }
    if options.terminal {
        present(&image, TerminalPainter::from_terminal(), &mut stdout())?;
    }
    Ok(())
}

/// Print `image` with `painter`. Without a usable terminal the frame is
/// skipped with a warning rather than failing an otherwise finished render.
pub fn present<W: Write>(
    image: &RgbImage,
    painter: io::Result<TerminalPainter>,
    writer: &mut W,
) -> Result<()> {
    match painter {
        Ok(painter) => painter.draw(image, writer)?,
        Err(why) => log::warn!("terminal size unavailable ({}), not drawing the frame", why),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster3d_core::Primitive;

    fn parse(args: &[&str]) -> std::result::Result<Options, String> {
        Options::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(parse(&[]).unwrap(), Options::default());
    }

    #[test]
    fn test_parse_full() {
        let options = parse(&[
            "model.stl",
            "--mode",
            "depth",
            "--projection",
            "ortho-y",
            "--size",
            "320x200",
            "-o",
            "out.png",
            "--no-terminal",
            "-v",
        ])
        .unwrap();
        assert_eq!(options.mesh_path, Some(PathBuf::from("model.stl")));
        assert_eq!(options.mode, RenderMode::Depth);
        assert_eq!(options.projection, Projection::Orthographic(Axis::Y));
        assert_eq!((options.width, options.height), (320, 200));
        assert_eq!(options.output, Some(PathBuf::from("out.png")));
        assert!(!options.terminal);
        assert_eq!(options.log_level, log::LevelFilter::Debug);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["--mode"]).is_err());
        assert!(parse(&["--mode", "raytraced"]).is_err());
        assert!(parse(&["--size", "12by4"]).is_err());
        assert!(parse(&["--size", "0x4"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["a.stl", "b.stl"]).is_err());
    }

    #[test]
    fn test_fitted_object_is_centred() {
        let mesh = Mesh::cube(10.0);
        let obj = fitted_object(mesh, "Cube");
        let Primitive::Mesh(instance) = obj.transformed().unwrap() else {
            panic!("expected a mesh");
        };
        for t in &instance.triangles {
            for p in t.points() {
                assert!(p.position.coords.norm() <= FIT_RADIUS + 1e-4);
            }
        }
    }

    #[test]
    fn test_demo_scene_renders_all_modes() {
        let options = Options {
            terminal: false,
            width: 80,
            height: 48,
            ..Options::default()
        };
        let scene = build_scene(load_mesh(&options).unwrap(), &options);
        assert_eq!(scene.len(), 2);
        assert!(scene.light().is_some());

        let background = raster3d_core::raster::BACKGROUND;
        let shaded = scene.render_shaded().unwrap();
        assert_ne!(*shaded.get_pixel(40, 24), background);
        let depth = scene.render_depth().unwrap();
        assert_ne!(*depth.get_pixel(40, 24), background);
        let outline = scene.render_outline(Projection::Isometric).unwrap();
        assert_eq!(outline.dimensions(), (80, 48));
    }

    #[test]
    fn test_present_without_terminal() {
        let image = RgbImage::new(4, 4);
        let mut out = Vec::new();
        let missing = Err(io::Error::new(io::ErrorKind::Other, "not a tty"));
        present(&image, missing, &mut out).unwrap();
        assert!(out.is_empty());

        present(&image, Ok(TerminalPainter::new(10, 10)), &mut out).unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn test_run_writes_png() {
        let path = std::env::temp_dir().join(format!("raster3d-run-{}.png", std::process::id()));
        let options = Options {
            mode: RenderMode::Depth,
            width: 40,
            height: 30,
            output: Some(path.clone()),
            terminal: false,
            ..Options::default()
        };
        run(&options).unwrap();
        let written = image::open(&path).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (40, 30));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_surface_mesh() {
        let options = Options {
            surface: true,
            ..Options::default()
        };
        assert_eq!(load_mesh(&options).unwrap().len(), 2 * 24 * 24);
    }
}
