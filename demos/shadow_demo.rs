//! Headless shadow volume demo.
//!
//! Renders a small scene on the software device and writes color, depth and
//! stencil captures for the selected algorithm.
//!
//! # Usage
//!
//! ```bash
//! # Z-fail with robust extrusion, captures in ./captures
//! cargo run --example shadow_demo -- --output captures
//!
//! # Z-pass without robust extrusion, larger frame
//! cargo run --example shadow_demo -- --algorithm z-pass --no-robust --width 1024 --height 768
//! ```

use std::path::PathBuf;

use clap::Parser;
use glam::{Quat, Vec3};

use stencil_shadows::resources::{DrawMode, Material, MeshData, MeshLibrary};
use stencil_shadows::scene::{Camera, Light, Projection, SceneObject, Transform};
use stencil_shadows::{
    Algorithm, Command, Renderer, RendererConfig, RendererResult, SoftwareDevice,
};

/// Shadow algorithm selection for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum CliAlgorithm {
    /// Count volume faces behind the scene
    #[default]
    ZFail,
    /// Count volume faces in front of the scene
    ZPass,
}

impl From<CliAlgorithm> for Algorithm {
    fn from(cli: CliAlgorithm) -> Self {
        match cli {
            CliAlgorithm::ZFail => Algorithm::ZFail,
            CliAlgorithm::ZPass => Algorithm::ZPass,
        }
    }
}

/// Stencil shadow volume demo arguments.
#[derive(Parser, Debug)]
#[command(name = "shadow_demo", about = "Render a shadowed scene to PNG files")]
struct Args {
    /// Framebuffer width
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Framebuffer height
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Shadow algorithm
    #[arg(long, value_enum, default_value_t = CliAlgorithm::ZFail)]
    algorithm: CliAlgorithm,

    /// Disable robust extrusion
    #[arg(long)]
    no_robust: bool,

    /// Directory for result.png, depth.png and stencil.png
    #[arg(long, short, default_value = ".")]
    output: PathBuf,

    /// Number of frames to render; the caster spins between frames
    #[arg(long, default_value_t = 1)]
    frames: u32,
}

fn build_scene(renderer: &mut Renderer<SoftwareDevice>) -> RendererResult<()> {
    let library = MeshLibrary::with_primitives();

    let ground = renderer.add_mesh("ground", MeshData::plane(12.0, 12.0, 4), DrawMode::Simple)?;
    let cube = renderer.load_mesh(&library, "cube", DrawMode::Adjacency)?;
    let sphere = renderer.load_mesh(&library, "sphere", DrawMode::Adjacency)?;
    let tetrahedron = renderer.load_mesh(&library, "tetrahedron", DrawMode::Adjacency)?;

    renderer.add_object(
        SceneObject::new(ground)
            .with_material(Material::ground())
            .with_shadow(false),
    )?;
    renderer.add_object(
        SceneObject::new(cube)
            .with_transform(
                Transform::at(Vec3::new(-1.5, 1.2, 0.0))
                    .with_rotation(Quat::from_rotation_y(0.6)),
            )
            .with_material(Material::plastic(Vec3::new(0.8, 0.2, 0.2))),
    )?;
    renderer.add_object(
        SceneObject::new(sphere)
            .with_position(Vec3::new(1.5, 1.0, 0.5))
            .with_material(Material::plastic(Vec3::new(0.2, 0.4, 0.8))),
    )?;
    renderer.add_object(
        SceneObject::new(tetrahedron)
            .with_transform(Transform::at(Vec3::new(0.0, 2.5, -1.5)).scaled(0.8))
            .with_material(Material::matte(Vec3::new(0.3, 0.7, 0.3))),
    )?;

    renderer.add_light(Light::point(Vec3::new(2.0, 8.0, 3.0)));
    renderer.add_light(Light::point(Vec3::new(-4.0, 6.0, -2.0)));

    let (width, height) = (renderer.config().width, renderer.config().height);
    renderer.scene_mut().camera = Camera::new(Vec3::new(0.0, 6.0, 9.0), Vec3::ZERO)
        .with_projection(Projection::perspective(
            45.0,
            width as f32 / height as f32,
            0.1,
            100.0,
        ));
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = RendererConfig {
        width: args.width,
        height: args.height,
        algorithm: args.algorithm.into(),
        robust: !args.no_robust,
        capture_dir: args.output.clone(),
        ..Default::default()
    };

    if let Err(err) = std::fs::create_dir_all(&args.output) {
        log::error!("Cannot create {}: {}", args.output.display(), err);
        std::process::exit(1);
    }

    let device = SoftwareDevice::new(config.width, config.height);
    let mut renderer = match Renderer::new(device, config) {
        Ok(renderer) => renderer,
        Err(err) => {
            log::error!("Failed to create renderer: {}", err);
            std::process::exit(1);
        }
    };
    if let Err(err) = build_scene(&mut renderer) {
        log::error!("Failed to build scene: {}", err);
        std::process::exit(1);
    }

    let queue = renderer.command_queue();
    let frames = args.frames.max(1);
    for frame in 0..frames {
        if frame + 1 == frames {
            queue.push(Command::Capture);
        }
        if let Some(report) = renderer.render_frame() {
            let stats = renderer.device().stats();
            log::info!(
                "Frame {} ({}, robust {}): {} volume draws, {} triangles, {} fragments",
                report.frame,
                report.algorithm,
                report.robust,
                report.volume_draws,
                stats.triangles,
                stats.fragments
            );
        }
        if let Some(cube) = renderer.scene_mut().objects.get_mut(1) {
            cube.transform.spin(Vec3::Y, 0.1);
        }
    }
}
