//! Common utilities for shadow pipeline integration tests.
//!
//! Scenes are rendered on the software device at a small resolution so every
//! test can compare whole stencil buffers.

#![allow(dead_code)]

use glam::{Vec3, Vec4};

use stencil_shadows::resources::{DrawMode, Material, MeshData};
use stencil_shadows::scene::{Camera, Light, Projection, SceneObject};
use stencil_shadows::{
    Algorithm, GraphicsDevice, Renderer, RendererConfig, SoftwareDevice,
};

pub const WIDTH: u32 = 96;
pub const HEIGHT: u32 = 72;

/// Clear color as stored in the color buffer
pub const CLEAR_PIXEL: [u8; 4] = [26, 26, 26, 255];

/// Light position used by scenes that do not pick their own
pub const LIGHT_POSITION: Vec3 = Vec3::new(1.3, 8.0, 2.1);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Scene Construction
// ============================================================================

/// Renderer looking down at the origin from (0, 10, 10)
pub fn create_renderer(algorithm: Algorithm, robust: bool) -> Renderer<SoftwareDevice> {
    init_logging();
    let config = RendererConfig {
        width: WIDTH,
        height: HEIGHT,
        algorithm,
        robust,
        ..Default::default()
    };
    let device = SoftwareDevice::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(device, config).expect("renderer creation");
    renderer.scene_mut().camera = Camera::new(Vec3::new(0.0, 10.0, 10.0), Vec3::ZERO)
        .with_projection(Projection::perspective(
            45.0,
            WIDTH as f32 / HEIGHT as f32,
            0.1,
            100.0,
        ));
    renderer
}

/// Ground plane large enough to fill the view. It receives but never casts.
pub fn add_ground(renderer: &mut Renderer<SoftwareDevice>) {
    let ground = renderer
        .add_mesh("ground", MeshData::plane(40.0, 40.0, 2), DrawMode::Simple)
        .expect("ground mesh");
    renderer
        .add_object(
            SceneObject::new(ground)
                .with_material(Material::ground())
                .with_shadow(false),
        )
        .expect("ground object");
}

/// Add an adjacency caster and return its object index
pub fn add_caster(
    renderer: &mut Renderer<SoftwareDevice>,
    name: &str,
    data: MeshData,
    position: Vec3,
    scale: f32,
) -> usize {
    let mesh = renderer
        .add_mesh(name, data, DrawMode::Adjacency)
        .expect("caster mesh");
    renderer
        .add_object(
            SceneObject::new(mesh)
                .with_position(position)
                .with_scale(Vec3::splat(scale))
                .with_material(Material::plastic(Vec3::new(0.8, 0.3, 0.2))),
        )
        .expect("caster object")
}

/// Ground, one caster above the origin and one light
pub fn create_shadow_scene(
    algorithm: Algorithm,
    robust: bool,
    caster: MeshData,
) -> Renderer<SoftwareDevice> {
    let mut renderer = create_renderer(algorithm, robust);
    add_ground(&mut renderer);
    add_caster(&mut renderer, "caster", caster, Vec3::new(0.0, 1.5, 0.0), 1.0);
    renderer.add_light(Light::point(LIGHT_POSITION));
    renderer
}

/// Caster by name, so rstest cases stay readable
pub fn caster_mesh(name: &str) -> MeshData {
    match name {
        "cube" => MeshData::cube(),
        "tetrahedron" => MeshData::tetrahedron(),
        "sphere" => MeshData::sphere(16, 8),
        other => panic!("unknown caster {}", other),
    }
}

// ============================================================================
// Readback
// ============================================================================

/// Render one frame and return the stencil buffer
pub fn render_stencil(renderer: &mut Renderer<SoftwareDevice>) -> Vec<u8> {
    renderer.render_frame().expect("frame was rendered");
    renderer.device().read_stencil()
}

/// Pixel covering `world`, in bottom-to-top row order
pub fn pixel_of(renderer: &Renderer<SoftwareDevice>, world: Vec3) -> (u32, u32) {
    let camera = &renderer.scene().camera;
    let clip = camera.projection_matrix() * camera.view_matrix() * Vec4::from((world, 1.0));
    let ndc = clip.truncate() / clip.w;
    let x = ((ndc.x * 0.5 + 0.5) * WIDTH as f32) as u32;
    let y = ((ndc.y * 0.5 + 0.5) * HEIGHT as f32) as u32;
    (x.min(WIDTH - 1), y.min(HEIGHT - 1))
}

pub fn pixel_index(x: u32, y: u32) -> usize {
    (y * WIDTH + x) as usize
}

pub fn shadowed_pixels(stencil: &[u8]) -> usize {
    stencil.iter().filter(|s| **s != 0).count()
}
