//! Integration tests for the stencil shadow pipeline.
//!
//! Every test renders on the software device and inspects the buffers it
//! leaves behind.
//!
//! # Test Categories
//!
//! - **Adjacency Tests**: opposite-vertex property and permutation invariance
//! - **Algorithm Tests**: Z-pass and Z-fail agreement, camera inside a volume, robust toggle
//! - **Scene Tests**: shadow footprint, directional light, switched-off light
//! - **Controller Tests**: pause, command queue, no-op inputs
//! - **Resource Tests**: malformed meshes, captures

mod common;

use glam::Vec3;
use rstest::rstest;

use common::{
    CLEAR_PIXEL, HEIGHT, LIGHT_POSITION, WIDTH, add_caster, add_ground, caster_mesh,
    create_renderer, create_shadow_scene, pixel_index, pixel_of, render_stencil,
    shadowed_pixels,
};
use stencil_shadows::backend::PipelineState;
use stencil_shadows::resources::{AdjacencyBuilder, DrawMode, MeshData, MeshError};
use stencil_shadows::scene::{Camera, Light, Projection, SceneObject};
use stencil_shadows::{Algorithm, Command, GraphicsDevice, RendererError};

// ============================================================================
// Adjacency Tests
// ============================================================================

fn triangle_positions(data: &MeshData, triangle: usize) -> [Vec3; 3] {
    let corner = |i: usize| data.positions[data.indices[triangle * 3 + i] as usize];
    [corner(0), corner(1), corner(2)]
}

/// On a closed mesh, the opposite entry of each edge is the third corner of
/// another triangle that uses the same edge reversed.
#[rstest]
#[case::cube("cube")]
#[case::tetrahedron("tetrahedron")]
#[case::sphere("sphere")]
fn test_adjacency_names_the_neighbor(#[case] name: &str) {
    let data = caster_mesh(name);
    let adjacency = AdjacencyBuilder::new()
        .build(&data.positions, &data.indices)
        .unwrap();
    assert_eq!(adjacency.indices().len(), data.indices.len() * 2);
    assert!(adjacency.stats().is_closed_manifold());

    let triangles = data.indices.len() / 3;
    for t in 0..triangles {
        let entry = adjacency.triangle(t).unwrap();
        let own = triangle_positions(&data, t);
        for edge in 0..3 {
            assert_eq!(entry[edge * 2], data.indices[t * 3 + edge]);

            let a = own[edge];
            let b = own[(edge + 1) % 3];
            let opposite = data.positions[entry[edge * 2 + 1] as usize];
            let found = (0..triangles).filter(|u| *u != t).any(|u| {
                let other = triangle_positions(&data, u);
                (0..3).any(|k| {
                    other[k] == b && other[(k + 1) % 3] == a && other[(k + 2) % 3] == opposite
                })
            });
            assert!(found, "triangle {} edge {} has no matching neighbor", t, edge);
        }
    }
}

#[rstest]
#[case::cube("cube")]
#[case::sphere("sphere")]
fn test_adjacency_is_invariant_under_triangle_permutation(#[case] name: &str) {
    let data = caster_mesh(name);
    let triangles = data.indices.len() / 3;
    // Reverse the triangle order and rotate each triangle's corners
    let order: Vec<usize> = (0..triangles).rev().collect();
    let mut permuted = data.clone();
    permuted.indices = order
        .iter()
        .flat_map(|&t| {
            let i = &data.indices[t * 3..t * 3 + 3];
            [i[1], i[2], i[0]]
        })
        .collect();

    let builder = AdjacencyBuilder::new();
    let original = builder.build(&data.positions, &data.indices).unwrap();
    let shuffled = builder.build(&permuted.positions, &permuted.indices).unwrap();

    for (new_index, &old_index) in order.iter().enumerate() {
        let before = original.triangle(old_index).unwrap();
        let after = shuffled.triangle(new_index).unwrap();
        for edge in 0..3 {
            // Rotation by one corner moves edge k to slot k - 1
            let slot = (edge + 2) % 3;
            assert_eq!(
                data.positions[before[edge * 2 + 1] as usize],
                data.positions[after[slot * 2 + 1] as usize],
            );
        }
    }
}

// ============================================================================
// Algorithm Tests
// ============================================================================

/// With the camera outside every volume both algorithms leave the same
/// stencil buffer.
#[rstest]
#[case::cube_robust("cube", true)]
#[case::cube("cube", false)]
#[case::tetrahedron_robust("tetrahedron", true)]
#[case::tetrahedron("tetrahedron", false)]
#[case::sphere_robust("sphere", true)]
fn test_zpass_and_zfail_agree(#[case] caster: &str, #[case] robust: bool) {
    let mut renderer = create_shadow_scene(Algorithm::ZFail, robust, caster_mesh(caster));
    let zfail = render_stencil(&mut renderer);

    assert!(renderer.select_algorithm(Algorithm::ZPass));
    let zpass = render_stencil(&mut renderer);

    assert!(shadowed_pixels(&zfail) > 0, "{} casts no shadow", caster);
    assert_eq!(zfail, zpass);
}

/// Only Z-fail survives a camera sitting inside the volume: Z-pass never
/// counts the faces behind the near plane, so it misses the shadow around
/// the camera and wraps to 255 where the view leaves the volume.
#[test]
fn test_camera_inside_volume() {
    let stencils = [Algorithm::ZFail, Algorithm::ZPass].map(|algorithm| {
        let mut renderer = create_renderer(algorithm, true);
        add_ground(&mut renderer);
        add_caster(&mut renderer, "cube", MeshData::cube(), Vec3::new(0.0, 3.0, 0.0), 2.0);
        renderer.add_light(Light::point(Vec3::new(0.0, 10.0, 0.0)));
        renderer.scene_mut().camera =
            Camera::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 2.0)).with_projection(
                Projection::perspective(45.0, WIDTH as f32 / HEIGHT as f32, 0.1, 100.0),
            );

        let stencil = render_stencil(&mut renderer);
        let (x, y) = pixel_of(&renderer, Vec3::new(0.0, 0.0, 1.3));
        let near = pixel_index(x, y);
        let (x, y) = pixel_of(&renderer, Vec3::new(0.0, 0.0, 4.0));
        let far = pixel_index(x, y);
        (stencil[near], stencil[far], renderer.device().read_color()[near])
    });

    let (near, far, near_color) = stencils[0];
    assert_ne!(near, 0, "Z-fail lost the shadow around the camera");
    assert_eq!(far, 0, "Z-fail shadowed the lit ground");
    assert_eq!(near_color, CLEAR_PIXEL);

    let (near, far, _) = stencils[1];
    assert_eq!(near, 0);
    assert_eq!(far, 255);
}

#[rstest]
#[case::zfail(Algorithm::ZFail)]
#[case::zpass(Algorithm::ZPass)]
fn test_robust_toggle_keeps_convex_shadows(#[case] algorithm: Algorithm) {
    let mut renderer = create_shadow_scene(algorithm, true, MeshData::cube());
    let robust = render_stencil(&mut renderer);

    assert!(renderer.set_robust(false));
    let plain = render_stencil(&mut renderer);

    assert_eq!(robust, plain);
}

#[test]
fn test_report_follows_render_state() {
    let mut renderer = create_shadow_scene(Algorithm::ZPass, false, MeshData::cube());
    let report = renderer.render_frame().unwrap();

    assert_eq!(report.frame, 1);
    assert_eq!(report.algorithm, Algorithm::ZPass);
    assert!(!report.robust);
    assert_eq!(report.prepass_draws, 2);
    assert_eq!(report.volume_draws, 1);
    assert_eq!(report.composite_draws, 2);
    assert_eq!(renderer.last_report(), Some(report));
}

#[test]
fn test_pipeline_state_is_restored_after_each_frame() {
    for algorithm in [Algorithm::ZFail, Algorithm::ZPass] {
        let mut renderer = create_shadow_scene(algorithm, true, MeshData::cube());
        renderer.render_frame().unwrap();
        assert_eq!(renderer.device().pipeline_state(), PipelineState::default());
    }
}

// ============================================================================
// Scene Tests
// ============================================================================

/// An upward facing triangle hanging under the light shadows the ground
/// below it, and those pixels keep the clear color.
#[rstest]
#[case::zfail_robust(Algorithm::ZFail, true)]
#[case::zfail(Algorithm::ZFail, false)]
#[case::zpass_robust(Algorithm::ZPass, true)]
#[case::zpass(Algorithm::ZPass, false)]
fn test_suspended_triangle_footprint(#[case] algorithm: Algorithm, #[case] robust: bool) {
    let mut renderer = create_renderer(algorithm, robust);
    add_ground(&mut renderer);
    add_caster(
        &mut renderer,
        "triangle",
        MeshData::triangle(),
        Vec3::new(0.0, 2.0, 0.0),
        2.0,
    );
    renderer.add_light(Light::point(Vec3::new(0.0, 8.0, 0.0)));

    let stencil = render_stencil(&mut renderer);
    let color = renderer.device().read_color();

    let (x, y) = pixel_of(&renderer, Vec3::new(0.0, 0.0, -0.2));
    let shadowed = pixel_index(x, y);
    assert_ne!(stencil[shadowed], 0);
    assert_eq!(color[shadowed], CLEAR_PIXEL);

    let (x, y) = pixel_of(&renderer, Vec3::new(3.0, 0.0, 3.0));
    let lit = pixel_index(x, y);
    assert_eq!(stencil[lit], 0);
    assert_ne!(color[lit], CLEAR_PIXEL);

    // Every shadowed pixel shows the clear color
    for (stencil, color) in stencil.iter().zip(&color) {
        if *stencil != 0 {
            assert_eq!(*color, CLEAR_PIXEL);
        }
    }
}

/// A light with w = 0 casts parallel rays, so the footprint of a cube lit
/// from straight above is the cube's own outline. A point light above the
/// cube widens it.
#[rstest]
#[case::zfail(Algorithm::ZFail)]
#[case::zpass(Algorithm::ZPass)]
fn test_directional_light_casts_straight_down(#[case] algorithm: Algorithm) {
    let mut renderer = create_renderer(algorithm, true);
    add_ground(&mut renderer);
    add_caster(&mut renderer, "cube", MeshData::cube(), Vec3::new(0.0, 3.0, 0.0), 2.0);
    renderer.add_light(Light::directional(Vec3::Y));

    let (x, y) = pixel_of(&renderer, Vec3::ZERO);
    let under = pixel_index(x, y);
    let (x, y) = pixel_of(&renderer, Vec3::new(1.4, 0.0, 0.0));
    let beside = pixel_index(x, y);

    let stencil = render_stencil(&mut renderer);
    assert_ne!(stencil[under], 0);
    assert_eq!(stencil[beside], 0);

    let point = renderer.add_light(Light::point(Vec3::new(0.0, 10.0, 0.0)));
    assert!(renderer.set_active_light(point));
    let stencil = render_stencil(&mut renderer);
    assert_ne!(stencil[under], 0);
    assert_ne!(stencil[beside], 0);
}

#[rstest]
#[case::zfail(Algorithm::ZFail)]
#[case::zpass(Algorithm::ZPass)]
fn test_switched_off_light_casts_nothing(#[case] algorithm: Algorithm) {
    let mut renderer = create_shadow_scene(algorithm, true, MeshData::cube());
    assert_eq!(renderer.toggle_light(), Some(false));

    let stencil = render_stencil(&mut renderer);
    assert!(stencil.iter().all(|s| *s == 0));
    assert_eq!(renderer.last_report().unwrap().volume_draws, 0);

    // Every covered pixel went through the composite pass
    let depth = renderer.device().read_depth();
    let color = renderer.device().read_color();
    for (depth, color) in depth.iter().zip(&color) {
        if *depth < 1.0 {
            assert_ne!(*color, CLEAR_PIXEL);
        }
    }
}

#[test]
fn test_only_the_active_light_casts() {
    let mut renderer = create_shadow_scene(Algorithm::ZFail, true, MeshData::cube());
    let first = render_stencil(&mut renderer);

    let second_light = renderer.add_light(Light::point(Vec3::new(-6.0, 7.0, -1.0)));
    let unchanged = render_stencil(&mut renderer);
    assert_eq!(first, unchanged);

    assert!(renderer.set_active_light(second_light));
    let moved = render_stencil(&mut renderer);
    assert_ne!(first, moved);
    assert!(shadowed_pixels(&moved) > 0);
}

// ============================================================================
// Controller Tests
// ============================================================================

#[test]
fn test_pause_keeps_the_last_frame() {
    let mut renderer = create_shadow_scene(Algorithm::ZFail, true, MeshData::cube());
    let stencil = render_stencil(&mut renderer);
    let color = renderer.device().read_color();

    assert!(renderer.toggle_pause());
    assert!(!renderer.select_algorithm(Algorithm::ZPass));
    assert!(!renderer.set_robust(false));
    assert!(renderer.render_frame().is_none());
    assert!(renderer.render_frame().is_none());

    assert_eq!(renderer.device().read_stencil(), stencil);
    assert_eq!(renderer.device().read_color(), color);
    assert_eq!(renderer.device().frame_index(), 1);
    assert_eq!(renderer.render_state().algorithm, Algorithm::ZFail);
    assert!(renderer.render_state().robust);

    assert!(!renderer.toggle_pause());
    assert_eq!(render_stencil(&mut renderer), stencil);
}

#[test]
fn test_repeated_frames_are_identical() {
    let mut renderer = create_shadow_scene(Algorithm::ZPass, true, MeshData::tetrahedron());
    let first = render_stencil(&mut renderer);
    let first_color = renderer.device().read_color();
    let second = render_stencil(&mut renderer);

    assert_eq!(first, second);
    assert_eq!(first_color, renderer.device().read_color());
}

#[test]
fn test_invalid_light_index_is_a_noop() {
    let mut renderer = create_shadow_scene(Algorithm::ZFail, true, MeshData::cube());
    assert!(!renderer.set_active_light(4));
    assert_eq!(renderer.render_state().active_light, 0);
}

#[test]
fn test_queued_commands_apply_before_the_next_frame() {
    let mut renderer = create_shadow_scene(Algorithm::ZFail, true, MeshData::cube());
    let queue = renderer.command_queue();

    std::thread::spawn(move || {
        queue.push(Command::SelectAlgorithm(Algorithm::ZPass));
        queue.push(Command::SetRobust(false));
        queue.push(Command::ToggleLight);
    })
    .join()
    .unwrap();

    // Nothing changes until the renderer drains the queue
    assert_eq!(renderer.render_state().algorithm, Algorithm::ZFail);
    assert_eq!(renderer.command_queue().len(), 3);

    let report = renderer.render_frame().unwrap();
    assert_eq!(report.algorithm, Algorithm::ZPass);
    assert!(!report.robust);
    assert_eq!(report.volume_draws, 0);
    assert!(renderer.command_queue().is_empty());
}

// ============================================================================
// Resource Tests
// ============================================================================

#[test]
fn test_malformed_mesh_leaves_the_scene_untouched() {
    let mut renderer = create_shadow_scene(Algorithm::ZFail, true, MeshData::cube());
    let before = render_stencil(&mut renderer);

    let broken = MeshData::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 7]);
    match renderer.add_mesh("broken", broken, DrawMode::Adjacency) {
        Err(RendererError::Mesh { name, source }) => {
            assert_eq!(name, "broken");
            assert!(matches!(source, MeshError::IndexOutOfRange { index: 7, .. }));
        }
        other => panic!("expected a mesh error, got {:?}", other.map(|_| ())),
    }

    let nan = MeshData::new(vec![Vec3::ZERO, Vec3::X, Vec3::NAN], vec![0, 1, 2]);
    assert!(renderer.add_mesh("nan", nan, DrawMode::Adjacency).is_err());

    assert_eq!(renderer.scene().objects.len(), 2);
    assert_eq!(render_stencil(&mut renderer), before);
}

#[test]
fn test_simple_meshes_never_cast() {
    let mut renderer = create_renderer(Algorithm::ZFail, true);
    add_ground(&mut renderer);
    let cube = renderer
        .add_mesh("cube", MeshData::cube(), DrawMode::Simple)
        .unwrap();
    let index = renderer
        .add_object(SceneObject::new(cube).with_position(Vec3::new(0.0, 1.5, 0.0)))
        .unwrap();
    renderer.add_light(Light::point(LIGHT_POSITION));

    assert!(!renderer.scene().objects[index].casts_shadow);
    let stencil = render_stencil(&mut renderer);
    assert_eq!(shadowed_pixels(&stencil), 0);
}

#[test]
fn test_capture_writes_png_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut renderer = create_shadow_scene(Algorithm::ZFail, true, MeshData::cube());
    renderer.render_frame().unwrap();

    renderer.capture_frame(dir.path().join("result.png")).unwrap();
    renderer.capture_depth(dir.path().join("depth.png")).unwrap();
    renderer.capture_stencil(dir.path().join("stencil.png")).unwrap();

    let frame = image::open(dir.path().join("result.png")).unwrap().to_rgba8();
    assert_eq!(frame.dimensions(), (WIDTH, HEIGHT));

    let stencil = image::open(dir.path().join("stencil.png")).unwrap().to_luma8();
    let shadowed = stencil.pixels().filter(|p| p.0[0] == 0).count();
    assert_eq!(shadowed, shadowed_pixels(&renderer.device().read_stencil()));
}
