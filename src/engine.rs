//! Main renderer orchestrator

use std::path::{Path, PathBuf};

use image::ImageError;
use thiserror::Error;

use crate::backend::{BackendError, ClearValues, GraphicsDevice, PipelineState};
use crate::capture;
use crate::controller::{Algorithm, AlgorithmController, Command, CommandQueue, RenderState};
use crate::pipeline::{FrameReport, PassSequencer, ShadowPrograms};
use crate::resources::{AdjacencyBuilder, DrawMode, GpuMesh, Mesh, MeshData, MeshError, MeshLoader};
use crate::scene::{Light, MeshId, Scene, SceneObject};
use crate::RendererConfig;

/// Renderer error type
#[derive(Error, Debug)]
pub enum RendererError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Failed to load mesh '{name}': {source}")]
    Mesh {
        name: String,
        #[source]
        source: MeshError,
    },
    #[error("Unknown mesh {0:?}")]
    UnknownMesh(MeshId),
    #[error("Readback of the {0} buffer does not match the frame size")]
    Readback(&'static str),
    #[error("Failed to write {}: {source}", path.display())]
    Capture {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

pub type RendererResult<T> = Result<T, RendererError>;

/// Owns the device, the scene and the pass sequencer
pub struct Renderer<D: GraphicsDevice> {
    device: D,
    config: RendererConfig,
    programs: ShadowPrograms,
    scene: Scene,
    meshes: Vec<GpuMesh>,
    adjacency_builder: AdjacencyBuilder,
    controller: AlgorithmController,
    sequencer: PassSequencer,
    commands: CommandQueue,
    capture_requested: bool,
    last_report: Option<FrameReport>,
}

impl<D: GraphicsDevice> Renderer<D> {
    /// Create a renderer on `device`. Program link failures are fatal.
    pub fn new(mut device: D, config: RendererConfig) -> RendererResult<Self> {
        if device.frame_size() != (config.width, config.height) {
            device.resize(config.width, config.height);
        }
        device.apply_state(&PipelineState::default());

        let programs = ShadowPrograms::create(&mut device)?;
        log::info!(
            "Renderer created on {} ({}x{})",
            device.name(),
            config.width,
            config.height
        );

        let controller = AlgorithmController::new(RenderState {
            algorithm: config.algorithm,
            robust: config.robust,
            width: config.width,
            height: config.height,
            ..Default::default()
        });

        let adjacency_builder = match config.weld_tolerance {
            Some(step) => AdjacencyBuilder::new().with_weld_tolerance(step),
            None => AdjacencyBuilder::new(),
        };

        let mut scene = Scene::new();
        scene
            .camera
            .set_aspect(config.width as f32, config.height as f32);

        Ok(Self {
            device,
            config,
            programs,
            scene,
            meshes: Vec::new(),
            adjacency_builder,
            controller,
            sequencer: PassSequencer::new(),
            commands: CommandQueue::new(),
            capture_requested: false,
            last_report: None,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn render_state(&self) -> RenderState {
        self.controller.state()
    }

    pub fn last_report(&self) -> Option<FrameReport> {
        self.last_report
    }

    /// Queue handle for input callbacks. Commands run before the next frame.
    pub fn command_queue(&self) -> CommandQueue {
        self.commands.clone()
    }

    /// Resize the device framebuffer and keep the camera aspect in sync
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.device.resize(width, height);
        self.scene.camera.set_aspect(width as f32, height as f32);
    }

    // Meshes and scene content

    /// Load `name` through `loader` and upload it
    pub fn load_mesh(
        &mut self,
        loader: &dyn MeshLoader,
        name: &str,
        draw_mode: DrawMode,
    ) -> RendererResult<MeshId> {
        let data = loader.load(name).map_err(|source| RendererError::Mesh {
            name: name.to_string(),
            source,
        })?;
        self.add_mesh(name, data, draw_mode)
    }

    /// Build (and for adjacency meshes, analyze) `data` and upload it
    pub fn add_mesh(
        &mut self,
        name: &str,
        data: MeshData,
        draw_mode: DrawMode,
    ) -> RendererResult<MeshId> {
        let mesh = Mesh::from_data(name, data, draw_mode, &self.adjacency_builder).map_err(
            |source| RendererError::Mesh {
                name: name.to_string(),
                source,
            },
        )?;

        if let Some(adjacency) = mesh.adjacency() {
            if !adjacency.stats().is_closed_manifold() {
                log::warn!(
                    "Mesh '{}' is not a closed manifold, its shadow volume may leak",
                    name
                );
            }
        }

        let gpu_mesh = GpuMesh::upload(&mut self.device, &mesh)?;
        let id = MeshId(self.meshes.len());
        self.meshes.push(gpu_mesh);
        log::info!(
            "Loaded mesh '{}': {} vertices, {} triangles, {:?}",
            name,
            mesh.vertex_count(),
            mesh.triangle_count(),
            draw_mode
        );
        Ok(id)
    }

    /// Add an object. Simple meshes have no adjacency and never cast.
    pub fn add_object(&mut self, mut object: SceneObject) -> RendererResult<usize> {
        let mesh = self
            .meshes
            .get(object.mesh.0)
            .ok_or(RendererError::UnknownMesh(object.mesh))?;
        if object.casts_shadow && mesh.draw_mode() == DrawMode::Simple {
            log::warn!("Mesh {:?} has no adjacency data and cannot cast shadows", object.mesh);
            object.casts_shadow = false;
        }
        if object.casts_shadow && object.transform.mirrors() {
            log::warn!(
                "Caster with mesh {:?} is mirrored; its lit side is reversed",
                object.mesh
            );
        }
        Ok(self.scene.add_object(object))
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        let kind = if light.is_directional() { "directional" } else { "point" };
        let index = self.scene.add_light(light);
        log::debug!("Added {} light {}", kind, index);
        index
    }

    // Controller

    pub fn select_algorithm(&mut self, algorithm: Algorithm) -> bool {
        self.controller.select_algorithm(algorithm)
    }

    pub fn set_robust(&mut self, robust: bool) -> bool {
        self.controller.set_robust(robust)
    }

    pub fn toggle_robust(&mut self) -> bool {
        self.controller.toggle_robust()
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.controller.toggle_pause()
    }

    pub fn set_active_light(&mut self, index: usize) -> bool {
        self.controller.set_active_light(index, self.scene.lights.len())
    }

    /// Switch the active light on or off. Returns the new flag, or `None`
    /// when there is no active light.
    pub fn toggle_light(&mut self) -> Option<bool> {
        let index = self.controller.state().active_light;
        let enabled = self.scene.lights.get_mut(index).map(Light::toggle);
        if let Some(enabled) = enabled {
            log::debug!("Light {}: {}", index, if enabled { "on" } else { "off" });
        }
        enabled
    }

    /// Run every queued command in submission order
    pub fn apply_commands(&mut self) {
        for command in self.commands.drain() {
            log::trace!("Applying {:?}", command);
            match command {
                Command::SelectAlgorithm(algorithm) => {
                    self.select_algorithm(algorithm);
                }
                Command::SetRobust(robust) => {
                    self.set_robust(robust);
                }
                Command::ToggleRobust => {
                    self.toggle_robust();
                }
                Command::TogglePause => {
                    self.toggle_pause();
                }
                Command::SetActiveLight(index) => {
                    self.set_active_light(index);
                }
                Command::ToggleLight => {
                    self.toggle_light();
                }
                Command::Capture => {
                    // The buffers still hold the last frame while paused
                    if self.controller.is_paused() {
                        self.write_captures();
                    } else {
                        self.capture_requested = true;
                    }
                }
            }
        }
    }

    // Frame

    /// Render one frame. Returns `None` while paused; the buffers then keep
    /// the last composited frame.
    pub fn render_frame(&mut self) -> Option<FrameReport> {
        self.apply_commands();
        if self.controller.is_paused() {
            return None;
        }

        let (width, height) = self.device.frame_size();
        self.controller.set_frame_size(width, height);
        let state = self.controller.state();

        self.device.begin_frame(&ClearValues {
            color: self.config.clear_color,
            ..Default::default()
        });
        let report = self.sequencer.run(
            &mut self.device,
            &self.scene,
            &self.meshes,
            &self.programs,
            state,
        );
        self.device.end_frame();

        if std::mem::take(&mut self.capture_requested) {
            self.write_captures();
        }
        self.last_report = Some(report);
        Some(report)
    }

    // Capture

    fn write_captures(&self) {
        let dir = &self.config.capture_dir;
        let results = [
            self.capture_frame(dir.join("result.png")),
            self.capture_depth(dir.join("depth.png")),
            self.capture_stencil(dir.join("stencil.png")),
        ];
        for err in results.into_iter().filter_map(Result::err) {
            log::error!("Capture failed: {}", err);
        }
    }

    /// Write the color buffer as an RGBA PNG
    pub fn capture_frame(&self, path: impl AsRef<Path>) -> RendererResult<()> {
        let (width, height) = self.device.frame_size();
        let image = capture::color_image(width, height, &self.device.read_color())
            .ok_or(RendererError::Readback("color"))?;
        let path = path.as_ref();
        capture::save_rgba(&image, path).map_err(|source| RendererError::Capture {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write linearized depth as a grayscale PNG
    pub fn capture_depth(&self, path: impl AsRef<Path>) -> RendererResult<()> {
        let (width, height) = self.device.frame_size();
        let image = capture::depth_image(
            width,
            height,
            &self.device.read_depth(),
            &self.scene.camera.projection,
        )
        .ok_or(RendererError::Readback("depth"))?;
        let path = path.as_ref();
        capture::save_gray(&image, path).map_err(|source| RendererError::Capture {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the stencil buffer as a mask, lit pixels white
    pub fn capture_stencil(&self, path: impl AsRef<Path>) -> RendererResult<()> {
        let (width, height) = self.device.frame_size();
        let image = capture::stencil_image(width, height, &self.device.read_stencil())
            .ok_or(RendererError::Readback("stencil"))?;
        let path = path.as_ref();
        capture::save_gray(&image, path).map_err(|source| RendererError::Capture {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl<D: GraphicsDevice> Drop for Renderer<D> {
    fn drop(&mut self) {
        for mesh in self.meshes.drain(..) {
            mesh.destroy(&mut self.device);
        }
    }
}
