//! Headless software device
//!
//! Deterministic CPU implementation of [`GraphicsDevice`]. It keeps a color,
//! depth and 8-bit stencil attachment, honors the full [`PipelineState`] and
//! runs reference versions of the scene and shadow-volume programs.

mod framebuffer;
mod program;
mod raster;

use std::collections::HashMap;

use crate::backend::traits::*;
use crate::backend::types::*;

pub use framebuffer::Framebuffer;
pub use raster::Viewport;

use program::{Program, StageVertex, Uniforms};
use raster::RasterJob;

enum BufferData {
    Vertex(Vec<Vertex>),
    Index(Vec<u32>),
}

/// Counters for the current frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStats {
    pub draw_calls: u32,
    pub triangles: u64,
    pub fragments: u64,
}

/// CPU rasterizer implementing [`GraphicsDevice`]
pub struct SoftwareDevice {
    framebuffer: Framebuffer,
    viewport: Viewport,
    state: PipelineState,
    buffers: HashMap<BufferHandle, BufferData>,
    programs: HashMap<ProgramHandle, (Program, Uniforms)>,
    bound_program: Option<ProgramHandle>,
    next_handle: u64,
    frame_index: u64,
    stats: DeviceStats,
}

impl SoftwareDevice {
    pub fn new(width: u32, height: u32) -> Self {
        log::info!("Creating software device ({}x{})", width, height);
        Self {
            framebuffer: Framebuffer::new(width, height),
            viewport: Viewport {
                x: 0,
                y: 0,
                width,
                height,
            },
            state: PipelineState::default(),
            buffers: HashMap::new(),
            programs: HashMap::new(),
            bound_program: None,
            next_handle: 1,
            frame_index: 0,
            stats: DeviceStats::default(),
        }
    }

    fn next_handle(&mut self) -> u64 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    /// Counters since the last `begin_frame`
    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Number of frames presented
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Current value of a uniform on the bound program
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        let handle = self.bound_program?;
        self.programs
            .get(&handle)
            .and_then(|(_, uniforms)| uniforms.get(name).copied())
    }

    fn vertices(&self, handle: BufferHandle) -> Option<&[Vertex]> {
        match self.buffers.get(&handle) {
            Some(BufferData::Vertex(data)) => Some(data),
            _ => None,
        }
    }

    fn indices(&self, handle: BufferHandle) -> Option<&[u32]> {
        match self.buffers.get(&handle) {
            Some(BufferData::Index(data)) => Some(data),
            _ => None,
        }
    }

    /// Run a draw with the vertex ids produced by `ids`
    fn draw(
        &mut self,
        topology: PrimitiveTopology,
        vertices: BufferHandle,
        ids: Option<BufferHandle>,
        count: u32,
    ) {
        let Some(handle) = self.bound_program else {
            log::warn!("Draw call without a bound program ignored");
            return;
        };
        let Some((program, uniforms)) = self.programs.get(&handle) else {
            return;
        };
        let Some(vertex_data) = self.vertices(vertices) else {
            log::warn!("Draw call with invalid vertex buffer {:?} ignored", vertices);
            return;
        };
        let index_data: Vec<u32> = match ids {
            Some(h) => match self.indices(h) {
                Some(data) => data.iter().take(count as usize).copied().collect(),
                None => {
                    log::warn!("Draw call with invalid index buffer {:?} ignored", h);
                    return;
                }
            },
            None => (0..count.min(vertex_data.len() as u32)).collect(),
        };

        let bound = program.bind(uniforms);
        let shaded: Vec<StageVertex> = vertex_data.iter().map(|v| bound.shade_vertex(v)).collect();

        let per_primitive = topology.vertices_per_primitive();
        let mut triangles = Vec::new();
        let mut primitive = Vec::with_capacity(per_primitive);
        for chunk in index_data.chunks_exact(per_primitive) {
            primitive.clear();
            for &i in chunk {
                match shaded.get(i as usize) {
                    Some(v) => primitive.push(*v),
                    None => break,
                }
            }
            if primitive.len() == per_primitive {
                bound.assemble(topology, &primitive, &mut triangles);
            }
        }

        let state = self.state;
        let mut job = RasterJob {
            framebuffer: &mut self.framebuffer,
            viewport: self.viewport,
            state: &state,
            program: &bound,
        };
        let mut fragments = 0u64;
        for triangle in &triangles {
            fragments += job.draw_triangle(triangle) as u64;
        }

        log::trace!(
            "Draw {:?}: {} primitives, {} triangles, {} fragments",
            topology,
            index_data.len() / per_primitive,
            triangles.len(),
            fragments
        );
        self.stats.draw_calls += 1;
        self.stats.triangles += triangles.len() as u64;
        self.stats.fragments += fragments;
    }
}

impl GraphicsDevice for SoftwareDevice {
    fn name(&self) -> &str {
        "Software"
    }

    fn frame_size(&self) -> (u32, u32) {
        (self.framebuffer.width(), self.framebuffer.height())
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::debug!("Resizing software framebuffer to {}x{}", width, height);
        self.framebuffer = Framebuffer::new(width, height);
        self.viewport = Viewport {
            x: 0,
            y: 0,
            width,
            height,
        };
    }

    fn create_vertex_buffer(&mut self, label: &str, vertices: &[Vertex]) -> BackendResult<BufferHandle> {
        if vertices.is_empty() {
            return Err(BackendError::BufferCreationFailed(format!(
                "vertex buffer '{}' is empty",
                label
            )));
        }
        let handle = BufferHandle(self.next_handle());
        log::trace!("Created vertex buffer '{}' ({} vertices)", label, vertices.len());
        self.buffers.insert(handle, BufferData::Vertex(vertices.to_vec()));
        Ok(handle)
    }

    fn create_index_buffer(&mut self, label: &str, indices: &[u32]) -> BackendResult<BufferHandle> {
        if indices.is_empty() {
            return Err(BackendError::BufferCreationFailed(format!(
                "index buffer '{}' is empty",
                label
            )));
        }
        let handle = BufferHandle(self.next_handle());
        log::trace!("Created index buffer '{}' ({} indices)", label, indices.len());
        self.buffers.insert(handle, BufferData::Index(indices.to_vec()));
        Ok(handle)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
    }

    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle> {
        let label = desc.label.clone().unwrap_or_else(|| format!("{:?}", desc.kind));
        for &stage in desc.kind.required_stages() {
            match desc.stage(stage) {
                Some(source) if !source.source.trim().is_empty() => {}
                Some(_) => {
                    return Err(BackendError::ShaderCreationFailed {
                        program: label,
                        stage,
                        message: "empty source".into(),
                    })
                }
                None => {
                    return Err(BackendError::ShaderCreationFailed {
                        program: label,
                        stage,
                        message: "missing stage".into(),
                    })
                }
            }
        }

        let handle = ProgramHandle(self.next_handle());
        log::info!("Linked program '{}' ({:?})", label, desc.kind);
        self.programs.insert(
            handle,
            (
                Program {
                    label,
                    kind: desc.kind,
                },
                Uniforms::default(),
            ),
        );
        Ok(handle)
    }

    fn begin_frame(&mut self, clear: &ClearValues) {
        self.stats = DeviceStats::default();
        self.framebuffer.clear(clear);
    }

    fn end_frame(&mut self) {
        self.frame_index += 1;
        log::trace!("Frame {} presented: {:?}", self.frame_index, self.stats);
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.viewport = Viewport {
            x,
            y,
            width,
            height,
        };
    }

    fn pipeline_state(&self) -> PipelineState {
        self.state
    }

    fn apply_state(&mut self, state: &PipelineState) {
        self.state = *state;
    }

    fn use_program(&mut self, program: ProgramHandle) {
        if let Some((linked, _)) = self.programs.get(&program) {
            log::trace!("Using program '{}'", linked.label);
            self.bound_program = Some(program);
        } else {
            log::warn!("use_program with unknown handle {:?}", program);
        }
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(handle) = self.bound_program else {
            log::warn!("Uniform '{}' set without a bound program", name);
            return;
        };
        if let Some((_, uniforms)) = self.programs.get_mut(&handle) {
            uniforms.set(name, value);
        }
    }

    fn draw_arrays(&mut self, topology: PrimitiveTopology, vertices: BufferHandle, count: u32) {
        self.draw(topology, vertices, None, count);
    }

    fn draw_indexed(
        &mut self,
        topology: PrimitiveTopology,
        vertices: BufferHandle,
        indices: BufferHandle,
        count: u32,
    ) {
        self.draw(topology, vertices, Some(indices), count);
    }

    fn read_color(&self) -> Vec<[u8; 4]> {
        self.framebuffer.color.clone()
    }

    fn read_depth(&self) -> Vec<f32> {
        self.framebuffer.depth.clone()
    }

    fn read_stencil(&self) -> Vec<u8> {
        self.framebuffer.stencil.clone()
    }
}
