//! Core device abstraction traits
//!
//! The pipeline talks to the GPU exclusively through [`GraphicsDevice`]. The
//! trait is object safe so passes can receive `&mut dyn GraphicsDevice`.

use crate::backend::types::*;
use thiserror::Error;

/// Device error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize device: {0}")]
    InitializationFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create {stage} stage of program {program}: {message}")]
    ShaderCreationFailed {
        program: String,
        stage: ShaderStage,
        message: String,
    },
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u64);

/// Main graphics device trait
pub trait GraphicsDevice {
    /// Human readable device name
    fn name(&self) -> &str;

    /// Current framebuffer size
    fn frame_size(&self) -> (u32, u32);

    /// Resize the default framebuffer
    fn resize(&mut self, width: u32, height: u32);

    // Resource creation

    /// Create a vertex buffer with initial data
    fn create_vertex_buffer(&mut self, label: &str, vertices: &[Vertex]) -> BackendResult<BufferHandle>;

    /// Create an index buffer with initial data
    fn create_index_buffer(&mut self, label: &str, indices: &[u32]) -> BackendResult<BufferHandle>;

    /// Destroy a buffer
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Compile and link a program from per-stage sources
    fn create_program(&mut self, desc: &ProgramDescriptor) -> BackendResult<ProgramHandle>;

    // Frame control

    /// Bind the default framebuffer and clear color, depth and stencil
    fn begin_frame(&mut self, clear: &ClearValues);

    /// Finish the frame and present it
    fn end_frame(&mut self);

    /// Set viewport
    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32);

    // Fixed-function state

    /// Currently applied pipeline state
    fn pipeline_state(&self) -> PipelineState;

    /// Replace the whole fixed-function state
    fn apply_state(&mut self, state: &PipelineState);

    // Programmable stages

    /// Bind a program for subsequent draws
    fn use_program(&mut self, program: ProgramHandle);

    /// Upload a uniform to the bound program
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    // Draw submission

    /// Draw non-indexed primitives
    fn draw_arrays(&mut self, topology: PrimitiveTopology, vertices: BufferHandle, count: u32);

    /// Draw indexed primitives
    fn draw_indexed(
        &mut self,
        topology: PrimitiveTopology,
        vertices: BufferHandle,
        indices: BufferHandle,
        count: u32,
    );

    // Readback, rows bottom to top

    /// Read the color attachment as RGBA8
    fn read_color(&self) -> Vec<[u8; 4]>;

    /// Read the depth attachment in window depth range [0, 1]
    fn read_depth(&self) -> Vec<f32>;

    /// Read the stencil attachment
    fn read_stencil(&self) -> Vec<u8>;
}
