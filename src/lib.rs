//! Stencil Shadows - A multi-pass stencil shadow volume renderer
//!
//! Computes which screen pixels a point light cannot reach by counting
//! extruded shadow volume faces into the stencil buffer, with either the
//! Z-pass or the Z-fail ("Carmack's reverse") algorithm.
//!
//! # Features
//! - Triangle adjacency construction with vertex welding
//! - Depth prepass, shadow volume stencil pass and shaded composite pass
//! - Robust extrusion for degenerate silhouettes and open meshes
//! - Runtime control of algorithm, robust mode, pause and active light
//! - Headless software device with PNG capture of color, depth and stencil

pub mod backend;
pub mod capture;
pub mod controller;
pub mod engine;
pub mod input;
pub mod pipeline;
pub mod resources;
pub mod scene;

use std::path::PathBuf;

pub use backend::{GraphicsDevice, SoftwareDevice};
pub use controller::{Algorithm, AlgorithmController, Command, CommandQueue, RenderState};
pub use engine::{Renderer, RendererError, RendererResult};
pub use pipeline::{FrameReport, PassSequencer};

/// Configuration for initializing the renderer
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Framebuffer width
    pub width: u32,
    /// Framebuffer height
    pub height: u32,
    /// Clear color, which is also what shadowed pixels show
    pub clear_color: [f32; 4],
    /// Initial shadow algorithm
    pub algorithm: Algorithm,
    /// Initial robust extrusion flag
    pub robust: bool,
    /// Directory capture commands write into
    pub capture_dir: PathBuf,
    /// Grid step for quantized vertex welding; `None` welds exact matches only
    pub weld_tolerance: Option<f32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            algorithm: Algorithm::ZFail,
            robust: true,
            capture_dir: PathBuf::from("."),
            weld_tolerance: None,
        }
    }
}
