//! Color, depth and stencil attachments of the software device

use crate::backend::types::ClearValues;

/// Default framebuffer. Rows are stored bottom to top.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pub(crate) color: Vec<[u8; 4]>,
    pub(crate) depth: Vec<f32>,
    pub(crate) stencil: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            color: vec![[0, 0, 0, 255]; len],
            depth: vec![1.0; len],
            stencil: vec![0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    pub fn clear(&mut self, clear: &ClearValues) {
        let color = encode_color(clear.color);
        self.color.fill(color);
        self.depth.fill(clear.depth.clamp(0.0, 1.0));
        self.stencil.fill(clear.stencil);
    }
}

/// Convert a linear color in [0, 1] to RGBA8
pub fn encode_color(color: [f32; 4]) -> [u8; 4] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}
