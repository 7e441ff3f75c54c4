//! PNG captures of the color, depth and stencil attachments

use std::path::Path;

use image::{GrayImage, ImageResult, RgbaImage};

use crate::scene::Projection;

/// Device rows run bottom to top, image rows top to bottom
fn flip_rows<T: Copy>(width: u32, height: u32, data: &[T]) -> Vec<T> {
    let width = width as usize;
    (0..height as usize)
        .rev()
        .flat_map(|row| data[row * width..(row + 1) * width].iter().copied())
        .collect()
}

fn check_len(width: u32, height: u32, len: usize) -> bool {
    (width as usize) * (height as usize) == len
}

pub fn color_image(width: u32, height: u32, pixels: &[[u8; 4]]) -> Option<RgbaImage> {
    if !check_len(width, height, pixels.len()) {
        return None;
    }
    let rows = flip_rows(width, height, pixels);
    RgbaImage::from_raw(width, height, bytemuck::cast_slice(&rows).to_vec())
}

/// Eye-space distance scaled so the far plane maps to white
pub fn depth_image(
    width: u32,
    height: u32,
    depth: &[f32],
    projection: &Projection,
) -> Option<GrayImage> {
    if !check_len(width, height, depth.len()) {
        return None;
    }
    let rows = flip_rows(width, height, depth);
    let pixels = rows
        .iter()
        .map(|d| {
            let linear = projection.linearize_depth(*d) / projection.far;
            (linear.clamp(0.0, 1.0) * 255.0) as u8
        })
        .collect();
    GrayImage::from_raw(width, height, pixels)
}

/// Zero stencil (lit) is white, anything else black
pub fn stencil_image(width: u32, height: u32, stencil: &[u8]) -> Option<GrayImage> {
    if !check_len(width, height, stencil.len()) {
        return None;
    }
    let rows = flip_rows(width, height, stencil);
    let pixels = rows.iter().map(|s| if *s == 0 { 255 } else { 0 }).collect();
    GrayImage::from_raw(width, height, pixels)
}

pub fn save_rgba(image: &RgbaImage, path: &Path) -> ImageResult<()> {
    log::info!("Writing {}", path.display());
    image.save(path)
}

pub fn save_gray(image: &GrayImage, path: &Path) -> ImageResult<()> {
    log::info!("Writing {}", path.display());
    image.save(path)
}
