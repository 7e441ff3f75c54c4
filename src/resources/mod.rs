//! Resource management
//!
//! Mesh geometry, adjacency construction and materials.

mod adjacency;
mod material;
mod mesh;

pub use adjacency::*;
pub use material::*;
pub use mesh::*;
