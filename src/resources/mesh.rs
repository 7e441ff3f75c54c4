//! Mesh data structures and generation

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use thiserror::Error;

use super::adjacency::{AdjacencyBuffer, AdjacencyBuilder};
use crate::backend::{BackendResult, BufferHandle, GraphicsDevice, PrimitiveTopology, Vertex};

/// Mesh validation and loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("Mesh has no triangles")]
    Empty,
    #[error("Index count {0} is not a multiple of three")]
    IndexCountNotMultipleOfThree(usize),
    #[error("Index {index} at slot {slot} exceeds vertex count {vertex_count}")]
    IndexOutOfRange {
        slot: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("Vertex {vertex} has a non-finite position")]
    NonFinitePosition { vertex: usize },
    #[error("{attribute} count {count} does not match position count {expected}")]
    AttributeCountMismatch {
        attribute: &'static str,
        count: usize,
        expected: usize,
    },
    #[error("Mesh '{0}' not found")]
    NotFound(String),
}

pub type MeshResult<T> = Result<T, MeshError>;

/// How a mesh is submitted to the device. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    /// Non-indexed triangle list; cannot cast shadows
    Simple,
    /// Indexed triangle list with adjacency
    #[default]
    Adjacency,
}

/// Raw geometry as produced by a loader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
    pub indices: Vec<u32>,
}

/// Source of mesh geometry by name
pub trait MeshLoader {
    fn load(&self, name: &str) -> MeshResult<MeshData>;
}

/// In-memory mesh library
#[derive(Debug, Clone, Default)]
pub struct MeshLibrary {
    meshes: HashMap<String, MeshData>,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with the generated primitives registered under their names
    pub fn with_primitives() -> Self {
        let mut library = Self::new();
        library.insert("cube", MeshData::cube());
        library.insert("tetrahedron", MeshData::tetrahedron());
        library.insert("sphere", MeshData::sphere(24, 12));
        library.insert("triangle", MeshData::triangle());
        library.insert("plane", MeshData::plane(1.0, 1.0, 1));
        library
    }

    pub fn insert(&mut self, name: &str, data: MeshData) {
        self.meshes.insert(name.to_string(), data);
    }
}

impl MeshLoader for MeshLibrary {
    fn load(&self, name: &str) -> MeshResult<MeshData> {
        self.meshes
            .get(name)
            .cloned()
            .ok_or_else(|| MeshError::NotFound(name.to_string()))
    }
}

impl MeshData {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            ..Default::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check indices and attributes against the position list
    pub fn validate(&self) -> MeshResult<()> {
        if self.indices.is_empty() {
            return Err(MeshError::Empty);
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IndexCountNotMultipleOfThree(self.indices.len()));
        }
        let expected = self.positions.len();
        if let Some((slot, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|(_, &i)| i as usize >= expected)
        {
            return Err(MeshError::IndexOutOfRange {
                slot,
                index,
                vertex_count: expected,
            });
        }
        if let Some(vertex) = self.positions.iter().position(|p| !p.is_finite()) {
            return Err(MeshError::NonFinitePosition { vertex });
        }
        if let Some(normals) = &self.normals {
            if normals.len() != expected {
                return Err(MeshError::AttributeCountMismatch {
                    attribute: "normal",
                    count: normals.len(),
                    expected,
                });
            }
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != expected {
                return Err(MeshError::AttributeCountMismatch {
                    attribute: "uv",
                    count: uvs.len(),
                    expected,
                });
            }
        }
        Ok(())
    }

    /// Area-weighted vertex normals from the triangle list
    pub fn generate_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
            // Unnormalized cross product is twice the triangle area
            let face = (self.positions[b] - self.positions[a])
                .cross(self.positions[c] - self.positions[a]);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        normals.iter().map(|n| n.normalize_or_zero()).collect()
    }

    /// Create a unit cube centered at origin
    pub fn cube() -> Self {
        let faces = [
            // Front face
            (Vec3::Z, [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]]),
            // Back face
            (-Vec3::Z, [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]]),
            // Right face
            (Vec3::X, [[0.5, -0.5, 0.5], [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5]]),
            // Left face
            (-Vec3::X, [[-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5]]),
            // Top face
            (Vec3::Y, [[-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5]]),
            // Bottom face
            (-Vec3::Y, [[-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5]]),
        ];
        let corner_uvs = [
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];

        let mut data = MeshData::default();
        let (mut normals, mut uvs) = (Vec::new(), Vec::new());
        for (face, (normal, corners)) in faces.iter().enumerate() {
            for (corner, uv) in corners.iter().zip(corner_uvs) {
                data.positions.push(Vec3::from_array(*corner));
                normals.push(*normal);
                uvs.push(uv);
            }
            // Two triangles per face
            let base = face as u32 * 4;
            data.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        data.with_normals(normals).with_uvs(uvs)
    }

    /// Regular tetrahedron inscribed in the unit cube, flat shaded
    pub fn tetrahedron() -> Self {
        let corners = [
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
        ];
        let mut data = MeshData::default();
        let mut normals = Vec::new();
        for opposite in 0..4 {
            let mut face: Vec<Vec3> = (0..4).filter(|i| *i != opposite).map(|i| corners[i]).collect();
            let mut normal = (face[1] - face[0]).cross(face[2] - face[0]);
            // Wind counter-clockwise seen from outside
            if normal.dot(face[0] - corners[opposite]) < 0.0 {
                face.swap(1, 2);
                normal = -normal;
            }
            let base = data.positions.len() as u32;
            data.positions.extend(face);
            normals.extend([normal.normalize(); 3]);
            data.indices.extend_from_slice(&[base, base + 1, base + 2]);
        }
        data.with_normals(normals)
    }

    /// Create a UV sphere of radius 0.5
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let segment_angle = 2.0 * std::f32::consts::PI / segments as f32;
        let ring_angle = std::f32::consts::PI / rings as f32;

        let mut data = MeshData::default();
        let (mut normals, mut uvs) = (Vec::new(), Vec::new());
        for ring in 0..=rings {
            let phi = ring as f32 * ring_angle;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for segment in 0..=segments {
                // The seam column repeats the first one exactly
                let theta = (segment % segments) as f32 * segment_angle;
                let normal = Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());
                data.positions.push(if ring == 0 || ring == rings {
                    Vec3::new(0.0, y * 0.5, 0.0)
                } else {
                    normal * 0.5
                });
                normals.push(normal.normalize());
                uvs.push(Vec2::new(
                    segment as f32 / segments as f32,
                    ring as f32 / rings as f32,
                ));
            }
        }

        for ring in 0..rings {
            for segment in 0..segments {
                let current = ring * (segments + 1) + segment;
                let next = current + segments + 1;
                // Pole rows would produce zero-area triangles
                if ring != 0 {
                    data.indices.extend_from_slice(&[current, current + 1, next]);
                }
                if ring != rings - 1 {
                    data.indices.extend_from_slice(&[current + 1, next + 1, next]);
                }
            }
        }

        data.with_normals(normals).with_uvs(uvs)
    }

    /// Create a plane on the XZ axis facing +Y
    pub fn plane(width: f32, depth: f32, subdivisions: u32) -> Self {
        let subdivisions = subdivisions.max(1);
        let half_width = width / 2.0;
        let half_depth = depth / 2.0;
        let step_x = width / subdivisions as f32;
        let step_z = depth / subdivisions as f32;

        let mut data = MeshData::default();
        let mut uvs = Vec::new();
        for z in 0..=subdivisions {
            for x in 0..=subdivisions {
                data.positions.push(Vec3::new(
                    -half_width + x as f32 * step_x,
                    0.0,
                    -half_depth + z as f32 * step_z,
                ));
                uvs.push(Vec2::new(
                    x as f32 / subdivisions as f32,
                    z as f32 / subdivisions as f32,
                ));
            }
        }

        for z in 0..subdivisions {
            for x in 0..subdivisions {
                let current = z * (subdivisions + 1) + x;
                let next = current + subdivisions + 1;
                data.indices.extend_from_slice(&[
                    current,
                    next,
                    current + 1,
                    current + 1,
                    next,
                    next + 1,
                ]);
            }
        }

        let normals = vec![Vec3::Y; data.positions.len()];
        data.with_normals(normals).with_uvs(uvs)
    }

    /// Single triangle in the XZ plane facing +Y
    pub fn triangle() -> Self {
        MeshData::new(
            vec![
                Vec3::new(-0.5, 0.0, 0.5),
                Vec3::new(0.5, 0.0, 0.5),
                Vec3::new(0.0, 0.0, -0.5),
            ],
            vec![0, 1, 2],
        )
        .with_normals(vec![Vec3::Y; 3])
    }
}

/// Validated mesh ready for upload
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    adjacency: Option<AdjacencyBuffer>,
    draw_mode: DrawMode,
}

impl Mesh {
    /// Validate `data`, fill in missing normals and build adjacency when the
    /// mesh is drawn with adjacency.
    pub fn from_data(
        name: &str,
        data: MeshData,
        draw_mode: DrawMode,
        builder: &AdjacencyBuilder,
    ) -> MeshResult<Self> {
        data.validate()?;

        let normals = match &data.normals {
            Some(normals) => normals.clone(),
            None => {
                log::debug!("Generating normals for mesh '{}'", name);
                data.generate_normals()
            }
        };
        let adjacency = match draw_mode {
            DrawMode::Adjacency => Some(builder.build(&data.positions, &data.indices)?),
            DrawMode::Simple => None,
        };

        let vertices = data
            .positions
            .iter()
            .enumerate()
            .map(|(i, position)| {
                let uv = data.uvs.as_ref().map_or(Vec2::ZERO, |uvs| uvs[i]);
                Vertex::new(*position, normals[i], uv)
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            vertices,
            indices: data.indices,
            adjacency,
            draw_mode,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn adjacency(&self) -> Option<&AdjacencyBuffer> {
        self.adjacency.as_ref()
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    /// Calculate vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Calculate triangle count
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Only adjacency meshes carry the neighbor information extrusion needs
    pub fn can_cast_shadows(&self) -> bool {
        self.adjacency.is_some()
    }
}

/// Device buffers of a [`Mesh`]
#[derive(Debug, Clone, Copy)]
pub struct GpuMesh {
    vertex_buffer: BufferHandle,
    index_buffer: Option<BufferHandle>,
    count: u32,
    draw_mode: DrawMode,
}

impl GpuMesh {
    pub fn upload(device: &mut dyn GraphicsDevice, mesh: &Mesh) -> BackendResult<Self> {
        match mesh.adjacency() {
            Some(adjacency) => {
                let vertex_buffer = device.create_vertex_buffer(mesh.name(), mesh.vertices())?;
                let index_buffer =
                    match device.create_index_buffer(mesh.name(), adjacency.indices()) {
                        Ok(buffer) => buffer,
                        Err(err) => {
                            device.destroy_buffer(vertex_buffer);
                            return Err(err);
                        }
                    };
                Ok(Self {
                    vertex_buffer,
                    index_buffer: Some(index_buffer),
                    count: adjacency.indices().len() as u32,
                    draw_mode: DrawMode::Adjacency,
                })
            }
            None => {
                // Unrolled so the device can pull vertices in order
                let unrolled: Vec<Vertex> = mesh
                    .indices()
                    .iter()
                    .map(|&i| mesh.vertices()[i as usize])
                    .collect();
                let vertex_buffer = device.create_vertex_buffer(mesh.name(), &unrolled)?;
                Ok(Self {
                    vertex_buffer,
                    index_buffer: None,
                    count: unrolled.len() as u32,
                    draw_mode: DrawMode::Simple,
                })
            }
        }
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    /// Submit the mesh with the currently bound program and state
    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        match self.index_buffer {
            Some(indices) => device.draw_indexed(
                PrimitiveTopology::TriangleListWithAdjacency,
                self.vertex_buffer,
                indices,
                self.count,
            ),
            None => device.draw_arrays(PrimitiveTopology::TriangleList, self.vertex_buffer, self.count),
        }
    }

    pub fn destroy(&self, device: &mut dyn GraphicsDevice) {
        device.destroy_buffer(self.vertex_buffer);
        if let Some(indices) = self.index_buffer {
            device.destroy_buffer(indices);
        }
    }
}
