//! Triangle adjacency construction
//!
//! Converts a plain triangle list into the six-indices-per-triangle layout
//! consumed by primitives with adjacency:
//!
//! ```text
//! v0, opp(e01), v1, opp(e12), v2, opp(e20)
//! ```
//!
//! `opp(e)` is the vertex of the neighboring triangle across edge `e` that is
//! not on the edge. Vertices are welded by position first so that meshes with
//! split normals or UV seams still find their neighbors.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use glam::Vec3;

use super::mesh::{MeshError, MeshResult};

/// Position used as a weld key. Ordered by x, then y, then z.
#[derive(Debug, Clone, Copy)]
struct WeldKey([f32; 3]);

impl WeldKey {
    fn new(position: Vec3, step: Option<f32>) -> Self {
        let snapped = match step {
            Some(step) => (position / step).round(),
            None => position,
        };
        // Adding zero turns -0.0 into 0.0
        Self(snapped.to_array().map(|c| c + 0.0))
    }
}

impl Ord for WeldKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for WeldKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for WeldKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for WeldKey {}

/// Triangles found on the far side of a directed edge
#[derive(Debug, Clone, Copy)]
enum EdgeUse {
    /// One triangle, with the original index of its opposite vertex
    Single(u32),
    Shared,
}

/// Counters collected while building adjacency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjacencyStats {
    pub triangles: usize,
    /// Distinct positions after welding
    pub welded_vertices: usize,
    /// Edges without a neighbor
    pub boundary_edges: usize,
    /// Edges with more than one candidate neighbor
    pub non_manifold_edges: usize,
}

impl AdjacencyStats {
    pub fn is_closed_manifold(&self) -> bool {
        self.boundary_edges == 0 && self.non_manifold_edges == 0
    }
}

/// Index list for triangle-list-with-adjacency draws
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyBuffer {
    indices: Vec<u32>,
    stats: AdjacencyStats,
}

impl AdjacencyBuffer {
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn stats(&self) -> &AdjacencyStats {
        &self.stats
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// The six entries of one triangle
    pub fn triangle(&self, index: usize) -> Option<&[u32]> {
        self.indices.get(index * 6..index * 6 + 6)
    }

    pub fn into_indices(self) -> Vec<u32> {
        self.indices
    }
}

/// Builds adjacency buffers from indexed triangle lists
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacencyBuilder {
    weld_tolerance: Option<f32>,
}

impl AdjacencyBuilder {
    /// Builder with exact positional welding
    pub fn new() -> Self {
        Self::default()
    }

    /// Snap positions to a grid of `step` before welding. Non-positive or
    /// non-finite steps keep exact welding.
    pub fn with_weld_tolerance(mut self, step: f32) -> Self {
        self.weld_tolerance = (step.is_finite() && step > 0.0).then_some(step);
        self
    }

    pub fn weld_tolerance(&self) -> Option<f32> {
        self.weld_tolerance
    }

    pub fn build(&self, positions: &[Vec3], indices: &[u32]) -> MeshResult<AdjacencyBuffer> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::IndexCountNotMultipleOfThree(indices.len()));
        }
        if let Some((slot, &index)) = indices
            .iter()
            .enumerate()
            .find(|(_, &i)| i as usize >= positions.len())
        {
            return Err(MeshError::IndexOutOfRange {
                slot,
                index,
                vertex_count: positions.len(),
            });
        }
        if let Some(vertex) = positions.iter().position(|p| !p.is_finite()) {
            return Err(MeshError::NonFinitePosition { vertex });
        }

        let canonical = self.weld(positions);
        let welded_vertices = canonical.iter().max().map_or(0, |m| *m as usize + 1);

        // Directed edge on canonical indices -> far side
        let mut edges: HashMap<(u32, u32), EdgeUse> = HashMap::with_capacity(indices.len());
        for tri in indices.chunks_exact(3) {
            for k in 0..3 {
                let (a, b, opposite) = (tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]);
                let key = (canonical[a as usize], canonical[b as usize]);
                edges
                    .entry(key)
                    .and_modify(|e| *e = EdgeUse::Shared)
                    .or_insert(EdgeUse::Single(opposite));
            }
        }

        let mut stats = AdjacencyStats {
            triangles: indices.len() / 3,
            welded_vertices,
            ..Default::default()
        };
        let mut out = Vec::with_capacity(indices.len() * 2);
        for tri in indices.chunks_exact(3) {
            for k in 0..3 {
                let (a, b, opposite) = (tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]);
                let reversed = (canonical[b as usize], canonical[a as usize]);
                let apex = match edges.get(&reversed) {
                    Some(EdgeUse::Single(apex)) => *apex,
                    Some(EdgeUse::Shared) => {
                        stats.non_manifold_edges += 1;
                        opposite
                    }
                    None => {
                        stats.boundary_edges += 1;
                        opposite
                    }
                };
                out.push(a);
                out.push(apex);
            }
        }

        log::debug!(
            "Built adjacency: {} triangles, {} welded vertices, {} boundary edges, {} non-manifold edges",
            stats.triangles,
            stats.welded_vertices,
            stats.boundary_edges,
            stats.non_manifold_edges
        );

        Ok(AdjacencyBuffer {
            indices: out,
            stats,
        })
    }

    /// Map every vertex to the ordinal of its position class
    fn weld(&self, positions: &[Vec3]) -> Vec<u32> {
        let mut classes: BTreeMap<WeldKey, u32> = BTreeMap::new();
        positions
            .iter()
            .map(|p| {
                let next = classes.len() as u32;
                *classes
                    .entry(WeldKey::new(*p, self.weld_tolerance))
                    .or_insert(next)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::MeshData;

    #[test]
    fn lone_triangle_falls_back_to_own_corners() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Z];
        let adjacency = AdjacencyBuilder::new().build(&positions, &[0, 1, 2]).unwrap();
        assert_eq!(adjacency.indices(), &[0, 2, 1, 0, 2, 1]);
        assert_eq!(adjacency.stats().boundary_edges, 3);
    }

    #[test]
    fn two_triangles_see_each_other() {
        // Quad split along 0-2
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let adjacency = AdjacencyBuilder::new()
            .build(&positions, &[0, 1, 2, 0, 2, 3])
            .unwrap();
        assert_eq!(adjacency.triangle(0).unwrap(), &[0, 2, 1, 0, 2, 3]);
        assert_eq!(adjacency.triangle(1).unwrap(), &[0, 1, 2, 0, 3, 2]);
        assert_eq!(adjacency.stats().boundary_edges, 4);
    }

    #[test]
    fn split_cube_welds_into_closed_manifold() {
        let cube = MeshData::cube();
        let adjacency = AdjacencyBuilder::new()
            .build(&cube.positions, &cube.indices)
            .unwrap();
        assert_eq!(adjacency.indices().len(), cube.indices.len() * 2);
        assert_eq!(adjacency.stats().welded_vertices, 8);
        assert!(adjacency.stats().is_closed_manifold());
    }

    #[test]
    fn negative_zero_welds_with_zero() {
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-0.0, 0.0, -0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let adjacency = AdjacencyBuilder::new()
            .build(&positions, &[0, 1, 2, 3, 4, 5])
            .unwrap();
        assert_eq!(adjacency.stats().welded_vertices, 4);
        // Edge 2 -> 0 of the first triangle meets edge 3 -> 4 of the second
        assert_eq!(adjacency.triangle(0).unwrap()[5], 5);
        assert_eq!(adjacency.triangle(1).unwrap()[1], 1);
    }

    #[test]
    fn weld_tolerance_joins_nearly_equal_positions() {
        let positions = [
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::new(1.0 + 1e-6, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0 - 1e-6, 0.0),
        ];
        let indices = [0, 1, 2, 3, 4, 5];

        let exact = AdjacencyBuilder::new().build(&positions, &indices).unwrap();
        assert_eq!(exact.stats().boundary_edges, 6);

        let welded = AdjacencyBuilder::new()
            .with_weld_tolerance(1e-3)
            .build(&positions, &indices)
            .unwrap();
        assert_eq!(welded.stats().boundary_edges, 4);
        assert_eq!(welded.triangle(0).unwrap()[3], 4);
    }

    #[test]
    fn fan_around_one_edge_is_non_manifold() {
        let positions = [
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
        ];
        // Three triangles on edge 0-1, two of them reversed
        let indices = [0, 1, 2, 1, 0, 3, 1, 0, 4];
        let adjacency = AdjacencyBuilder::new().build(&positions, &indices).unwrap();
        assert_eq!(adjacency.triangle(0).unwrap()[1], 2);
        assert_eq!(adjacency.stats().non_manifold_edges, 1);
        // Each reversed triangle sees the single forward one
        assert_eq!(adjacency.triangle(1).unwrap()[1], 2);
        assert_eq!(adjacency.triangle(2).unwrap()[1], 2);
    }

    #[test]
    fn malformed_input_is_rejected() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let builder = AdjacencyBuilder::new();
        assert_eq!(
            builder.build(&positions, &[0, 1]),
            Err(MeshError::IndexCountNotMultipleOfThree(2))
        );
        assert!(matches!(
            builder.build(&positions, &[0, 1, 3]),
            Err(MeshError::IndexOutOfRange { slot: 2, index: 3, .. })
        ));
        assert_eq!(
            builder.build(&[Vec3::ZERO, Vec3::X, Vec3::splat(f32::NAN)], &[0, 1, 2]),
            Err(MeshError::NonFinitePosition { vertex: 2 })
        );
    }
}
