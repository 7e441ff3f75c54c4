//! Clipping, rasterization and per-fragment tests
//!
//! Triangles are clipped in homogeneous space, snapped to a fixed-point grid
//! with 8 subpixel bits and scanned with integer edge functions. Pixels on a
//! shared edge belong to exactly one of the two triangles (top-left rule), so
//! a closed surface covers every pixel an equal number of times from the
//! front and from the back.

use std::cmp::Ordering;

use glam::Vec4;

use super::framebuffer::{encode_color, Framebuffer};
use super::program::{BoundProgram, ClipVertex, Varyings};
use crate::backend::types::{Face, FrontFace, PipelineState, StencilOperation};

const SUBPIXEL_BITS: u32 = 8;
const SUBPIXEL_SCALE: f64 = (1 << SUBPIXEL_BITS) as f64;
const HALF_PIXEL: i64 = 1 << (SUBPIXEL_BITS - 1);

/// Smallest clip-space w kept by the clipper
const W_EPSILON: f32 = 1e-6;

/// Viewport rectangle in pixels, origin at the bottom left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clip plane `dot(plane, position) >= bias`
struct ClipPlane {
    plane: Vec4,
    bias: f32,
}

const GUARD_PLANES: [ClipPlane; 5] = [
    ClipPlane { plane: Vec4::new(0.0, 0.0, 0.0, 1.0), bias: W_EPSILON },
    ClipPlane { plane: Vec4::new(1.0, 0.0, 0.0, 1.0), bias: 0.0 },
    ClipPlane { plane: Vec4::new(-1.0, 0.0, 0.0, 1.0), bias: 0.0 },
    ClipPlane { plane: Vec4::new(0.0, 1.0, 0.0, 1.0), bias: 0.0 },
    ClipPlane { plane: Vec4::new(0.0, -1.0, 0.0, 1.0), bias: 0.0 },
];

const DEPTH_PLANES: [ClipPlane; 2] = [
    ClipPlane { plane: Vec4::new(0.0, 0.0, 1.0, 1.0), bias: 0.0 },
    ClipPlane { plane: Vec4::new(0.0, 0.0, -1.0, 1.0), bias: 0.0 },
];

impl ClipPlane {
    fn distance(&self, v: &ClipVertex) -> f32 {
        self.plane.dot(v.position) - self.bias
    }
}

/// Total order on clip positions, so an edge is always split from the same end
fn canonical_order(a: &ClipVertex, b: &ClipVertex) -> Ordering {
    let (p, q) = (a.position.to_array(), b.position.to_array());
    p.iter()
        .zip(q.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn intersect(a: &ClipVertex, da: f32, b: &ClipVertex, db: f32) -> ClipVertex {
    let (a, da, b, db) = match canonical_order(a, b) {
        Ordering::Greater => (b, db, a, da),
        _ => (a, da, b, db),
    };
    let t = da / (da - db);
    ClipVertex {
        position: a.position.lerp(b.position, t),
        varyings: a.varyings.lerp(&b.varyings, t),
    }
}

fn clip_against(polygon: Vec<ClipVertex>, plane: &ClipPlane) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(polygon.len() + 1);
    for (i, current) in polygon.iter().enumerate() {
        let next = &polygon[(i + 1) % polygon.len()];
        let (dc, dn) = (plane.distance(current), plane.distance(next));
        if dc >= 0.0 {
            out.push(*current);
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            out.push(intersect(current, dc, next, dn));
        }
    }
    out
}

/// Clip a triangle to the view volume. Near and far planes are skipped under
/// depth clamping.
pub fn clip_triangle(triangle: &[ClipVertex; 3], depth_clamp: bool) -> Vec<ClipVertex> {
    let mut polygon = triangle.to_vec();
    let depth_planes: &[ClipPlane] = if depth_clamp { &[] } else { &DEPTH_PLANES };
    for plane in GUARD_PLANES.iter().chain(depth_planes) {
        if polygon.len() < 3 {
            break;
        }
        polygon = clip_against(polygon, plane);
    }
    polygon
}

#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: i64,
    y: i64,
    z: f64,
    inv_w: f32,
    varyings: Varyings,
}

impl ScreenVertex {
    fn new(vertex: &ClipVertex, viewport: &Viewport) -> Self {
        let inv_w = 1.0 / vertex.position.w;
        let ndc = vertex.position.truncate() * inv_w;
        let sx = (ndc.x as f64 * 0.5 + 0.5) * viewport.width as f64 + viewport.x as f64;
        let sy = (ndc.y as f64 * 0.5 + 0.5) * viewport.height as f64 + viewport.y as f64;
        Self {
            x: (sx * SUBPIXEL_SCALE).round() as i64,
            y: (sy * SUBPIXEL_SCALE).round() as i64,
            z: ndc.z as f64 * 0.5 + 0.5,
            inv_w,
            varyings: vertex.varyings,
        }
    }
}

fn orient(a: &ScreenVertex, b: &ScreenVertex, px: i64, py: i64) -> i64 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

fn signed_area(a: &ScreenVertex, b: &ScreenVertex, c: &ScreenVertex) -> i64 {
    orient(a, b, c.x, c.y)
}

/// Tie rule for samples exactly on the edge `a -> b` of a counter-clockwise
/// triangle. Opposite directions never agree.
fn owns_edge(a: &ScreenVertex, b: &ScreenVertex) -> bool {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    dy < 0 || (dy == 0 && dx > 0)
}

/// Window depth from the vertices in a fixed order, independent of winding
struct DepthPlane {
    vertices: [ScreenVertex; 3],
    area: f64,
}

impl DepthPlane {
    fn new(triangle: [&ScreenVertex; 3]) -> Self {
        let mut vertices = triangle.map(|v| *v);
        vertices.sort_by(|a, b| (a.x, a.y).cmp(&(b.x, b.y)));
        let area = signed_area(&vertices[0], &vertices[1], &vertices[2]) as f64;
        Self { vertices, area }
    }

    fn depth(&self, px: i64, py: i64) -> f64 {
        let [a, b, c] = &self.vertices;
        let wa = orient(b, c, px, py) as f64;
        let wb = orient(c, a, px, py) as f64;
        let wc = orient(a, b, px, py) as f64;
        (wa * a.z + wb * b.z + wc * c.z) / self.area
    }
}

/// Per-draw raster state
pub struct RasterJob<'a> {
    pub framebuffer: &'a mut Framebuffer,
    pub viewport: Viewport,
    pub state: &'a PipelineState,
    pub program: &'a BoundProgram,
}

impl RasterJob<'_> {
    /// Clip, rasterize and shade one triangle. Returns the number of
    /// fragments that passed every test.
    pub fn draw_triangle(&mut self, triangle: &[ClipVertex; 3]) -> usize {
        let polygon = clip_triangle(triangle, self.state.depth_clamp);
        if polygon.len() < 3 {
            return 0;
        }
        let screen: Vec<ScreenVertex> = polygon
            .iter()
            .map(|v| ScreenVertex::new(v, &self.viewport))
            .collect();

        let area: i64 = (1..screen.len() - 1)
            .map(|i| signed_area(&screen[0], &screen[i], &screen[i + 1]))
            .sum();
        if area == 0 {
            return 0;
        }
        let ccw = area > 0;
        let face = match (ccw, self.state.front_face) {
            (true, FrontFace::Ccw) | (false, FrontFace::Cw) => Face::Front,
            _ => Face::Back,
        };
        if self.state.culls(face) {
            return 0;
        }

        let mut passed = 0;
        for i in 1..screen.len() - 1 {
            let (a, b, c) = (&screen[0], &screen[i], &screen[i + 1]);
            let fan_area = signed_area(a, b, c);
            // Snapping can fold a sliver of the fan over; it covers nothing new
            if fan_area == 0 || (fan_area > 0) != ccw {
                continue;
            }
            let (b, c) = if ccw { (b, c) } else { (c, b) };
            passed += self.scan(a, b, c, fan_area.abs(), face);
        }
        passed
    }

    fn scan(
        &mut self,
        a: &ScreenVertex,
        b: &ScreenVertex,
        c: &ScreenVertex,
        area: i64,
        face: Face,
    ) -> usize {
        let fb_width = self.framebuffer.width() as i64;
        let fb_height = self.framebuffer.height() as i64;
        let vp = self.viewport;
        let x_lo = (vp.x as i64).max(0);
        let y_lo = (vp.y as i64).max(0);
        let x_hi = ((vp.x + vp.width) as i64).min(fb_width) - 1;
        let y_hi = ((vp.y + vp.height) as i64).min(fb_height) - 1;

        let min_x = (a.x.min(b.x).min(c.x) >> SUBPIXEL_BITS).max(x_lo);
        let max_x = (a.x.max(b.x).max(c.x) >> SUBPIXEL_BITS).min(x_hi);
        let min_y = (a.y.min(b.y).min(c.y) >> SUBPIXEL_BITS).max(y_lo);
        let max_y = (a.y.max(b.y).max(c.y) >> SUBPIXEL_BITS).min(y_hi);

        let owns = [owns_edge(b, c), owns_edge(c, a), owns_edge(a, b)];
        let plane = DepthPlane::new([a, b, c]);
        let state = *self.state;
        let face_ops = *state.stencil_face(face);
        let mut passed = 0;

        for py in min_y..=max_y {
            let sy = (py << SUBPIXEL_BITS) + HALF_PIXEL;
            for px in min_x..=max_x {
                let sx = (px << SUBPIXEL_BITS) + HALF_PIXEL;
                let weights = [orient(b, c, sx, sy), orient(c, a, sx, sy), orient(a, b, sx, sy)];
                let inside = weights
                    .iter()
                    .zip(owns)
                    .all(|(w, own)| *w > 0 || (*w == 0 && own));
                if !inside {
                    continue;
                }

                let idx = self.framebuffer.index(px as u32, py as u32);

                if state.stencil_test {
                    let stored = self.framebuffer.stencil[idx];
                    if !state.stencil_function.test(stored) {
                        self.update_stencil(idx, face_ops.fail_op);
                        continue;
                    }
                }

                let mut z = plane.depth(sx, sy);
                if state.depth_clamp {
                    z = z.clamp(0.0, 1.0);
                }
                let z = z as f32;

                if state.depth_test && !state.depth_compare.test(z, self.framebuffer.depth[idx]) {
                    if state.stencil_test {
                        self.update_stencil(idx, face_ops.depth_fail_op);
                    }
                    continue;
                }

                if state.stencil_test {
                    self.update_stencil(idx, face_ops.pass_op);
                }
                if state.depth_test && state.depth_write {
                    self.framebuffer.depth[idx] = z;
                }
                if state.color_write {
                    let varyings = perspective_varyings(weights, area, [a, b, c]);
                    let color = self.program.shade_fragment(&varyings);
                    self.framebuffer.color[idx] = encode_color(color);
                }
                passed += 1;
            }
        }
        passed
    }

    fn update_stencil(&mut self, idx: usize, op: StencilOperation) {
        let mask = self.state.stencil_write_mask;
        let old = self.framebuffer.stencil[idx];
        let new = op.apply(old, self.state.stencil_function.reference);
        self.framebuffer.stencil[idx] = (old & !mask) | (new & mask);
    }
}

fn perspective_varyings(weights: [i64; 3], area: i64, vertices: [&ScreenVertex; 3]) -> Varyings {
    let mut corrected = [0.0f32; 3];
    for i in 0..3 {
        corrected[i] = (weights[i] as f64 / area as f64) as f32 * vertices[i].inv_w;
    }
    let sum: f32 = corrected.iter().sum();
    if sum > 0.0 {
        corrected.iter_mut().for_each(|w| *w /= sum);
    }
    Varyings::blend(corrected, vertices.map(|v| &v.varyings))
}
