//! Reference implementations of the programmable stages
//!
//! The software device does not compile GLSL. It validates that every stage a
//! program kind needs has a source and then runs the matching built-in stages:
//! Blinn-Phong scene shading, and silhouette extrusion for shadow volumes.

use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::backend::types::{PrimitiveTopology, ProgramKind, UniformValue, Vertex};

/// Uniforms uploaded to a program, keyed by GLSL name
#[derive(Debug, Default, Clone)]
pub struct Uniforms {
    values: HashMap<String, UniformValue>,
}

impl Uniforms {
    pub fn set(&mut self, name: &str, value: UniformValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    fn mat4(&self, name: &str) -> Mat4 {
        self.get(name)
            .and_then(UniformValue::as_mat4)
            .unwrap_or(Mat4::IDENTITY)
    }

    fn vec3(&self, name: &str) -> Vec3 {
        self.get(name).and_then(UniformValue::as_vec3).unwrap_or(Vec3::ZERO)
    }

    fn vec4(&self, name: &str) -> Vec4 {
        self.get(name).and_then(UniformValue::as_vec4).unwrap_or(Vec4::ZERO)
    }

    fn int(&self, name: &str) -> i32 {
        self.get(name).and_then(UniformValue::as_int).unwrap_or(0)
    }

    fn float(&self, name: &str) -> f32 {
        self.get(name).and_then(UniformValue::as_float).unwrap_or(0.0)
    }

    fn flag(&self, name: &str) -> bool {
        self.int(name) != 0
    }
}

/// Attributes interpolated across a primitive
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Varyings {
    pub world_position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Varyings {
    pub fn lerp(&self, other: &Varyings, t: f32) -> Varyings {
        Varyings {
            world_position: self.world_position.lerp(other.world_position, t),
            normal: self.normal.lerp(other.normal, t),
            uv: self.uv.lerp(other.uv, t),
        }
    }

    pub fn blend(weights: [f32; 3], values: [&Varyings; 3]) -> Varyings {
        let mut out = Varyings::default();
        for (w, v) in weights.iter().zip(values) {
            out.world_position += v.world_position * *w;
            out.normal += v.normal * *w;
            out.uv += v.uv * *w;
        }
        out
    }
}

/// Vertex in clip space, ready for clipping and rasterization
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipVertex {
    pub position: Vec4,
    pub varyings: Varyings,
}

/// Output of the vertex stage
#[derive(Debug, Clone, Copy)]
pub struct StageVertex {
    /// Clip space for scene programs, eye space for shadow-volume programs
    pub position: Vec4,
    pub varyings: Varyings,
}

/// A linked program
#[derive(Debug, Clone)]
pub struct Program {
    pub label: String,
    pub kind: ProgramKind,
}

impl Program {
    /// Resolve the uniforms once per draw call
    pub fn bind(&self, uniforms: &Uniforms) -> BoundProgram {
        match self.kind {
            ProgramKind::Scene => BoundProgram::Scene(SceneStages::from_uniforms(uniforms)),
            ProgramKind::ShadowVolume => {
                BoundProgram::ShadowVolume(VolumeStages::from_uniforms(uniforms))
            }
        }
    }
}

/// Program with its uniforms resolved for one draw call
pub enum BoundProgram {
    Scene(SceneStages),
    ShadowVolume(VolumeStages),
}

impl BoundProgram {
    pub fn shade_vertex(&self, vertex: &Vertex) -> StageVertex {
        match self {
            BoundProgram::Scene(stages) => stages.vertex(vertex),
            BoundProgram::ShadowVolume(stages) => stages.vertex(vertex),
        }
    }

    /// Primitive assembly plus the geometry stage, if any
    pub fn assemble(
        &self,
        topology: PrimitiveTopology,
        primitive: &[StageVertex],
        out: &mut Vec<[ClipVertex; 3]>,
    ) {
        match self {
            BoundProgram::Scene(_) => {
                // Without a geometry stage adjacency primitives draw their even slots
                let corners = match topology {
                    PrimitiveTopology::TriangleList => [0, 1, 2],
                    PrimitiveTopology::TriangleListWithAdjacency => [0, 2, 4],
                };
                out.push(corners.map(|i| ClipVertex {
                    position: primitive[i].position,
                    varyings: primitive[i].varyings,
                }));
            }
            BoundProgram::ShadowVolume(stages) => match topology {
                PrimitiveTopology::TriangleListWithAdjacency => {
                    let eye: [Vec4; 6] = std::array::from_fn(|i| primitive[i].position);
                    stages.extrude(&eye, out);
                }
                PrimitiveTopology::TriangleList => {
                    log::trace!("Shadow volume stage ignores primitives without adjacency");
                }
            },
        }
    }

    pub fn shade_fragment(&self, varyings: &Varyings) -> [f32; 4] {
        match self {
            BoundProgram::Scene(stages) => stages.fragment(varyings),
            BoundProgram::ShadowVolume(_) => [0.0, 0.0, 0.0, 1.0],
        }
    }
}

struct LightParams {
    position: Vec4,
    ambient: Vec3,
    diffuse: Vec3,
    specular: Vec3,
}

struct MaterialParams {
    emission: Vec3,
    ambient: Vec3,
    diffuse: Vec4,
    specular: Vec3,
    exponent: f32,
}

/// Vertex and fragment stages of the scene program
pub struct SceneStages {
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    normal_matrix: Mat3,
    camera_position: Vec3,
    material: MaterialParams,
    light: Option<LightParams>,
}

impl SceneStages {
    fn from_uniforms(uniforms: &Uniforms) -> Self {
        let model = uniforms.mat4("ModelMatrix");
        let view = uniforms.mat4("ViewMatrix");
        let index = uniforms.int("LightIndex");
        let light_count = uniforms.int("LightNum");
        let prefix = format!("Lights[{}].", index);
        let light = (index >= 0
            && index < light_count
            && uniforms.flag(&format!("{}LightSwitch", prefix)))
        .then(|| LightParams {
            position: uniforms.vec4(&format!("{}Position", prefix)),
            ambient: uniforms.vec3(&format!("{}AmbientColor", prefix)),
            diffuse: uniforms.vec3(&format!("{}DiffuseColor", prefix)),
            specular: uniforms.vec3(&format!("{}SpecularColor", prefix)),
        });

        Self {
            model,
            view,
            projection: uniforms.mat4("ProjectionMatrix"),
            normal_matrix: Mat3::from_mat4(model).inverse().transpose(),
            camera_position: view.inverse().w_axis.truncate(),
            material: MaterialParams {
                emission: uniforms.vec3("Material.EmissionColor"),
                ambient: uniforms.vec3("Material.AmbientColor"),
                diffuse: uniforms.vec4("Material.DiffuseColor"),
                specular: uniforms.vec3("Material.SpecularColor"),
                exponent: uniforms.float("Material.SpecularExponent").max(1.0),
            },
            light,
        }
    }

    fn vertex(&self, vertex: &Vertex) -> StageVertex {
        let world = self.model * vertex.position.extend(1.0);
        // Same operation order as the volume program, so caps match bit for bit
        let eye = self.view * world;
        StageVertex {
            position: self.projection * eye,
            varyings: Varyings {
                world_position: world.truncate(),
                normal: self.normal_matrix * vertex.normal,
                uv: vertex.uv,
            },
        }
    }

    fn fragment(&self, varyings: &Varyings) -> [f32; 4] {
        let material = &self.material;
        let mut color = material.emission;

        if let Some(light) = &self.light {
            let normal = varyings.normal.normalize_or_zero();
            let to_light = if light.position.w == 0.0 {
                light.position.truncate().normalize_or_zero()
            } else {
                (light.position.truncate() / light.position.w - varyings.world_position)
                    .normalize_or_zero()
            };
            let to_eye = (self.camera_position - varyings.world_position).normalize_or_zero();
            let half = (to_light + to_eye).normalize_or_zero();

            let diffuse = normal.dot(to_light).max(0.0);
            let specular = if diffuse > 0.0 {
                normal.dot(half).max(0.0).powf(material.exponent)
            } else {
                0.0
            };

            color += light.ambient * material.ambient
                + light.diffuse * material.diffuse.truncate() * diffuse
                + light.specular * material.specular * specular;
        }

        let color = color.clamp(Vec3::ZERO, Vec3::ONE);
        [color.x, color.y, color.z, material.diffuse.w.clamp(0.0, 1.0)]
    }
}

/// Vertex and geometry stages of the shadow-volume program
pub struct VolumeStages {
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    /// Homogeneous light position in eye space; w = 0 is a direction
    light: Vec4,
    robust: bool,
    zfail: bool,
}

impl VolumeStages {
    fn from_uniforms(uniforms: &Uniforms) -> Self {
        Self {
            model: uniforms.mat4("ModelMatrix"),
            view: uniforms.mat4("ViewMatrix"),
            projection: uniforms.mat4("ProjectionMatrix"),
            light: uniforms.vec4("LightPosition"),
            robust: uniforms.flag("Robust"),
            zfail: uniforms.flag("ZFail"),
        }
    }

    fn vertex(&self, vertex: &Vertex) -> StageVertex {
        let world = self.model * vertex.position.extend(1.0);
        StageVertex {
            position: self.view * world,
            varyings: Varyings::default(),
        }
    }

    /// Vector from `point` toward the light, scaled by the light's w
    fn to_light(&self, point: Vec3) -> Vec3 {
        self.light.truncate() - point * self.light.w
    }

    /// Whether the triangle `a b c` faces the light.
    ///
    /// The robust test accepts a triangle when any corner sees the light on the
    /// front side. Its result does not depend on which corner comes first, so
    /// two triangles sharing an edge always agree on each other's facing.
    fn faces_light(&self, a: Vec3, b: Vec3, c: Vec3) -> bool {
        let corner = |p: Vec3, q: Vec3, r: Vec3| (q - p).cross(r - p).dot(self.to_light(p)) > 0.0;
        if self.robust {
            corner(a, b, c) || corner(b, c, a) || corner(c, a, b)
        } else {
            corner(a, b, c)
        }
    }

    fn project(&self, point: Vec4) -> ClipVertex {
        ClipVertex {
            position: self.projection * point,
            varyings: Varyings::default(),
        }
    }

    /// Project `point` pushed away from the light onto the plane at infinity.
    /// A directional light pushes every point along the same direction.
    fn project_infinite(&self, point: Vec4) -> ClipVertex {
        self.project((-self.to_light(point.truncate())).extend(0.0))
    }

    fn extrude(&self, primitive: &[Vec4; 6], out: &mut Vec<[ClipVertex; 3]>) {
        let mut corners = [primitive[0], primitive[2], primitive[4]];
        let mut apexes = [primitive[1], primitive[3], primitive[5]];
        let p = corners.map(|v| v.truncate());

        if (p[1] - p[0]).cross(p[2] - p[0]) == Vec3::ZERO {
            return;
        }

        // A boundary edge carries the triangle's own opposite corner as its apex
        let mut open = [
            apexes[0] == corners[2],
            apexes[1] == corners[0],
            apexes[2] == corners[1],
        ];
        let lit = self.faces_light(p[0], p[1], p[2]);

        if !lit {
            if !(self.robust && open.iter().any(|b| *b)) {
                return;
            }
            // Open surfaces cast from both sides: reverse the winding
            corners = [corners[0], corners[2], corners[1]];
            apexes = [apexes[2], apexes[1], apexes[0]];
            open = [open[2], open[1], open[0]];
        }

        for i in 0..3 {
            let a = corners[i];
            let b = corners[(i + 1) % 3];
            let neighbor_lit =
                self.faces_light(b.truncate(), a.truncate(), apexes[i].truncate());
            let silhouette = (self.robust && open[i]) || neighbor_lit != lit;
            if silhouette {
                let (a_near, b_near) = (self.project(a), self.project(b));
                let (a_far, b_far) = (self.project_infinite(a), self.project_infinite(b));
                out.push([a_near, a_far, b_near]);
                out.push([b_near, a_far, b_far]);
            }
        }

        if self.zfail {
            out.push(corners.map(|v| self.project(v)));
            out.push([
                self.project_infinite(corners[0]),
                self.project_infinite(corners[2]),
                self.project_infinite(corners[1]),
            ]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(robust: bool, zfail: bool) -> VolumeStages {
        lit_by(Vec4::new(0.0, 10.0, 0.0, 1.0), robust, zfail)
    }

    fn lit_by(light: Vec4, robust: bool, zfail: bool) -> VolumeStages {
        VolumeStages {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            light,
            robust,
            zfail,
        }
    }

    /// Lone triangle facing up, each apex falling back to the opposite corner
    fn lone_triangle(up: bool) -> [Vec4; 6] {
        let a = Vec4::new(-1.0, 0.0, 1.0, 1.0);
        let (b, c) = (Vec4::new(1.0, 0.0, 1.0, 1.0), Vec4::new(0.0, 0.0, -1.0, 1.0));
        let (b, c) = if up { (b, c) } else { (c, b) };
        [a, c, b, a, c, b]
    }

    #[test]
    fn lit_open_triangle_extrudes_every_edge() {
        let mut out = Vec::new();
        volume(false, false).extrude(&lone_triangle(true), &mut out);
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn zfail_adds_both_caps() {
        let mut out = Vec::new();
        volume(false, true).extrude(&lone_triangle(true), &mut out);
        assert_eq!(out.len(), 8);
        assert!(out[7].iter().all(|v| v.position.w == 0.0));
    }

    #[test]
    fn back_facing_open_triangle_casts_only_in_robust_mode() {
        let mut out = Vec::new();
        volume(false, false).extrude(&lone_triangle(false), &mut out);
        assert!(out.is_empty());

        volume(true, false).extrude(&lone_triangle(false), &mut out);
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn directional_light_extrudes_straight_away_from_itself() {
        let mut out = Vec::new();
        let sun = lit_by(Vec4::new(0.0, 1.0, 0.0, 0.0), false, true);
        sun.extrude(&lone_triangle(true), &mut out);
        assert_eq!(out.len(), 8);
        for far in &out[7] {
            assert_eq!(far.position, Vec4::new(0.0, -1.0, 0.0, 0.0));
        }
    }

    #[test]
    fn point_light_extrudes_along_the_ray_through_each_corner() {
        let mut out = Vec::new();
        // w = 2 names the same light as (0, 10, 0, 1)
        let lamp = lit_by(Vec4::new(0.0, 20.0, 0.0, 2.0), false, true);
        lamp.extrude(&lone_triangle(true), &mut out);
        let corner = Vec3::new(-1.0, 0.0, 1.0);
        let ray = out[7][0].position.truncate().normalize();
        assert!((ray - (corner - Vec3::new(0.0, 10.0, 0.0)).normalize()).length() < 1e-6);
    }

    #[test]
    fn degenerate_triangle_emits_nothing() {
        let p = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let mut out = Vec::new();
        volume(true, true).extrude(&[p; 6], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn unset_light_index_renders_emission_only() {
        let mut uniforms = Uniforms::default();
        uniforms.set("Material.EmissionColor", Vec3::new(0.2, 0.0, 0.0).into());
        uniforms.set("Material.DiffuseColor", Vec4::ONE.into());
        let stages = SceneStages::from_uniforms(&uniforms);
        let color = stages.fragment(&Varyings::default());
        assert_eq!(color, [0.2, 0.0, 0.0, 1.0]);
    }
}
