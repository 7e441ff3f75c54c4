//! Common types shared between devices

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Standard vertex with position, normal and texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    /// Six indices per triangle: own vertices at even slots, neighbor apexes at odd slots
    TriangleListWithAdjacency,
}

impl PrimitiveTopology {
    pub fn vertices_per_primitive(&self) -> usize {
        match self {
            PrimitiveTopology::TriangleList => 3,
            PrimitiveTopology::TriangleListWithAdjacency => 6,
        }
    }
}

/// Front face winding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

/// Cull mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

/// Triangle facing after rasterization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
}

/// Compare function for depth/stencil
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl CompareFunction {
    /// Evaluate `incoming <op> stored`
    pub fn test<T: PartialOrd>(&self, incoming: T, stored: T) -> bool {
        match self {
            CompareFunction::Never => false,
            CompareFunction::Less => incoming < stored,
            CompareFunction::Equal => incoming == stored,
            CompareFunction::LessEqual => incoming <= stored,
            CompareFunction::Greater => incoming > stored,
            CompareFunction::NotEqual => incoming != stored,
            CompareFunction::GreaterEqual => incoming >= stored,
            CompareFunction::Always => true,
        }
    }
}

/// Stencil buffer update operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOperation {
    Keep,
    Zero,
    Replace,
    Invert,
    IncrementClamp,
    DecrementClamp,
    IncrementWrap,
    DecrementWrap,
}

impl StencilOperation {
    pub fn apply(&self, value: u8, reference: u8) -> u8 {
        match self {
            StencilOperation::Keep => value,
            StencilOperation::Zero => 0,
            StencilOperation::Replace => reference,
            StencilOperation::Invert => !value,
            StencilOperation::IncrementClamp => value.saturating_add(1),
            StencilOperation::DecrementClamp => value.saturating_sub(1),
            StencilOperation::IncrementWrap => value.wrapping_add(1),
            StencilOperation::DecrementWrap => value.wrapping_sub(1),
        }
    }
}

/// Stencil operations for one face orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFaceState {
    /// Stencil test failed
    pub fail_op: StencilOperation,
    /// Stencil test passed, depth test failed
    pub depth_fail_op: StencilOperation,
    /// Both tests passed
    pub pass_op: StencilOperation,
}

impl StencilFaceState {
    pub const KEEP: Self = Self {
        fail_op: StencilOperation::Keep,
        depth_fail_op: StencilOperation::Keep,
        pass_op: StencilOperation::Keep,
    };

    pub fn on_depth_fail(op: StencilOperation) -> Self {
        Self {
            depth_fail_op: op,
            ..Self::KEEP
        }
    }

    pub fn on_depth_pass(op: StencilOperation) -> Self {
        Self {
            pass_op: op,
            ..Self::KEEP
        }
    }
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self::KEEP
    }
}

/// Stencil comparison shared by both faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFunction {
    pub compare: CompareFunction,
    pub reference: u8,
    pub read_mask: u8,
}

impl Default for StencilFunction {
    fn default() -> Self {
        Self {
            compare: CompareFunction::Always,
            reference: 0,
            read_mask: 0xFF,
        }
    }
}

impl StencilFunction {
    pub fn test(&self, stored: u8) -> bool {
        self.compare
            .test(self.reference & self.read_mask, stored & self.read_mask)
    }
}

/// Fixed-function pipeline configuration.
///
/// Passes never toggle device state piecemeal: they derive a complete value
/// from the defaults and hand it to the device in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub depth_test: bool,
    pub depth_compare: CompareFunction,
    pub depth_write: bool,
    /// Disable near/far clipping and clamp fragment depth instead
    pub depth_clamp: bool,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub stencil_test: bool,
    pub stencil_function: StencilFunction,
    pub stencil_write_mask: u8,
    pub stencil_front: StencilFaceState,
    pub stencil_back: StencilFaceState,
    pub color_write: bool,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_compare: CompareFunction::Less,
            depth_write: true,
            depth_clamp: false,
            cull_mode: CullMode::Back,
            front_face: FrontFace::Ccw,
            stencil_test: false,
            stencil_function: StencilFunction::default(),
            stencil_write_mask: 0xFF,
            stencil_front: StencilFaceState::KEEP,
            stencil_back: StencilFaceState::KEEP,
            color_write: true,
        }
    }
}

impl PipelineState {
    pub fn stencil_face(&self, face: Face) -> &StencilFaceState {
        match face {
            Face::Front => &self.stencil_front,
            Face::Back => &self.stencil_back,
        }
    }

    pub fn culls(&self, face: Face) -> bool {
        matches!(
            (self.cull_mode, face),
            (CullMode::Front, Face::Front) | (CullMode::Back, Face::Back)
        )
    }
}

/// Values used when clearing the framebuffer at frame start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    pub color: [f32; 4],
    pub depth: f32,
    pub stencil: u8,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            color: [0.1, 0.1, 0.1, 1.0],
            depth: 1.0,
            stencil: 0,
        }
    }
}

/// Programmable shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Geometry => write!(f, "geometry"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Which stage set a program implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Transform and light scene geometry
    Scene,
    /// Extrude silhouette edges and caps away from the light
    ShadowVolume,
}

impl ProgramKind {
    pub fn required_stages(&self) -> &'static [ShaderStage] {
        match self {
            ProgramKind::Scene => &[ShaderStage::Vertex, ShaderStage::Fragment],
            ProgramKind::ShadowVolume => &[
                ShaderStage::Vertex,
                ShaderStage::Geometry,
                ShaderStage::Fragment,
            ],
        }
    }
}

/// Source for a single shader stage
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub source: String,
}

/// Program descriptor
#[derive(Debug, Clone)]
pub struct ProgramDescriptor {
    pub label: Option<String>,
    pub kind: ProgramKind,
    pub stages: Vec<ShaderSource>,
}

impl ProgramDescriptor {
    pub fn stage(&self, stage: ShaderStage) -> Option<&ShaderSource> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Uniform value uploaded to the bound program
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(glam::Vec3),
    Vec4(glam::Vec4),
    Mat4(glam::Mat4),
}

impl UniformValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            UniformValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            UniformValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<glam::Vec3> {
        match self {
            UniformValue::Vec3(v) => Some(*v),
            UniformValue::Vec4(v) => Some(v.truncate()),
            _ => None,
        }
    }

    pub fn as_vec4(&self) -> Option<glam::Vec4> {
        match self {
            UniformValue::Vec4(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_mat4(&self) -> Option<glam::Mat4> {
        match self {
            UniformValue::Mat4(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        UniformValue::Int(value as i32)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<glam::Vec3> for UniformValue {
    fn from(value: glam::Vec3) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<glam::Vec4> for UniformValue {
    fn from(value: glam::Vec4) -> Self {
        UniformValue::Vec4(value)
    }
}

impl From<glam::Mat4> for UniformValue {
    fn from(value: glam::Mat4) -> Self {
        UniformValue::Mat4(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_ops_round_trip_through_zero() {
        assert_eq!(StencilOperation::DecrementWrap.apply(0, 0), 255);
        assert_eq!(StencilOperation::IncrementWrap.apply(255, 0), 0);
        assert_eq!(StencilOperation::DecrementClamp.apply(0, 0), 0);
    }

    #[test]
    fn stencil_function_uses_read_mask() {
        let func = StencilFunction {
            compare: CompareFunction::Equal,
            reference: 0,
            read_mask: 0x0F,
        };
        assert!(func.test(0xF0));
        assert!(!func.test(0x01));
    }

    #[test]
    fn default_state_culls_back_faces_only() {
        let state = PipelineState::default();
        assert!(state.culls(Face::Back));
        assert!(!state.culls(Face::Front));
        assert!(!state.stencil_test);
    }
}
