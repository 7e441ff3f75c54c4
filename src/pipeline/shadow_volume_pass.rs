//! Shadow-volume stencil pass
//!
//! Rasterizes the extruded volumes of every caster into the stencil buffer.
//! Depth writes are off and depth clamping is on so geometry projected to
//! infinity is neither clipped nor allowed to disturb the scene depth.

use super::pass::{PassContext, RenderPass};
use crate::backend::{
    CompareFunction, CullMode, PipelineState, StencilFaceState, StencilFunction,
    StencilOperation,
};
use crate::controller::{Algorithm, RenderState};
use crate::resources::DrawMode;

/// Stencil counting of shadow volume faces
#[derive(Debug, Default)]
pub struct ShadowVolumePass;

impl ShadowVolumePass {
    pub fn new() -> Self {
        Self
    }

    /// Two-sided stencil ops for an algorithm, as `(front, back)`
    pub fn stencil_ops(algorithm: Algorithm) -> (StencilFaceState, StencilFaceState) {
        match algorithm {
            Algorithm::ZPass => (
                StencilFaceState::on_depth_pass(StencilOperation::IncrementWrap),
                StencilFaceState::on_depth_pass(StencilOperation::DecrementWrap),
            ),
            Algorithm::ZFail => (
                StencilFaceState::on_depth_fail(StencilOperation::DecrementWrap),
                StencilFaceState::on_depth_fail(StencilOperation::IncrementWrap),
            ),
        }
    }
}

impl RenderPass for ShadowVolumePass {
    fn name(&self) -> &str {
        "Shadow Volume Pass"
    }

    fn pipeline_state(&self, state: &RenderState) -> PipelineState {
        let (front, back) = Self::stencil_ops(state.algorithm);
        PipelineState {
            depth_test: true,
            depth_compare: CompareFunction::Less,
            depth_write: false,
            depth_clamp: true,
            cull_mode: CullMode::None,
            stencil_test: true,
            stencil_function: StencilFunction {
                compare: CompareFunction::Always,
                reference: 0,
                read_mask: 0xFF,
            },
            stencil_front: front,
            stencil_back: back,
            color_write: false,
            ..Default::default()
        }
    }

    fn execute(&self, ctx: &mut PassContext) -> u32 {
        ctx.device.use_program(ctx.programs.shadow_volume);
        ctx.upload_camera();

        let scene = ctx.scene;
        let light = scene.light(ctx.state.active_light);
        let light_in_eye = light
            .map(|l| scene.camera.view_matrix() * l.position)
            .unwrap_or_default();
        ctx.device.set_uniform("LightPosition", light_in_eye.into());
        ctx.device.set_uniform("Robust", ctx.state.robust.into());
        ctx.device
            .set_uniform("ZFail", (ctx.state.algorithm == Algorithm::ZFail).into());

        // A switched-off light casts nothing; the stencil stays cleared
        if !light.is_some_and(|l| l.enabled) {
            log::trace!("Active light {} is off, no volumes drawn", ctx.state.active_light);
            return 0;
        }

        let mut draws = 0;
        for object in scene.casters() {
            let casts = ctx
                .meshes
                .get(object.mesh.0)
                .is_some_and(|mesh| mesh.draw_mode() == DrawMode::Adjacency);
            if casts {
                draws += ctx.draw_object(object) as u32;
            }
        }
        draws
    }
}
