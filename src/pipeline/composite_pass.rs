//! Shaded composite pass
//!
//! Re-renders the scene with lighting where the stencil is still zero. The
//! depth test compares against the prepass depth, so only visible unshadowed
//! fragments are lit; shadowed pixels keep the clear color.

use super::pass::{PassContext, RenderPass};
use crate::backend::{CompareFunction, PipelineState, StencilFaceState, StencilFunction};
use crate::controller::{Algorithm, RenderState};

#[derive(Debug, Default)]
pub struct CompositePass;

impl CompositePass {
    pub fn new() -> Self {
        Self
    }
}

impl RenderPass for CompositePass {
    fn name(&self) -> &str {
        "Composite Pass"
    }

    fn pipeline_state(&self, state: &RenderState) -> PipelineState {
        PipelineState {
            depth_test: true,
            depth_compare: match state.algorithm {
                Algorithm::ZFail => CompareFunction::Equal,
                Algorithm::ZPass => CompareFunction::LessEqual,
            },
            depth_write: true,
            stencil_test: true,
            stencil_function: StencilFunction {
                compare: CompareFunction::Equal,
                reference: 0,
                read_mask: 0xFF,
            },
            stencil_front: StencilFaceState::KEEP,
            stencil_back: StencilFaceState::KEEP,
            color_write: true,
            ..Default::default()
        }
    }

    fn execute(&self, ctx: &mut PassContext) -> u32 {
        ctx.device.use_program(ctx.programs.scene);
        ctx.upload_camera();

        let scene = ctx.scene;
        ctx.device
            .set_uniform("LightNum", (scene.lights.len() as i32).into());
        for (index, light) in scene.lights.iter().enumerate() {
            light.upload(ctx.device, index);
        }
        ctx.device
            .set_uniform("LightIndex", (ctx.state.active_light as i32).into());
        ctx.device.set_uniform("UseTexture", false.into());

        let mut draws = 0;
        for object in &scene.objects {
            object.material.upload(ctx.device);
            draws += ctx.draw_object(object) as u32;
        }
        draws
    }
}
