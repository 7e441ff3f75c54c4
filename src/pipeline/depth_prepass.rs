//! Depth pre-pass establishing the scene depth buffer

use super::pass::{PassContext, RenderPass};
use crate::backend::{CompareFunction, PipelineState};
use crate::controller::RenderState;

/// Depth-only render of every object
#[derive(Debug, Default)]
pub struct DepthPrepass;

impl DepthPrepass {
    pub fn new() -> Self {
        Self
    }
}

impl RenderPass for DepthPrepass {
    fn name(&self) -> &str {
        "Depth Prepass"
    }

    fn pipeline_state(&self, _state: &RenderState) -> PipelineState {
        PipelineState {
            depth_test: true,
            depth_compare: CompareFunction::Less,
            depth_write: true,
            stencil_test: false,
            color_write: false,
            ..Default::default()
        }
    }

    fn execute(&self, ctx: &mut PassContext) -> u32 {
        ctx.device.use_program(ctx.programs.scene);
        ctx.upload_camera();

        let scene = ctx.scene;
        let mut draws = 0;
        for object in &scene.objects {
            draws += ctx.draw_object(object) as u32;
        }
        draws
    }
}
