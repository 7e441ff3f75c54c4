//! Render pass definitions

use glam::Mat4;

use super::shaders::ShadowPrograms;
use crate::backend::{GraphicsDevice, PipelineState};
use crate::controller::RenderState;
use crate::resources::GpuMesh;
use crate::scene::{Scene, SceneObject};

/// Everything a pass reads while it executes
pub struct PassContext<'a> {
    pub device: &'a mut dyn GraphicsDevice,
    pub scene: &'a Scene,
    /// Uploaded meshes, indexed by `MeshId`
    pub meshes: &'a [GpuMesh],
    pub programs: &'a ShadowPrograms,
    /// Snapshot taken before the first pass of the frame
    pub state: RenderState,
}

impl PassContext<'_> {
    /// Upload camera matrices to the bound program
    pub fn upload_camera(&mut self) {
        let camera = &self.scene.camera;
        self.device.set_uniform("ViewMatrix", camera.view_matrix().into());
        self.device
            .set_uniform("ProjectionMatrix", camera.projection_matrix().into());
    }

    /// Set the model matrix and submit one object. Returns whether a draw
    /// was issued.
    pub fn draw_object(&mut self, object: &SceneObject) -> bool {
        let Some(mesh) = self.meshes.get(object.mesh.0) else {
            log::warn!("Object references unknown mesh {:?}", object.mesh);
            return false;
        };
        let model: Mat4 = object.transform.model_matrix();
        self.device.set_uniform("ModelMatrix", model.into());
        mesh.draw(self.device);
        true
    }
}

/// One stage of the frame sequence
pub trait RenderPass {
    /// Get the pass name (for debugging)
    fn name(&self) -> &str;

    /// Fixed-function state applied for the duration of the pass
    fn pipeline_state(&self, state: &RenderState) -> PipelineState;

    /// Issue the pass's draws. Returns the number of draw calls.
    fn execute(&self, ctx: &mut PassContext) -> u32;
}
