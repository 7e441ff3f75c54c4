//! Shadow volume rendering pipeline
//!
//! Every frame runs three passes in a fixed order:
//! 1. Depth prepass - scene depth with color writes off
//! 2. Shadow volume pass - counts volume faces into the stencil buffer
//! 3. Composite pass - lights fragments whose stencil is still zero

pub mod composite_pass;
pub mod depth_prepass;
pub mod pass;
pub mod shaders;
pub mod shadow_volume_pass;
pub mod state;

pub use composite_pass::CompositePass;
pub use depth_prepass::DepthPrepass;
pub use pass::{PassContext, RenderPass};
pub use shaders::ShadowPrograms;
pub use shadow_volume_pass::ShadowVolumePass;
pub use state::StateScope;

use crate::backend::{GraphicsDevice, PipelineState};
use crate::controller::{Algorithm, RenderState};
use crate::resources::GpuMesh;
use crate::scene::Scene;

/// Summary of one executed pass sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub algorithm: Algorithm,
    pub robust: bool,
    pub prepass_draws: u32,
    pub volume_draws: u32,
    pub composite_draws: u32,
}

/// Runs the depth prepass, the shadow-volume pass and the composite pass
pub struct PassSequencer {
    depth_prepass: DepthPrepass,
    shadow_volume_pass: ShadowVolumePass,
    composite_pass: CompositePass,
    frames: u64,
}

impl Default for PassSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl PassSequencer {
    pub fn new() -> Self {
        Self {
            depth_prepass: DepthPrepass::new(),
            shadow_volume_pass: ShadowVolumePass::new(),
            composite_pass: CompositePass::new(),
            frames: 0,
        }
    }

    /// Number of sequences run so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run all three passes. Fixed-function state is back to its value at
    /// entry when this returns.
    pub fn run(
        &mut self,
        device: &mut dyn GraphicsDevice,
        scene: &Scene,
        meshes: &[GpuMesh],
        programs: &ShadowPrograms,
        state: RenderState,
    ) -> FrameReport {
        let mut frame = StateScope::enter(device, &PipelineState::default());
        frame.device().set_viewport(0, 0, state.width, state.height);

        let passes: [&dyn RenderPass; 3] = [
            &self.depth_prepass,
            &self.shadow_volume_pass,
            &self.composite_pass,
        ];
        let mut draws = [0u32; 3];
        for (pass, count) in passes.iter().zip(draws.iter_mut()) {
            let pipeline = pass.pipeline_state(&state);
            let mut scope = StateScope::enter(frame.device(), &pipeline);
            let mut ctx = PassContext {
                device: scope.device(),
                scene,
                meshes,
                programs,
                state,
            };
            *count = pass.execute(&mut ctx);
            log::trace!("{}: {} draws", pass.name(), count);
        }

        self.frames += 1;
        let report = FrameReport {
            frame: self.frames,
            algorithm: state.algorithm,
            robust: state.robust,
            prepass_draws: draws[0],
            volume_draws: draws[1],
            composite_draws: draws[2],
        };
        log::trace!("{:?}", report);
        report
    }
}
