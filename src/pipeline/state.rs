//! Scoped fixed-function state

use crate::backend::{GraphicsDevice, PipelineState};

/// Applies a [`PipelineState`] on entry and restores the previous one when
/// dropped, including on early return and unwinding.
pub struct StateScope<'a> {
    device: &'a mut dyn GraphicsDevice,
    previous: PipelineState,
}

impl<'a> StateScope<'a> {
    pub fn enter(device: &'a mut dyn GraphicsDevice, state: &PipelineState) -> Self {
        let previous = device.pipeline_state();
        device.apply_state(state);
        Self { device, previous }
    }

    /// State that will be restored on drop
    pub fn previous(&self) -> &PipelineState {
        &self.previous
    }

    pub fn device(&mut self) -> &mut dyn GraphicsDevice {
        &mut *self.device
    }
}

impl Drop for StateScope<'_> {
    fn drop(&mut self) {
        self.device.apply_state(&self.previous);
    }
}
