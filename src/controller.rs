//! Render-affecting state and the controller that mutates it
//!
//! Input callbacks never touch renderer state directly. They either call the
//! [`AlgorithmController`] through the renderer between frames, or push a
//! [`Command`] onto a [`CommandQueue`] that the renderer drains before the
//! next frame starts.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Shadow volume counting algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Count volume faces behind the scene ("Carmack's reverse")
    #[default]
    ZFail,
    /// Count volume faces in front of the scene
    ZPass,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::ZFail => write!(f, "Z-fail"),
            Algorithm::ZPass => write!(f, "Z-pass"),
        }
    }
}

/// Snapshot consumed by one pass sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub algorithm: Algorithm,
    pub robust: bool,
    pub paused: bool,
    pub active_light: usize,
    pub width: u32,
    pub height: u32,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::ZFail,
            robust: true,
            paused: false,
            active_light: 0,
            width: 0,
            height: 0,
        }
    }
}

/// Owner of the [`RenderState`]. Every mutation returns whether it applied.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmController {
    state: RenderState,
}

impl AlgorithmController {
    pub fn new(state: RenderState) -> Self {
        Self { state }
    }

    /// Copy of the current state
    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Ignored while paused
    pub fn select_algorithm(&mut self, algorithm: Algorithm) -> bool {
        if self.state.paused {
            return false;
        }
        if self.state.algorithm != algorithm {
            log::debug!("Shadow algorithm: {}", algorithm);
        }
        self.state.algorithm = algorithm;
        true
    }

    /// Ignored while paused
    pub fn set_robust(&mut self, robust: bool) -> bool {
        if self.state.paused {
            return false;
        }
        if self.state.robust != robust {
            log::debug!("Robust extrusion: {}", robust);
        }
        self.state.robust = robust;
        true
    }

    pub fn toggle_robust(&mut self) -> bool {
        self.set_robust(!self.state.robust)
    }

    /// Always allowed. Returns the new pause flag.
    pub fn toggle_pause(&mut self) -> bool {
        self.state.paused = !self.state.paused;
        log::debug!("Paused: {}", self.state.paused);
        self.state.paused
    }

    /// No-op when `index` is not below `light_count`
    pub fn set_active_light(&mut self, index: usize, light_count: usize) -> bool {
        if index >= light_count {
            log::debug!("Ignoring light index {} ({} lights)", index, light_count);
            return false;
        }
        self.state.active_light = index;
        true
    }

    pub fn set_frame_size(&mut self, width: u32, height: u32) {
        self.state.width = width;
        self.state.height = height;
    }
}

/// Operation requested by an input callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SelectAlgorithm(Algorithm),
    SetRobust(bool),
    ToggleRobust,
    TogglePause,
    SetActiveLight(usize),
    /// Flip the on/off switch of the active light
    ToggleLight,
    /// Write color, depth and stencil captures after the next frame
    Capture,
}

/// Thread-safe queue of pending commands. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    inner: Arc<Mutex<VecDeque<Command>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: Command) {
        self.inner.lock().push_back(command);
    }

    /// Take every pending command in submission order
    pub fn drain(&self) -> Vec<Command> {
        self.inner.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
