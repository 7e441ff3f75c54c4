//! Device abstraction layer
//!
//! Provides the traits and types the pipeline drives, plus a software device
//! that implements them without GPU hardware.

pub mod software;
pub mod traits;
pub mod types;

pub use software::SoftwareDevice;
pub use traits::*;
pub use types::*;
