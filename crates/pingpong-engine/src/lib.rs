//! Pingpong engine crate.
//!
//! Double-buffered multi-attachment render targets for GPU feedback loops,
//! with per-attachment readback staging. The remaining modules are the thin
//! device/window runtime the targets are driven from.

pub mod device;
pub mod window;
pub mod core;

pub mod logging;
pub mod paint;
pub mod render;
pub mod readback;
pub mod target;

pub use target::{GroupId, MultiTarget, TargetConfig, TargetError, MAX_ATTACHMENTS};
