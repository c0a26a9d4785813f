//! Window + runtime loop.
//!
//! Owns the `winit` event loop and a single window wired to the GPU layer.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
