//! Drawing attachments into caller-owned targets.
//!
//! Convention: destination coordinates are pixels with a top-left origin and
//! +Y down; the vertex shader converts to NDC using the target viewport.

mod blit;
mod ctx;

pub use blit::TextureBlitter;
pub use ctx::{RenderCtx, RenderTarget, Viewport};
