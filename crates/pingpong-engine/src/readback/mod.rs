//! GPU-to-CPU transfer of attachment contents.
//!
//! [`ReadbackStaging`] keeps a per-attachment transfer buffer and mirror
//! texture refreshed on the device timeline, so consumers never wait on the
//! GPU. [`read_texture`] is the explicit, blocking path that maps texels into
//! host memory.

mod pixels;
mod staging;

pub use pixels::{padded_bytes_per_row, read_texture, TexelData};
pub use staging::ReadbackStaging;
