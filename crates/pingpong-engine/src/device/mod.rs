//! GPU device management.
//!
//! Two contexts share one set of init parameters:
//! - [`Gpu`] owns a window surface and acquires frames for presentation
//! - [`HeadlessGpu`] has no surface and serves offscreen work and tests

mod gpu;
mod headless;
mod init;
mod surface;

pub use gpu::{Gpu, GpuFrame, SurfaceErrorAction};
pub use headless::HeadlessGpu;
pub use init::GpuInit;

pub(crate) use init::request_device;
