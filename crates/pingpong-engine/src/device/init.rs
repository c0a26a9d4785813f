use anyhow::{Context, Result};

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available. Ignored without a surface.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). Ignored without a surface.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device when `adapter_limits` is off.
    pub required_limits: wgpu::Limits,

    /// Request the adapter's full limits instead of `required_limits`.
    ///
    /// The default limits cap color attachments at 32 bytes per sample, which a
    /// handful of float attachments exceeds.
    pub adapter_limits: bool,

    /// Desired maximum frame latency for the surface.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            adapter_limits: true,
            desired_maximum_frame_latency: 2,
        }
    }
}

/// Creates the logical device and queue shared by both context kinds.
pub(crate) async fn request_device(
    adapter: &wgpu::Adapter,
    init: &GpuInit,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    let required_limits = if init.adapter_limits {
        adapter.limits()
    } else {
        init.required_limits.clone()
    };

    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("pingpong device"),
            required_features: init.required_features,
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")
}
