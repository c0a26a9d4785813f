use thiserror::Error;

/// Rejections reported by [`MultiTarget`](super::MultiTarget) and its helpers.
///
/// Every variant leaves the manager's state exactly as it was before the call.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("cannot create a multi-target with {requested} attachments (max {max})")]
    TooManyAttachments { requested: usize, max: usize },

    #[error("at least one attachment format is required")]
    NoFormats,

    #[error("invalid target size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("target size {width}x{height} exceeds the device limit of {limit}")]
    SizeExceedsLimit { width: u32, height: u32, limit: u32 },

    #[error("attachment {index}: format {format:?} cannot back a readable render target")]
    UnsupportedFormat {
        index: usize,
        format: wgpu::TextureFormat,
    },

    #[error("attachments need {bytes} bytes per sample, device allows {limit}")]
    AttachmentBytesExceeded { bytes: u32, limit: u32 },

    #[error("invalid attachment index {index} (attachment count {count})")]
    InvalidIndex { index: usize, count: usize },

    #[error("a pass is already open; end it before calling begin_all()")]
    PassAlreadyOpen,

    #[error("attachment {index} is already active in the open pass")]
    AttachmentAlreadyActive { index: usize },

    #[error("no pass is open")]
    NoOpenPass,

    #[error("cannot swap while a pass is open")]
    SwapDuringPass,

    #[error("device rejected the attachment resources: {0}")]
    Device(wgpu::Error),

    #[error("readback was not enabled at allocation")]
    ReadbackDisabled,

    #[error("failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("readback map callback was dropped")]
    MapCallbackDropped,
}

impl TargetError {
    /// Severity used when a rejection is reported through `log`.
    pub fn log_level(&self) -> log::Level {
        match self {
            Self::PassAlreadyOpen
            | Self::AttachmentAlreadyActive { .. }
            | Self::NoOpenPass
            | Self::SwapDuringPass => log::Level::Warn,
            Self::ReadbackDisabled => log::Level::Debug,
            _ => log::Level::Error,
        }
    }
}

/// Logs `err` at its severity and returns it as `Err`.
pub(crate) fn reject<T>(err: TargetError) -> Result<T, TargetError> {
    log::log!(target: "pingpong_engine::target", err.log_level(), "{err}");
    Err(err)
}

/// Runs `create` inside a validation error scope.
///
/// Whatever the device reports while `create` runs comes back as
/// [`TargetError::Device`] instead of reaching the uncaptured-error handler.
pub(crate) fn capture_validation<T>(
    device: &wgpu::Device,
    create: impl FnOnce() -> T,
) -> Result<T, TargetError> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(scope.pop()) {
        None => Ok(value),
        Some(err) => Err(TargetError::Device(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{GpuInit, HeadlessGpu};

    #[test]
    fn protocol_violations_are_warnings() {
        assert_eq!(TargetError::PassAlreadyOpen.log_level(), log::Level::Warn);
        assert_eq!(
            TargetError::AttachmentAlreadyActive { index: 2 }.log_level(),
            log::Level::Warn
        );
    }

    #[test]
    fn configuration_and_index_errors_are_errors() {
        let too_many = TargetError::TooManyAttachments { requested: 8, max: 7 };
        assert_eq!(too_many.log_level(), log::Level::Error);
        assert_eq!(
            TargetError::InvalidIndex { index: 9, count: 3 }.log_level(),
            log::Level::Error
        );
    }

    #[test]
    fn messages_name_the_offending_values() {
        let msg = TargetError::InvalidIndex { index: 9, count: 3 }.to_string();
        assert!(msg.contains('9') && msg.contains('3'));
    }

    #[test]
    fn captured_validation_errors_are_returned() {
        let Ok(gpu) = HeadlessGpu::blocking(GpuInit::default()) else { return };
        let device = gpu.device();

        let bad = capture_validation(device, || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("zero mips"),
                size: wgpu::Extent3d { width: 4, height: 4, depth_or_array_layers: 1 },
                mip_level_count: 0,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        });
        assert!(matches!(bad, Err(TargetError::Device(_))));

        let good = capture_validation(device, || 7);
        assert!(matches!(good, Ok(7)));
    }
}
