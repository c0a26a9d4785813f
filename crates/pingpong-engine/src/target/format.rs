use super::TargetError;

/// Numeric representation of a format's channels.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Repr {
    /// Normalized integer storage (`*Unorm`).
    Fixed,
    /// IEEE float storage (`*Float`).
    Float,
}

/// Layout of one attachment's texels as seen by copies.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FormatInfo {
    pub format: wgpu::TextureFormat,
    pub channels: u32,
    pub bytes_per_pixel: u32,
    pub repr: Repr,
}

impl FormatInfo {
    /// Describes `format`, or `None` when it is not a single-plane color format
    /// whose texels the shaders can load as floats.
    pub fn describe(format: wgpu::TextureFormat) -> Option<Self> {
        if format.is_depth_stencil_format() || format.is_compressed() {
            return None;
        }
        if !matches!(
            format.sample_type(None, None),
            Some(wgpu::TextureSampleType::Float { .. })
        ) {
            return None;
        }

        let bytes_per_pixel = format.block_copy_size(None)?;
        let repr = if is_float_format(format) { Repr::Float } else { Repr::Fixed };

        Some(Self {
            format,
            channels: format.components() as u32,
            bytes_per_pixel,
            repr,
        })
    }

    /// Bytes each channel occupies, or `None` for packed formats whose
    /// channels do not sit on byte boundaries.
    pub fn bytes_per_channel(&self) -> Option<u32> {
        if is_packed_format(self.format) {
            return None;
        }
        Some(self.bytes_per_pixel / self.channels.max(1))
    }

    /// Bytes of one tightly packed row of `width` texels.
    pub fn unpadded_bytes_per_row(&self, width: u32) -> u32 {
        width * self.bytes_per_pixel
    }
}

fn is_packed_format(format: wgpu::TextureFormat) -> bool {
    use wgpu::TextureFormat as F;
    matches!(format, F::Rg11b10Ufloat | F::Rgb10a2Unorm | F::Rgb9e5Ufloat)
}

fn is_float_format(format: wgpu::TextureFormat) -> bool {
    use wgpu::TextureFormat as F;
    matches!(
        format,
        F::R16Float
            | F::Rg16Float
            | F::Rgba16Float
            | F::R32Float
            | F::Rg32Float
            | F::Rgba32Float
            | F::Rg11b10Ufloat
    )
}

/// Usages every attachment, mirror and readback source needs.
pub(crate) const ATTACHMENT_USAGES: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

/// Validates `format` for attachment `index` on a device with `features`.
pub(crate) fn check_attachment_format(
    index: usize,
    format: wgpu::TextureFormat,
    features: wgpu::Features,
) -> Result<FormatInfo, TargetError> {
    let unsupported = || TargetError::UnsupportedFormat { index, format };

    let info = FormatInfo::describe(format).ok_or_else(unsupported)?;
    let allowed = format.guaranteed_format_features(features).allowed_usages;
    if !allowed.contains(ATTACHMENT_USAGES) {
        return Err(unsupported());
    }
    Ok(info)
}

/// Bytes one sample of every attachment costs when all are bound together.
///
/// Mirrors the device-side rule: each target is aligned to its component
/// alignment before its byte cost is added.
pub(crate) fn color_bytes_per_sample(formats: &[wgpu::TextureFormat]) -> u32 {
    formats.iter().fold(0u32, |total, f| {
        let align = f.target_component_alignment().unwrap_or(1).max(1);
        let cost = f.target_pixel_byte_cost().unwrap_or(0);
        total.div_ceil(align) * align + cost
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat as F;

    #[test]
    fn describes_fixed_point_rgba8() {
        let info = FormatInfo::describe(F::Rgba8Unorm).unwrap();
        assert_eq!(info.channels, 4);
        assert_eq!(info.bytes_per_pixel, 4);
        assert_eq!(info.bytes_per_channel(), Some(1));
        assert_eq!(info.repr, Repr::Fixed);
    }

    #[test]
    fn describes_float_formats() {
        let half = FormatInfo::describe(F::Rgba16Float).unwrap();
        assert_eq!((half.bytes_per_pixel, half.repr), (8, Repr::Float));

        let single = FormatInfo::describe(F::R32Float).unwrap();
        assert_eq!((single.channels, single.bytes_per_channel()), (1, Some(4)));
    }

    #[test]
    fn packed_formats_have_no_per_channel_size() {
        let packed = FormatInfo::describe(F::Rg11b10Ufloat).unwrap();
        assert_eq!((packed.channels, packed.bytes_per_pixel), (3, 4));
        assert_eq!(packed.bytes_per_channel(), None);
        assert_eq!(FormatInfo::describe(F::Rgb10a2Unorm).unwrap().bytes_per_channel(), None);
    }

    #[test]
    fn rejects_integer_and_depth_formats() {
        assert!(FormatInfo::describe(F::Rgba8Uint).is_none());
        assert!(FormatInfo::describe(F::Depth32Float).is_none());
        assert!(FormatInfo::describe(F::Bc1RgbaUnorm).is_none());
    }

    #[test]
    fn attachment_check_reports_index() {
        let err = check_attachment_format(3, F::Rgba8Uint, wgpu::Features::empty()).unwrap_err();
        assert!(matches!(err, TargetError::UnsupportedFormat { index: 3, .. }));
    }

    #[test]
    fn rgba8_and_rgba16float_are_valid_attachments() {
        for f in [F::Rgba8Unorm, F::Rgba16Float, F::R32Float] {
            assert!(check_attachment_format(0, f, wgpu::Features::empty()).is_ok(), "{f:?}");
        }
    }

    #[test]
    fn unpadded_row_scales_with_width() {
        let info = FormatInfo::describe(F::Rgba16Float).unwrap();
        assert_eq!(info.unpadded_bytes_per_row(10), 80);
    }

    #[test]
    fn bytes_per_sample_sums_target_costs() {
        assert_eq!(color_bytes_per_sample(&[F::Rgba8Unorm, F::Rgba8Unorm]), 16);
        assert_eq!(color_bytes_per_sample(&[F::Rgba16Float]), 8);
    }
}
