use crate::paint::Color;

use super::{TargetError, MAX_ATTACHMENTS};

/// One attachment after list normalization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AttachmentSpec {
    pub format: wgpu::TextureFormat,
    pub clear: Color,
}

/// Render-target allocation parameters.
///
/// `formats` and `colors` are matched by position. When their lengths
/// differ the shorter list is padded by repeating its last element; an empty
/// `colors` list clears to transparent black.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetConfig {
    pub width: u32,
    pub height: u32,
    pub formats: Vec<wgpu::TextureFormat>,
    pub colors: Vec<Color>,
    pub readback: bool,
}

impl TargetConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            formats: Vec::new(),
            colors: Vec::new(),
            readback: false,
        }
    }

    /// Single format and clear color broadcast to `count` attachments.
    pub fn uniform(
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        count: usize,
        color: Color,
    ) -> Self {
        Self::new(width, height)
            .formats(vec![format; count])
            .colors(vec![color; count])
    }

    pub fn format(mut self, format: wgpu::TextureFormat) -> Self {
        self.formats.push(format);
        self
    }

    pub fn formats(mut self, formats: impl IntoIterator<Item = wgpu::TextureFormat>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.colors.push(color);
        self
    }

    pub fn colors(mut self, colors: impl IntoIterator<Item = Color>) -> Self {
        self.colors = colors.into_iter().collect();
        self
    }

    pub fn readback(mut self, enabled: bool) -> Self {
        self.readback = enabled;
        self
    }

    /// Normalizes the format/color lists; see [`resolve_attachments`].
    pub fn attachments(&self) -> Result<Vec<AttachmentSpec>, TargetError> {
        resolve_attachments(&self.formats, &self.colors)
    }
}

/// Pairs formats with clear colors.
///
/// Either list reaching `MAX_ATTACHMENTS + 1` entries is rejected before any
/// padding happens, matching the count the caller asked for.
pub fn resolve_attachments(
    formats: &[wgpu::TextureFormat],
    colors: &[Color],
) -> Result<Vec<AttachmentSpec>, TargetError> {
    let requested = formats.len().max(colors.len());
    if requested > MAX_ATTACHMENTS {
        return Err(TargetError::TooManyAttachments {
            requested,
            max: MAX_ATTACHMENTS,
        });
    }

    let Some(&last_format) = formats.last() else {
        return Err(TargetError::NoFormats);
    };
    let last_color = colors.last().copied().unwrap_or(Color::TRANSPARENT);

    if formats.len() != colors.len() {
        log::info!(
            "padding attachment lists: {} formats, {} colors -> {requested}",
            formats.len(),
            colors.len()
        );
    }

    Ok((0..requested)
        .map(|i| AttachmentSpec {
            format: formats.get(i).copied().unwrap_or(last_format),
            clear: colors.get(i).copied().unwrap_or(last_color),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat as F;

    const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
    const GREEN: Color = Color::new(0.0, 1.0, 0.0, 1.0);
    const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);

    #[test]
    fn single_format_is_repeated_for_each_color() {
        let specs = resolve_attachments(&[F::Rgba16Float], &[RED, GREEN, BLUE]).unwrap();
        assert_eq!(specs.len(), 3);
        assert!(specs.iter().all(|s| s.format == F::Rgba16Float));
        let clears: Vec<_> = specs.iter().map(|s| s.clear).collect();
        assert_eq!(clears, vec![RED, GREEN, BLUE]);
    }

    #[test]
    fn last_color_is_repeated_for_extra_formats() {
        let specs = resolve_attachments(&[F::Rgba8Unorm, F::R32Float, F::Rgba16Float], &[RED, BLUE])
            .unwrap();
        assert_eq!(specs[2], AttachmentSpec { format: F::Rgba16Float, clear: BLUE });
        assert_eq!(specs[1].format, F::R32Float);
    }

    #[test]
    fn empty_colors_default_to_transparent() {
        let specs = resolve_attachments(&[F::Rgba8Unorm; 2], &[]).unwrap();
        assert!(specs.iter().all(|s| s.clear == Color::TRANSPARENT));
    }

    #[test]
    fn empty_formats_are_rejected() {
        assert!(matches!(resolve_attachments(&[], &[RED]), Err(TargetError::NoFormats)));
    }

    #[test]
    fn seven_attachments_are_accepted() {
        let specs = resolve_attachments(&[F::R8Unorm; 7], &[RED; 7]).unwrap();
        assert_eq!(specs.len(), MAX_ATTACHMENTS);
    }

    #[test]
    fn eight_formats_or_eight_colors_are_rejected() {
        assert!(matches!(
            resolve_attachments(&[F::R8Unorm; 8], &[RED]),
            Err(TargetError::TooManyAttachments { requested: 8, max: 7 })
        ));
        assert!(matches!(
            resolve_attachments(&[F::R8Unorm], &[RED; 8]),
            Err(TargetError::TooManyAttachments { requested: 8, .. })
        ));
    }

    #[test]
    fn uniform_config_broadcasts_format_and_color() {
        let cfg = TargetConfig::uniform(64, 32, F::Rgba8Unorm, 4, GREEN);
        let specs = cfg.attachments().unwrap();
        assert_eq!(specs.len(), 4);
        assert!(specs.iter().all(|s| s.format == F::Rgba8Unorm && s.clear == GREEN));
    }

    #[test]
    fn builder_appends_formats_and_colors() {
        let cfg = TargetConfig::new(8, 8)
            .format(F::Rgba8Unorm)
            .format(F::R16Float)
            .color(RED)
            .readback(true);
        assert_eq!(cfg.formats, vec![F::Rgba8Unorm, F::R16Float]);
        assert!(cfg.readback);
        assert_eq!(cfg.attachments().unwrap()[1].clear, RED);
    }
}
