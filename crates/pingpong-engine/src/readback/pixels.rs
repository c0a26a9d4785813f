use std::sync::mpsc;

use crate::target::{FormatInfo, TargetError};

/// Rounds a tight row up to the copy alignment wgpu requires for
/// buffer/texture copies.
pub fn padded_bytes_per_row(unpadded: u32) -> u32 {
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Tightly packed texels read back from the GPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexelData {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub bytes_per_pixel: u32,
    pub bytes: Vec<u8>,
}

impl TexelData {
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = (self.width * self.bytes_per_pixel) as usize;
        let start = y as usize * stride;
        self.bytes.get(start..start + stride)
    }

    pub fn texel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width {
            return None;
        }
        let bpp = self.bytes_per_pixel as usize;
        let start = x as usize * bpp;
        self.row(y)?.get(start..start + bpp)
    }
}

/// Drops the per-row alignment padding of a mapped buffer.
pub(crate) fn strip_row_padding(mapped: &[u8], unpadded: usize, padded: usize, rows: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(unpadded * rows);
    for row in mapped.chunks(padded).take(rows) {
        out.extend_from_slice(&row[..unpadded]);
    }
    out
}

/// Records a full-texture copy into `buffer`, laid out with `padded` bytes per row.
pub(crate) fn record_texture_to_buffer(
    encoder: &mut wgpu::CommandEncoder,
    texture: &wgpu::Texture,
    buffer: &wgpu::Buffer,
    padded: u32,
) {
    let size = texture.size();
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(size.height),
            },
        },
        size,
    );
}

/// Copies `texture` into host memory, blocking until the device is done.
///
/// This stalls the calling thread on the GPU; it is meant for snapshots,
/// CPU-side processing and verification, not for the per-frame path.
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    info: FormatInfo,
) -> Result<TexelData, TargetError> {
    let size = texture.size();
    let unpadded = info.unpadded_bytes_per_row(size.width);
    let padded = padded_bytes_per_row(unpadded);

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("pingpong host readback buffer"),
        size: padded as u64 * size.height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("pingpong host readback encoder"),
    });
    record_texture_to_buffer(&mut encoder, texture, &staging, padded);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device.poll(wgpu::PollType::wait_indefinitely())?;
    rx.recv().map_err(|_| TargetError::MapCallbackDropped)??;

    let bytes = {
        let mapped = slice.get_mapped_range();
        strip_row_padding(&mapped, unpadded as usize, padded as usize, size.height as usize)
    };
    staging.unmap();

    Ok(TexelData {
        width: size.width,
        height: size.height,
        format: info.format,
        bytes_per_pixel: info.bytes_per_pixel,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(256), 256);
        assert_eq!(padded_bytes_per_row(257), 512);
        assert_eq!(padded_bytes_per_row(0), 0);
    }

    #[test]
    fn padding_is_stripped_per_row() {
        // Two rows of 3 bytes, padded to 5.
        let mapped = [1, 2, 3, 0, 0, 4, 5, 6, 0, 0];
        assert_eq!(strip_row_padding(&mapped, 3, 5, 2), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn texel_addresses_tight_rows() {
        let data = TexelData {
            width: 2,
            height: 2,
            format: wgpu::TextureFormat::Rg8Unorm,
            bytes_per_pixel: 2,
            bytes: vec![0, 1, 2, 3, 4, 5, 6, 7],
        };
        assert_eq!(data.row(1), Some(&[4, 5, 6, 7][..]));
        assert_eq!(data.texel(1, 0), Some(&[2, 3][..]));
        assert_eq!(data.texel(2, 0), None);
        assert_eq!(data.row(2), None);
    }
}
