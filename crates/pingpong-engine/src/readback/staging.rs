use crate::target::{Attachment, TargetGroup};

use super::pixels::{padded_bytes_per_row, record_texture_to_buffer};

/// Transfer buffer and mirror texture for one attachment.
struct TransferSlot {
    buffer: wgpu::Buffer,
    mirror: Attachment,
    padded_bytes_per_row: u32,
}

/// Per-attachment readback staging.
///
/// Sized once from the group it is created for and refreshed in place after
/// every swap. Mirrors lag the live targets by exactly one swap.
pub struct ReadbackStaging {
    slots: Vec<TransferSlot>,
}

impl ReadbackStaging {
    /// Allocates one transfer buffer and one mirror per attachment of `source`.
    pub fn new(device: &wgpu::Device, source: &TargetGroup) -> Self {
        let slots = source
            .attachments()
            .iter()
            .enumerate()
            .map(|(i, attachment)| {
                let size = attachment.size();
                let padded = padded_bytes_per_row(attachment.info.unpadded_bytes_per_row(size.width));

                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("pingpong transfer buffer {i}")),
                    size: padded as u64 * size.height as u64,
                    usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                });

                let mirror = Attachment::create(
                    device,
                    &format!("pingpong mirror {i}"),
                    size,
                    attachment.info,
                    wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::COPY_DST
                        | wgpu::TextureUsages::COPY_SRC,
                );

                TransferSlot {
                    buffer,
                    mirror,
                    padded_bytes_per_row: padded,
                }
            })
            .collect();

        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Mirror of attachment `index` as of the last refresh.
    pub fn mirror(&self, index: usize) -> Option<&Attachment> {
        self.slots.get(index).map(|slot| &slot.mirror)
    }

    /// Copies every attachment of `source` through its transfer buffer into its mirror.
    ///
    /// Both copies stay on the device timeline; the CPU does not wait. Queue
    /// order places them after every earlier submission that drew into `source`.
    pub fn refresh_all(&self, device: &wgpu::Device, queue: &wgpu::Queue, source: &TargetGroup) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("pingpong readback refresh"),
        });

        for (slot, attachment) in self.slots.iter().zip(source.attachments()) {
            record_texture_to_buffer(&mut encoder, &attachment.texture, &slot.buffer, slot.padded_bytes_per_row);

            let size = slot.mirror.size();
            encoder.copy_buffer_to_texture(
                wgpu::TexelCopyBufferInfo {
                    buffer: &slot.buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(slot.padded_bytes_per_row),
                        rows_per_image: Some(size.height),
                    },
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &slot.mirror.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                size,
            );
        }

        queue.submit(std::iter::once(encoder.finish()));
        log::trace!("refreshed {} mirrors from group {:?}", self.slots.len(), source.id());
    }
}
