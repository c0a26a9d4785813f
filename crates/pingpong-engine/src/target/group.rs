use crate::paint::Color;

use super::format::{FormatInfo, ATTACHMENT_USAGES};
use super::{ActiveSet, AttachmentSpec};

/// Label of one of the two render-target groups.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GroupId {
    A,
    B,
}

impl GroupId {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// Which group currently plays the `data` (read) role.
///
/// The `utility` (write) role is always the other group; swapping flips one
/// label and never touches pixel storage.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Roles {
    data: GroupId,
}

impl Default for Roles {
    fn default() -> Self {
        Self { data: GroupId::A }
    }
}

impl Roles {
    pub fn data(self) -> GroupId {
        self.data
    }

    pub fn utility(self) -> GroupId {
        self.data.other()
    }

    pub fn swap(&mut self) {
        self.data = self.data.other();
    }
}

/// A texture plus its default view.
#[derive(Debug)]
pub struct Attachment {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub info: FormatInfo,
}

impl Attachment {
    pub(crate) fn create(
        device: &wgpu::Device,
        label: &str,
        size: wgpu::Extent3d,
        info: FormatInfo,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: info.format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view, info }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.info.format
    }

    pub fn size(&self) -> wgpu::Extent3d {
        self.texture.size()
    }
}

/// One complete set of co-located attachments sharing a size.
#[derive(Debug)]
pub struct TargetGroup {
    id: GroupId,
    attachments: Vec<Attachment>,
}

impl TargetGroup {
    pub(crate) fn new(
        device: &wgpu::Device,
        id: GroupId,
        size: wgpu::Extent3d,
        layout: &[FormatInfo],
    ) -> Self {
        let attachments = layout
            .iter()
            .enumerate()
            .map(|(i, info)| {
                let label = format!("pingpong group {id:?} attachment {i}");
                Attachment::create(device, &label, size, *info, ATTACHMENT_USAGES)
            })
            .collect();
        Self { id, attachments }
    }

    /// Records one clear pass per attachment, using each spec's clear color.
    pub(crate) fn record_clears(&self, encoder: &mut wgpu::CommandEncoder, specs: &[AttachmentSpec]) {
        for (attachment, spec) in self.attachments.iter().zip(specs) {
            clear_view(encoder, &attachment.view, spec.clear);
        }
    }

    /// Records a clear of each attachment in `active` to `color`.
    ///
    /// One single-attachment pass per index, so the cleared location never
    /// depends on how a backend packs a sparse attachment list.
    pub(crate) fn record_active_clears(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        active: ActiveSet,
        color: Color,
    ) {
        for index in active.iter() {
            if let Some(attachment) = self.attachments.get(index) {
                clear_view(encoder, &attachment.view, color);
            }
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Attachment> {
        self.attachments.get(index)
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn formats(&self) -> impl Iterator<Item = wgpu::TextureFormat> + '_ {
        self.attachments.iter().map(Attachment::format)
    }

    pub fn size(&self) -> Option<wgpu::Extent3d> {
        self.attachments.first().map(Attachment::size)
    }
}

fn clear_view(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, color: Color) {
    let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("pingpong attachment clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(color.into()),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}
