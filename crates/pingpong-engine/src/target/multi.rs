use crate::paint::Color;
use crate::readback::{read_texture, ReadbackStaging, TexelData};
use crate::render::{RenderCtx, RenderTarget, TextureBlitter};

use super::error::{capture_validation, reject};
use super::format::{check_attachment_format, color_bytes_per_sample, FormatInfo};
use super::pass::check_index;
use super::{
    ActiveSet, Attachment, AttachmentSpec, GroupId, PassState, Roles, TargetConfig, TargetError,
    TargetGroup, Transition,
};

/// Ping-pong pair of multi-attachment render targets.
///
/// Per frame: open a pass ([`begin_all`](Self::begin_all) or
/// [`begin`](Self::begin)), record draws through
/// [`render_pass`](Self::render_pass), close it with [`end`](Self::end), swap.
/// The pass owns one command encoder; closing the pass submits it, so queue
/// order puts the readback refresh of a swap after the draws it exposes.
///
/// Rejected calls log, return `Err` and leave every piece of state untouched.
pub struct MultiTarget {
    device: wgpu::Device,
    queue: wgpu::Queue,

    size: wgpu::Extent3d,
    specs: Vec<AttachmentSpec>,
    groups: [TargetGroup; 2],
    roles: Roles,

    pass: PassState,
    encoder: Option<wgpu::CommandEncoder>,

    staging: Option<ReadbackStaging>,
    blitter: TextureBlitter,
}

impl MultiTarget {
    /// Allocates both groups, clears them to their initial colors and, when
    /// `config.readback` is set, creates the readback staging.
    ///
    /// Layout validation runs before any GPU object is created. Resource
    /// creation the device still refuses is returned as
    /// [`TargetError::Device`], with nothing left allocated.
    pub fn allocate(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &TargetConfig,
    ) -> Result<Self, TargetError> {
        let specs = config.attachments().or_else(reject)?;
        let layout = validate_layout(device, config.width, config.height, &specs).or_else(reject)?;

        let size = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };
        let roles = Roles::default();

        // Some adapters restrict formats beyond the guaranteed feature table;
        // the device only reports that once the textures are created.
        let (groups, staging) = capture_validation(device, || {
            let groups = [
                TargetGroup::new(device, GroupId::A, size, &layout),
                TargetGroup::new(device, GroupId::B, size, &layout),
            ];
            let staging = config
                .readback
                .then(|| ReadbackStaging::new(device, &groups[roles.data().slot()]));
            (groups, staging)
        })
        .or_else(reject)?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("pingpong initial clear"),
        });
        for group in &groups {
            group.record_clears(&mut encoder, &specs);
        }
        queue.submit(std::iter::once(encoder.finish()));

        log::info!(
            "allocated {}x{} multi-target: {} attachments {:?}, readback {}",
            size.width,
            size.height,
            specs.len(),
            specs.iter().map(|s| s.format).collect::<Vec<_>>(),
            if staging.is_some() { "on" } else { "off" }
        );

        let targets = Self {
            device: device.clone(),
            queue: queue.clone(),
            size,
            specs,
            groups,
            roles,
            pass: PassState::Idle,
            encoder: None,
            staging,
            blitter: TextureBlitter::new(),
        };
        targets.refresh_mirrors();
        Ok(targets)
    }

    /// Single `format` and `color` broadcast to `count` attachments.
    #[allow(clippy::too_many_arguments)]
    pub fn allocate_uniform(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        count: usize,
        color: Color,
        readback: bool,
    ) -> Result<Self, TargetError> {
        let config = TargetConfig::uniform(width, height, format, count, color).readback(readback);
        Self::allocate(device, queue, &config)
    }

    // ── layout ────────────────────────────────────────────────────────────

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn attachment_count(&self) -> usize {
        self.specs.len()
    }

    /// The range check every indexed call performs.
    pub fn index_in_range(&self, index: usize) -> bool {
        index < self.attachment_count()
    }

    pub fn formats(&self) -> impl Iterator<Item = wgpu::TextureFormat> + '_ {
        self.specs.iter().map(|s| s.format)
    }

    pub fn attachment_specs(&self) -> &[AttachmentSpec] {
        &self.specs
    }

    pub fn group(&self, id: GroupId) -> &TargetGroup {
        &self.groups[id.slot()]
    }

    pub fn data_group(&self) -> GroupId {
        self.roles.data()
    }

    pub fn utility_group(&self) -> GroupId {
        self.roles.utility()
    }

    fn data(&self) -> &TargetGroup {
        self.group(self.roles.data())
    }

    // ── pass scoping ──────────────────────────────────────────────────────

    pub fn is_drawing(&self) -> bool {
        self.pass.is_drawing()
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.pass.active().contains(index)
    }

    pub fn active_indices(&self) -> ActiveSet {
        self.pass.active()
    }

    /// Opens a pass drawing into every attachment of the utility group.
    pub fn begin_all(&mut self) -> Result<(), TargetError> {
        let transition = self.pass.begin_all(self.attachment_count()).or_else(reject)?;
        self.apply(transition);
        Ok(())
    }

    /// Adds attachment `index` to the draw targets, opening a pass if none is open.
    pub fn begin(&mut self, index: usize) -> Result<(), TargetError> {
        let transition = self.pass.begin(index, self.attachment_count()).or_else(reject)?;
        self.apply(transition);
        Ok(())
    }

    /// Closes the open pass, submitting what it recorded, then swaps if asked.
    ///
    /// Closing while idle is a no-op, so `end(true)` on an idle manager is a
    /// plain [`swap`](Self::swap).
    pub fn end(&mut self, swap: bool) -> Result<(), TargetError> {
        let transition = self.pass.end_all();
        if transition == Transition::Unchanged {
            log::debug!("end() without an open pass");
        }
        self.apply(transition);

        if swap {
            self.swap()?;
        }
        Ok(())
    }

    /// Removes attachment `index` from the draw targets; the pass closes when
    /// none remain. Swapping is left to the caller.
    pub fn end_index(&mut self, index: usize) -> Result<(), TargetError> {
        let transition = self.pass.end(index, self.attachment_count()).or_else(reject)?;
        self.apply(transition);
        Ok(())
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Opened => {
                self.encoder = Some(self.device.create_command_encoder(
                    &wgpu::CommandEncoderDescriptor {
                        label: Some("pingpong pass encoder"),
                    },
                ));
                log::trace!("pass opened on group {:?}: {:?}", self.utility_group(), self.pass);
            }
            Transition::Rebound => {
                log::trace!("pass rebound: {:?}", self.pass);
            }
            Transition::Closed => {
                if let Some(encoder) = self.encoder.take() {
                    self.queue.submit(std::iter::once(encoder.finish()));
                }
                log::trace!("pass closed on group {:?}", self.utility_group());
            }
            Transition::Unchanged => {}
        }
    }

    /// Render pass over the active attachments, preserving their contents.
    ///
    /// Color attachment `i` of the pass is utility attachment `i`; inactive
    /// locations are `None`. Pipelines used in it should come from
    /// [`active_color_targets`](Self::active_color_targets).
    pub fn render_pass(&mut self) -> Result<wgpu::RenderPass<'_>, TargetError> {
        self.open_render_pass(None)
    }

    /// Like [`render_pass`](Self::render_pass) but clears every active
    /// attachment to `color` first. Inactive attachments keep their contents.
    pub fn clearing_render_pass(&mut self, color: Color) -> Result<wgpu::RenderPass<'_>, TargetError> {
        self.open_render_pass(Some(color))
    }

    fn open_render_pass(&mut self, clear: Option<Color>) -> Result<wgpu::RenderPass<'_>, TargetError> {
        let active = self.pass.active();
        let utility = &self.groups[self.roles.utility().slot()];
        let Some(encoder) = self.encoder.as_mut() else {
            return reject(TargetError::NoOpenPass);
        };

        if let Some(color) = clear {
            utility.record_active_clears(encoder, active, color);
        }

        let color_attachments: Vec<_> = utility
            .attachments()
            .iter()
            .enumerate()
            .map(|(i, attachment)| {
                active.contains(i).then(|| wgpu::RenderPassColorAttachment {
                    view: &attachment.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        Ok(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pingpong utility pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        }))
    }

    /// Color targets for a pipeline drawing into every attachment.
    pub fn all_color_targets(&self, blend: Option<wgpu::BlendState>) -> Vec<Option<wgpu::ColorTargetState>> {
        self.color_targets(ActiveSet::all(self.attachment_count()), blend)
    }

    /// Color targets matching the render passes of the current active set.
    pub fn active_color_targets(&self, blend: Option<wgpu::BlendState>) -> Vec<Option<wgpu::ColorTargetState>> {
        self.color_targets(self.pass.active(), blend)
    }

    fn color_targets(
        &self,
        active: ActiveSet,
        blend: Option<wgpu::BlendState>,
    ) -> Vec<Option<wgpu::ColorTargetState>> {
        self.specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                active.contains(i).then(|| wgpu::ColorTargetState {
                    format: spec.format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect()
    }

    // ── swap ──────────────────────────────────────────────────────────────

    /// Exchanges the data/utility roles and refreshes the readback mirrors
    /// from the new data group. No pixels are copied between groups.
    ///
    /// Rejected while a pass is open.
    pub fn swap(&mut self) -> Result<(), TargetError> {
        if self.pass.is_drawing() {
            return reject(TargetError::SwapDuringPass);
        }
        self.roles.swap();
        log::trace!("swapped: data = {:?}", self.roles.data());
        self.refresh_mirrors();
        Ok(())
    }

    fn refresh_mirrors(&self) {
        if let Some(staging) = &self.staging {
            staging.refresh_all(&self.device, &self.queue, self.data());
        }
    }

    // ── reading ───────────────────────────────────────────────────────────

    /// Data-group attachment `index`.
    pub fn texture(&self, index: usize) -> Option<&Attachment> {
        self.data().get(index)
    }

    /// View of data-group attachment `index`.
    pub fn view(&self, index: usize) -> Option<&wgpu::TextureView> {
        self.texture(index).map(|a| &a.view)
    }

    /// Views of every data-group attachment, in attachment order.
    pub fn views(&self) -> impl Iterator<Item = &wgpu::TextureView> + '_ {
        self.data().attachments().iter().map(|a| &a.view)
    }

    pub fn readback_enabled(&self) -> bool {
        self.staging.is_some()
    }

    /// Mirror of attachment `index` as of the last swap.
    ///
    /// `None` when readback is disabled or `index` is out of range.
    pub fn mirror(&self, index: usize) -> Option<&Attachment> {
        self.staging.as_ref()?.mirror(index)
    }

    /// Blocking copy of data-group attachment `index` into host memory.
    pub fn read_attachment(&self, index: usize) -> Result<TexelData, TargetError> {
        check_index(index, self.attachment_count()).or_else(reject)?;
        let attachment = &self.data().attachments()[index];
        read_texture(&self.device, &self.queue, &attachment.texture, attachment.info)
    }

    /// Blocking copy of mirror `index` into host memory.
    pub fn read_mirror(&self, index: usize) -> Result<TexelData, TargetError> {
        check_index(index, self.attachment_count()).or_else(reject)?;
        let Some(mirror) = self.mirror(index) else {
            return reject(TargetError::ReadbackDisabled);
        };
        read_texture(&self.device, &self.queue, &mirror.texture, mirror.info)
    }

    // ── drawing out ───────────────────────────────────────────────────────

    /// Draws data attachment `index` at its native size with its top-left at `(x, y)`.
    pub fn draw(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        x: f32,
        y: f32,
        index: usize,
    ) -> Result<(), TargetError> {
        let (w, h) = (self.width() as f32, self.height() as f32);
        self.draw_sized(ctx, target, x, y, w, h, index)
    }

    /// Draws data attachment `index` stretched over `(x, y, w, h)`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_sized(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        index: usize,
    ) -> Result<(), TargetError> {
        check_index(index, self.attachment_count()).or_else(reject)?;
        let source = &self.groups[self.roles.data().slot()].attachments()[index].view;
        self.blitter.draw(ctx, target, source, [x, y, w, h]);
        Ok(())
    }
}

impl Drop for MultiTarget {
    fn drop(&mut self) {
        // Work recorded in a pass that was never closed is submitted rather than lost.
        if let Some(encoder) = self.encoder.take() {
            log::warn!("multi-target dropped with an open pass");
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }
}

/// Checks size, formats and combined attachment cost against the device.
fn validate_layout(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    specs: &[AttachmentSpec],
) -> Result<Vec<FormatInfo>, TargetError> {
    if width == 0 || height == 0 {
        return Err(TargetError::InvalidSize { width, height });
    }

    let limits = device.limits();
    let limit = limits.max_texture_dimension_2d;
    if width > limit || height > limit {
        return Err(TargetError::SizeExceedsLimit { width, height, limit });
    }

    let max_attachments = limits.max_color_attachments as usize;
    if specs.len() > max_attachments {
        return Err(TargetError::TooManyAttachments {
            requested: specs.len(),
            max: max_attachments,
        });
    }

    let features = device.features();
    let layout = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| check_attachment_format(i, spec.format, features))
        .collect::<Result<Vec<_>, _>>()?;

    let formats: Vec<_> = specs.iter().map(|s| s.format).collect();
    let bytes = color_bytes_per_sample(&formats);
    let limit = limits.max_color_attachment_bytes_per_sample;
    if bytes > limit {
        return Err(TargetError::AttachmentBytesExceeded { bytes, limit });
    }

    Ok(layout)
}
