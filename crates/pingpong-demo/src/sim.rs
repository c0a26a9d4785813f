use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use std::path::Path;

use pingpong_engine::paint::Color;
use pingpong_engine::render::{RenderCtx, RenderTarget};
use pingpong_engine::target::{GroupId, MultiTarget, TargetConfig};

/// Reaction-diffusion parameters.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub width: u32,
    pub height: u32,
    pub feed: f32,
    pub kill: f32,
    pub steps_per_frame: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            feed: 0.055,
            kill: 0.062,
            steps_per_frame: 4,
        }
    }
}

/// Attachment holding the simulated color view.
pub const COLOR_ATTACHMENT: usize = 1;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SimUniform {
    feed: f32,
    kill: f32,
    seed: f32,
    _pad: f32,
}

/// Gray-Scott feedback loop over a three-attachment ping-pong target.
pub struct Sim {
    config: SimConfig,
    targets: MultiTarget,
    pipeline: wgpu::RenderPipeline,
    uniform: wgpu::Buffer,
    // One bind group per group, selected by which one is currently `data`.
    bind_groups: [wgpu::BindGroup; 2],
    seed_pending: bool,
}

impl Sim {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, config: SimConfig) -> Result<Self> {
        let target_config = TargetConfig::new(config.width, config.height)
            .formats([
                wgpu::TextureFormat::Rgba16Float,
                wgpu::TextureFormat::Rgba8Unorm,
                wgpu::TextureFormat::Rgba8Unorm,
            ])
            .colors([Color::new(1.0, 0.0, 0.0, 1.0), Color::BLACK])
            .readback(true);
        let targets = MultiTarget::allocate(device, queue, &target_config)
            .context("failed to allocate simulation targets")?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sim shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sim.wgsl").into()),
        });

        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sim bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<SimUniform>() as u64),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sim ubo"),
            size: std::mem::size_of::<SimUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_for = |id: GroupId| -> Result<wgpu::BindGroup> {
            let state = targets
                .group(id)
                .get(0)
                .context("state attachment missing")?;
            Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("sim bind group"),
                layout: &bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&state.view),
                    },
                ],
            }))
        };
        let bind_groups = [bind_group_for(GroupId::A)?, bind_group_for(GroupId::B)?];

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sim pipeline layout"),
            bind_group_layouts: &[&bgl],
            immediate_size: 0,
        });

        let color_targets = targets.all_color_targets(None);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sim pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &color_targets,
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Ok(Self {
            config,
            targets,
            pipeline,
            uniform,
            bind_groups,
            seed_pending: true,
        })
    }

    pub fn reseed(&mut self) {
        self.seed_pending = true;
    }

    /// Advances the simulation by `steps_per_frame` ping-pong steps.
    pub fn step(&mut self, queue: &wgpu::Queue) -> Result<()> {
        for _ in 0..self.config.steps_per_frame {
            let u = SimUniform {
                feed: self.config.feed,
                kill: self.config.kill,
                seed: if std::mem::take(&mut self.seed_pending) { 1.0 } else { 0.0 },
                _pad: 0.0,
            };
            queue.write_buffer(&self.uniform, 0, bytemuck::bytes_of(&u));

            let bind_group = match self.targets.data_group() {
                GroupId::A => &self.bind_groups[0],
                GroupId::B => &self.bind_groups[1],
            };

            self.targets.begin_all()?;
            {
                let mut rpass = self.targets.render_pass()?;
                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, bind_group, &[]);
                rpass.draw(0..3, 0..1);
            }
            self.targets.end(true)?;
        }
        Ok(())
    }

    /// Draws every attachment side by side, scaled to fit the viewport.
    pub fn present(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        let count = self.targets.attachment_count();
        let slot = ctx.viewport.width / count as f32;
        let aspect = self.targets.height() as f32 / self.targets.width() as f32;
        let h = (slot * aspect).min(ctx.viewport.height);
        let w = h / aspect;
        let y = (ctx.viewport.height - h) * 0.5;

        for i in 0..count {
            let x = i as f32 * slot + (slot - w) * 0.5;
            if let Err(e) = self.targets.draw_sized(ctx, target, x, y, w, h, i) {
                log::warn!("present attachment {i}: {e}");
            }
        }
    }

    /// Writes the mirrored color attachment to `path` as PNG.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let pixels = self.targets.read_mirror(COLOR_ATTACHMENT)?;
        let image = image::RgbaImage::from_raw(pixels.width, pixels.height, pixels.bytes)
            .context("mirror size does not match its texel data")?;
        image
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("saved snapshot {}", path.display());
        Ok(())
    }
}
