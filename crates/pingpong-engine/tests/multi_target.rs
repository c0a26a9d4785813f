//! GPU-backed checks of allocation, pass scoping, swapping and readback.
//!
//! Each test requests a headless adapter and returns early when none exists.

use pingpong_engine::device::{GpuInit, HeadlessGpu};
use pingpong_engine::paint::Color;
use pingpong_engine::target::{GroupId, MultiTarget, TargetConfig, TargetError};
use wgpu::TextureFormat as F;

const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
const GREEN: Color = Color::new(0.0, 1.0, 0.0, 1.0);
const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);

fn gpu() -> Option<HeadlessGpu> {
    match HeadlessGpu::blocking(GpuInit::default()) {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("skipping: no GPU adapter ({e:#})");
            None
        }
    }
}

fn allocate(gpu: &HeadlessGpu, config: &TargetConfig) -> MultiTarget {
    MultiTarget::allocate(gpu.device(), gpu.queue(), config).unwrap()
}

fn solid(color: Color, w: u32, h: u32) -> Vec<u8> {
    color.to_rgba8().repeat((w * h) as usize)
}

#[test]
fn groups_share_layout_for_one_to_seven_attachments() {
    let Some(gpu) = gpu() else { return };

    for count in 1..=7 {
        let config = TargetConfig::uniform(16, 8, F::R8Unorm, count, Color::BLACK);
        let targets = allocate(&gpu, &config);

        let (a, b) = (targets.group(GroupId::A), targets.group(GroupId::B));
        assert_eq!(a.len(), count);
        assert_eq!(b.len(), count);
        assert_eq!(a.size(), b.size());
        assert_eq!(a.formats().collect::<Vec<_>>(), b.formats().collect::<Vec<_>>());
        assert_eq!((targets.width(), targets.height()), (16, 8));
    }
}

#[test]
fn mixed_formats_are_kept_per_attachment() {
    let Some(gpu) = gpu() else { return };

    let config = TargetConfig::new(8, 8)
        .formats([F::Rgba8Unorm, F::Rgba16Float, F::R8Unorm])
        .color(Color::BLACK);
    let targets = allocate(&gpu, &config);

    for id in [GroupId::A, GroupId::B] {
        let formats: Vec<_> = targets.group(id).formats().collect();
        assert_eq!(formats, vec![F::Rgba8Unorm, F::Rgba16Float, F::R8Unorm]);
    }
}

#[test]
fn adapter_restricted_formats_fail_allocation_without_aborting() {
    let Some(gpu) = gpu() else { return };

    // R32Float is a guaranteed render format, but downlevel adapters refuse it as an attachment.
    let config = TargetConfig::new(8, 8)
        .formats([F::Rgba8Unorm, F::R32Float])
        .readback(true);
    match MultiTarget::allocate(gpu.device(), gpu.queue(), &config) {
        Ok(targets) => assert_eq!(targets.attachment_count(), 2),
        Err(err) => assert!(matches!(err, TargetError::Device(_)), "{err}"),
    }

    // The device stays usable after a refused allocation.
    let targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 1, RED));
    assert_eq!(targets.read_attachment(0).unwrap().bytes, solid(RED, 4, 4));
}

#[test]
fn eight_attachments_are_rejected() {
    let Some(gpu) = gpu() else { return };

    let too_many_formats = TargetConfig::new(8, 8).formats([F::R8Unorm; 8]).color(RED);
    let err = MultiTarget::allocate(gpu.device(), gpu.queue(), &too_many_formats).err();
    assert!(matches!(err, Some(TargetError::TooManyAttachments { requested: 8, .. })));

    let too_many_colors = TargetConfig::new(8, 8).format(F::R8Unorm).colors([RED; 8]);
    assert!(MultiTarget::allocate(gpu.device(), gpu.queue(), &too_many_colors).is_err());
}

#[test]
fn zero_size_and_unusable_formats_are_rejected() {
    let Some(gpu) = gpu() else { return };

    let empty = TargetConfig::uniform(0, 8, F::Rgba8Unorm, 1, RED);
    assert!(matches!(
        MultiTarget::allocate(gpu.device(), gpu.queue(), &empty).err(),
        Some(TargetError::InvalidSize { .. })
    ));

    let integer = TargetConfig::new(8, 8).formats([F::Rgba8Unorm, F::Rgba8Uint]);
    assert!(matches!(
        MultiTarget::allocate(gpu.device(), gpu.queue(), &integer).err(),
        Some(TargetError::UnsupportedFormat { index: 1, .. })
    ));
}

#[test]
fn one_format_three_colors_clears_each_attachment() {
    let Some(gpu) = gpu() else { return };

    let config = TargetConfig::new(4, 4).format(F::Rgba8Unorm).colors([RED, GREEN, BLUE]);
    let targets = allocate(&gpu, &config);

    assert_eq!(targets.attachment_count(), 3);
    assert!(targets.formats().all(|f| f == F::Rgba8Unorm));
    for (i, color) in [RED, GREEN, BLUE].into_iter().enumerate() {
        assert_eq!(targets.read_attachment(i).unwrap().bytes, solid(color, 4, 4), "attachment {i}");
    }
}

#[test]
fn swap_after_begin_all_exposes_the_drawn_group() {
    let Some(gpu) = gpu() else { return };

    let mut targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 2, Color::BLACK));
    let drawn = targets.utility_group();

    targets.begin_all().unwrap();
    drop(targets.clearing_render_pass(GREEN).unwrap());
    targets.end(true).unwrap();

    assert_eq!(targets.data_group(), drawn);
    assert_ne!(targets.utility_group(), drawn);
    for i in 0..2 {
        assert_eq!(targets.read_attachment(i).unwrap().bytes, solid(GREEN, 4, 4));
    }
}

#[test]
fn end_without_swap_keeps_roles() {
    let Some(gpu) = gpu() else { return };

    let mut targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 1, RED));
    let data = targets.data_group();

    targets.begin_all().unwrap();
    drop(targets.clearing_render_pass(BLUE).unwrap());
    targets.end(false).unwrap();

    assert_eq!(targets.data_group(), data);
    assert_eq!(targets.read_attachment(0).unwrap().bytes, solid(RED, 4, 4));
}

#[test]
fn per_index_begin_end_tracks_active_set() {
    let Some(gpu) = gpu() else { return };

    let mut targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 3, Color::BLACK));

    targets.begin(0).unwrap();
    targets.begin(1).unwrap();
    targets.end_index(0).unwrap();
    assert!(targets.is_drawing());
    assert_eq!(targets.active_indices().iter().collect::<Vec<_>>(), vec![1]);

    targets.end_index(1).unwrap();
    assert!(!targets.is_drawing());
    assert!(targets.active_indices().is_empty());
}

#[test]
fn per_index_pass_only_writes_active_attachments() {
    let Some(gpu) = gpu() else { return };

    let mut targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 3, Color::BLACK));

    targets.begin(1).unwrap();
    assert_eq!(targets.active_color_targets(None).iter().filter(|t| t.is_some()).count(), 1);
    drop(targets.clearing_render_pass(BLUE).unwrap());
    targets.end_index(1).unwrap();
    targets.swap().unwrap();

    assert_eq!(targets.read_attachment(0).unwrap().bytes, solid(Color::BLACK, 4, 4));
    assert_eq!(targets.read_attachment(1).unwrap().bytes, solid(BLUE, 4, 4));
    assert_eq!(targets.read_attachment(2).unwrap().bytes, solid(Color::BLACK, 4, 4));
}

#[test]
fn clearing_sparse_active_sets_writes_each_bound_attachment() {
    let Some(gpu) = gpu() else { return };

    for active in [vec![0, 2], vec![1, 2], vec![2]] {
        let mut targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 3, Color::BLACK));

        for &i in &active {
            targets.begin(i).unwrap();
        }
        drop(targets.clearing_render_pass(BLUE).unwrap());
        targets.end(true).unwrap();

        for i in 0..3 {
            let expected = if active.contains(&i) { BLUE } else { Color::BLACK };
            assert_eq!(
                targets.read_attachment(i).unwrap().bytes,
                solid(expected, 4, 4),
                "active {active:?}, attachment {i}"
            );
        }
    }
}

#[test]
fn load_pass_draws_only_into_the_bound_attachment() {
    let Some(gpu) = gpu() else { return };
    let device = gpu.device();

    let mut targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 3, RED));
    targets.begin(2).unwrap();

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fill location 2"),
        source: wgpu::ShaderSource::Wgsl(FILL_LOCATION_2.into()),
    });
    let color_targets = targets.active_color_targets(None);
    assert_eq!(color_targets.iter().map(Option::is_some).collect::<Vec<_>>(), [false, false, true]);

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("fill location 2"),
        layout: None,
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

    {
        let mut pass = targets.render_pass().unwrap();
        pass.set_pipeline(&pipeline);
        pass.draw(0..3, 0..1);
    }
    targets.end(true).unwrap();

    assert_eq!(targets.read_attachment(0).unwrap().bytes, solid(RED, 4, 4));
    assert_eq!(targets.read_attachment(1).unwrap().bytes, solid(RED, 4, 4));
    assert_eq!(targets.read_attachment(2).unwrap().bytes, solid(GREEN, 4, 4));
}

const FILL_LOCATION_2: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    var corners = array<vec2<f32>, 3>(vec2(-1.0, -1.0), vec2(3.0, -1.0), vec2(-1.0, 3.0));
    return vec4<f32>(corners[i], 0.0, 1.0);
}

struct Out {
    @location(2) color: vec4<f32>,
}

@fragment
fn fs_main() -> Out {
    return Out(vec4<f32>(0.0, 1.0, 0.0, 1.0));
}
"#;

#[test]
fn protocol_violations_leave_state_unchanged() {
    let Some(gpu) = gpu() else { return };

    let mut targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 2, Color::BLACK));

    targets.begin(0).unwrap();
    assert!(matches!(targets.begin(0), Err(TargetError::AttachmentAlreadyActive { index: 0 })));
    assert!(matches!(targets.begin_all(), Err(TargetError::PassAlreadyOpen)));
    assert!(matches!(targets.swap(), Err(TargetError::SwapDuringPass)));
    assert_eq!(targets.active_indices().iter().collect::<Vec<_>>(), vec![0]);

    targets.end(false).unwrap();
    assert!(matches!(targets.render_pass().err(), Some(TargetError::NoOpenPass)));
}

#[test]
fn out_of_range_indices_fail_without_mutation() {
    let Some(gpu) = gpu() else { return };

    let mut targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 2, Color::BLACK));
    let data = targets.data_group();

    assert!(!targets.index_in_range(2));
    assert!(targets.texture(2).is_none());
    assert!(matches!(targets.begin(2), Err(TargetError::InvalidIndex { index: 2, count: 2 })));
    assert!(!targets.is_drawing());
    assert!(targets.end_index(2).is_err());
    assert!(targets.read_attachment(2).is_err());
    assert_eq!(targets.data_group(), data);
}

#[test]
fn mirrors_match_data_group_after_each_swap() {
    let Some(gpu) = gpu() else { return };

    let config = TargetConfig::new(8, 4)
        .formats([F::Rgba8Unorm, F::Rgba16Float])
        .colors([RED, BLUE])
        .readback(true);
    let mut targets = allocate(&gpu, &config);
    assert!(targets.readback_enabled());

    // Valid straight after allocation.
    for i in 0..2 {
        assert_eq!(targets.read_mirror(i).unwrap(), targets.read_attachment(i).unwrap());
    }

    for color in [GREEN, RED] {
        targets.begin_all().unwrap();
        drop(targets.clearing_render_pass(color).unwrap());
        targets.end(true).unwrap();

        for i in 0..2 {
            let mirror = targets.read_mirror(i).unwrap();
            assert_eq!(mirror, targets.read_attachment(i).unwrap(), "attachment {i}");
        }
        assert_eq!(targets.read_mirror(0).unwrap().bytes, solid(color, 8, 4));
    }
}

#[test]
fn mirrors_lag_drawing_until_swap() {
    let Some(gpu) = gpu() else { return };

    let config = TargetConfig::uniform(4, 4, F::Rgba8Unorm, 1, RED).readback(true);
    let mut targets = allocate(&gpu, &config);

    targets.begin_all().unwrap();
    drop(targets.clearing_render_pass(GREEN).unwrap());
    targets.end(false).unwrap();
    assert_eq!(targets.read_mirror(0).unwrap().bytes, solid(RED, 4, 4));

    targets.swap().unwrap();
    assert_eq!(targets.read_mirror(0).unwrap().bytes, solid(GREEN, 4, 4));
}

#[test]
fn readback_calls_without_staging_are_noops() {
    let Some(gpu) = gpu() else { return };

    let mut targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 1, RED));
    assert!(!targets.readback_enabled());
    assert!(targets.mirror(0).is_none());
    assert!(matches!(targets.read_mirror(0), Err(TargetError::ReadbackDisabled)));
    targets.swap().unwrap();
}

#[test]
fn draw_blits_data_attachment_into_external_target() {
    use pingpong_engine::render::{RenderCtx, RenderTarget, Viewport};

    let Some(gpu) = gpu() else { return };
    let device = gpu.device();

    let mut targets = allocate(&gpu, &TargetConfig::uniform(4, 4, F::Rgba8Unorm, 2, GREEN));

    let dest = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("test destination"),
        size: wgpu::Extent3d { width: 8, height: 4, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: F::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = dest.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
        let ctx = RenderCtx::new(device, gpu.queue(), F::Rgba8Unorm, Viewport::new(8.0, 4.0));
        let mut target = RenderTarget::new(&mut encoder, &view);
        targets.draw(&ctx, &mut target, 0.0, 0.0, 1).unwrap();
        assert!(targets.draw(&ctx, &mut target, 0.0, 0.0, 2).is_err());
    }
    gpu.queue().submit(std::iter::once(encoder.finish()));

    let info = pingpong_engine::target::FormatInfo::describe(F::Rgba8Unorm).unwrap();
    let pixels = pingpong_engine::readback::read_texture(device, gpu.queue(), &dest, info).unwrap();
    assert_eq!(pixels.texel(0, 0), Some(&GREEN.to_rgba8()[..]));
    assert_eq!(pixels.texel(3, 3), Some(&GREEN.to_rgba8()[..]));
    // Right half is outside the 4x4 quad and stays untouched (zeroed).
    assert_eq!(pixels.texel(6, 2), Some(&[0u8, 0, 0, 0][..]));
}
