use bytemuck::{Pod, Zeroable};
use wgpu::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, BufferBindingType, ColorTargetState,
    CommandEncoder, Device, FilterMode, FragmentState, PipelineCompilationOptions,
    PipelineLayoutDescriptor, PrimitiveState, Queue, RenderPipeline, Sampler, SamplerBindingType,
    ShaderStages, TextureFormat, TextureSampleType, TextureView, TextureViewDimension,
    VertexState,
};

use super::fullscreen_quad::{run_fullscreen_pass, FULLSCREEN_TRIANGLE_VS};
use super::render_target::RenderTarget;

/// Upscales a channel onto the surface. A channel texel covers a
/// `downscale x downscale` block of pixels, and row 0 of the channel is the
/// bottom of the window so `gl_FragCoord` reads bottom-up as in GL.
const COMPOSITE_FS: &str = r#"
struct CompositeUniforms {
    texel_scale: vec2f,
    _pad: vec2f,
}

@group(0) @binding(0) var src_tex: texture_2d<f32>;
@group(0) @binding(1) var src_sampler: sampler;
@group(0) @binding(2) var<uniform> u: CompositeUniforms;

@fragment
fn fs_main(@builtin(position) frag: vec4f) -> @location(0) vec4f {
    let uv = frag.xy * u.texel_scale;
    let color = textureSample(src_tex, src_sampler, vec2f(uv.x, 1.0 - uv.y));
    return vec4f(color.rgb, 1.0);
}
"#;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CompositeUniforms {
    texel_scale: [f32; 2],
    _pad: [f32; 2],
}

impl CompositeUniforms {
    fn new(source_width: u32, source_height: u32, downscale: u32) -> Self {
        let d = downscale.max(1) as f32;
        Self {
            texel_scale: [
                1.0 / (d * source_width.max(1) as f32),
                1.0 / (d * source_height.max(1) as f32),
            ],
            _pad: [0.0; 2],
        }
    }
}

/// Presents the last stage's channel on the window surface.
pub struct Compositor {
    pipeline: RenderPipeline,
    bgl: BindGroupLayout,
    sampler: Sampler,
    uniform_buffer: wgpu::Buffer,
}

impl Compositor {
    pub fn new(device: &Device, surface_format: TextureFormat, filter: FilterMode) -> Self {
        let bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("compositor-bgl"),
            entries: &[
                tex_entry(0),
                sampler_entry(1),
                uniform_entry(2, std::mem::size_of::<CompositeUniforms>()),
            ],
        });
        let pipeline = create_fs_pipeline(device, "compositor", &bgl, surface_format);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("compositor-uniforms"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            bgl,
            sampler: create_sampler(device, filter),
            uniform_buffer,
        }
    }

    /// Draw `source` onto `surface`, or clear it when there is nothing to show.
    pub fn composite(
        &self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        source: Option<&RenderTarget>,
        downscale: u32,
        surface: &TextureView,
    ) {
        let Some(source) = source else {
            run_fullscreen_pass(encoder, "compositor-blank", None, surface);
            return;
        };

        let (width, height) = source.size();
        let uniforms = CompositeUniforms::new(width, height, downscale);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("compositor-bg"),
            layout: &self.bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&source.view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.sampler),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        run_fullscreen_pass(
            encoder,
            "compositor",
            Some((&self.pipeline, &bind_group)),
            surface,
        );
    }
}

fn create_sampler(device: &Device, filter: FilterMode) -> Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("compositor-sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    })
}

// --- Bind group layout helpers, shared with the stage programs ---

pub(super) fn tex_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: true },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

pub(super) fn sampler_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Sampler(SamplerBindingType::Filtering),
        count: None,
    }
}

/// `size == 0` leaves the minimum binding size to be checked at draw time.
pub(super) fn uniform_entry(binding: u32, size: usize) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: std::num::NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn create_fs_pipeline(
    device: &Device,
    label: &str,
    bgl: &BindGroupLayout,
    target_format: TextureFormat,
) -> RenderPipeline {
    let full_source = format!("{FULLSCREEN_TRIANGLE_VS}\n{COMPOSITE_FS}");
    let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(full_source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(&format!("{label}-layout")),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{label}-pipeline")),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader_module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: &shader_module,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: target_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: PipelineCompilationOptions::default(),
        }),
        primitive: PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
