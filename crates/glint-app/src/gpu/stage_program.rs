use std::borrow::Cow;

use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, Buffer, ColorTargetState, Device, FragmentState,
    PipelineCompilationOptions, PipelineLayout, PipelineLayoutDescriptor, PrimitiveState,
    RenderPipeline, ShaderModule, TextureFormat, VertexState,
};

use crate::pipeline::CHANNEL_COUNT;
use crate::preprocess::{CompileUnit, CompilerMessage};
use crate::shader::validate_fragment;

use super::compositor::{sampler_entry, tex_entry, uniform_entry};
use super::fullscreen_quad::FULLSCREEN_TRIANGLE_VS;
use super::uniforms::block_size;

/// Layout objects every stage program shares: the `Globals` uniform at
/// binding 0, the channel sampler at 1 and the four channel textures at 2..=5.
pub struct StageLayout {
    pub bgl: BindGroupLayout,
    pipeline_layout: PipelineLayout,
    vertex: ShaderModule,
    format: TextureFormat,
}

impl StageLayout {
    pub fn new(device: &Device, format: TextureFormat) -> Self {
        let mut entries = vec![uniform_entry(0, 0), sampler_entry(1)];
        entries.extend((0..CHANNEL_COUNT as u32).map(|i| tex_entry(2 + i)));

        let bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("stage-bgl"),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("stage-layout"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("stage-vs"),
            source: wgpu::ShaderSource::Wgsl(FULLSCREEN_TRIANGLE_VS.into()),
        });

        Self {
            bgl,
            pipeline_layout,
            vertex,
            format,
        }
    }
}

/// One compiled stage: its render pipeline plus a uniform buffer sized for
/// the parameter count it was compiled against.
pub struct StageProgram {
    pub pipeline: RenderPipeline,
    pub uniform_buffer: Buffer,
}

impl StageProgram {
    pub fn new(
        device: &Device,
        layout: &StageLayout,
        unit: &CompileUnit,
    ) -> Result<Self, Vec<CompilerMessage>> {
        validate_fragment(&unit.source)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("stage{}-fs", unit.stage)),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(unit.source.as_str()),
                stage: wgpu::naga::ShaderStage::Fragment,
                defines: &[],
            },
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("stage{}-pipeline", unit.stage)),
            layout: Some(&layout.pipeline_layout),
            vertex: VertexState {
                module: &layout.vertex,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &fragment,
                entry_point: Some("main"),
                targets: &[Some(ColorTargetState {
                    format: layout.format,
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
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(vec![CompilerMessage {
                line: None,
                text: error.to_string(),
            }]);
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("stage{}-globals", unit.stage)),
            size: block_size(unit.parameters.len()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
        })
    }
}
