use anyhow::Result;
use wgpu::{
    BindGroupDescriptor, BindGroupEntry, BindingResource, CommandEncoder, FilterMode, Sampler,
    SurfaceTexture, TextureView,
};

use crate::pipeline::{RenderBackend, StageUniforms, CHANNEL_COUNT};
use crate::preprocess::{CompileUnit, CompilerMessage};

use super::compositor::Compositor;
use super::context::{GpuContext, CHANNEL_FORMAT};
use super::fullscreen_quad::run_fullscreen_pass;
use super::render_target::RenderTarget;
use super::stage_program::{StageLayout, StageProgram};
use super::uniforms;

/// Surface texture and encoder for the frame being recorded.
struct Frame {
    surface: SurfaceTexture,
    view: TextureView,
    encoder: CommandEncoder,
}

/// wgpu implementation of the stage pipeline's backend.
///
/// Draw calls record into the encoder opened by `begin_frame`; nothing is
/// submitted until `end_frame`. Calls made outside a frame are dropped.
pub struct WgpuBackend {
    pub gpu: GpuContext,
    layout: StageLayout,
    channel_sampler: Sampler,
    compositor: Compositor,
    frame: Option<Frame>,
}

impl WgpuBackend {
    pub fn new(gpu: GpuContext, composite_filter: FilterMode) -> Self {
        let layout = StageLayout::new(&gpu.device, CHANNEL_FORMAT);
        let channel_sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("channel-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        let compositor = Compositor::new(&gpu.device, gpu.format(), composite_filter);

        Self {
            gpu,
            layout,
            channel_sampler,
            compositor,
            frame: None,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    /// Acquire the next surface texture and open an encoder.
    ///
    /// Returns `Ok(false)` when the frame should be skipped (surface lost or
    /// outdated; it is reconfigured for the next attempt).
    pub fn begin_frame(&mut self) -> Result<bool> {
        let surface = match self.gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (w, h) = self.gpu.size();
                self.gpu.resize(w, h);
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout, skipping frame");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        self.frame = Some(Frame {
            surface,
            view,
            encoder,
        });
        Ok(true)
    }

    /// Device, queue, encoder and surface view of the open frame, for
    /// overlays that draw after the composite.
    pub fn frame_parts(
        &mut self,
    ) -> Option<(&wgpu::Device, &wgpu::Queue, &mut CommandEncoder, &TextureView)> {
        let frame = self.frame.as_mut()?;
        Some((&self.gpu.device, &self.gpu.queue, &mut frame.encoder, &frame.view))
    }

    /// Submit the recorded commands and present.
    pub fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.gpu.queue.submit(std::iter::once(frame.encoder.finish()));
            frame.surface.present();
        }
    }
}

impl RenderBackend for WgpuBackend {
    type Program = StageProgram;
    type Target = RenderTarget;

    fn compile(&mut self, unit: &CompileUnit) -> Result<StageProgram, Vec<CompilerMessage>> {
        StageProgram::new(&self.gpu.device, &self.layout, unit)
    }

    fn create_target(&mut self, label: &str, width: u32, height: u32) -> RenderTarget {
        RenderTarget::new(
            &self.gpu.device,
            width,
            height,
            CHANNEL_FORMAT,
            label,
        )
    }

    fn clear(&mut self, target: &RenderTarget) {
        if let Some(frame) = self.frame.as_mut() {
            run_fullscreen_pass(&mut frame.encoder, "channel-clear", None, &target.view);
        }
    }

    fn draw(
        &mut self,
        program: &StageProgram,
        uniforms: &StageUniforms<'_>,
        inputs: [&RenderTarget; CHANNEL_COUNT],
        output: &RenderTarget,
    ) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        self.gpu
            .queue
            .write_buffer(&program.uniform_buffer, 0, &uniforms::pack(uniforms));

        let mut entries = vec![
            BindGroupEntry {
                binding: 0,
                resource: program.uniform_buffer.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::Sampler(&self.channel_sampler),
            },
        ];
        entries.extend(inputs.iter().enumerate().map(|(i, t)| BindGroupEntry {
            binding: 2 + i as u32,
            resource: BindingResource::TextureView(&t.view),
        }));
        let bind_group = self.gpu.device.create_bind_group(&BindGroupDescriptor {
            label: Some("stage-bg"),
            layout: &self.layout.bgl,
            entries: &entries,
        });

        run_fullscreen_pass(
            &mut frame.encoder,
            "stage",
            Some((&program.pipeline, &bind_group)),
            &output.view,
        );
    }

    fn composite(&mut self, source: Option<&RenderTarget>, downscale: u32) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        self.compositor.composite(
            &self.gpu.device,
            &self.gpu.queue,
            &mut frame.encoder,
            source,
            downscale,
            &frame.view,
        );
    }
}
