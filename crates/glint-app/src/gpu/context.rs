use std::sync::Arc;

use anyhow::{anyhow, Result};
use wgpu::{
    Adapter, Device, DeviceDescriptor, ExperimentalFeatures, Instance, InstanceDescriptor,
    MemoryHints, PowerPreference, Queue, RequestAdapterOptions, Surface, SurfaceCapabilities,
    SurfaceConfiguration, TextureFormat, TextureUsages, Trace,
};
use winit::window::Window;

/// Format of the feedback channel buffers.
pub const CHANNEL_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Device, queue and the window surface they present to.
pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
}

impl GpuContext {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let instance = Instance::new(&InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;
        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;
        let (device, queue) = request_device(&adapter)?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = display_format(&capabilities)
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
        let size = window.inner_size();
        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: capabilities.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &surface_config);

        let info = adapter.get_info();
        log::info!(
            "GPU initialized: {} ({:?}), surface {format:?}",
            info.name,
            info.backend
        );

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
        })
    }

    pub fn format(&self) -> TextureFormat {
        self.surface_config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.surface.configure(&self.device, &self.surface_config);
        }
    }
}

fn request_device(adapter: &Adapter) -> Result<(Device, Queue)> {
    let pair = pollster::block_on(adapter.request_device(&DeviceDescriptor {
        label: Some("glint-device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        experimental_features: ExperimentalFeatures::default(),
        memory_hints: MemoryHints::Performance,
        trace: Trace::Off,
    }))?;
    Ok(pair)
}

/// Shaders write display values directly, as they would to a default GL
/// framebuffer, so a non-sRGB surface is preferred.
fn display_format(capabilities: &SurfaceCapabilities) -> Option<TextureFormat> {
    capabilities
        .formats
        .iter()
        .find(|f| !f.is_srgb())
        .or_else(|| capabilities.formats.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: Vec<TextureFormat>) -> SurfaceCapabilities {
        SurfaceCapabilities {
            formats,
            ..Default::default()
        }
    }

    #[test]
    fn prefers_linear_surface_format() {
        let c = caps(vec![TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm]);
        assert_eq!(display_format(&c), Some(TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn falls_back_to_first_format() {
        let c = caps(vec![TextureFormat::Rgba8UnormSrgb]);
        assert_eq!(display_format(&c), Some(TextureFormat::Rgba8UnormSrgb));
        assert_eq!(display_format(&caps(Vec::new())), None);
    }
}
