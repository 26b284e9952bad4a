use crate::preprocess::{CompileUnit, CompilerMessage};

pub const CHANNEL_COUNT: usize = 4;

/// Per-frame values of the standard uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGlobals {
    pub position: [f32; 3],
    /// Column-major.
    pub eye: [[f32; 3]; 3],
    pub time: f32,
    pub frame: f32,
    pub resolution: [f32; 2],
}

impl Default for FrameGlobals {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            eye: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            time: 0.0,
            frame: 0.0,
            resolution: [1.0, 1.0],
        }
    }
}

/// Uniform values for one stage draw: the standard block header followed by
/// the stage's parameter values in block order.
#[derive(Debug, Clone, Copy)]
pub struct StageUniforms<'a> {
    pub globals: &'a FrameGlobals,
    pub params: &'a [f32],
}

/// The GPU operations the pipeline needs.
///
/// `clear`, `draw` and `composite` record into the current frame; the wgpu
/// implementation ignores them outside a frame.
pub trait RenderBackend {
    type Program;
    type Target;

    fn compile(&mut self, unit: &CompileUnit) -> Result<Self::Program, Vec<CompilerMessage>>;

    /// A zero-initialised color target.
    fn create_target(&mut self, label: &str, width: u32, height: u32) -> Self::Target;

    fn clear(&mut self, target: &Self::Target);

    fn draw(
        &mut self,
        program: &Self::Program,
        uniforms: &StageUniforms<'_>,
        inputs: [&Self::Target; CHANNEL_COUNT],
        output: &Self::Target,
    );

    /// Show `source` on the display, upscaled by `downscale`. `None` presents
    /// a blank frame.
    fn composite(&mut self, source: Option<&Self::Target>, downscale: u32);
}
