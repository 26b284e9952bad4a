pub mod backend;
pub mod compositor;
pub mod context;
pub mod fullscreen_quad;
pub mod render_target;
pub mod stage_program;
pub mod uniforms;

pub use backend::WgpuBackend;
pub use context::GpuContext;
