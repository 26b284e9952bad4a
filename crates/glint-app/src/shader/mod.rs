pub mod compiler;
pub mod hot_reload;

pub use compiler::validate_fragment;
pub use hot_reload::ShaderWatcher;
