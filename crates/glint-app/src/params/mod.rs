pub mod registry;
pub mod types;

pub use registry::VariableRegistry;
pub use types::{Bounds, Declaration, Parameter};
