pub mod overlay;
pub mod param_panel;
