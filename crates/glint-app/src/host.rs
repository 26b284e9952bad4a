use winit::event::WindowEvent;
use winit::keyboard::KeyCode;

/// Hooks the windowing run loop drives.
///
/// The event loop owns the implementor and calls `init` once after
/// construction, `update` once per redraw, and `shutdown` once before exit.
pub trait Lifecycle {
    fn init(&mut self);

    fn shutdown(&mut self);

    /// One frame tick: reload if needed, advance state, render and present.
    fn update(&mut self);

    fn resized(&mut self, width: u32, height: u32);

    /// A physical key changed state. Not called while the UI has keyboard focus.
    fn key(&mut self, key: KeyCode, pressed: bool);

    /// Raw event passthrough, seen before any other handling.
    /// Returns true if the event was consumed.
    fn process_event(&mut self, event: &WindowEvent) -> bool;

    fn wants_keyboard(&self) -> bool;

    fn quit_requested(&self) -> bool;
}
