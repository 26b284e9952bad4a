use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use winit::event::WindowEvent;
use winit::keyboard::KeyCode;
use winit::window::{Fullscreen, Window};

use crate::camera::{Camera, HeldKeys};
use crate::gpu::{GpuContext, WgpuBackend};
use crate::host::Lifecycle;
use crate::params::VariableRegistry;
use crate::pipeline::{FrameGlobals, Pipeline, RenderBackend};
use crate::reload::{ReloadController, ReloadOutcome};
use crate::settings::{SettingsConfig, MAX_DOWNSCALE};
use crate::shader::ShaderWatcher;
use crate::ui::overlay::EguiOverlay;
use crate::ui::param_panel::draw_variables_window;

pub struct App {
    pub window: Arc<Window>,
    pub backend: WgpuBackend,
    pub pipeline: Pipeline<WgpuBackend>,
    pub registry: VariableRegistry,
    pub controller: ReloadController,
    pub watcher: ShaderWatcher,
    pub camera: Camera,
    pub keys: HeldKeys,
    pub egui_overlay: EguiOverlay,
    pub settings: SettingsConfig,
    quit_requested: bool,
    start_time: Instant,
    frame_count: u32,
}

impl App {
    pub fn new(window: Arc<Window>, shader_path: PathBuf, settings: SettingsConfig) -> Result<Self> {
        let gpu = GpuContext::new(window.clone())?;
        let (width, height) = gpu.size();
        let format = gpu.format();
        let mut backend = WgpuBackend::new(gpu, settings.composite_filter.filter_mode());

        let pipeline = Pipeline::new(&mut backend, width, height, settings.downscale);
        let egui_overlay = EguiOverlay::new(&backend.gpu.device, format, &window);
        let watcher =
            ShaderWatcher::new(&shader_path, Duration::from_millis(settings.debounce_ms))?;
        let controller = ReloadController::new(
            shader_path,
            settings.max_stages,
            settings.prune_unreferenced,
        );
        let camera = Camera::new(settings.camera, settings.move_speed, settings.turn_speed);

        Ok(Self {
            window,
            backend,
            pipeline,
            registry: VariableRegistry::new(),
            controller,
            watcher,
            camera,
            keys: HeldKeys::default(),
            egui_overlay,
            settings,
            quit_requested: false,
            start_time: Instant::now(),
            frame_count: 0,
        })
    }

    /// Reload the shader file with the watcher paused.
    fn reload(&mut self) {
        self.watcher.pause();
        let outcome =
            self.controller
                .reload(&mut self.backend, &mut self.pipeline, &mut self.registry);
        self.watcher.resume();
        self.window
            .set_title(&window_title(self.controller.path(), &outcome));
    }

    fn set_downscale(&mut self, downscale: u32) {
        let downscale = downscale.clamp(1, MAX_DOWNSCALE);
        if self.pipeline.set_downscale(&mut self.backend, downscale) {
            let (w, h) = self.pipeline.channel_resolution();
            log::info!("Downscale {downscale} ({w}x{h})");
        }
    }

    fn toggle_fullscreen(&self) {
        if self.window.fullscreen().is_some() {
            self.window.set_fullscreen(None);
        } else {
            self.window
                .set_fullscreen(Some(Fullscreen::Borderless(None)));
        }
    }

    fn globals(&self) -> FrameGlobals {
        let (w, h) = self.pipeline.channel_resolution();
        FrameGlobals {
            position: self.camera.position.to_array(),
            eye: self.camera.eye_columns(),
            time: self.start_time.elapsed().as_secs_f32(),
            frame: self.frame_count as f32,
            resolution: [w as f32, h as f32],
        }
    }

    fn render(&mut self) -> Result<()> {
        if !self.backend.begin_frame()? {
            return Ok(());
        }

        let globals = self.globals();
        self.pipeline
            .render(&mut self.backend, &globals, &self.registry);

        self.egui_overlay.begin_frame(&self.window);
        if self.egui_overlay.visible {
            let ctx = self.egui_overlay.context();
            let pipeline = &self.pipeline;
            draw_variables_window(&ctx, &mut self.registry, |name| {
                pipeline.uses_parameter(name)
            });
        }
        self.egui_overlay.end_frame(&self.window);

        if let Some((device, queue, encoder, view)) = self.backend.frame_parts() {
            self.egui_overlay.render(device, queue, encoder, view);
        }
        self.backend.end_frame();

        self.frame_count = self.frame_count.wrapping_add(1);
        Ok(())
    }
}

/// Title shown while `path` is loaded; carries the error when the last
/// reload did not fully apply.
fn window_title(path: &Path, outcome: &ReloadOutcome) -> String {
    match outcome.error() {
        None => format!("glint - {}", path.display()),
        Some(e) => format!("glint - {} [{e}]", path.display()),
    }
}

/// Advance the camera one tick. Any motion discards accumulated feedback.
fn steer_camera<B: RenderBackend>(camera: &mut Camera, keys: &HeldKeys, pipeline: &mut Pipeline<B>) {
    if camera.update(keys) {
        pipeline.invalidate();
    }
}

impl Lifecycle for App {
    fn init(&mut self) {
        // The first load takes the same path as a file change.
        self.reload();
    }

    fn shutdown(&mut self) {
        self.settings.camera = self.camera.pose();
        self.settings.downscale = self.pipeline.downscale();
        self.settings.save();
        log::info!("Shutting down");
    }

    fn update(&mut self) {
        if self.watcher.drain_changes() {
            self.reload();
        }

        steer_camera(&mut self.camera, &self.keys, &mut self.pipeline);

        if let Err(e) = self.render() {
            log::error!("Render failed: {e}");
            self.quit_requested = true;
        }
    }

    fn resized(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.backend.resize(width, height);
        self.pipeline.resize(&mut self.backend, width, height);
        self.egui_overlay
            .resize(width, height, self.window.scale_factor() as f32);
    }

    fn key(&mut self, key: KeyCode, pressed: bool) {
        self.keys.set(key, pressed);
        if !pressed {
            return;
        }
        match key {
            KeyCode::Escape => self.quit_requested = true,
            KeyCode::KeyF => self.toggle_fullscreen(),
            KeyCode::Tab => self.egui_overlay.toggle_visible(),
            KeyCode::Backspace => {
                self.camera.reset();
                self.pipeline.invalidate();
            }
            KeyCode::Equal => self.set_downscale(self.pipeline.downscale() + 1),
            KeyCode::Minus => self.set_downscale(self.pipeline.downscale().saturating_sub(1)),
            _ => {}
        }
    }

    fn process_event(&mut self, event: &WindowEvent) -> bool {
        let consumed = self.egui_overlay.handle_event(&self.window, event);
        if matches!(event, WindowEvent::Focused(false)) {
            self.keys.clear();
        }
        consumed
    }

    fn wants_keyboard(&self) -> bool {
        self.egui_overlay.wants_keyboard()
    }

    fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}
