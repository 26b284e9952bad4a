mod app;
mod camera;
mod error;
mod gpu;
mod host;
mod params;
mod pipeline;
mod preprocess;
mod reload;
mod settings;
mod shader;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{WindowAttributes, WindowId};

use app::App;
use host::Lifecycle;
use settings::SettingsConfig;

/// Live-reloading multi-pass fragment shader viewer.
#[derive(Parser, Debug)]
#[command(name = "glint", version, about)]
struct Cli {
    /// Shader file; stages are separated by `---` lines
    shader_file: PathBuf,
}

fn usage_line(program: &str) -> String {
    format!("usage: {program} shader_file")
}

struct GlintHost {
    shader_path: PathBuf,
    settings: Option<SettingsConfig>,
    app: Option<App>,
}

impl GlintHost {
    fn new(shader_path: PathBuf, settings: SettingsConfig) -> Self {
        Self {
            shader_path,
            settings: Some(settings),
            app: None,
        }
    }
}

impl ApplicationHandler for GlintHost {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        let Some(settings) = self.settings.take() else {
            return;
        };

        let title = format!("glint - {}", self.shader_path.display());
        let attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(winit::dpi::LogicalSize::new(800, 600));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match App::new(window, self.shader_path.clone(), settings) {
            Ok(mut app) => {
                app.init();
                app.window.request_redraw();
                self.app = Some(app);
                log::info!("glint initialized");
            }
            Err(e) => {
                log::error!("Failed to initialize app: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(app) = self.app.as_mut() else {
            return;
        };

        // Let egui handle events first
        app.process_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                app.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.resized(size.width, size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                // Releases always go through so no key stays held.
                if !pressed || !app.wants_keyboard() {
                    app.key(key, pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                app.update();
                if app.quit_requested() {
                    app.shutdown();
                    event_loop.exit();
                    return;
                }
                app.window.request_redraw();
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info,wgpu_core=warn,wgpu_hal=warn,naga=warn"),
    )
    .format_timestamp_millis()
    .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            e.print()?;
            return Ok(());
        }
        Err(_) => {
            let program = std::env::args().next().unwrap_or_else(|| "glint".into());
            println!("{}", usage_line(&program));
            return Ok(());
        }
    };

    let settings = SettingsConfig::load();

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut host = GlintHost::new(cli.shader_file, settings);
    event_loop.run_app(&mut host)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_positional_argument() {
        let cli = Cli::try_parse_from(["glint", "demo.glsl"]).unwrap();
        assert_eq!(cli.shader_file, PathBuf::from("demo.glsl"));
    }

    #[test]
    fn missing_or_extra_arguments_fail() {
        assert!(Cli::try_parse_from(["glint"]).is_err());
        assert!(Cli::try_parse_from(["glint", "a.glsl", "b.glsl"]).is_err());
    }

    #[test]
    fn usage_names_the_program() {
        assert_eq!(usage_line("./glint"), "usage: ./glint shader_file");
    }
}
