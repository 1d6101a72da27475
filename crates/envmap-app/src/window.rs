//! Window event loop driving the scene.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use envmap_config::{Config, WindowConfig};
use envmap_render::{FrameEncoder, RenderContext, SurfaceError, init_render_context_blocking};
use tracing::{debug, error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::AppError;
use crate::frame_clock::FrameClock;
use crate::scene::SceneContext;

/// How often `config.ron` is checked for changes.
const CONFIG_RELOAD_INTERVAL: Duration = Duration::from_secs(1);

/// Keyboard commands understood by the demo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    ToggleProjection,
    ToggleQuad,
    CycleShape,
    Exit,
}

/// What the event loop does when a frame cannot be acquired. Every variant
/// except `Exit` requests another redraw, so the loop keeps animating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceRecovery {
    /// Skip this frame.
    Retry,
    /// Reconfigure the surface at its current size.
    Reconfigure,
    Exit,
}

impl SurfaceRecovery {
    pub fn for_error(err: &SurfaceError) -> Self {
        match err {
            SurfaceError::Timeout => Self::Retry,
            SurfaceError::Lost => Self::Reconfigure,
            SurfaceError::OutOfMemory => Self::Exit,
        }
    }

    pub fn requests_redraw(self) -> bool {
        self != Self::Exit
    }
}

/// Whether a `Resized` event changes the surface. Platforms that report the
/// initial size as a resize would otherwise override the configured target
/// size before the user has touched the window.
fn is_new_size(current: (u32, u32), width: u32, height: u32) -> bool {
    current != (width.max(1), height.max(1))
}

pub fn key_action(code: KeyCode) -> Option<KeyAction> {
    match code {
        KeyCode::KeyP => Some(KeyAction::ToggleProjection),
        KeyCode::KeyQ => Some(KeyAction::ToggleQuad),
        KeyCode::KeyS => Some(KeyAction::CycleShape),
        KeyCode::Escape => Some(KeyAction::Exit),
        _ => None,
    }
}

pub fn window_attributes_from_config(config: &WindowConfig) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.width as f64,
            config.height as f64,
        ))
}

pub struct AppState {
    config: Config,
    config_dir: Option<PathBuf>,
    window: Option<Arc<Window>>,
    gpu: Option<RenderContext>,
    scene: Option<SceneContext>,
    clock: FrameClock,
    last_reload_check: Instant,
    error: Option<AppError>,
}

impl AppState {
    pub fn new(config: Config, config_dir: Option<PathBuf>) -> Self {
        Self {
            config,
            config_dir,
            window: None,
            gpu: None,
            scene: None,
            clock: FrameClock::new(),
            last_reload_check: Instant::now(),
            error: None,
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let attrs = window_attributes_from_config(&self.config.window);
        let window = Arc::new(event_loop.create_window(attrs)?);
        let gpu = init_render_context_blocking(window.clone(), self.config.window.vsync)?;
        let (width, height) = gpu.size();
        let scene = SceneContext::new(
            &gpu.device,
            &gpu.queue,
            gpu.surface_format,
            width,
            height,
            &self.config,
        )?;
        info!(
            "Window ready: {width}x{height} ({:?}), targets {}x{} until resized",
            gpu.surface_format, self.config.render.target_width, self.config.render.target_height
        );

        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        self.scene = Some(scene);
        self.clock = FrameClock::new();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!("{err}");
        self.error = Some(err);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut scene) = self.scene.take()
            && let Err(e) = scene.dispose()
        {
            warn!("Scene dispose failed: {e}");
        }
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(action) = key_action(code) else {
            return;
        };
        if action == KeyAction::Exit {
            info!("Escape pressed, shutting down");
            self.shutdown(event_loop);
            return;
        }
        let (Some(gpu), Some(scene)) = (self.gpu.as_ref(), self.scene.as_mut()) else {
            return;
        };
        match action {
            KeyAction::ToggleProjection => {
                if let Err(e) = scene.toggle_projection(&gpu.device, &gpu.queue) {
                    error!("Projection toggle failed: {e}");
                }
            }
            KeyAction::ToggleQuad => {
                scene.toggle_quad();
            }
            KeyAction::CycleShape => {
                scene.cycle_shape(&gpu.device);
            }
            KeyAction::Exit => {}
        }
    }

    fn check_config_reload(&mut self) {
        if self.last_reload_check.elapsed() < CONFIG_RELOAD_INTERVAL {
            return;
        }
        self.last_reload_check = Instant::now();
        let Some(dir) = self.config_dir.as_deref() else {
            return;
        };
        match self.config.reload(dir) {
            Ok(Some(new_config)) => {
                if let (Some(gpu), Some(scene)) = (self.gpu.as_ref(), self.scene.as_mut())
                    && let Err(e) = scene.apply_config(&gpu.device, &gpu.queue, &new_config)
                {
                    warn!("Failed to apply reloaded config: {e}");
                }
                self.config = new_config;
            }
            Ok(None) => {}
            Err(e) => debug!("Config reload skipped: {e}"),
        }
    }

    #[instrument(skip_all)]
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.check_config_reload();
        let tick = self.clock.tick();

        let (Some(gpu), Some(scene)) = (self.gpu.as_mut(), self.scene.as_mut()) else {
            return;
        };
        scene.update(&tick);

        let surface_texture = match gpu.get_current_texture() {
            Ok(texture) => texture,
            Err(e) => {
                let recovery = SurfaceRecovery::for_error(&e);
                match recovery {
                    SurfaceRecovery::Retry => {
                        warn!("Surface {e}, skipping frame {}", tick.frame);
                    }
                    SurfaceRecovery::Reconfigure => {
                        let (width, height) = gpu.size();
                        warn!("Surface {e}, reconfiguring at {width}x{height}");
                        gpu.resize(width, height);
                    }
                    SurfaceRecovery::Exit => {
                        error!("Surface {e}, exiting");
                        self.shutdown(event_loop);
                    }
                }
                if recovery.requests_redraw() {
                    self.request_redraw();
                }
                return;
            }
        };

        let mut frame = FrameEncoder::new(&gpu.device, &gpu.queue, surface_texture);
        if let Some((encoder, view)) = frame.parts()
            && let Err(e) = scene.render(&gpu.device, &gpu.queue, encoder, view, tick.elapsed_ms)
        {
            error!("Frame {} failed: {e}", tick.frame);
        }
        frame.submit();

        if tick.frame > 0 && tick.frame % 600 == 0 {
            debug!("Frame {} at {:.1}s", tick.frame, tick.elapsed_ms / 1000.0);
        }
        self.request_redraw();
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    /// Error that ended the event loop, if any.
    pub fn take_error(&mut self) -> Option<AppError> {
        self.error.take()
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(new_size) => {
                let (Some(gpu), Some(scene)) = (self.gpu.as_mut(), self.scene.as_mut()) else {
                    return;
                };
                if !is_new_size(gpu.size(), new_size.width, new_size.height) {
                    return;
                }
                gpu.resize(new_size.width, new_size.height);
                if let Err(e) =
                    scene.resize(&gpu.device, &gpu.queue, new_size.width, new_size.height)
                {
                    error!("Resize to {}x{} failed: {e}", new_size.width, new_size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Open the window and run until it closes.
///
/// `config_dir`, when given, is polled for `config.ron` changes.
pub fn run(config: Config, config_dir: Option<PathBuf>) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let mut app = AppState::new(config, config_dir);
    event_loop.run_app(&mut app)?;
    match app.take_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_keys() {
        assert_eq!(key_action(KeyCode::KeyP), Some(KeyAction::ToggleProjection));
        assert_eq!(key_action(KeyCode::KeyQ), Some(KeyAction::ToggleQuad));
        assert_eq!(key_action(KeyCode::KeyS), Some(KeyAction::CycleShape));
        assert_eq!(key_action(KeyCode::Escape), Some(KeyAction::Exit));
    }

    #[test]
    fn test_unbound_keys_ignored() {
        assert_eq!(key_action(KeyCode::KeyW), None);
        assert_eq!(key_action(KeyCode::Space), None);
    }

    #[test]
    fn test_recoverable_surface_errors_keep_redrawing() {
        assert_eq!(
            SurfaceRecovery::for_error(&SurfaceError::Timeout),
            SurfaceRecovery::Retry
        );
        assert_eq!(
            SurfaceRecovery::for_error(&SurfaceError::Lost),
            SurfaceRecovery::Reconfigure
        );
        assert!(SurfaceRecovery::Retry.requests_redraw());
        assert!(SurfaceRecovery::Reconfigure.requests_redraw());
    }

    #[test]
    fn test_out_of_memory_stops_redrawing() {
        let recovery = SurfaceRecovery::for_error(&SurfaceError::OutOfMemory);
        assert_eq!(recovery, SurfaceRecovery::Exit);
        assert!(!recovery.requests_redraw());
    }

    #[test]
    fn test_initial_size_report_is_not_a_resize() {
        assert!(!is_new_size((1280, 720), 1280, 720));
        assert!(!is_new_size((1, 1), 0, 0));
        assert!(is_new_size((1280, 720), 1600, 900));
    }

    #[test]
    fn test_window_title_from_config() {
        let config = WindowConfig {
            title: "Nebula Test".to_string(),
            ..WindowConfig::default()
        };
        let attrs = window_attributes_from_config(&config);
        assert_eq!(attrs.title, "Nebula Test");
    }

    #[test]
    fn test_new_state_has_no_gpu() {
        let mut app = AppState::new(Config::default(), None);
        assert!(app.gpu.is_none());
        assert!(app.scene.is_none());
        assert!(app.take_error().is_none());
    }
}
