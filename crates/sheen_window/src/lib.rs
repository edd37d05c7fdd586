use std::sync::Arc;

use sheen_core::Time;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    error::{EventLoopError, OsError},
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

#[derive(thiserror::Error, Debug)]
pub enum WindowError {
    #[error("Event loop failed: {0}")]
    EventLoop(#[from] EventLoopError),

    #[error("Failed to create window: {0}")]
    CreateWindow(#[from] OsError),

    #[error(transparent)]
    App(#[from] anyhow::Error),
}

/// What the window loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Sheen".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl WindowSettings {
    pub fn attributes(&self) -> WindowAttributes {
        Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(PhysicalSize::new(self.width.max(1), self.height.max(1)))
    }
}

/// The application side of the window loop.
///
/// `init` runs once, when the OS first hands out a window. Every later call
/// happens on the same thread, between `init` and `teardown`.
pub trait AppHandler {
    fn init(&mut self, window: Arc<Window>) -> anyhow::Result<()>;

    fn resize(&mut self, width: u32, height: u32);

    fn frame(&mut self, time: &Time) -> anyhow::Result<()>;

    /// Called on key press only; auto-repeat is filtered out.
    fn key(&mut self, _code: KeyCode) -> Flow {
        Flow::Continue
    }

    fn teardown(&mut self) {}
}

// The state machine that holds the app while waiting for the OS
struct SheenRunner<A: AppHandler> {
    app: A,
    settings: WindowSettings,
    window: Option<Arc<Window>>,
    time: Time,
    // First fatal error; the loop exits as soon as it is set.
    error: Option<WindowError>,
}

impl<A: AppHandler> SheenRunner<A> {
    fn new(app: A, settings: WindowSettings) -> Self {
        Self {
            app,
            settings,
            window: None,
            time: Time::default(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: WindowError) {
        log::error!("{error}");
        self.error.get_or_insert(error);
        event_loop.exit();
    }
}

impl<A: AppHandler> ApplicationHandler for SheenRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(self.settings.attributes()) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        if let Err(e) = self.app.init(window.clone()) {
            return self.fail(event_loop, e.into());
        }
        self.window = Some(window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested; stopping");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.app.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if self.app.key(code) == Flow::Exit {
                    event_loop.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                // 1. Tick the clock
                self.time.update();

                // 2. Run the frame
                if let Err(e) = self.app.frame(&self.time) {
                    return self.fail(event_loop, e.into());
                }

                // 3. Request next frame
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => (),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.app.teardown();
        self.window = None;
    }
}

/// Opens the window and drives `app` until the window closes or a callback fails.
pub fn run_app<A: AppHandler>(app: A, settings: WindowSettings) -> Result<(), WindowError> {
    let event_loop = EventLoop::new()?;

    // Poll keeps the loop spinning without OS events, which is what a
    // continuously animated scene wants.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = SheenRunner::new(app, settings);
    event_loop.run_app(&mut runner)?;

    match runner.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use winit::dpi::Size;

    use super::*;

    #[test]
    fn settings_become_window_attributes() {
        let settings = WindowSettings {
            title: "PBR".into(),
            width: 800,
            height: 0,
        };
        let attributes = settings.attributes();

        assert_eq!(attributes.title, "PBR");
        assert_eq!(
            attributes.inner_size,
            Some(Size::Physical(PhysicalSize::new(800, 1)))
        );
    }
}
