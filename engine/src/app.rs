use std::collections::HashSet;
use std::time::Instant;

use pixels::{Pixels, PixelsBuilder, SurfaceTexture};
use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::canvas::Canvas;
use crate::clock::{FrameClock, FrameTick};
use crate::surface::SurfaceSize;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create pixel surface: {0}")]
    Pixels(#[from] pixels::Error),
}

pub struct AppConfig {
    pub title: String,
    pub desired_size: PhysicalSize<u32>,
    /// Logical drawing resolution; the pixel buffer is scaled to the window.
    pub buffer_size: SurfaceSize,
    pub vsync: bool,
}

/// Keyboard state accumulated between two redraws.
#[derive(Debug, Clone, Default)]
pub struct InputFrame {
    pub keys_down: HashSet<VirtualKeyCode>,
    pub keys_pressed: HashSet<VirtualKeyCode>,
    pub keys_released: HashSet<VirtualKeyCode>,
}

impl InputFrame {
    pub fn apply_key(&mut self, key: VirtualKeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                // OS key-repeat delivers repeated presses for a held key.
                if self.keys_down.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_down.remove(&key);
                self.keys_released.insert(key);
            }
        }
    }

    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
    }

    /// Drops every held key, e.g. when focus moves elsewhere and key-up events will never
    /// arrive.
    pub fn release_all(&mut self) {
        self.keys_released.extend(self.keys_down.drain());
        self.keys_pressed.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Exit,
}

/// A scene driven by [`run_scene`]: one `update` + `draw` per redraw.
pub trait SceneApp {
    fn update(&mut self, input: &InputFrame, tick: FrameTick) -> LoopAction;

    fn draw(&mut self, canvas: &mut Canvas<'_>);

    fn on_focus_changed(&mut self, _focused: bool) {}

    /// Called exactly once before the loop exits.
    fn shutdown(&mut self) {}
}

pub fn run_scene<A: SceneApp + 'static>(config: AppConfig, mut app: A) -> Result<(), AppError> {
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(config.title)
        .with_inner_size(config.desired_size)
        .build(&event_loop)?;

    let window_size = window.inner_size();
    let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
    let buffer_size = config.buffer_size;
    let mut pixels: Pixels =
        PixelsBuilder::new(buffer_size.width, buffer_size.height, surface_texture)
            .enable_vsync(config.vsync)
            .build()?;

    let mut input = InputFrame::default();
    let mut clock = FrameClock::start(Instant::now());
    let mut shut_down = false;

    tracing::info!(
        width = window_size.width,
        height = window_size.height,
        "window opened"
    );

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        let mut exit = false;
        match &event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => exit = true,
                WindowEvent::Resized(size) => {
                    if let Err(err) = pixels.resize_surface(size.width, size.height) {
                        tracing::warn!("resize failed: {err}");
                    }
                    window.request_redraw();
                }
                WindowEvent::Focused(focused) => {
                    if !focused {
                        input.release_all();
                    }
                    app.on_focus_changed(*focused);
                }
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            virtual_keycode: Some(key),
                            state,
                            ..
                        },
                    ..
                } => input.apply_key(*key, *state),
                _ => {}
            },
            Event::RedrawRequested(_) => {
                let tick = clock.tick(Instant::now());
                if app.update(&input, tick) == LoopAction::Exit {
                    exit = true;
                }
                input.end_frame();

                {
                    let mut canvas = Canvas::new(pixels.frame_mut(), buffer_size);
                    app.draw(&mut canvas);
                }
                if let Err(err) = pixels.render() {
                    tracing::warn!("render failed: {err}");
                    exit = true;
                }
            }
            Event::MainEventsCleared => window.request_redraw(),
            Event::LoopDestroyed => exit = true,
            _ => {}
        }

        if exit {
            if !shut_down {
                shut_down = true;
                app.shutdown();
                tracing::info!("scene shut down");
            }
            *control_flow = ControlFlow::Exit;
        }
    });
}
