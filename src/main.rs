use std::sync::Arc;

use clap::Parser;
use glam::Vec3;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Fullscreen, Window, WindowId},
};

use foveated_renderer::camera::{Camera, CameraController, CameraPose, FlyController, FOV_RATE};
use foveated_renderer::cli::Cli;
use foveated_renderer::frame::{FrameClock, IntervalStats};
use foveated_renderer::input::{InputEvent, InputState};
use foveated_renderer::renderer::Renderer;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Known-good starting view over the instanced city
fn default_camera() -> Camera {
    Camera::new(
        Vec3::new(-3.000_140, 1.453_398, -2.767_532),
        -670.001_5,
        -20.000_036,
        31.015_045,
    )
}

struct App {
    cli: Cli,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    camera: Camera,
    controller: Box<dyn CameraController>,
    input: InputState,
    clock: FrameClock,
    frame_stats: IntervalStats,
}

impl App {
    fn new(cli: Cli, camera: Camera) -> Self {
        Self {
            cli,
            window: None,
            renderer: None,
            camera,
            controller: Box::new(FlyController::default()),
            input: InputState::default(),
            clock: FrameClock::new(),
            frame_stats: IntervalStats::new("ms/frame", 5.0),
        }
    }

    fn redraw(&mut self) {
        let frame = self.clock.tick(self.input.drain());

        // Toggles and the pose dump apply here, at the frame boundary, so
        // the rendering path never changes mid-frame
        for event in &frame.input.events {
            match event {
                InputEvent::ToggleFoveation => {
                    if let Some(renderer) = &mut self.renderer {
                        renderer.toggle_foveation();
                    }
                }
                InputEvent::ToggleWireframe => {
                    if let Some(renderer) = &mut self.renderer {
                        renderer.toggle_wireframe();
                    }
                }
                InputEvent::DumpPose => println!("{}", self.camera.pose().to_json()),
            }
        }

        if self.input.keyboard().is_down(KeyCode::KeyP) {
            self.camera.adjust_fov(FOV_RATE * frame.delta);
        }
        if self.input.keyboard().is_down(KeyCode::KeyO) {
            self.camera.adjust_fov(-FOV_RATE * frame.delta);
        }

        let (dx, dy) = frame.input.mouse_delta;
        self.controller.process_mouse(&mut self.camera, dx, dy);
        self.controller
            .process_keyboard(&mut self.camera, self.input.keyboard(), frame.delta);

        if let Some(renderer) = &mut self.renderer {
            if let Err(error) = renderer.render(&self.camera, &frame) {
                eprintln!("Render error: {}", error);
            }
        }

        self.frame_stats.report(frame.delta);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let mut attributes = Window::default_attributes().with_title("Foveated Rendering");
        attributes = match self.cli.windowed_size() {
            Some((width, height)) => {
                attributes.with_inner_size(winit::dpi::PhysicalSize::new(width, height))
            }
            None => attributes.with_fullscreen(Some(Fullscreen::Borderless(None))),
        };

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                eprintln!("Failed to create window: {}", error);
                event_loop.exit();
                return;
            }
        };

        // Capture the cursor for mouse look
        window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
            .ok();
        window.set_cursor_visible(false);

        let renderer = match pollster::block_on(Renderer::new(window.clone(), &self.cli)) {
            Ok(renderer) => renderer,
            Err(error) => {
                eprintln!("Failed to initialize renderer: {}", error);
                event_loop.exit();
                return;
            }
        };

        self.window = Some(window);
        self.renderer = Some(renderer);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => self.input.handle_key(&event),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.handle_mouse_motion(dx, dy);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let camera = match &cli.pose {
        Some(json) => Camera::from_pose(
            &CameraPose::from_json(json).map_err(|e| format!("invalid --pose: {}", e))?,
        ),
        None => default_camera(),
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(cli, camera);

    println!(
        "Foveated Renderer - WASD + mouse to fly, LShift toggles foveation, \
         Space wireframe, P/O adjust FOV, 1 dumps the camera pose, Escape quits"
    );
    event_loop.run_app(&mut app)?;

    Ok(())
}
