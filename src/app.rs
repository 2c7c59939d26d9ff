use crate::assets::load_patch;
use crate::marker::ConsoleMarker;
use anyhow::{Result, anyhow, bail};
use oba_experiment::{
    ExperimentConfig, KeyAction, MarkerSink, NullMarker, SessionController, TickFlow,
};
use oba_render::{StimulusRenderer, random_dot_patch};
use oba_timing::MonotonicClock;
use pixels::{Pixels, SurfaceTexture};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::Arc;
use tiny_skia::Pixmap;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

type Controller = SessionController<MonotonicClock, StdRng, Box<dyn MarkerSink>>;

const TEST_WINDOW_SIZE: (u32, u32) = (1920, 700);
const PATCH_SIZE_PX: u32 = 512;
const PATCH_DOT_COUNT: usize = 120;

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    canvas: Option<Pixmap>,
    renderer: Option<StimulusRenderer>,
    controller: Controller,
    image_root: PathBuf,
    quit_code: KeyCode,
    response_code: KeyCode,
    test_mode: bool,
    /// Logical key presses collected since the last presented frame.
    pressed: Vec<KeyAction>,
    current_size: Option<PhysicalSize<u32>>,
    scale_factor: f64,
    refresh_rate: Option<f64>,
    should_exit: bool,
}

impl App {
    pub fn new(config: ExperimentConfig, image_root: PathBuf) -> Result<Self> {
        let bindings = config.keyboard.bindings();
        let quit_code = keycode_for(bindings.quit_key)?;
        let response_code = keycode_for(bindings.response_key)?;
        let test_mode = config.subject_id == "test";

        let marker: Box<dyn MarkerSink> = if config.send_markers {
            Box::new(ConsoleMarker)
        } else {
            Box::new(NullMarker)
        };
        let controller =
            SessionController::new(config, MonotonicClock::new(), StdRng::from_os_rng(), marker)?;

        Ok(Self {
            window: None,
            pixels: None,
            canvas: None,
            renderer: None,
            controller,
            image_root,
            quit_code,
            response_code,
            test_mode,
            pressed: Vec::new(),
            current_size: None,
            scale_factor: 1.0,
            refresh_rate: None,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let mut window_attributes = Window::default_attributes()
            .with_title("FBA tilt detection")
            .with_resizable(false);
        if self.test_mode {
            window_attributes = window_attributes
                .with_inner_size(LogicalSize::new(TEST_WINDOW_SIZE.0, TEST_WINDOW_SIZE.1));
        } else {
            window_attributes = window_attributes
                .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor.clone()))));
        }

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        self.current_size = Some(physical_size);
        self.scale_factor = window.scale_factor();

        println!("Display Configuration:");
        println!(
            "  Physical size: {}x{}",
            physical_size.width, physical_size.height
        );
        println!("  Scale factor: {:.2}", self.scale_factor);
        if let Some(refresh_rate) = self.refresh_rate {
            println!("  Refresh rate: {:.1} Hz", refresh_rate);
        }

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);
        self.canvas = Pixmap::new(physical_size.width, physical_size.height);

        let (patch1, patch2) = self.load_patches()?;
        self.renderer = Some(StimulusRenderer::new(
            physical_size.width,
            physical_size.height,
            patch1,
            patch2,
        ));

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// Pre-flight asset loading: fatal outside test mode, synthesized
    /// random-dot patches when running as the "test" subject.
    fn load_patches(&self) -> Result<(Pixmap, Pixmap)> {
        let path1 = self.image_root.join("image1.png");
        let path2 = self.image_root.join("image2.png");
        if path1.exists() && path2.exists() {
            return Ok((load_patch(&path1)?, load_patch(&path2)?));
        }
        if !self.test_mode {
            bail!(
                "patch images not found under {} (required outside test mode)",
                self.image_root.display()
            );
        }
        println!("Patch assets not found; synthesizing random-dot patches.");
        let mut rng = StdRng::from_os_rng();
        let patch1 = random_dot_patch(
            &mut rng,
            PATCH_SIZE_PX,
            PATCH_DOT_COUNT,
            [0, 153, 255, 255],
        );
        let patch2 = random_dot_patch(
            &mut rng,
            PATCH_SIZE_PX,
            PATCH_DOT_COUNT,
            [255, 50, 50, 255],
        );
        Ok((patch1, patch2))
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(canvas), Some(renderer)) =
            (&mut self.pixels, &mut self.canvas, &self.renderer)
        else {
            return Ok(());
        };
        renderer.render_frame(canvas, self.controller.frame_view())?;
        pixels.frame_mut().copy_from_slice(canvas.data());
        pixels.render()?;
        Ok(())
    }

    /// One presented frame: advance the controller with the keys pressed
    /// since the previous frame, then draw its view.
    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let pressed = std::mem::take(&mut self.pressed);
        match self.controller.tick(&pressed) {
            Ok(TickFlow::Quit) => {
                println!("\nQuit key pressed; session aborted.");
                self.cleanup_and_exit(event_loop);
                return;
            }
            Ok(TickFlow::SessionOver) => {
                // Keep presenting the end screen; the response key exits.
                if pressed.contains(&KeyAction::Response) {
                    self.cleanup_and_exit(event_loop);
                    return;
                }
            }
            Ok(TickFlow::Continue) => {}
            Err(e) => {
                eprintln!("Fatal: {e:#}");
                self.cleanup_and_exit(event_loop);
                return;
            }
        }
        if let Err(e) = self.render() {
            eprintln!("Render error: {e:#}");
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn handle_input(&mut self, key: PhysicalKey) {
        if let PhysicalKey::Code(code) = key {
            if code == self.quit_code {
                self.pressed.push(KeyAction::Quit);
            } else if code == self.response_code {
                self.pressed.push(KeyAction::Response);
            }
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.current_size = Some(new_size);
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                eprintln!("Failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                eprintln!("Failed to resize buffer: {e}");
            }
        }
        self.canvas = Pixmap::new(new_size.width, new_size.height);
        if let Some(renderer) = &mut self.renderer {
            renderer.set_viewport(new_size.width, new_size.height);
        }
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        if self.controller.is_finished() {
            println!(
                "\nSession complete; {} trials logged to {}.",
                self.controller.log().len(),
                self.controller.config().log_path.display()
            );
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                eprintln!("Failed to create window and surface: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => self.frame(event_loop),
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_input(event.physical_key);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }
}

fn keycode_for(name: &str) -> Result<KeyCode> {
    match name {
        "backspace" => Ok(KeyCode::Backspace),
        "num0" => Ok(KeyCode::Numpad0),
        "escape" => Ok(KeyCode::Escape),
        "space" => Ok(KeyCode::Space),
        other => bail!("key name '{other}' not recognized"),
    }
}
