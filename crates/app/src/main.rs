//! Prism demo application.
//!
//! Opens a window, brings up the renderer, and spins a textured cube above
//! a floor plane under a directional light.

use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use prism_core::{RendererConfig, Timer};
use prism_platform::Window;
use prism_renderer::Renderer;
use prism_resources::{Mesh, ShaderSet, Texture};
use prism_scene::{DEFAULT_PIPELINE, Drawable, DrawableId, Scene, Transform};

/// Degrees per second the demo cube spins.
const CUBE_SPIN_SPEED: f32 = 45.0;

struct App {
    config: RendererConfig,
    shaders: ShaderSet,
    scene: Scene,
    cube: DrawableId,
    timer: Timer,
    window: Option<Window>,
    renderer: Option<Renderer>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(
            event_loop,
            self.config.window_width,
            self.config.window_height,
            &self.config.title,
        ) {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let mut renderer = match Renderer::new(&window, &self.config) {
            Ok(renderer) => renderer,
            Err(e) => {
                error!("Failed to create renderer: {:?}", e);
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = renderer.add_pipeline(DEFAULT_PIPELINE, &self.shaders) {
            error!("Failed to create default pipeline: {:?}", e);
            event_loop.exit();
            return;
        }

        self.scene.set_viewport_size(window.width(), window.height());

        info!("Initialization complete, entering main loop");
        self.window = Some(window);
        self.renderer = Some(renderer);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(ref mut window) = self.window {
                    window.resize(size.width, size.height);
                }
                self.scene.set_viewport_size(size.width, size.height);
                if let Some(ref mut renderer) = self.renderer {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let delta = self.timer.delta_secs();
                if let Some(cube) = self.scene.drawable_mut(self.cube) {
                    cube.transform.rotation.y += CUBE_SPIN_SPEED * delta;
                }

                if let Some(ref mut renderer) = self.renderer
                    && let Err(e) = renderer.render_frame(&self.scene)
                {
                    error!("Render error: {:?}", e);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

/// Assembles the demo scene: a spinning cube above a wide floor plane.
fn build_demo_scene() -> Result<(Scene, DrawableId)> {
    let mut scene = Scene::new();

    scene.camera.position = Vec3::new(2.5, 2.0, 2.5);
    scene.camera.look_at(Vec3::ZERO);
    scene.light.direction = Vec3::new(-1.0, -1.5, -0.5);

    let cube_mesh =
        Mesh::load(Path::new("assets/meshes/cube.mesh")).context("loading cube mesh")?;
    let cube = scene.add_drawable(
        Drawable::new("cube", cube_mesh)
            .with_texture(Texture::solid(1, 1, [0.85, 0.55, 0.25, 1.0])),
    );

    let floor_mesh =
        Mesh::load(Path::new("assets/meshes/floor.mesh")).context("loading floor mesh")?;
    scene.add_drawable(
        Drawable::new("floor", floor_mesh)
            .with_texture(Texture::solid(1, 1, [0.35, 0.38, 0.42, 1.0]))
            .with_transform(Transform {
                position: Vec3::new(0.0, -1.0, 0.0),
                rotation: Vec3::ZERO,
                scale: Vec3::new(4.0, 1.0, 4.0),
            }),
    );

    Ok((scene, cube))
}

fn main() -> Result<()> {
    prism_core::init_logging();
    info!("Starting prism");

    let config = RendererConfig::default()
        .with_title("Prism")
        .with_window_size(1280, 720);

    let (scene, cube) = build_demo_scene()?;
    let shaders =
        ShaderSet::load(Path::new("assets/shaders"), "default").context("loading default shaders")?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        config,
        shaders,
        scene,
        cube,
        timer: Timer::new(),
        window: None,
        renderer: None,
    };
    event_loop.run_app(&mut app)?;

    Ok(())
}
