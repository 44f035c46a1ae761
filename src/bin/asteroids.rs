//! Instancing demo: a planet circled by a ring of rocks.
//!
//! ```text
//! asteroids [planet.obj] [rock.obj]
//! ```
//!
//! Both models go through the same material binding path; the planet is drawn
//! with a single instance and the rocks with one instance per ring member.

use std::{iter, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use cgmath::{Deg, InnerSpace, Rad, Rotation3, Vector3};
use instant::{Duration, Instant};
use rand::Rng;
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use model_ngin::{
    camera::{Camera, CameraResources, Projection},
    config::LoadOptions,
    context::Context,
    data_structures::{
        instance::Instance,
        model::{DrawModel, Model, ModelBinding},
        texture::Texture,
    },
    pipelines::material::ModelPipeline,
};

const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 720;
const ROCK_COUNT: usize = 10_000;
const RING_RADIUS: f32 = 20.0;
const RING_OFFSET: f32 = 2.5;
const ROCK_ROTATION_AXIS: Vector3<f32> = Vector3::new(0.4, 0.6, 0.8);
const CAMERA_DISTANCE: f32 = 45.0;
const CAMERA_HEIGHT: f32 = 12.0;
const CAMERA_SPEED: Deg<f32> = Deg(6.0);
const CLEAR_COLOUR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

/// Transforms of a ring of `amount` rocks around the origin.
///
/// Each rock sits on a circle of `radius`, jittered by up to `offset` on every
/// axis (less vertically), scaled between 0.05 and 0.25 and rotated by a random
/// angle around a fixed axis.
fn asteroid_ring(amount: usize, radius: f32, offset: f32, rng: &mut impl Rng) -> Vec<Instance> {
    let axis = ROCK_ROTATION_AXIS.normalize();
    (0..amount)
        .map(|i| {
            let angle = Rad(i as f32 / amount as f32 * std::f32::consts::TAU);
            let mut displacement = || rng.random_range(-offset..offset);
            let x = angle.0.sin() * radius + displacement();
            let y = displacement() * 0.4;
            let z = angle.0.cos() * radius + displacement();
            let scale = rng.random_range(0.05..0.25);
            Instance {
                position: Vector3::new(x, y, z),
                rotation: cgmath::Quaternion::from_axis_angle(axis, Deg(rng.random_range(0.0..360.0))),
                scale: Vector3::new(scale, scale, scale),
            }
        })
        .collect()
}

fn instance_buffer(device: &wgpu::Device, label: &str, instances: &[Instance]) -> wgpu::Buffer {
    let raw: Vec<_> = instances.iter().map(Instance::to_raw).collect();
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(&raw),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

struct Drawable {
    model: Model,
    binding: ModelBinding,
    instances: wgpu::Buffer,
    amount: u32,
}

impl Drawable {
    fn new(ctx: &Context, pipeline: &ModelPipeline, model: Model, label: &str, instances: &[Instance]) -> Self {
        let binding = model.bind(ctx, &pipeline.material);
        Self {
            instances: instance_buffer(&ctx.device, label, instances),
            amount: instances.len() as u32,
            model,
            binding,
        }
    }
}

struct Scene {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    ctx: Context,
    depth_texture: Texture,
    projection: Projection,
    camera: CameraResources,
    pipeline: ModelPipeline,
    drawables: Vec<Drawable>,
    orbit: Rad<f32>,
    is_surface_configured: bool,
}

impl Scene {
    async fn new(window: Arc<Window>, planet: PathBuf, rock: PathBuf) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter for the window surface")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colour and relies on an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let ctx = Context::new(device, queue);
        let projection = Projection::new(config.width, config.height, Deg(45.0), 0.1, 500.0);
        let camera = CameraResources::new(
            &ctx.device,
            Camera::new((0.0, CAMERA_HEIGHT, CAMERA_DISTANCE), Deg(-90.0), Deg(-15.0)),
            &projection,
        );
        let pipeline = ModelPipeline::new(&ctx.device, config.format, &camera.bind_group_layout);
        let depth_texture =
            Texture::create_depth_texture(&ctx.device, [config.width, config.height], "depth_texture");

        let options = LoadOptions::default();
        let planet = Model::load(&ctx, &planet, &options);
        let rock = Model::load(&ctx, &rock, &options);
        if planet.is_empty() || rock.is_empty() {
            log::warn!("A model failed to load; only the loaded parts are drawn");
        }

        let planet_instance = Instance {
            position: Vector3::new(0.0, -3.0, 0.0),
            scale: Vector3::new(4.0, 4.0, 4.0),
            ..Default::default()
        };
        let rocks = asteroid_ring(ROCK_COUNT, RING_RADIUS, RING_OFFSET, &mut rand::rng());
        let drawables = vec![
            Drawable::new(&ctx, &pipeline, planet, "Planet Instances", &[planet_instance]),
            Drawable::new(&ctx, &pipeline, rock, "Rock Instances", &rocks),
        ];

        Ok(Self {
            window,
            surface,
            config,
            ctx,
            depth_texture,
            projection,
            camera,
            pipeline,
            drawables,
            orbit: Rad(0.0),
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.is_surface_configured = true;
            self.projection.resize(width, height);
            self.surface.configure(&self.ctx.device, &self.config);
            self.depth_texture =
                Texture::create_depth_texture(&self.ctx.device, [width, height], "depth_texture");
        }
    }

    /// Circle the camera around the planet, always facing the origin.
    fn update(&mut self, dt: Duration) {
        self.orbit += Rad::from(CAMERA_SPEED) * dt.as_secs_f32();
        let (sin, cos) = self.orbit.0.sin_cos();
        let position = cgmath::Point3::new(sin * CAMERA_DISTANCE, CAMERA_HEIGHT, cos * CAMERA_DISTANCE);
        let camera = &mut self.camera.camera;
        camera.position = position;
        camera.yaw = Rad((-position.z).atan2(-position.x));
        camera.pitch = Rad((-CAMERA_HEIGHT).atan2(CAMERA_DISTANCE));
        self.camera.update(&self.ctx.queue, &self.projection);
    }

    fn render(&mut self) -> Result<(), wgpu::CurrentSurfaceTexture> {
        self.window.request_redraw();
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output)
            | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
            other => return Err(other),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOUR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(1, &self.camera.bind_group, &[]);
            for drawable in &self.drawables {
                if drawable.amount == 0 || drawable.model.is_empty() {
                    continue;
                }
                render_pass.set_vertex_buffer(1, drawable.instances.slice(..));
                render_pass.draw_model_instanced(&drawable.model, &drawable.binding, 0..drawable.amount);
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

struct App {
    async_runtime: tokio::runtime::Runtime,
    planet: PathBuf,
    rock: PathBuf,
    scene: Option<Scene>,
    last_time: Instant,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("asteroids")
            .with_inner_size(winit::dpi::PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let init = Scene::new(window, self.planet.clone(), self.rock.clone());
        match self.async_runtime.block_on(init) {
            Ok(mut scene) => {
                let size = scene.window.inner_size();
                scene.resize(size.width, size.height);
                self.last_time = Instant::now();
                self.scene = Some(scene);
            }
            Err(e) => {
                log::error!("Scene initialization failed: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let scene = match &mut self.scene {
            Some(scene) => scene,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => scene.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                scene.update(dt);
                match scene.render() {
                    Ok(()) => {}
                    Err(wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated) => {
                        let size = scene.window.inner_size();
                        scene.resize(size.width, size.height);
                    }
                    Err(e) => log::error!("Unable to render {e:?}"),
                }
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let mut args = std::env::args().skip(1);
    let planet = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets/planet/planet.obj"));
    let rock = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets/rock/rock.obj"));

    let event_loop = EventLoop::new()?;
    let mut app = App {
        async_runtime: tokio::runtime::Runtime::new()?,
        planet,
        rock,
        scene: None,
        last_time: Instant::now(),
    };
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn ring_stays_within_offset_of_radius() {
        let mut rng = StdRng::seed_from_u64(7);
        let rocks = asteroid_ring(500, RING_RADIUS, RING_OFFSET, &mut rng);
        assert_eq!(rocks.len(), 500);
        for rock in rocks {
            let horizontal = Vector3::new(rock.position.x, 0.0, rock.position.z).magnitude();
            assert!(horizontal <= RING_RADIUS + 2.0 * RING_OFFSET);
            assert!(horizontal >= RING_RADIUS - 2.0 * RING_OFFSET);
            assert!(rock.position.y.abs() <= RING_OFFSET * 0.4);
            assert!((0.05..0.25).contains(&rock.scale.x));
            assert_eq!(rock.scale.x, rock.scale.z);
        }
    }
}
