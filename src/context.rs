//! GPU context shared by loading and drawing.

use std::cell::OnceCell;

use anyhow::Context as _;

use crate::data_structures::default_textures::DefaultTextures;

/// Device, queue and the resources created once per device.
///
/// All GPU work of this crate happens on the thread that owns the context.
#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    defaults: OnceCell<DefaultTextures>,
}

impl Context {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            defaults: OnceCell::new(),
        }
    }

    /// Request an adapter and device without a surface, for offscreen work and tests.
    pub async fn headless() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter available")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            })
            .await?;
        Ok(Self::new(device, queue))
    }

    /// The fallback texture set, created on first use.
    ///
    /// Later calls return the same textures.
    pub fn defaults(&self) -> &DefaultTextures {
        self.defaults
            .get_or_init(|| DefaultTextures::new(&self.device, &self.queue))
    }

    pub fn has_defaults(&self) -> bool {
        self.defaults.get().is_some()
    }
}
