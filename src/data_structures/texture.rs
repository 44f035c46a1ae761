//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! and helpers for depth textures, solid-colour fallbacks and uploading decoded
//! images with a full mip chain.

use image::{DynamicImage, GenericImageView, imageops::FilterType};

use crate::error::LoadError;

/// A GPU texture with a view and optional sampler.
///
/// Cloning is cheap: the clone refers to the same GPU resource.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

/// How decoded pixel data is laid out on the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    /// One channel, uploaded as `R8Unorm`.
    Single,
    /// Three channels. wgpu has no 24-bit format so the data is padded to RGBA.
    Rgb,
    Rgba,
}

impl PixelLayout {
    /// Pick the layout for an image with `channels` 8-bit channels.
    ///
    /// Anything other than 1, 3 or 4 channels is rejected.
    pub fn from_channels(channels: u8, path: &str) -> Result<Self, LoadError> {
        match channels {
            1 => Ok(PixelLayout::Single),
            3 => Ok(PixelLayout::Rgb),
            4 => Ok(PixelLayout::Rgba),
            _ => Err(LoadError::UnsupportedChannelCount {
                path: path.to_string(),
                channels,
            }),
        }
    }

    pub fn texture_format(self, srgb: bool) -> wgpu::TextureFormat {
        match (self, srgb) {
            (PixelLayout::Single, _) => wgpu::TextureFormat::R8Unorm,
            (_, true) => wgpu::TextureFormat::Rgba8UnormSrgb,
            (_, false) => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelLayout::Single => 1,
            PixelLayout::Rgb | PixelLayout::Rgba => 4,
        }
    }

    /// Convert `img` to 8-bit data in this layout.
    fn convert(self, img: &DynamicImage) -> DynamicImage {
        match self {
            PixelLayout::Single => DynamicImage::ImageLuma8(img.to_luma8()),
            PixelLayout::Rgb | PixelLayout::Rgba => DynamicImage::ImageRgba8(img.to_rgba8()),
        }
    }
}

/// Number of mip levels down to 1x1 for a `width` x `height` texture.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Downscale `base` into a full mip chain, level 0 first.
pub fn mip_chain(base: DynamicImage, levels: u32) -> Vec<DynamicImage> {
    let (width, height) = base.dimensions();
    let mut chain = Vec::with_capacity(levels as usize);
    chain.push(base);
    for level in 1..levels {
        let w = (width >> level).max(1);
        let h = (height >> level).max(1);
        let next = chain[level as usize - 1].resize_exact(w, h, FilterType::Triangle);
        chain.push(next);
    }
    chain
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Create a 1x1 texture filled with `rgba`.
    pub fn solid_colour(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        }
    }

    /// A 1x1 texture whose content is never written.
    ///
    /// Handed out when an image cannot be read or decoded so the mesh still has
    /// a valid handle in that slot.
    pub fn placeholder(device: &wgpu::Device, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        }
    }

    /// Upload a decoded image.
    ///
    /// * `label` names the GPU resource and is reported in errors
    /// * `srgb` selects an sRGB format for colour data
    /// * `generate_mipmaps` uploads a full mip chain instead of a single level
    ///
    /// Images wider or taller than the device's 2D texture limit are rejected;
    /// see [`fit_to_limit`].
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &DynamicImage,
        label: &str,
        srgb: bool,
        generate_mipmaps: bool,
    ) -> Result<Self, LoadError> {
        let layout = PixelLayout::from_channels(img.color().channel_count(), label)?;
        let (width, height) = img.dimensions();
        let limit = device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(LoadError::TextureTooLarge {
                path: label.to_string(),
                width,
                height,
                limit,
            });
        }
        let levels = if generate_mipmaps {
            mip_level_count(width, height)
        } else {
            1
        };
        let format = layout.texture_format(srgb);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, mip) in mip_chain(layout.convert(img), levels).iter().enumerate() {
            let (w, h) = mip.dimensions();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                mip.as_bytes(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(layout.bytes_per_pixel() * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        })
    }
}

/// Downscale `img` so neither side exceeds `limit`, keeping the aspect ratio.
///
/// Images already within the limit are returned unchanged.
pub fn fit_to_limit(img: DynamicImage, limit: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= limit && height <= limit {
        return img;
    }
    img.resize(limit, limit, FilterType::Triangle)
}

/// Repeat wrapping with linear filtering across and between mip levels.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}
