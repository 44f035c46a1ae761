#![allow(dead_code)]

use std::{
    iter,
    path::{Path, PathBuf},
    time::Duration,
};

pub const SCENE_OBJ: &str = "\
mtllib scene.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
o first
usemtl painted
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
o second
usemtl painted
f 1/1/1 3/3/1 4/4/1
o third
usemtl shiny
f 1/1/1 2/2/1 3/3/1
";

pub const SCENE_MTL: &str = "\
newmtl painted
Kd 1 1 1
map_Kd shared.png

newmtl shiny
map_Kd shared.png
map_Ks specular.png
";

/// A 20x20 quad in the z = 0 plane facing +z, without a material.
pub const QUAD_OBJ: &str = "\
v -10 -10 0
v 10 -10 0
v 10 10 0
v -10 10 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
o quad
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

/// Three meshes over two materials that share `shared.png`.
///
/// Returns the path of the OBJ file.
pub fn write_scene(dir: &Path) -> PathBuf {
    std::fs::write(dir.join("scene.mtl"), SCENE_MTL).unwrap();
    write_png(&dir.join("shared.png"), image::ColorType::Rgb8, 4, 4);
    write_png(&dir.join("specular.png"), image::ColorType::L8, 4, 4);
    let path = dir.join("scene.obj");
    std::fs::write(&path, SCENE_OBJ).unwrap();
    path
}

pub fn write_png(path: &Path, colour: image::ColorType, width: u32, height: u32) {
    let image = match colour {
        image::ColorType::L8 => image::DynamicImage::ImageLuma8(image::GrayImage::new(width, height)),
        image::ColorType::La8 => {
            image::DynamicImage::ImageLumaA8(image::GrayAlphaImage::new(width, height))
        }
        image::ColorType::Rgba8 => image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height)),
        _ => image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height)),
    };
    image.save(path).unwrap();
}

/// Copy an 8-bit RGBA texture back to the CPU.
pub fn read_pixels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> image::RgbaImage {
    let (width, height) = (texture.width(), texture.height());
    let u32_size = std::mem::size_of::<u32>() as u32;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_row = (u32_size * width).div_ceil(align) * align;

    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback buffer"),
        size: (padded_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    queue.submit(iter::once(encoder.finish()));

    // Map first, then poll, then wait for the mapping.
    let buffer_slice = output_buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).unwrap();
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .unwrap();
    futures::executor::block_on(rx.receive()).unwrap().unwrap();

    let pixels = {
        let data = buffer_slice.get_mapped_range();
        data.chunks(padded_row as usize)
            .flat_map(|row| row[..(u32_size * width) as usize].iter().copied())
            .collect()
    };
    output_buffer.unmap();
    image::RgbaImage::from_raw(width, height, pixels).unwrap()
}
