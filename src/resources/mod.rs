//! Loading scene files and their textures from disk.
//!
//! [`import_scene`] picks an importer by file extension and produces an
//! [`ImportedScene`](scene::ImportedScene). [`load_model_data`] turns that into
//! meshes; it is generic over the texture handle so the traversal can run
//! without a GPU. [`load_texture`] is the GPU upload used by
//! [`Model`](crate::data_structures::model::Model).

use std::path::{Path, PathBuf};

use crate::{
    config::LoadOptions,
    context::Context,
    data_structures::{
        material::TextureKind,
        model::ModelData,
        texture::{self, Texture},
    },
    error::LoadError,
    resources::{
        cache::TextureCache,
        scene::{ImportedScene, TextureSource, build_model_data},
    },
};

pub mod cache;
pub mod gltf;
pub mod obj;
pub mod scene;

/// Read and parse a scene file with the importer matching its extension.
pub fn import_scene(path: &Path, options: &LoadOptions) -> Result<ImportedScene, LoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("obj") => obj::import(path, options),
        Some("gltf") | Some("glb") => gltf::import(path, options),
        _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Import `path` and build its meshes, uploading textures through `load`.
///
/// `load` sees each distinct texture path once; the returned
/// [`ModelData::textures_loaded`] holds what it produced.
pub fn load_model_data<H, F>(
    path: &Path,
    options: &LoadOptions,
    load: F,
) -> Result<ModelData<H>, LoadError>
where
    H: Clone,
    F: FnMut(&TextureSource, TextureKind) -> Result<H, LoadError>,
{
    let scene = import_scene(path, options)?;
    let mut textures_loaded = TextureCache::new();
    let meshes = build_model_data(&scene, &mut textures_loaded, load)?;
    Ok(ModelData {
        meshes,
        directory: directory_of(path),
        textures_loaded,
    })
}

/// Directory texture paths of the scene file at `path` are relative to.
pub fn directory_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

pub fn load_binary(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_string(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode a material texture and upload it.
///
/// Files that cannot be read or decoded are logged and replaced by an
/// uninitialised placeholder texture. Images larger than the device's 2D
/// texture limit are downscaled to fit. Images with an unsupported channel
/// count are an error.
pub fn load_texture(
    ctx: &Context,
    source: &TextureSource,
    kind: TextureKind,
    directory: &Path,
    options: &LoadOptions,
) -> Result<Texture, LoadError> {
    let image = match decode(source, directory) {
        Ok(image) => image,
        Err(e) => {
            log::error!("Texture failed to load at path {}: {e}", source.path);
            return Ok(Texture::placeholder(&ctx.device, &source.path));
        }
    };
    let limit = ctx.device.limits().max_texture_dimension_2d;
    if image.width() > limit || image.height() > limit {
        log::warn!(
            "Texture {} is {}x{}, downscaling to the device limit of {limit}",
            source.path,
            image.width(),
            image.height()
        );
    }
    let image = texture::fit_to_limit(image, limit);
    Texture::from_image(
        &ctx.device,
        &ctx.queue,
        &image,
        &source.path,
        kind.is_srgb(),
        options.generate_mipmaps,
    )
}

/// Decode the image behind `source`, from its embedded bytes or from disk.
pub fn decode(source: &TextureSource, directory: &Path) -> anyhow::Result<image::DynamicImage> {
    let image = match &source.embedded {
        Some(bytes) => image::load_from_memory(bytes)?,
        None => {
            let bytes = load_binary(&directory.join(&source.path))?;
            image::load_from_memory(&bytes)?
        }
    };
    Ok(image)
}
