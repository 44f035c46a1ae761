//! Models: every mesh of one scene file and the textures they share.

use std::{
    ops::Range,
    path::{Path, PathBuf},
};

use crate::{
    config::LoadOptions,
    context::Context,
    data_structures::{
        mesh::{Mesh, MeshBinding, MeshData},
        texture::Texture,
    },
    error::LoadError,
    pipelines::material::MaterialLayout,
    resources::{self, cache::TextureCache},
};

/// CPU-side result of loading a scene file.
#[derive(Debug)]
pub struct ModelData<H> {
    /// Meshes in depth-first scene graph order.
    pub meshes: Vec<MeshData<H>>,
    /// Directory material texture paths are relative to.
    pub directory: PathBuf,
    /// Every texture uploaded while building the meshes.
    pub textures_loaded: TextureCache<H>,
}

impl<H> ModelData<H> {
    pub fn empty(directory: PathBuf) -> Self {
        Self {
            meshes: Vec::new(),
            directory,
            textures_loaded: TextureCache::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// A loaded scene file on the GPU.
///
/// Read-only after loading. Dropping the model releases its buffers and the
/// textures in its cache; bind groups created through [`Model::bind`] must not
/// be used afterwards.
#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub directory: PathBuf,
    textures_loaded: TextureCache<Texture>,
}

impl Model {
    /// Load `path`, logging failures and returning an empty model instead.
    ///
    /// An empty mesh list is the only failure signal; use
    /// [`try_load`](Self::try_load) to get the error.
    ///
    /// A texture that cannot be read or decoded only costs its own slot, which
    /// gets a placeholder. A texture with an unsupported channel count (such as
    /// grey plus alpha) fails the whole load: uploading it would need a format
    /// guess, and an empty model makes the problem visible. Convert such images
    /// to RGBA or load with [`try_load`](Self::try_load) to see which file it was.
    pub fn load(ctx: &Context, path: impl AsRef<Path>, options: &LoadOptions) -> Self {
        let path = path.as_ref();
        match Self::try_load(ctx, path, options) {
            Ok(model) => model,
            Err(e) => {
                log::error!("Model {} could not be loaded: {e}", path.display());
                Self::from_data(&ctx.device, ModelData::empty(resources::directory_of(path)))
            }
        }
    }

    pub fn try_load(
        ctx: &Context,
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Self, LoadError> {
        let path = options.resolve(path);
        let directory = resources::directory_of(&path);
        let data = resources::load_model_data(&path, options, |source, kind| {
            resources::load_texture(ctx, source, kind, &directory, options)
        })?;
        log::debug!(
            "loaded {} with {} meshes and {} textures",
            path.display(),
            data.meshes.len(),
            data.textures_loaded.len()
        );
        Ok(Self::from_data(&ctx.device, data))
    }

    pub fn from_data(device: &wgpu::Device, data: ModelData<Texture>) -> Self {
        Self {
            meshes: data
                .meshes
                .into_iter()
                .map(|mesh| Mesh::new(device, mesh))
                .collect(),
            directory: data.directory,
            textures_loaded: data.textures_loaded,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn textures_loaded(&self) -> &TextureCache<Texture> {
        &self.textures_loaded
    }

    /// Build the material bind groups of every mesh for `layout`.
    pub fn bind(&self, ctx: &Context, layout: &MaterialLayout) -> ModelBinding {
        ModelBinding {
            meshes: self.meshes.iter().map(|mesh| mesh.bind(ctx, layout)).collect(),
        }
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        for texture in self.textures_loaded.handles() {
            texture.texture.destroy();
        }
    }
}

/// Bind groups of a [`Model`] for one material layout, one per mesh.
#[derive(Debug)]
pub struct ModelBinding {
    pub meshes: Vec<MeshBinding>,
}

/// Draw calls for meshes and models.
///
/// The render pass must have a pipeline set whose material bind group lives at
/// group 0, and an instance buffer bound at vertex slot 1 holding at least as
/// many instances as drawn. Meshes without indices are skipped.
pub trait DrawModel<'a> {
    fn draw_mesh(&mut self, mesh: &'a Mesh, binding: &'a MeshBinding);
    fn draw_mesh_instanced(&mut self, mesh: &'a Mesh, binding: &'a MeshBinding, instances: Range<u32>);
    fn draw_model(&mut self, model: &'a Model, binding: &'a ModelBinding);
    fn draw_model_instanced(&mut self, model: &'a Model, binding: &'a ModelBinding, instances: Range<u32>);
}

impl<'a> DrawModel<'a> for wgpu::RenderPass<'a> {
    fn draw_mesh(&mut self, mesh: &'a Mesh, binding: &'a MeshBinding) {
        self.draw_mesh_instanced(mesh, binding, 0..1);
    }

    fn draw_mesh_instanced(&mut self, mesh: &'a Mesh, binding: &'a MeshBinding, instances: Range<u32>) {
        // Empty buffers cannot be sliced.
        if mesh.num_elements == 0 {
            return;
        }
        self.set_bind_group(0, &binding.bind_group, &[]);
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model(&mut self, model: &'a Model, binding: &'a ModelBinding) {
        self.draw_model_instanced(model, binding, 0..1);
    }

    fn draw_model_instanced(&mut self, model: &'a Model, binding: &'a ModelBinding, instances: Range<u32>) {
        for (mesh, mesh_binding) in model.meshes.iter().zip(&binding.meshes) {
            self.draw_mesh_instanced(mesh, mesh_binding, instances.clone());
        }
    }
}
