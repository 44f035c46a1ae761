//! Meshes: imported geometry plus the material textures it samples.

use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        material::{SlotBinding, TextureRef, plan_bindings},
        texture::Texture,
        vertex::ModelVertex,
    },
    error::LoadError,
    pipelines::material::MaterialLayout,
};

/// CPU-side mesh produced by the scene traversal.
///
/// `H` is the texture handle type, [`Texture`] for meshes headed to the GPU.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData<H> {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub textures: Vec<TextureRef<H>>,
}

impl<H> MeshData<H> {
    /// Check that every index addresses an existing vertex.
    pub fn validate(&self) -> Result<(), LoadError> {
        match self
            .indices
            .iter()
            .find(|&&index| index as usize >= self.vertices.len())
        {
            Some(&index) => Err(LoadError::IndexOutOfRange {
                mesh: self.name.clone(),
                index,
                vertex_count: self.vertices.len(),
            }),
            None => Ok(()),
        }
    }
}

/// A mesh uploaded to the GPU.
///
/// Owns its vertex and index buffers and destroys them when dropped. Textures
/// are shared with the model's cache.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub textures: Vec<TextureRef<Texture>>,
    /// Texture unit assignment, computed once at creation.
    pub bindings: Vec<SlotBinding<Texture>>,
}

impl Mesh {
    pub fn new(device: &wgpu::Device, data: MeshData<Texture>) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let bindings = plan_bindings(&data.textures);

        Self {
            name: data.name,
            vertex_buffer,
            index_buffer,
            num_elements: data.indices.len() as u32,
            textures: data.textures,
            bindings,
        }
    }

    /// Build the material bind group this mesh uses with `layout`.
    pub fn bind(&self, ctx: &Context, layout: &MaterialLayout) -> MeshBinding {
        let bind_group = layout.bind_group(&ctx.device, ctx.defaults(), &self.bindings, &self.name);
        MeshBinding { bind_group }
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

/// The material bind group of one mesh for one [`MaterialLayout`].
#[derive(Debug)]
pub struct MeshBinding {
    pub bind_group: wgpu::BindGroup,
}
