use crate::data_structures::{
    default_textures::DefaultTextures,
    instance::InstanceRaw,
    material::{BindingSource, SamplerTable, SlotBinding, resolve_slots},
    texture::{Texture, create_default_sampler},
    vertex::{ModelVertex, Vertex},
};

/// Bind group layout for the material samplers a shader declares.
///
/// Every slot of the [`SamplerTable`] becomes a filterable 2D texture binding
/// followed by a filtering sampler binding.
#[derive(Debug)]
pub struct MaterialLayout {
    pub table: SamplerTable,
    pub layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl MaterialLayout {
    pub fn new(device: &wgpu::Device, table: SamplerTable) -> Self {
        let entries: Vec<_> = table
            .slots()
            .flat_map(|(_, _, location)| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: location.texture,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: location.sampler,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &entries,
            label: Some("material_bind_group_layout"),
        });

        Self {
            table,
            layout,
            sampler: create_default_sampler(device),
        }
    }

    /// Build the bind group for one mesh from its binding plan.
    ///
    /// Slots the plan leaves open get the fallback texture of their kind.
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        defaults: &DefaultTextures,
        plan: &[SlotBinding<Texture>],
        label: &str,
    ) -> wgpu::BindGroup {
        let resolved = resolve_slots(&self.table, plan);
        let entries: Vec<_> = resolved
            .iter()
            .flat_map(|(location, binding)| {
                let texture = match &binding.source {
                    BindingSource::Texture(texture) => texture,
                    BindingSource::Fallback(colour) => defaults.get(*colour),
                };
                log::trace!(
                    "{label}: {} -> binding {}",
                    binding.uniform_name(),
                    location.texture
                );
                [
                    wgpu::BindGroupEntry {
                        binding: location.texture,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: location.sampler,
                        resource: wgpu::BindingResource::Sampler(
                            texture.sampler.as_ref().unwrap_or(&self.sampler),
                        ),
                    },
                ]
            })
            .collect();

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.layout,
            entries: &entries,
            label: Some(&format!("{label} material_bind_group")),
        })
    }
}

/// The bundled model pipeline: material samplers at group 0, camera at group 1.
pub struct ModelPipeline {
    pub material: MaterialLayout,
    pub pipeline: wgpu::RenderPipeline,
}

impl ModelPipeline {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let material = MaterialLayout::new(device, SamplerTable::standard());
        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Model Pipeline Layout"),
            bind_group_layouts: &[Some(&material.layout), Some(camera_bind_group_layout)],
            immediate_size: 0,
        });

        let shader = wgpu::ShaderModuleDescriptor {
            label: Some("Model Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("model.wgsl").into()),
        };

        let pipeline = mk_render_pipeline(
            device,
            &render_pipeline_layout,
            color_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            Some(Texture::DEPTH_FORMAT),
            &[ModelVertex::desc(), InstanceRaw::desc()],
            shader,
        );

        Self { material, pipeline }
    }
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(true),
            depth_compare: Some(wgpu::CompareFunction::Less),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
