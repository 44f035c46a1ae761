//! Vertex layout shared by every model mesh.

use cgmath::{InnerSpace, Vector3};

/// Types that describe their own GPU vertex buffer layout.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// A mesh vertex as stored on the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl ModelVertex {
    /// Build a vertex from imported attributes.
    ///
    /// Missing texture coordinates default to (0, 0). A present tangent is made
    /// orthogonal to the normal (Gram-Schmidt) and the bitangent is derived as
    /// `normalize(normal x tangent)`. Without a tangent, or when it is parallel
    /// to the normal, tangent and bitangent stay zero.
    pub fn new(
        position: [f32; 3],
        normal: [f32; 3],
        tex_coords: Option<[f32; 2]>,
        tangent: Option<[f32; 3]>,
    ) -> Self {
        let (tangent, bitangent): ([f32; 3], [f32; 3]) = tangent
            .and_then(|t| tangent_frame(normal.into(), t.into()))
            .map(|(t, b)| (t.into(), b.into()))
            .unwrap_or_default();
        Self {
            position,
            normal,
            tex_coords: tex_coords.unwrap_or_default(),
            tangent,
            bitangent,
        }
    }
}

fn tangent_frame(
    normal: Vector3<f32>,
    tangent: Vector3<f32>,
) -> Option<(Vector3<f32>, Vector3<f32>)> {
    let ortho = tangent - normal * normal.dot(tangent);
    if ortho.magnitude2() <= f32::EPSILON {
        return None;
    }
    let tangent = ortho.normalize();
    let bitangent = normal.cross(tangent);
    if bitangent.magnitude2() <= f32::EPSILON {
        return None;
    }
    Some((tangent, bitangent.normalize()))
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
        Vector3::from(a).dot(Vector3::from(b))
    }

    #[test]
    fn tangent_is_orthogonalised_against_normal() {
        let normal = [0.0, 0.0, 1.0];
        let v = ModelVertex::new([0.0; 3], normal, None, Some([1.0, 0.0, 0.5]));
        assert!(dot(v.tangent, normal).abs() < EPS);
        assert!((Vector3::from(v.tangent).magnitude() - 1.0).abs() < EPS);
        assert!((v.tangent[0] - 1.0).abs() < EPS);
    }

    #[test]
    fn bitangent_is_normal_cross_tangent() {
        let normal = Vector3::new(0.0, 1.0, 1.0).normalize();
        let v = ModelVertex::new([0.0; 3], normal.into(), None, Some([0.3, 1.0, 0.2]));
        let expected = normal.cross(Vector3::from(v.tangent)).normalize();
        let actual = Vector3::from(v.bitangent);
        assert!((actual - expected).magnitude() < EPS);
        assert!(dot(v.bitangent, normal.into()).abs() < EPS);
    }

    #[test]
    fn missing_tangent_leaves_zero_frame() {
        let v = ModelVertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], Some([0.5, 0.25]), None);
        assert_eq!(v.tangent, [0.0; 3]);
        assert_eq!(v.bitangent, [0.0; 3]);
        assert_eq!(v.tex_coords, [0.5, 0.25]);
    }

    #[test]
    fn tangent_parallel_to_normal_collapses_to_zero() {
        let v = ModelVertex::new([0.0; 3], [0.0, 1.0, 0.0], None, Some([0.0, 2.0, 0.0]));
        assert_eq!(v.tangent, [0.0; 3]);
        assert_eq!(v.bitangent, [0.0; 3]);
    }

    #[test]
    fn missing_uv_defaults_to_origin() {
        let v = ModelVertex::new([0.0; 3], [0.0, 1.0, 0.0], None, None);
        assert_eq!(v.tex_coords, [0.0, 0.0]);
    }

    #[test]
    fn layout_stride_covers_all_attributes() {
        let desc = ModelVertex::desc();
        assert_eq!(desc.array_stride, 14 * 4);
        assert_eq!(desc.attributes.len(), 5);
    }
}
