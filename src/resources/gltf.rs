//! glTF 2.0 importer (`.gltf` with external or embedded buffers, and `.glb`).

use std::path::Path;

use crate::{
    config::LoadOptions,
    data_structures::material::TextureKind,
    error::LoadError,
    resources::{
        directory_of, load_binary,
        scene::{
            ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, TextureSource,
            compute_tangents,
        },
    },
};

/// Parse a glTF file into a scene graph.
///
/// Every primitive becomes its own mesh. The nodes of the default scene (or
/// the first scene) hang off a synthetic root named after the scene.
pub fn import(path: &Path, options: &LoadOptions) -> Result<ImportedScene, LoadError> {
    let gltf_err = |source| LoadError::Gltf {
        path: path.to_path_buf(),
        source,
    };
    let bytes = load_binary(path)?;
    let gltf = ::gltf::Gltf::from_slice(&bytes).map_err(gltf_err)?;
    let directory = directory_of(path);
    let buffers = ::gltf::import_buffers(&gltf.document, Some(&directory), gltf.blob.clone())
        .map_err(gltf_err)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut meshes = Vec::new();
    let mut primitives_of_mesh = Vec::new();
    for mesh in gltf.meshes() {
        let mut indices = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != ::gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping {:?} primitive {} of mesh {:?}: only triangles are supported",
                    primitive.mode(),
                    primitive.index(),
                    mesh.name()
                );
                continue;
            }
            indices.push(meshes.len());
            meshes.push(convert_primitive(&mesh, &primitive, &buffers, options));
        }
        primitives_of_mesh.push(indices);
    }

    let materials = gltf
        .materials()
        .map(|material| convert_material(&material, &buffers, &file_name))
        .collect();

    let root = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .map(|scene| {
            ImportedNode::new(
                scene.name().unwrap_or("scene"),
                Vec::new(),
                scene
                    .nodes()
                    .map(|node| convert_node(&node, &primitives_of_mesh))
                    .collect(),
            )
        });

    Ok(ImportedScene {
        root,
        meshes,
        materials,
        incomplete: false,
    })
}

fn convert_node(node: &::gltf::Node, primitives_of_mesh: &[Vec<usize>]) -> ImportedNode {
    let meshes = node
        .mesh()
        .and_then(|mesh| primitives_of_mesh.get(mesh.index()).cloned())
        .unwrap_or_default();
    ImportedNode::new(
        node.name().unwrap_or_default(),
        meshes,
        node.children()
            .map(|child| convert_node(&child, primitives_of_mesh))
            .collect(),
    )
}

fn convert_primitive(
    mesh: &::gltf::Mesh,
    primitive: &::gltf::Primitive,
    buffers: &[::gltf::buffer::Data],
    options: &LoadOptions,
) -> ImportedMesh {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|positions| positions.collect())
        .unwrap_or_default();
    let normals = reader
        .read_normals()
        .map(|normals| normals.collect())
        .unwrap_or_default();
    let tex_coords: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|tex_coords| tex_coords.into_f32().collect());
    // glTF tangents are vec4 with the bitangent sign in w; the sign is
    // recomputed from the normal instead.
    let tangents: Option<Vec<[f32; 3]>> = reader
        .read_tangents()
        .map(|tangents| tangents.map(|[x, y, z, _]| [x, y, z]).collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let faces: Vec<Vec<u32>> = indices.chunks(3).map(<[u32]>::to_vec).collect();
    let tangents = match (tangents, &tex_coords) {
        (Some(tangents), _) => Some(tangents),
        (None, Some(uvs)) if options.calc_tangent_space => {
            Some(compute_tangents(&positions, uvs, &faces))
        }
        (None, _) => None,
    };

    let name = match mesh.name() {
        Some(name) => format!("{name}#{}", primitive.index()),
        None => format!("mesh{}#{}", mesh.index(), primitive.index()),
    };

    ImportedMesh {
        name,
        positions,
        normals,
        tex_coords,
        tangents,
        faces,
        material: primitive.material().index(),
    }
}

fn convert_material(
    material: &::gltf::Material,
    buffers: &[::gltf::buffer::Data],
    file_name: &str,
) -> ImportedMaterial {
    let pbr = material.pbr_metallic_roughness();
    let slots = [
        (
            TextureKind::Diffuse,
            pbr.base_color_texture().map(|info| info.texture()),
        ),
        (
            TextureKind::Specular,
            pbr.metallic_roughness_texture().map(|info| info.texture()),
        ),
        (
            TextureKind::Reflect,
            material.occlusion_texture().map(|info| info.texture()),
        ),
        (
            TextureKind::Normal,
            material.normal_texture().map(|info| info.texture()),
        ),
    ];

    ImportedMaterial {
        name: material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material{}", material.index().unwrap_or_default())),
        textures: slots
            .into_iter()
            .filter_map(|(kind, texture)| {
                let source = texture_source(&texture?.source(), buffers, file_name)?;
                Some((kind, source))
            })
            .collect(),
    }
}

fn texture_source(
    image: &::gltf::Image,
    buffers: &[::gltf::buffer::Data],
    file_name: &str,
) -> Option<TextureSource> {
    match image.source() {
        ::gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
            log::warn!("Image {} uses a data URI, which is not supported", image.index());
            None
        }
        ::gltf::image::Source::Uri { uri, .. } => match urlencoding::decode(uri) {
            Ok(decoded) => Some(TextureSource::file(decoded)),
            Err(e) => {
                log::warn!("Image URI {uri:?} is not valid UTF-8 once decoded: {e}");
                Some(TextureSource::file(uri))
            }
        },
        ::gltf::image::Source::View { view, .. } => {
            let buffer = buffers.get(view.buffer().index())?;
            let bytes = buffer.0.get(view.offset()..view.offset() + view.length())?;
            Some(TextureSource {
                path: format!("{file_name}#image{}", image.index()),
                embedded: Some(bytes.to_vec()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // One triangle with positions, normals and optionally UVs in an external buffer.
    fn write_triangle(dir: &Path, with_uvs: bool, albedo_uri: &str) -> std::path::PathBuf {
        let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normals: [[f32; 3]; 3] = [[0.0, 0.0, 1.0]; 3];
        let uvs: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let mut bin = Vec::new();
        for v in positions.iter().chain(normals.iter()) {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for v in &uvs {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        std::fs::File::create(dir.join("tri.bin"))
            .and_then(|mut f| f.write_all(&bin))
            .unwrap();

        let attributes = if with_uvs {
            r#"{ "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 }"#
        } else {
            r#"{ "POSITION": 0, "NORMAL": 1 }"#
        };
        let json = format!(
            r#"{{
            "asset": {{ "version": "2.0" }},
            "scene": 0,
            "scenes": [ {{ "name": "main", "nodes": [0] }} ],
            "nodes": [
                {{ "name": "parent", "mesh": 0, "children": [1] }},
                {{ "name": "child", "mesh": 0 }}
            ],
            "meshes": [ {{ "name": "tri", "primitives": [ {{
                "attributes": {attributes},
                "material": 0
            }} ] }} ],
            "materials": [ {{
                "name": "painted",
                "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 0 }} }},
                "normalTexture": {{ "index": 1 }}
            }} ],
            "textures": [ {{ "source": 0 }}, {{ "source": 1 }} ],
            "images": [ {{ "uri": "{albedo_uri}" }}, {{ "uri": "normal.png" }} ],
            "buffers": [ {{ "uri": "tri.bin", "byteLength": 96 }} ],
            "bufferViews": [
                {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
                {{ "buffer": 0, "byteOffset": 36, "byteLength": 36 }},
                {{ "buffer": 0, "byteOffset": 72, "byteLength": 24 }}
            ],
            "accessors": [
                {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
                {{ "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" }},
                {{ "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2" }}
            ]
        }}"#
        );
        let path = dir.join("tri.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn imports_hierarchy_and_materials() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle(dir.path(), false, "albedo.png");
        let scene = import(&path, &LoadOptions::default()).unwrap();

        let root = scene.root.as_ref().unwrap();
        assert_eq!(root.name, "main");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].meshes, [0]);
        assert_eq!(root.children[0].children[0].meshes, [0]);

        assert_eq!(scene.meshes.len(), 1);
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.faces, [vec![0, 1, 2]]);
        assert_eq!(mesh.tex_coords, None);
        assert_eq!(mesh.tangents, None);
        assert_eq!(mesh.material, Some(0));

        let textures: Vec<_> = scene.materials[0]
            .textures
            .iter()
            .map(|(kind, source)| (*kind, source.path.as_str()))
            .collect();
        assert_eq!(
            textures,
            [
                (TextureKind::Diffuse, "albedo.png"),
                (TextureKind::Normal, "normal.png")
            ]
        );
    }

    #[test]
    fn malformed_json_is_a_gltf_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gltf");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            import(&path, &LoadOptions::default()),
            Err(LoadError::Gltf { .. })
        ));
    }

    #[test]
    fn missing_tangents_are_generated_from_uvs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle(dir.path(), true, "albedo.png");
        let scene = import(&path, &LoadOptions::default()).unwrap();
        assert_eq!(scene.meshes[0].tangents, Some(vec![[1.0, 0.0, 0.0]; 3]));

        let mut cache = crate::resources::cache::TextureCache::new();
        let meshes =
            crate::resources::scene::build_model_data(&scene, &mut cache, |_, _| Ok(())).unwrap();
        for v in &meshes[0].vertices {
            let dot: f32 = v.tangent.iter().zip(v.normal).map(|(a, b)| a * b).sum();
            assert!(dot.abs() < 1e-5);
            assert_ne!(v.tangent, [0.0; 3]);
            assert_ne!(v.bitangent, [0.0; 3]);
        }
    }

    #[test]
    fn tangent_generation_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle(dir.path(), true, "albedo.png");
        let options = LoadOptions {
            calc_tangent_space: false,
            ..Default::default()
        };
        let scene = import(&path, &options).unwrap();
        assert_eq!(scene.meshes[0].tangents, None);
    }

    #[test]
    fn image_uris_are_percent_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle(dir.path(), false, "my%20albedo.png");
        let scene = import(&path, &LoadOptions::default()).unwrap();
        assert_eq!(scene.materials[0].textures[0].1.path, "my albedo.png");
    }
}
