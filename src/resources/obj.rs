//! Wavefront OBJ/MTL importer.

use std::{
    io::{BufReader, Cursor},
    path::Path,
};

use crate::{
    config::LoadOptions,
    data_structures::material::TextureKind,
    error::LoadError,
    resources::{
        directory_of, load_string,
        scene::{
            ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, TextureSource,
            compute_tangents,
        },
    },
};

/// Parse an OBJ file and the MTL libraries it references.
///
/// OBJ has no hierarchy, so every mesh hangs off a single root node in file
/// order. A missing or broken MTL file is logged and the meshes load without
/// materials.
pub fn import(path: &Path, options: &LoadOptions) -> Result<ImportedScene, LoadError> {
    let obj_text = load_string(path)?;
    let directory = directory_of(path);
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, obj_materials) = tobj::load_obj_buf(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: options.triangulate,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let mtl_path = directory.join(p);
            match std::fs::read_to_string(&mtl_path) {
                Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                Err(e) => {
                    log::warn!("Material library {} could not be read: {e}", mtl_path.display());
                    Err(tobj::LoadError::OpenFileFailed)
                }
            }
        },
    )
    .map_err(|source| LoadError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let materials = match obj_materials {
        Ok(materials) => materials.iter().map(convert_material).collect(),
        Err(e) => {
            log::warn!("{} loads without materials: {e}", path.display());
            Vec::new()
        }
    };
    let material_count = materials.len();

    let meshes: Vec<ImportedMesh> = models
        .into_iter()
        .map(|model| {
            let mut mesh = convert_mesh(model, options);
            mesh.material = mesh.material.filter(|&index| index < material_count);
            mesh
        })
        .collect();

    let root_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ImportedScene {
        root: Some(ImportedNode::new(root_name, (0..meshes.len()).collect(), Vec::new())),
        meshes,
        materials,
        incomplete: false,
    })
}

fn convert_material(material: &tobj::Material) -> ImportedMaterial {
    let slots = [
        (TextureKind::Diffuse, material.diffuse_texture.as_deref()),
        (TextureKind::Specular, material.specular_texture.as_deref()),
        (TextureKind::Reflect, material.ambient_texture.as_deref()),
        (TextureKind::Normal, material.normal_texture.as_deref()),
        (
            TextureKind::Height,
            material.unknown_param.get("disp").map(String::as_str),
        ),
    ];
    ImportedMaterial {
        name: material.name.clone(),
        textures: slots
            .into_iter()
            .filter_map(|(kind, path)| {
                path.map(str::trim)
                    .filter(|path| !path.is_empty())
                    .map(|path| (kind, TextureSource::file(path)))
            })
            .collect(),
    }
}

fn convert_mesh(model: tobj::Model, options: &LoadOptions) -> ImportedMesh {
    let m = model.mesh;
    let vertex_count = m.positions.len() / 3;

    let positions: Vec<[f32; 3]> = m
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let normals: Vec<[f32; 3]> = m
        .normals
        .chunks_exact(3)
        .map(|n| [n[0], n[1], n[2]])
        .collect();
    let tex_coords: Option<Vec<[f32; 2]>> = (!m.texcoords.is_empty()).then(|| {
        (0..vertex_count)
            .map(|i| {
                let u = m.texcoords.get(i * 2).copied().unwrap_or(0.0);
                let v = m.texcoords.get(i * 2 + 1).copied().unwrap_or(0.0);
                if options.flip_uvs { [u, 1.0 - v] } else { [u, v] }
            })
            .collect()
    });

    let faces = split_faces(&m.indices, &m.face_arities);
    let tangents = match &tex_coords {
        Some(uvs) if options.calc_tangent_space => Some(compute_tangents(&positions, uvs, &faces)),
        _ => None,
    };

    ImportedMesh {
        name: model.name,
        positions,
        normals,
        tex_coords,
        tangents,
        faces,
        material: m.material_id,
    }
}

/// Group the flat index list into faces. Without arities every face is a triangle.
fn split_faces(indices: &[u32], arities: &[u32]) -> Vec<Vec<u32>> {
    if arities.is_empty() {
        return indices.chunks(3).map(<[u32]>::to_vec).collect();
    }
    let mut faces = Vec::with_capacity(arities.len());
    let mut start = 0;
    for &arity in arities {
        let end = (start + arity as usize).min(indices.len());
        faces.push(indices[start..end].to_vec());
        start = end;
    }
    faces
}
