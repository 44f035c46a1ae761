//! Importer-neutral scene graph and its conversion into meshes.
//!
//! The OBJ and glTF importers both produce an [`ImportedScene`].
//! [`build_model_data`] walks it depth-first and turns every referenced mesh
//! into a [`MeshData`], resolving material textures through a
//! [`TextureCache`].

use cgmath::{Vector2, Vector3};

use crate::{
    data_structures::{material::TextureKind, mesh::MeshData, vertex::ModelVertex},
    error::LoadError,
    resources::cache::TextureCache,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedScene {
    pub root: Option<ImportedNode>,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
    /// Set by importers that could only read part of the file.
    pub incomplete: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedNode {
    pub name: String,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<ImportedNode>,
}

impl ImportedNode {
    pub fn new(name: impl Into<String>, meshes: Vec<usize>, children: Vec<ImportedNode>) -> Self {
        Self {
            name: name.into(),
            meshes,
            children,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// First UV channel, if the mesh has one.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub faces: Vec<Vec<u32>>,
    /// Index into [`ImportedScene::materials`].
    pub material: Option<usize>,
}

/// Where a material texture comes from.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureSource {
    /// Path relative to the scene file, also the texture cache key.
    pub path: String,
    /// Encoded image bytes for textures stored inside the scene file.
    pub embedded: Option<Vec<u8>>,
}

impl TextureSource {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            embedded: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    /// Texture slots in the order the importer found them.
    pub textures: Vec<(TextureKind, TextureSource)>,
}

impl ImportedMaterial {
    pub fn sources(&self, kind: TextureKind) -> impl Iterator<Item = &TextureSource> {
        self.textures
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, source)| source)
    }
}

/// Convert every mesh referenced from the scene graph, depth-first.
///
/// A node's own meshes come before those of its children. `load` is called
/// once per distinct texture path; repeated paths are served from `cache`.
pub fn build_model_data<H, F>(
    scene: &ImportedScene,
    cache: &mut TextureCache<H>,
    mut load: F,
) -> Result<Vec<MeshData<H>>, LoadError>
where
    H: Clone,
    F: FnMut(&TextureSource, TextureKind) -> Result<H, LoadError>,
{
    if scene.incomplete {
        return Err(LoadError::IncompleteScene);
    }
    let root = scene.root.as_ref().ok_or(LoadError::MissingRoot)?;

    let mut meshes = Vec::new();
    visit(root, scene, cache, &mut load, &mut meshes)?;
    Ok(meshes)
}

fn visit<H, F>(
    node: &ImportedNode,
    scene: &ImportedScene,
    cache: &mut TextureCache<H>,
    load: &mut F,
    out: &mut Vec<MeshData<H>>,
) -> Result<(), LoadError>
where
    H: Clone,
    F: FnMut(&TextureSource, TextureKind) -> Result<H, LoadError>,
{
    for &index in &node.meshes {
        let mesh = scene.meshes.get(index).ok_or(LoadError::DanglingReference {
            what: "mesh",
            index,
        })?;
        out.push(process_mesh(mesh, scene, cache, load)?);
    }
    for child in &node.children {
        visit(child, scene, cache, load, out)?;
    }
    Ok(())
}

fn process_mesh<H, F>(
    mesh: &ImportedMesh,
    scene: &ImportedScene,
    cache: &mut TextureCache<H>,
    load: &mut F,
) -> Result<MeshData<H>, LoadError>
where
    H: Clone,
    F: FnMut(&TextureSource, TextureKind) -> Result<H, LoadError>,
{
    let vertices = mesh
        .positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            ModelVertex::new(
                position,
                mesh.normals.get(i).copied().unwrap_or_default(),
                mesh.tex_coords.as_ref().and_then(|uvs| uvs.get(i).copied()),
                mesh.tangents.as_ref().and_then(|ts| ts.get(i).copied()),
            )
        })
        .collect();

    let indices = mesh.faces.iter().flatten().copied().collect();

    let mut textures = Vec::new();
    if let Some(index) = mesh.material {
        let material = scene.materials.get(index).ok_or(LoadError::DanglingReference {
            what: "material",
            index,
        })?;
        for kind in TextureKind::ALL {
            for source in material.sources(kind) {
                textures.push(cache.get_or_load(&source.path, kind, || load(source, kind))?);
            }
        }
    }

    let data = MeshData {
        name: mesh.name.clone(),
        vertices,
        indices,
        textures,
    };
    data.validate()?;
    Ok(data)
}

/// Per-vertex tangents averaged over the triangles sharing the vertex.
///
/// Used for meshes imported without tangents: they are derived from the
/// positions and texture coordinates of each triangle. Polygons are fanned
/// into triangles.
/// Vertices touched only by degenerate triangles keep a zero tangent.
pub fn compute_tangents(
    positions: &[[f32; 3]],
    uvs: &[[f32; 2]],
    faces: &[Vec<u32>],
) -> Vec<[f32; 3]> {
    let mut sums = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];
    let mut triangles_included = vec![0u32; positions.len()];

    let triangles = faces.iter().flat_map(|face| {
        (1..face.len().saturating_sub(1)).map(move |i| [face[0], face[i], face[i + 1]])
    });
    for c in triangles {
        let [i0, i1, i2] = c.map(|i| i as usize);
        if [i0, i1, i2].iter().any(|&i| i >= positions.len() || i >= uvs.len()) {
            continue;
        }
        let pos0: Vector3<f32> = positions[i0].into();
        let pos1: Vector3<f32> = positions[i1].into();
        let pos2: Vector3<f32> = positions[i2].into();
        let uv0: Vector2<f32> = uvs[i0].into();
        let uv1: Vector2<f32> = uvs[i1].into();
        let uv2: Vector2<f32> = uvs[i2].into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        // delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) / det;

        for i in [i0, i1, i2] {
            sums[i] += tangent;
            triangles_included[i] += 1;
        }
    }

    sums.into_iter()
        .zip(triangles_included)
        .map(|(sum, n)| {
            if n == 0 {
                [0.0; 3]
            } else {
                (sum / n as f32).into()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(name: &str, material: Option<usize>) -> ImportedMesh {
        ImportedMesh {
            name: name.into(),
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            tex_coords: None,
            tangents: None,
            faces: vec![vec![0, 1, 2], vec![0, 2, 3]],
            material,
        }
    }

    fn material(textures: &[(TextureKind, &str)]) -> ImportedMaterial {
        ImportedMaterial {
            name: "mat".into(),
            textures: textures
                .iter()
                .map(|&(kind, path)| (kind, TextureSource::file(path)))
                .collect(),
        }
    }

    fn counting_loader(uploads: &mut Vec<String>) -> impl FnMut(&TextureSource, TextureKind) -> Result<usize, LoadError> + '_ {
        move |source, _| {
            uploads.push(source.path.clone());
            Ok(uploads.len())
        }
    }

    #[test]
    fn meshes_follow_depth_first_preorder() {
        let scene = ImportedScene {
            root: Some(ImportedNode::new(
                "root",
                vec![0],
                vec![
                    ImportedNode::new("a", vec![1], vec![ImportedNode::new("a1", vec![3], vec![])]),
                    ImportedNode::new("b", vec![2, 4], vec![]),
                ],
            )),
            meshes: ["m0", "m1", "m2", "m3", "m4"].iter().map(|n| quad(n, None)).collect(),
            ..Default::default()
        };
        let mut cache = TextureCache::new();
        let meshes = build_model_data(&scene, &mut cache, |_, _| Ok(0u32)).unwrap();
        let names: Vec<_> = meshes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["m0", "m1", "m3", "m2", "m4"]);
    }

    #[test]
    fn mesh_referenced_twice_is_built_twice() {
        let scene = ImportedScene {
            root: Some(ImportedNode::new(
                "root",
                vec![0],
                vec![ImportedNode::new("child", vec![0], vec![])],
            )),
            meshes: vec![quad("m", None)],
            ..Default::default()
        };
        let mut cache = TextureCache::new();
        let meshes = build_model_data(&scene, &mut cache, |_, _| Ok(0u32)).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0], meshes[1]);
    }

    #[test]
    fn faces_are_flattened_in_order() {
        let scene = ImportedScene {
            root: Some(ImportedNode::new("root", vec![0], vec![])),
            meshes: vec![quad("q", None)],
            ..Default::default()
        };
        let mut cache = TextureCache::new();
        let meshes = build_model_data(&scene, &mut cache, |_, _| Ok(0u32)).unwrap();
        assert_eq!(meshes[0].indices, [0, 1, 2, 0, 2, 3]);
        assert_eq!(meshes[0].vertices.len(), 4);
        assert!(meshes[0].vertices.iter().all(|v| v.tex_coords == [0.0, 0.0]));
    }

    #[test]
    fn shared_texture_paths_upload_once() {
        let scene = ImportedScene {
            root: Some(ImportedNode::new("root", vec![0, 1], vec![])),
            meshes: vec![quad("a", Some(0)), quad("b", Some(1))],
            materials: vec![
                material(&[(TextureKind::Diffuse, "rock.png")]),
                material(&[
                    (TextureKind::Diffuse, "rock.png"),
                    (TextureKind::Specular, "rock_spec.png"),
                ]),
            ],
            ..Default::default()
        };
        let mut uploads = Vec::new();
        let mut cache = TextureCache::new();
        let meshes = build_model_data(&scene, &mut cache, counting_loader(&mut uploads)).unwrap();

        assert_eq!(uploads, ["rock.png", "rock_spec.png"]);
        assert_eq!(meshes[0].textures[0].handle, meshes[1].textures[0].handle);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn textures_resolve_in_kind_order() {
        let scene = ImportedScene {
            root: Some(ImportedNode::new("root", vec![0], vec![])),
            meshes: vec![quad("a", Some(0))],
            materials: vec![material(&[
                (TextureKind::Height, "disp.png"),
                (TextureKind::Normal, "bump.png"),
                (TextureKind::Diffuse, "albedo.png"),
                (TextureKind::Reflect, "ambient.png"),
                (TextureKind::Specular, "specular.png"),
                (TextureKind::Diffuse, "detail.png"),
            ])],
            ..Default::default()
        };
        let mut cache = TextureCache::new();
        let meshes = build_model_data(&scene, &mut cache, |_, _| Ok(())).unwrap();
        let kinds: Vec<_> = meshes[0].textures.iter().map(|t| (t.kind, t.path.as_str())).collect();
        assert_eq!(
            kinds,
            [
                (TextureKind::Diffuse, "albedo.png"),
                (TextureKind::Diffuse, "detail.png"),
                (TextureKind::Specular, "specular.png"),
                (TextureKind::Reflect, "ambient.png"),
                (TextureKind::Normal, "bump.png"),
                (TextureKind::Height, "disp.png"),
            ]
        );
    }

    #[test]
    fn incomplete_or_rootless_scenes_fail() {
        let mut cache: TextureCache<()> = TextureCache::new();
        let incomplete = ImportedScene {
            root: Some(ImportedNode::default()),
            incomplete: true,
            ..Default::default()
        };
        assert!(matches!(
            build_model_data(&incomplete, &mut cache, |_, _| Ok(())),
            Err(LoadError::IncompleteScene)
        ));
        assert!(matches!(
            build_model_data(&ImportedScene::default(), &mut cache, |_, _| Ok(())),
            Err(LoadError::MissingRoot)
        ));
    }

    #[test]
    fn dangling_mesh_index_is_an_error() {
        let scene = ImportedScene {
            root: Some(ImportedNode::new("root", vec![3], vec![])),
            ..Default::default()
        };
        let mut cache: TextureCache<()> = TextureCache::new();
        assert!(matches!(
            build_model_data(&scene, &mut cache, |_, _| Ok(())),
            Err(LoadError::DanglingReference { what: "mesh", index: 3 })
        ));
    }

    #[test]
    fn texture_errors_propagate() {
        let scene = ImportedScene {
            root: Some(ImportedNode::new("root", vec![0], vec![])),
            meshes: vec![quad("a", Some(0))],
            materials: vec![material(&[(TextureKind::Diffuse, "la.png")])],
            ..Default::default()
        };
        let mut cache: TextureCache<()> = TextureCache::new();
        let result = build_model_data(&scene, &mut cache, |source, _| {
            Err(LoadError::UnsupportedChannelCount {
                path: source.path.clone(),
                channels: 2,
            })
        });
        assert!(matches!(result, Err(LoadError::UnsupportedChannelCount { channels: 2, .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn tangents_are_orthogonal_when_present() {
        let mut mesh = quad("t", None);
        mesh.tangents = Some(vec![[1.0, 0.0, 0.3]; 4]);
        let scene = ImportedScene {
            root: Some(ImportedNode::new("root", vec![0], vec![])),
            meshes: vec![mesh],
            ..Default::default()
        };
        let mut cache = TextureCache::new();
        let meshes = build_model_data(&scene, &mut cache, |_, _| Ok(0u32)).unwrap();
        for v in &meshes[0].vertices {
            let dot: f32 = v.tangent.iter().zip(v.normal).map(|(a, b)| a * b).sum();
            assert!(dot.abs() < 1e-5);
            assert_eq!(v.bitangent, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn tangent_follows_u_direction() {
        let positions = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let tangents = compute_tangents(&positions, &uvs, &[vec![0, 1, 2]]);
        for t in tangents {
            assert_eq!(t, [2.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn degenerate_uvs_leave_zero_tangents() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let uvs = [[0.5, 0.5]; 3];
        let tangents = compute_tangents(&positions, &uvs, &[vec![0, 1, 2]]);
        assert!(tangents.iter().all(|t| *t == [0.0; 3]));
    }
}
